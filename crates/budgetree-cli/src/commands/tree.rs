//! Budget tree display

use std::path::Path;

use anyhow::{Context, Result};
use budgetree_core::{build_budget_tree, tree_stats, AnalysisConfig, BudgetNode};
use serde_json::json;

use super::{load_plan, money, truncate};

pub fn cmd_tree(
    plan_path: &Path,
    budget: Option<f64>,
    config: &AnalysisConfig,
    json_output: bool,
) -> Result<()> {
    let plan = load_plan(plan_path, budget)?;
    let root = build_budget_tree(&plan.items, plan.total_budget, config.allocation_rules());
    let stats = tree_stats(&root);

    if json_output {
        let output = json!({ "tree": root, "stats": stats });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize tree")?
        );
        return Ok(());
    }

    println!("🌳 Budget Tree ({} {})", money(plan.total_budget), plan.currency);
    println!("   ─────────────────────────────────────────────");
    print!("{}", render_tree(&root));
    println!();
    println!(
        "   {} nodes, {} leaves, depth {}, {} categories",
        stats.nodes, stats.leaves, stats.max_depth, stats.categories
    );

    Ok(())
}

/// Render a tree as indented lines, one node per line
pub fn render_tree(root: &BudgetNode) -> String {
    let mut out = String::new();
    render_node(root, 0, &mut out);
    out
}

fn render_node(node: &BudgetNode, depth: usize, out: &mut String) {
    let utilization = format!("{:.0}%", node.utilization_or_zero() * 100.0);
    let indent = "  ".repeat(depth);
    let label = truncate(&node.name, 40usize.saturating_sub(indent.len()));

    out.push_str(&format!(
        "   {}{:<width$} {:>10} of {:>10}  {:>5}",
        indent,
        label,
        money(node.actual_cost),
        money(node.allocated_budget),
        utilization,
        width = 40usize.saturating_sub(indent.len()),
    ));
    if node.is_leaf() && !node.items.is_empty() {
        out.push_str(&format!("  ({} items)", node.items.len()));
    }
    out.push('\n');

    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}
