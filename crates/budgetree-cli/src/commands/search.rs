//! Criteria search over plan items

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use budgetree_core::{search_with_depth, Criterion, ExpenseItem};

use super::{load_plan, money, truncate};

/// Parse criteria from a file path, or as inline JSON when no such file exists
pub fn parse_criteria(arg: &str) -> Result<Criterion> {
    let path = Path::new(arg);
    let content = if path.is_file() {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read criteria {}", path.display()))?
    } else {
        arg.to_string()
    };

    Criterion::from_json_str(&content).context("Invalid search criteria")
}

pub fn cmd_search(plan_path: &Path, criteria: &str, max_depth: usize, json_output: bool) -> Result<()> {
    let plan = load_plan(plan_path, None)?;
    let criterion = parse_criteria(criteria)?;
    let result = search_with_depth(&plan.items, &criterion, max_depth);

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize results")?
        );
        return Ok(());
    }

    println!("🔍 Search Results ({} of {})", result.items.len(), plan.items.len());
    println!("   ─────────────────────────────────────────────");

    let ignored = criterion.all_ignored_keys();
    if !ignored.is_empty() {
        println!("   ⚠ Ignored keys: {}", ignored.join(", "));
    }
    if result.truncated {
        println!("   ⚠ Clauses nested deeper than {} were not expanded", max_depth);
    }

    if result.items.is_empty() {
        println!("   No matching items.");
        return Ok(());
    }

    for item in &result.items {
        println!("{}", render_item(item));
    }

    Ok(())
}

fn render_item(item: &ExpenseItem) -> String {
    format!(
        "   {}  {:<30} {:>10}  {} @ {}",
        item.date,
        truncate(&item.title, 30),
        money(item.cost),
        truncate(&item.category, 20),
        truncate(&item.location, 20),
    )
}
