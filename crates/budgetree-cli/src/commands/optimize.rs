//! Optimization report

use std::path::Path;

use anyhow::{Context, Result};
use budgetree_core::{analyze, build_budget_tree, AnalysisConfig, OptimizationReport, Severity};

use super::{load_plan, money};

pub fn cmd_optimize(
    plan_path: &Path,
    budget: Option<f64>,
    config: &AnalysisConfig,
    json_output: bool,
) -> Result<()> {
    let plan = load_plan(plan_path, budget)?;
    let root = build_budget_tree(&plan.items, plan.total_budget, config.allocation_rules());
    let report = analyze(&root, &config.optimizer);

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
        return Ok(());
    }

    print!("{}", render_report(&report));
    Ok(())
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "🔴",
        Severity::Medium => "🟡",
        Severity::Low => "🟢",
    }
}

/// Render suggestions grouped by severity, highest first, then a summary
pub fn render_report(report: &OptimizationReport) -> String {
    let mut out = String::new();
    out.push_str("💡 Optimization Report\n");
    out.push_str("   ─────────────────────────────────────────────\n");

    if report.is_empty() {
        out.push_str("   ✓ Budget allocation looks balanced\n");
    }

    let mut severities = Severity::all().to_vec();
    severities.sort_by_key(|s| std::cmp::Reverse(s.priority()));

    for severity in severities {
        let group = report.by_severity(severity);
        if group.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "\n   {} {} ({})\n",
            severity_icon(severity),
            severity.as_str().to_uppercase(),
            group.len()
        ));
        for suggestion in group {
            out.push_str(&format!("      • {}\n", suggestion.message));
        }
    }

    let summary = &report.summary;
    out.push('\n');
    out.push_str(&format!(
        "   {} nodes analyzed, depth {}{}\n",
        summary.nodes_analyzed,
        summary.max_depth_reached,
        if summary.truncated {
            " (deeper levels skipped)"
        } else {
            ""
        }
    ));
    if summary.total_reallocation > 0.0 {
        out.push_str(&format!(
            "   Suggested reallocation: {}\n",
            money(summary.total_reallocation)
        ));
    }
    out
}
