//! Core commands and shared utilities
//!
//! - `load_plan` - Read and validate a plan file, applying a budget override
//! - `load_config` - Resolve the analysis config
//! - `cmd_config` - Show the effective config and where it came from

use std::path::Path;

use anyhow::{bail, Context, Result};
use budgetree_core::{AnalysisConfig, ExpensePlan};

/// Load a plan file, replacing its total budget when `budget` is given
pub fn load_plan(path: &Path, budget: Option<f64>) -> Result<ExpensePlan> {
    let mut plan = ExpensePlan::load(path)
        .with_context(|| format!("Failed to load plan {}", path.display()))?;

    if let Some(budget) = budget {
        if !budget.is_finite() {
            bail!("Budget must be a finite number, got {}", budget);
        }
        plan.total_budget = budget;
    }

    tracing::debug!(
        items = plan.items.len(),
        total_budget = plan.total_budget,
        "Loaded plan"
    );
    Ok(plan)
}

pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    AnalysisConfig::load(path).context("Failed to load analysis config")
}

pub fn cmd_config(path: Option<&Path>) -> Result<()> {
    let (config, source) =
        AnalysisConfig::resolve(path).context("Failed to load analysis config")?;

    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;

    println!("⚙️  Analysis Config ({})", source);
    println!("   ─────────────────────────────────────────────");
    println!();
    print!("{}", rendered);

    Ok(())
}
