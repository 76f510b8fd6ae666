//! Budgetree CLI - Hierarchical budget analysis
//!
//! Usage:
//!   budgetree tree --plan trip.json              Show the budget tree
//!   budgetree optimize --plan trip.json          Suggest reallocations
//!   budgetree search --plan trip.json -c '{..}'  Filter plan items
//!   budgetree config                             Show effective config

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Tree { plan, budget, json } => {
            let config = commands::load_config(config_path)?;
            commands::cmd_tree(&plan, budget, &config, json)
        }
        Commands::Optimize { plan, budget, json } => {
            let config = commands::load_config(config_path)?;
            commands::cmd_optimize(&plan, budget, &config, json)
        }
        Commands::Search {
            plan,
            criteria,
            max_depth,
            json,
        } => {
            let config = commands::load_config(config_path)?;
            let max_depth = max_depth.unwrap_or(config.search.max_depth);
            commands::cmd_search(&plan, &criteria, max_depth, json)
        }
        Commands::Config => commands::cmd_config(config_path),
    }
}
