//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Budgetree - Hierarchical budget analysis for planned expenses
#[derive(Parser)]
#[command(name = "budgetree")]
#[command(about = "Build, optimize and search hierarchical budget plans", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Analysis config file (TOML)
    ///
    /// Defaults to ~/.local/share/budgetree/config/analysis.toml if present,
    /// otherwise the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and show the budget allocation tree
    Tree {
        /// Plan file (JSON with items and total_budget)
        #[arg(short, long)]
        plan: PathBuf,

        /// Override the plan's total budget
        #[arg(short, long, allow_negative_numbers = true)]
        budget: Option<f64>,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Analyze the budget tree for misallocation
    Optimize {
        /// Plan file (JSON with items and total_budget)
        #[arg(short, long)]
        plan: PathBuf,

        /// Override the plan's total budget
        #[arg(short, long, allow_negative_numbers = true)]
        budget: Option<f64>,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Search plan items with nested criteria
    Search {
        /// Plan file (JSON with items and total_budget)
        #[arg(short, long)]
        plan: PathBuf,

        /// Criteria as a JSON file path or inline JSON
        ///
        /// Example: '{"category": "Food", "or": {"location": "Paris"}}'
        #[arg(short, long)]
        criteria: String,

        /// Deepest nested clause to expand (defaults to config)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the effective analysis configuration
    Config,
}
