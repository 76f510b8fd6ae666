//! Budgetree Core Library
//!
//! Hierarchical budget analysis over a flat list of planned expenses:
//! - Budget tree construction (category → location → date)
//! - Optimization analysis flagging misallocated budget
//! - Nested and/or criteria search over expense items
//! - TOML analysis configuration with embedded defaults

pub mod config;
pub mod error;
pub mod models;
pub mod optimizer;
pub mod search;
pub mod tree;

pub use config::{AnalysisConfig, ConfigSource, SearchConfig};
pub use error::{Error, Result};
pub use models::{
    AllocationRule, AllocationRules, BudgetLevel, BudgetNode, ExpenseItem, ExpensePlan, TreeStats,
};
pub use optimizer::{
    analyze, analyze_default, NodeAnalysis, OptimizationReport, OptimizerConfig, ReportSummary,
    Severity, Suggestion, SuggestionKind,
};
pub use search::{search, search_with_depth, Criterion, Predicate, SearchResult};
pub use tree::{build_budget_tree, tree_stats};
