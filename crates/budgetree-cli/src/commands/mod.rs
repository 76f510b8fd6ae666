//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Config command and shared utilities (load_plan, load_config)
//! - `tree` - Budget tree display
//! - `optimize` - Optimization report
//! - `search` - Criteria search over plan items

pub mod core;
pub mod optimize;
pub mod search;
pub mod tree;

// Re-export command functions for main.rs
pub use core::*;
pub use optimize::*;
pub use search::*;
pub use tree::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an amount as currency with two decimals
pub fn money(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}
