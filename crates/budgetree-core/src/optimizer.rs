//! Budget optimization analysis
//!
//! Walks a built budget tree post-order and, at every internal node, compares
//! each child's utilization against the configured thresholds:
//!
//! - **High** - child spends more than `over_budget_threshold` of its allocation
//! - **Medium** - child spends less than `under_utilized_threshold`
//! - **Low** - proposed transfer from an under-utilized sibling to an
//!   over-budget one (greedy pairing, worst offenders first)
//!
//! Analysis stops below `max_depth`; skipped subtrees are reported through
//! `ReportSummary::truncated` rather than as an error.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{BudgetLevel, BudgetNode};

/// Thresholds and limits for optimization analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Utilization above which a child is over budget (1.20 = 120%)
    pub over_budget_threshold: f64,
    /// Utilization below which a child is under-utilized
    pub under_utilized_threshold: f64,
    /// Deepest level analyzed (root = 0)
    pub max_depth: usize,
    /// Fraction of an under-utilized sibling's allocation proposed for transfer
    pub optimization_factor: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            over_budget_threshold: 1.20,
            under_utilized_threshold: 0.50,
            max_depth: 5,
            optimization_factor: 0.10,
        }
    }
}

/// How urgent a suggestion is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Proposed transfer between siblings
    Low,
    /// Budget sitting unused
    Medium,
    /// Spending well over allocation
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Numeric priority for sorting (higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    /// All severities, most urgent first
    pub fn all() -> &'static [Severity] {
        &[Severity::High, Severity::Medium, Severity::Low]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// What a suggestion is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    OverBudget,
    UnderUtilized,
    Reallocation,
}

/// A single optimization suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub severity: Severity,
    pub message: String,
    /// Node names from the root down to the target node
    pub path: Vec<String>,
    /// For reallocations: the sibling the budget moves from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<Vec<String>>,
    /// For reallocations: the amount proposed for transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl Suggestion {
    /// Target path joined for display (e.g., "Total Budget > Food")
    pub fn target(&self) -> String {
        self.path.join(" > ")
    }
}

/// Analysis of one tree node, mirroring the tree's shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAnalysis {
    pub name: String,
    pub level: BudgetLevel,
    pub depth: usize,
    pub allocated_budget: f64,
    pub actual_cost: f64,
    pub utilization_rate: Option<f64>,
    /// Suggestions raised at this node about its children
    pub suggestions: Vec<Suggestion>,
    pub children: Vec<NodeAnalysis>,
}

impl NodeAnalysis {
    fn new(node: &BudgetNode, depth: usize) -> Self {
        Self {
            name: node.name.clone(),
            level: node.level,
            depth,
            allocated_budget: node.allocated_budget,
            actual_cost: node.actual_cost,
            utilization_rate: node.utilization_rate(),
            suggestions: Vec::new(),
            children: Vec::new(),
        }
    }

    /// This node's suggestions followed by each child's, in child order
    fn collect_suggestions(&self, out: &mut Vec<Suggestion>) {
        out.extend(self.suggestions.iter().cloned());
        for child in &self.children {
            child.collect_suggestions(out);
        }
    }
}

/// Summary counters for a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub nodes_analyzed: usize,
    pub max_depth_reached: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Sum of all proposed transfer amounts
    pub total_reallocation: f64,
    /// Set when a subtree below `max_depth` was not analyzed
    pub truncated: bool,
}

/// Result of an optimization pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub suggestions: Vec<Suggestion>,
    pub summary: ReportSummary,
    pub analysis: NodeAnalysis,
}

impl OptimizationReport {
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    /// Suggestions of one severity, in report order
    pub fn by_severity(&self, severity: Severity) -> Vec<&Suggestion> {
        self.suggestions
            .iter()
            .filter(|s| s.severity == severity)
            .collect()
    }
}

/// Analyze a tree with default thresholds
pub fn analyze_default(root: &BudgetNode) -> OptimizationReport {
    analyze(root, &OptimizerConfig::default())
}

/// Analyze a budget tree for misallocation
pub fn analyze(root: &BudgetNode, config: &OptimizerConfig) -> OptimizationReport {
    let mut analyzer = Analyzer {
        config,
        nodes_analyzed: 0,
        max_depth_reached: 0,
        truncated: false,
    };

    let root_path = vec![root.name.clone()];
    let analysis = analyzer.visit(root, 0, &root_path);

    let mut suggestions = Vec::new();
    analysis.collect_suggestions(&mut suggestions);

    let count = |severity: Severity| suggestions.iter().filter(|s| s.severity == severity).count();
    let summary = ReportSummary {
        nodes_analyzed: analyzer.nodes_analyzed,
        max_depth_reached: analyzer.max_depth_reached,
        high: count(Severity::High),
        medium: count(Severity::Medium),
        low: count(Severity::Low),
        total_reallocation: suggestions.iter().filter_map(|s| s.amount).sum(),
        truncated: analyzer.truncated,
    };

    tracing::debug!(
        nodes = summary.nodes_analyzed,
        suggestions = suggestions.len(),
        high = summary.high,
        truncated = summary.truncated,
        "Optimization analysis complete"
    );

    OptimizationReport {
        suggestions,
        summary,
        analysis,
    }
}

/// Where a child stands against the thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
enum Standing {
    Over(f64),
    Under(f64),
    Balanced,
}

struct Analyzer<'c> {
    config: &'c OptimizerConfig,
    nodes_analyzed: usize,
    max_depth_reached: usize,
    truncated: bool,
}

impl Analyzer<'_> {
    /// Analyze `node` at `depth` (never deeper than `max_depth`)
    fn visit(&mut self, node: &BudgetNode, depth: usize, path: &[String]) -> NodeAnalysis {
        self.nodes_analyzed += 1;
        self.max_depth_reached = self.max_depth_reached.max(depth);

        let mut analysis = NodeAnalysis::new(node, depth);
        if node.is_leaf() {
            return analysis;
        }

        for child in &node.children {
            if depth + 1 > self.config.max_depth {
                if !child.is_leaf() {
                    self.truncated = true;
                    tracing::debug!(node = %child.name, depth = depth + 1, "Analysis depth limit reached");
                }
                continue;
            }
            let child_path = child_path(path, child);
            analysis.children.push(self.visit(child, depth + 1, &child_path));
        }

        analysis.suggestions = self.assess_children(node, path);
        analysis
    }

    /// Threshold flags for each child, then sibling reallocation pairs
    fn assess_children(&self, node: &BudgetNode, path: &[String]) -> Vec<Suggestion> {
        let standings: Vec<(&BudgetNode, Standing)> = node
            .children
            .iter()
            .map(|child| (child, self.standing(child)))
            .collect();

        let mut suggestions = Vec::new();

        for (child, standing) in &standings {
            match standing {
                Standing::Over(_) => suggestions.push(Suggestion {
                    kind: SuggestionKind::OverBudget,
                    severity: Severity::High,
                    message: format!(
                        "Reduce allocation or cost in {}: {}",
                        child.name,
                        describe_usage(child)
                    ),
                    path: child_path(path, child),
                    source_path: None,
                    amount: None,
                }),
                Standing::Under(_) => suggestions.push(Suggestion {
                    kind: SuggestionKind::UnderUtilized,
                    severity: Severity::Medium,
                    message: format!(
                        "Reallocate unused budget from {}: {}",
                        child.name,
                        describe_usage(child)
                    ),
                    path: child_path(path, child),
                    source_path: None,
                    amount: None,
                }),
                Standing::Balanced => {}
            }
        }

        // Stable sorts keep child order among equal utilization
        let mut over: Vec<(&BudgetNode, f64)> = standings
            .iter()
            .filter_map(|(child, standing)| match standing {
                Standing::Over(rate) => Some((*child, *rate)),
                _ => None,
            })
            .collect();
        over.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let mut under: Vec<(&BudgetNode, f64)> = standings
            .iter()
            .filter_map(|(child, standing)| match standing {
                Standing::Under(rate) => Some((*child, *rate)),
                _ => None,
            })
            .collect();
        under.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        for ((over_child, _), (under_child, _)) in over.iter().zip(under.iter()) {
            let amount = self.config.optimization_factor * under_child.allocated_budget;
            suggestions.push(Suggestion {
                kind: SuggestionKind::Reallocation,
                severity: Severity::Low,
                message: format!(
                    "Move ${:.2} from {} to {}",
                    amount, under_child.name, over_child.name
                ),
                path: child_path(path, over_child),
                source_path: Some(child_path(path, under_child)),
                amount: Some(amount),
            });
        }

        suggestions
    }

    /// Utilization is undefined without an allocation and reads as 0 in
    /// reports (`BudgetNode::utilization_or_zero`). Judging differs on
    /// purpose: a child with cost but no allocation is infinitely over
    /// budget, and one with neither is not judged.
    fn standing(&self, child: &BudgetNode) -> Standing {
        let rate = match child.utilization_rate() {
            Some(rate) => rate,
            None if child.actual_cost > 0.0 => f64::INFINITY,
            None => return Standing::Balanced,
        };

        if rate > self.config.over_budget_threshold {
            Standing::Over(rate)
        } else if rate < self.config.under_utilized_threshold {
            Standing::Under(rate)
        } else {
            Standing::Balanced
        }
    }
}

fn child_path(path: &[String], child: &BudgetNode) -> Vec<String> {
    let mut out = path.to_vec();
    out.push(child.name.clone());
    out
}

fn describe_usage(node: &BudgetNode) -> String {
    match node.utilization_rate() {
        Some(rate) => format!(
            "spent ${:.2} of ${:.2} ({:.0}% utilized)",
            node.actual_cost,
            node.allocated_budget,
            rate * 100.0
        ),
        None => format!("spent ${:.2} with no allocation", node.actual_cost),
    }
}
