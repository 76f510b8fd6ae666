//! Domain models for Budgetree

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ========== Expense Item Models ==========

/// A planned, costed activity supplied by the surrounding application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Planned cost, never negative
    pub cost: f64,
    pub category: String,
    pub location: String,
    pub date: NaiveDate,
    /// Optional start time label (e.g., "19:00")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Duration in hours, never negative
    #[serde(default)]
    pub duration_hours: f64,
    /// Whether the activity was proposed by the planning assistant
    #[serde(default)]
    pub ai_suggested: bool,
}

impl ExpenseItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        cost: f64,
        category: impl Into<String>,
        location: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            cost,
            category: category.into(),
            location: location.into(),
            date,
            time: None,
            duration_hours: 0.0,
            ai_suggested: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_duration(mut self, hours: f64) -> Self {
        self.duration_hours = hours;
        self
    }

    pub fn with_ai_suggested(mut self, value: bool) -> Self {
        self.ai_suggested = value;
        self
    }

    /// Reject items whose cost or duration is negative or not finite
    pub fn validate(&self) -> Result<()> {
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(Error::InvalidData(format!(
                "Item '{}' has invalid cost: {}",
                self.id, self.cost
            )));
        }
        if !self.duration_hours.is_finite() || self.duration_hours < 0.0 {
            return Err(Error::InvalidData(format!(
                "Item '{}' has invalid duration: {}",
                self.id, self.duration_hours
            )));
        }
        Ok(())
    }
}

/// A set of planned expenses with the budget they must fit in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpensePlan {
    pub items: Vec<ExpenseItem>,
    pub total_budget: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Free-form trip or plan location (e.g., "Multi-city Trip")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl ExpensePlan {
    pub fn new(items: Vec<ExpenseItem>, total_budget: f64) -> Self {
        Self {
            items,
            total_budget,
            currency: default_currency(),
            start_date: None,
            end_date: None,
            location: None,
        }
    }

    /// Parse a plan from JSON and validate every item
    pub fn from_json_str(content: &str) -> Result<Self> {
        let plan: ExpensePlan = serde_json::from_str(content)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Load a plan from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.total_budget.is_finite() {
            return Err(Error::InvalidData(format!(
                "Invalid total budget: {}",
                self.total_budget
            )));
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }

    /// Sum of all planned item costs
    pub fn total_cost(&self) -> f64 {
        self.items.iter().map(|i| i.cost).sum()
    }
}

// ========== Allocation Rule Models ==========

/// Desired share of the total budget for one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationRule {
    /// Fraction of the total budget (0.0 - 1.0)
    pub percentage: f64,
    /// Rank when rules oversubscribe the budget (lower = served first)
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    1
}

impl AllocationRule {
    pub fn new(percentage: f64, priority: u32) -> Self {
        Self {
            percentage,
            priority,
        }
    }
}

/// Allocation rules keyed by category label
pub type AllocationRules = BTreeMap<String, AllocationRule>;

// ========== Budget Tree Models ==========

/// Level of a node in the budget tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLevel {
    Root,
    Category,
    Location,
    Date,
}

impl BudgetLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Category => "category",
            Self::Location => "location",
            Self::Date => "date",
        }
    }

    /// The level below this one, if any
    pub fn next(&self) -> Option<BudgetLevel> {
        match self {
            Self::Root => Some(Self::Category),
            Self::Category => Some(Self::Location),
            Self::Location => Some(Self::Date),
            Self::Date => None,
        }
    }
}

impl fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BudgetLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "root" => Ok(Self::Root),
            "category" => Ok(Self::Category),
            "location" => Ok(Self::Location),
            "date" => Ok(Self::Date),
            _ => Err(format!(
                "Unknown budget level: {} (valid: root, category, location, date)",
                s
            )),
        }
    }
}

/// A node of the budget-allocation tree
///
/// Internal nodes own no items; leaves own the items they represent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetNode {
    pub name: String,
    pub level: BudgetLevel,
    /// Share of the parent's allocation assigned to this node
    pub allocated_budget: f64,
    /// Cost of every item beneath this node
    pub actual_cost: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ExpenseItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BudgetNode>,
}

impl BudgetNode {
    /// Create a leaf holding `items`, with cost rolled up from them
    pub fn leaf(
        name: impl Into<String>,
        level: BudgetLevel,
        allocated_budget: f64,
        items: Vec<ExpenseItem>,
    ) -> Self {
        let actual_cost = items.iter().map(|i| i.cost).sum();
        Self {
            name: name.into(),
            level,
            allocated_budget,
            actual_cost,
            items,
            children: Vec::new(),
        }
    }

    /// Create an internal node, with cost rolled up from its children
    pub fn branch(
        name: impl Into<String>,
        level: BudgetLevel,
        allocated_budget: f64,
        children: Vec<BudgetNode>,
    ) -> Self {
        let actual_cost = children.iter().map(|c| c.actual_cost).sum();
        Self {
            name: name.into(),
            level,
            allocated_budget,
            actual_cost,
            items: Vec::new(),
            children,
        }
    }

    /// `actual_cost / allocated_budget`, undefined without a positive allocation
    pub fn utilization_rate(&self) -> Option<f64> {
        if self.allocated_budget > 0.0 {
            Some(self.actual_cost / self.allocated_budget)
        } else {
            None
        }
    }

    /// Utilization for reporting, with undefined treated as zero
    pub fn utilization_or_zero(&self) -> f64 {
        self.utilization_rate().unwrap_or(0.0)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(|c| c.leaf_count()).sum()
        }
    }

    /// Edges on the longest path down to a leaf (0 for a leaf)
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// All items owned by leaves beneath this node, in tree order
    pub fn leaf_items(&self) -> Box<dyn Iterator<Item = &ExpenseItem> + '_> {
        if self.is_leaf() {
            Box::new(self.items.iter())
        } else {
            Box::new(self.children.iter().flat_map(|c| c.leaf_items()))
        }
    }

    /// Find a direct child by name
    pub fn child(&self, name: &str) -> Option<&BudgetNode> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Shape statistics of a budget tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    pub categories: usize,
}
