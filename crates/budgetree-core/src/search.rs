//! Nested criteria search over expense items
//!
//! A criterion level holds conjunctive leaf predicates plus optional nested
//! `and` / `or` clauses:
//!
//! - `and` further restricts what this level matched
//! - `or` is evaluated against this level's *unfiltered* input and unioned in
//!
//! Results are always an order-preserving subsequence of the input. Nesting
//! deeper than `max_depth` is not expanded.
//!
//! ## JSON form
//!
//! ```json
//! {
//!   "category": "Culture",
//!   "or": { "location": "New York", "and": { "cost_range": [15, 50] } }
//! }
//! ```

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::ExpenseItem;

/// Default limit on nested clause expansion
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// A single leaf test against an expense item
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Category contains the text (case-insensitive)
    Category(String),
    /// Location contains the text (case-insensitive)
    Location(String),
    /// Cost within `[min, max]`
    CostRange { min: f64, max: f64 },
    /// Duration in hours within `[min, max]`
    DurationRange { min: f64, max: f64 },
    /// Date within `[start, end]`
    DateRange { start: NaiveDate, end: NaiveDate },
}

impl Predicate {
    pub fn matches(&self, item: &ExpenseItem) -> bool {
        match self {
            Predicate::Category(text) => contains_ignore_case(&item.category, text),
            Predicate::Location(text) => contains_ignore_case(&item.location, text),
            Predicate::CostRange { min, max } => item.cost >= *min && item.cost <= *max,
            Predicate::DurationRange { min, max } => {
                item.duration_hours >= *min && item.duration_hours <= *max
            }
            Predicate::DateRange { start, end } => item.date >= *start && item.date <= *end,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// One level of a nested search criterion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criterion {
    /// Leaf predicates, all of which must match
    pub predicates: Vec<Predicate>,
    pub and: Option<Box<Criterion>>,
    pub or: Option<Box<Criterion>>,
    /// Keys skipped while parsing this level
    pub ignored_keys: Vec<String>,
}

impl Criterion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn category(self, text: impl Into<String>) -> Self {
        self.predicate(Predicate::Category(text.into()))
    }

    pub fn location(self, text: impl Into<String>) -> Self {
        self.predicate(Predicate::Location(text.into()))
    }

    pub fn cost_range(self, min: f64, max: f64) -> Self {
        self.predicate(Predicate::CostRange { min, max })
    }

    pub fn duration_range(self, min: f64, max: f64) -> Self {
        self.predicate(Predicate::DurationRange { min, max })
    }

    pub fn date_range(self, start: NaiveDate, end: NaiveDate) -> Self {
        self.predicate(Predicate::DateRange { start, end })
    }

    pub fn with_and(mut self, clause: Criterion) -> Self {
        self.and = Some(Box::new(clause));
        self
    }

    pub fn with_or(mut self, clause: Criterion) -> Self {
        self.or = Some(Box::new(clause));
        self
    }

    /// Whether an item passes every leaf predicate at this level
    pub fn matches_level(&self, item: &ExpenseItem) -> bool {
        self.predicates.iter().all(|p| p.matches(item))
    }

    /// Levels in the deepest and/or chain (1 for a flat criterion)
    pub fn nesting_depth(&self) -> usize {
        let and = self.and.as_ref().map_or(0, |c| c.nesting_depth());
        let or = self.or.as_ref().map_or(0, |c| c.nesting_depth());
        1 + and.max(or)
    }

    /// Parse criteria JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_json(&value)
    }

    /// Parse the nested mapping form
    ///
    /// Unknown keys are logged and skipped; known keys with values of the
    /// wrong shape are rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::InvalidData("Criteria must be a JSON object".to_string()))?;

        let mut criterion = Criterion::new();

        for (key, value) in map {
            match key.as_str() {
                "category" => {
                    criterion = criterion.category(expect_str(key, value)?);
                }
                "location" => {
                    criterion = criterion.location(expect_str(key, value)?);
                }
                "cost_range" => {
                    let (min, max) = parse_number_range(key, value)?;
                    criterion = criterion.cost_range(min, max);
                }
                "duration_range" => {
                    let (min, max) = parse_number_range(key, value)?;
                    criterion = criterion.duration_range(min, max);
                }
                "date_range" => {
                    let (start, end) = parse_date_range(key, value)?;
                    criterion = criterion.date_range(start, end);
                }
                "and" => {
                    criterion = criterion.with_and(Criterion::from_json(value)?);
                }
                "or" => {
                    criterion = criterion.with_or(Criterion::from_json(value)?);
                }
                _ => {
                    tracing::warn!(key = %key, "Ignoring unknown criteria key");
                    criterion.ignored_keys.push(key.clone());
                }
            }
        }

        Ok(criterion)
    }

    /// Ignored keys at every level, in parse order
    pub fn all_ignored_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.ignored_keys.iter().map(String::as_str).collect();
        if let Some(and) = &self.and {
            keys.extend(and.all_ignored_keys());
        }
        if let Some(or) = &self.or {
            keys.extend(or.all_ignored_keys());
        }
        keys
    }
}

fn expect_str<'v>(key: &str, value: &'v Value) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| Error::InvalidData(format!("Criteria key '{}' must be a string", key)))
}

/// Accepts `[min, max]` or `{"min": .., "max": ..}`
fn range_bounds<'v>(key: &str, value: &'v Value) -> Result<(&'v Value, &'v Value)> {
    match value {
        Value::Array(bounds) if bounds.len() == 2 => Ok((&bounds[0], &bounds[1])),
        Value::Object(map) => match (map.get("min"), map.get("max")) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(Error::InvalidData(format!(
                "Criteria key '{}' needs both min and max",
                key
            ))),
        },
        _ => Err(Error::InvalidData(format!(
            "Criteria key '{}' must be a [min, max] pair",
            key
        ))),
    }
}

fn parse_number_range(key: &str, value: &Value) -> Result<(f64, f64)> {
    let (min, max) = range_bounds(key, value)?;
    match (min.as_f64(), max.as_f64()) {
        (Some(min), Some(max)) => Ok((min, max)),
        _ => Err(Error::InvalidData(format!(
            "Criteria key '{}' bounds must be numbers",
            key
        ))),
    }
}

fn parse_date_range(key: &str, value: &Value) -> Result<(NaiveDate, NaiveDate)> {
    let (start, end) = range_bounds(key, value)?;
    let parse = |bound: &Value| {
        bound
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "Criteria key '{}' bounds must be YYYY-MM-DD dates",
                    key
                ))
            })
    };
    Ok((parse(start)?, parse(end)?))
}

/// Items matched by a search, plus whether nesting was cut short
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    pub items: Vec<ExpenseItem>,
    pub truncated: bool,
}

/// Search with the default depth limit
pub fn search(items: &[ExpenseItem], criterion: &Criterion) -> Vec<ExpenseItem> {
    search_with_depth(items, criterion, DEFAULT_MAX_DEPTH).items
}

/// Search, expanding nested clauses down to `max_depth` (top level = 0)
pub fn search_with_depth(
    items: &[ExpenseItem],
    criterion: &Criterion,
    max_depth: usize,
) -> SearchResult {
    let input: Vec<&ExpenseItem> = items.iter().collect();
    let mut truncated = false;
    let matched = evaluate(&input, criterion, 0, max_depth, &mut truncated);

    tracing::debug!(
        input = items.len(),
        matched = matched.len(),
        truncated,
        "Criteria search complete"
    );

    SearchResult {
        items: matched.into_iter().cloned().collect(),
        truncated,
    }
}

fn evaluate<'a>(
    items: &[&'a ExpenseItem],
    criterion: &Criterion,
    depth: usize,
    max_depth: usize,
    truncated: &mut bool,
) -> Vec<&'a ExpenseItem> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut filtered: Vec<&ExpenseItem> = items
        .iter()
        .copied()
        .filter(|item| criterion.matches_level(item))
        .collect();

    if criterion.and.is_none() && criterion.or.is_none() {
        return filtered;
    }

    if depth > max_depth {
        *truncated = true;
        tracing::debug!(depth, max_depth, "Criteria nesting limit reached");
        return filtered;
    }

    if let Some(and) = &criterion.and {
        filtered = evaluate(&filtered, and, depth + 1, max_depth, truncated);
    }

    if let Some(or) = &criterion.or {
        let alternatives = evaluate(items, or, depth + 1, max_depth, truncated);
        filtered = union_in_order(items, &filtered, &alternatives);
    }

    filtered
}

/// Items present in either list, in `items` order
///
/// Both lists borrow from `items`, so membership is by identity. Two
/// distinct items sharing an id are kept apart.
fn union_in_order<'a>(
    items: &[&'a ExpenseItem],
    left: &[&ExpenseItem],
    right: &[&ExpenseItem],
) -> Vec<&'a ExpenseItem> {
    let wanted: HashSet<*const ExpenseItem> = left
        .iter()
        .chain(right.iter())
        .map(|item| *item as *const ExpenseItem)
        .collect();

    items
        .iter()
        .copied()
        .filter(|item| wanted.contains(&(*item as *const ExpenseItem)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn item(id: &str, cost: f64, category: &str, location: &str, day: &str) -> ExpenseItem {
        ExpenseItem::new(id, id, cost, category, location, date(day))
    }

    fn ids(items: &[ExpenseItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    fn sample() -> Vec<ExpenseItem> {
        vec![
            item("lunch", 35.0, "Food & Dining", "Paris", "2025-01-21").with_duration(1.0),
            item("taxi", 45.0, "Transportation", "Paris", "2025-01-20").with_duration(0.5),
            item("dinner", 120.0, "Food & Dining", "New York", "2025-01-15").with_duration(2.5),
            item("show", 150.0, "Entertainment", "New York", "2025-01-16").with_duration(3.0),
            item("louvre", 20.0, "Culture", "Paris", "2025-01-22").with_duration(5.0),
        ]
    }

    #[test]
    fn test_or_branch_uses_unfiltered_items() {
        let items = vec![
            item("food", 30.0, "Food", "Rome", "2025-01-15"),
            item("bus", 50.0, "Transport", "Paris", "2025-01-15"),
        ];
        let criterion = Criterion::new()
            .category("Food")
            .with_or(Criterion::new().location("Paris"));

        assert_eq!(ids(&search(&items, &criterion)), vec!["food", "bus"]);
    }

    #[test]
    fn test_or_union_keeps_matched_item_when_ids_collide() {
        let items = vec![
            item("x", 200.0, "Lodging", "Rome", "2025-01-15").with_description("Hotel"),
            item("x", 25.0, "Food", "Rome", "2025-01-15").with_description("Pasta"),
        ];
        let plain = search(&items, &Criterion::new().category("Food"));
        let with_empty_or = search(
            &items,
            &Criterion::new()
                .category("Food")
                .with_or(Criterion::new().location("Nowhere")),
        );

        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].category, "Food");
        assert_eq!(with_empty_or, plain);
    }

    #[test]
    fn test_or_union_keeps_both_items_sharing_an_id() {
        let items = vec![
            item("x", 200.0, "Lodging", "Rome", "2025-01-15"),
            item("x", 25.0, "Food", "Rome", "2025-01-15"),
        ];
        let criterion = Criterion::new()
            .category("Food")
            .with_or(Criterion::new().category("Lodging"));

        let categories: Vec<String> = search(&items, &criterion)
            .into_iter()
            .map(|i| i.category)
            .collect();
        assert_eq!(categories, vec!["Lodging", "Food"]);
    }

    #[test]
    fn test_category_match_is_case_insensitive_containment() {
        let criterion = Criterion::new().category("food");
        assert_eq!(ids(&search(&sample(), &criterion)), vec!["lunch", "dinner"]);
    }

    #[test]
    fn test_leaf_predicates_are_conjunctive() {
        let criterion = Criterion::new().location("Paris").cost_range(30.0, 45.0);
        assert_eq!(ids(&search(&sample(), &criterion)), vec!["lunch", "taxi"]);
    }

    #[test]
    fn test_ranges_are_inclusive() {
        let items = sample();
        assert_eq!(
            ids(&search(&items, &Criterion::new().cost_range(45.0, 120.0))),
            vec!["taxi", "dinner"]
        );
        assert_eq!(
            ids(&search(&items, &Criterion::new().duration_range(3.0, 5.0))),
            vec!["show", "louvre"]
        );
        assert_eq!(
            ids(&search(
                &items,
                &Criterion::new().date_range(date("2025-01-16"), date("2025-01-21"))
            )),
            vec!["lunch", "taxi", "show"]
        );
    }

    #[test]
    fn test_and_narrows_result() {
        let criterion = Criterion::new()
            .location("Paris")
            .with_and(Criterion::new().cost_range(0.0, 40.0));
        assert_eq!(ids(&search(&sample(), &criterion)), vec!["lunch", "louvre"]);
    }

    #[test]
    fn test_and_then_or_union() {
        let criterion = Criterion::new()
            .location("Paris")
            .with_and(Criterion::new().category("Culture"))
            .with_or(Criterion::new().category("Entertainment"));
        assert_eq!(ids(&search(&sample(), &criterion)), vec!["show", "louvre"]);
    }

    #[test]
    fn test_union_lists_each_item_once() {
        let criterion = Criterion::new()
            .location("Paris")
            .with_or(Criterion::new().category("Food"));
        assert_eq!(
            ids(&search(&sample(), &criterion)),
            vec!["lunch", "taxi", "dinner", "louvre"]
        );
    }

    #[test]
    fn test_empty_items_return_empty() {
        let criterion = Criterion::new().with_or(Criterion::new());
        assert!(search(&[], &criterion).is_empty());
    }

    #[test]
    fn test_empty_criterion_matches_everything() {
        assert_eq!(search(&sample(), &Criterion::new()).len(), 5);
    }

    #[test]
    fn test_depth_limit_stops_expansion() {
        // Each level narrows further; levels past the limit are ignored
        let mut criterion = Criterion::new().cost_range(0.0, 40.0);
        for _ in 0..5 {
            criterion = Criterion::new().with_and(criterion);
        }
        assert_eq!(criterion.nesting_depth(), 6);

        let limited = search_with_depth(&sample(), &criterion, 3);
        assert!(limited.truncated);
        assert_eq!(limited.items.len(), 5);

        let full = search_with_depth(&sample(), &criterion, 10);
        assert!(!full.truncated);
        assert_eq!(ids(&full.items), vec!["lunch", "louvre"]);
    }

    #[test]
    fn test_depth_boundary() {
        // and clause at depth 1 is expanded when max_depth = 0
        let criterion = Criterion::new().with_and(Criterion::new().category("Culture"));
        let result = search_with_depth(&sample(), &criterion, 0);
        assert!(!result.truncated);
        assert_eq!(ids(&result.items), vec!["louvre"]);
    }

    #[test]
    fn test_parse_json_criteria() {
        let criterion = Criterion::from_json_str(
            r#"{
                "category": "Culture",
                "or": {
                    "location": "New York",
                    "and": {"cost_range": [15, 50]}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(criterion.predicates, vec![Predicate::Category("Culture".into())]);
        let or = criterion.or.as_ref().unwrap();
        assert_eq!(or.predicates, vec![Predicate::Location("New York".into())]);
        assert_eq!(
            or.and.as_ref().unwrap().predicates,
            vec![Predicate::CostRange { min: 15.0, max: 50.0 }]
        );
    }

    #[test]
    fn test_parse_object_and_date_ranges() {
        let criterion = Criterion::from_json_str(
            r#"{"duration_range": {"min": 1, "max": 3},
                "date_range": ["2025-01-15", "2025-01-21"]}"#,
        )
        .unwrap();
        assert_eq!(ids(&search(&sample(), &criterion)), vec!["lunch", "dinner", "show"]);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let criterion = Criterion::from_json_str(
            r#"{"category": "Food", "vibe": "cozy", "and": {"rating": 5}}"#,
        )
        .unwrap();
        assert_eq!(criterion.ignored_keys, vec!["vibe"]);
        assert_eq!(criterion.all_ignored_keys(), vec!["vibe", "rating"]);
        assert_eq!(ids(&search(&sample(), &criterion)), vec!["lunch", "dinner"]);
    }

    #[test]
    fn test_malformed_known_keys_are_errors() {
        assert!(Criterion::from_json_str(r#"{"category": 5}"#).is_err());
        assert!(Criterion::from_json_str(r#"{"cost_range": [1]}"#).is_err());
        assert!(Criterion::from_json_str(r#"{"cost_range": ["a", "b"]}"#).is_err());
        assert!(Criterion::from_json_str(r#"{"date_range": ["01/15/2025", "2025-01-20"]}"#).is_err());
        assert!(Criterion::from_json_str(r#"["category"]"#).is_err());
    }
}
