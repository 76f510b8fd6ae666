//! Budget tree construction
//!
//! Partitions a flat list of expense items into a budget-allocation tree:
//!
//! ```text
//! Total Budget (root)
//! ├── category
//! │   ├── category @ location
//! │   │   └── category @ location on date
//! │   └── ...
//! └── ...
//! ```
//!
//! Each level splits its parent's allocation between children in proportion
//! to their planned cost (or per category allocation rules at the top
//! level), so children always sum to the parent. A level is skipped when it
//! would not split the group, and grouping stops at the date level.
//! Partition keys are sorted so the same items always produce the same tree.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AllocationRule, AllocationRules, BudgetLevel, BudgetNode, ExpenseItem, TreeStats};

/// Display name of the root node
pub const ROOT_NAME: &str = "Total Budget";

/// Build a budget tree for `items` within `total_budget`
///
/// A non-positive budget still builds the full tree; every node then has an
/// undefined utilization rate.
pub fn build_budget_tree(
    items: &[ExpenseItem],
    total_budget: f64,
    rules: Option<&AllocationRules>,
) -> BudgetNode {
    if items.is_empty() {
        return BudgetNode::leaf(ROOT_NAME, BudgetLevel::Root, total_budget, Vec::new());
    }

    let groups: Vec<(String, Vec<&ExpenseItem>)> =
        partition(items.iter(), |item| item.category.clone())
            .into_iter()
            .collect();

    let costs: Vec<(&str, f64)> = groups
        .iter()
        .map(|(category, group)| (category.as_str(), group_cost(group)))
        .collect();
    let allocations = allocate_categories(&costs, total_budget, rules);

    let children: Vec<BudgetNode> = groups
        .into_iter()
        .zip(allocations)
        .map(|((_, group), allocated)| subdivide(group, BudgetLevel::Category, allocated))
        .collect();

    let root = BudgetNode::branch(ROOT_NAME, BudgetLevel::Root, total_budget, children);

    tracing::debug!(
        items = items.len(),
        nodes = root.node_count(),
        leaves = root.leaf_count(),
        total_budget,
        actual_cost = root.actual_cost,
        "Budget tree built"
    );

    root
}

/// Collect shape statistics for a built tree
pub fn tree_stats(root: &BudgetNode) -> TreeStats {
    let categories: BTreeSet<&str> = root.leaf_items().map(|i| i.category.as_str()).collect();

    TreeStats {
        nodes: root.node_count(),
        leaves: root.leaf_count(),
        max_depth: root.depth(),
        categories: categories.len(),
    }
}

/// Build the node for `group` at `level`, splitting further while a level
/// below still yields more than one partition
fn subdivide(group: Vec<&ExpenseItem>, level: BudgetLevel, allocated: f64) -> BudgetNode {
    let name = node_name(level, &group);

    if group.len() <= 1 {
        return BudgetNode::leaf(name, level, allocated, group.into_iter().cloned().collect());
    }

    match next_partition(&group, level) {
        Some((child_level, partitions)) => {
            let weights: Vec<f64> = partitions.iter().map(|p| group_cost(p)).collect();
            let shares = apportion(allocated, &weights);

            let children = partitions
                .into_iter()
                .zip(shares)
                .map(|(part, share)| subdivide(part, child_level, share))
                .collect();

            BudgetNode::branch(name, level, allocated, children)
        }
        // Nothing left to split on, or past the date level
        None => BudgetNode::leaf(name, level, allocated, group.into_iter().cloned().collect()),
    }
}

/// Find the first level below `level` that splits `group` into 2+ parts
fn next_partition<'a>(
    group: &[&'a ExpenseItem],
    level: BudgetLevel,
) -> Option<(BudgetLevel, Vec<Vec<&'a ExpenseItem>>)> {
    let mut candidate = level.next();

    while let Some(next) = candidate {
        let partitions: Vec<Vec<&ExpenseItem>> = match next {
            BudgetLevel::Location => partition(group.iter().copied(), |i| i.location.clone())
                .into_values()
                .collect(),
            BudgetLevel::Date => partition(group.iter().copied(), |i| i.date)
                .into_values()
                .collect(),
            BudgetLevel::Root | BudgetLevel::Category => return None,
        };

        if partitions.len() > 1 {
            return Some((next, partitions));
        }
        candidate = next.next();
    }

    None
}

/// Group items by key, keeping input order within each group
fn partition<'a, K, I, F>(items: I, key: F) -> BTreeMap<K, Vec<&'a ExpenseItem>>
where
    K: Ord,
    I: Iterator<Item = &'a ExpenseItem>,
    F: Fn(&ExpenseItem) -> K,
{
    let mut groups: BTreeMap<K, Vec<&ExpenseItem>> = BTreeMap::new();
    for item in items {
        groups.entry(key(item)).or_default().push(item);
    }
    groups
}

fn group_cost(group: &[&ExpenseItem]) -> f64 {
    group.iter().map(|i| i.cost).sum()
}

/// Every item in a group shares the labels its level is named after
fn node_name(level: BudgetLevel, group: &[&ExpenseItem]) -> String {
    let Some(item) = group.first() else {
        return String::new();
    };

    match level {
        BudgetLevel::Root => ROOT_NAME.to_string(),
        BudgetLevel::Category => item.category.clone(),
        BudgetLevel::Location => format!("{} @ {}", item.category, item.location),
        BudgetLevel::Date => format!(
            "{} @ {} on {}",
            item.category,
            item.location,
            item.date.format("%Y-%m-%d")
        ),
    }
}

/// Split `total` proportionally to `weights`; evenly when no weight is positive
fn apportion(total: f64, weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let weight_sum: f64 = weights.iter().sum();
    if weight_sum > 0.0 {
        weights.iter().map(|w| total * w / weight_sum).collect()
    } else {
        vec![total / weights.len() as f64; weights.len()]
    }
}

/// Allocate the total budget across categories
///
/// Without applicable rules the split follows each category's planned cost.
/// With rules, ruled categories are served in priority order (ties by name)
/// and capped by what is left; unruled categories share the remainder by
/// cost. If every category is ruled, any remainder goes back to them in
/// proportion to what they were granted.
fn allocate_categories(
    categories: &[(&str, f64)],
    total_budget: f64,
    rules: Option<&AllocationRules>,
) -> Vec<f64> {
    let costs: Vec<f64> = categories.iter().map(|(_, cost)| *cost).collect();

    let rules = match rules {
        Some(rules) if total_budget > 0.0 && categories.iter().any(|(c, _)| rules.contains_key(*c)) => {
            rules
        }
        _ => return apportion(total_budget, &costs),
    };

    let mut shares = vec![0.0; categories.len()];

    let mut ruled: Vec<(usize, &AllocationRule)> = categories
        .iter()
        .enumerate()
        .filter_map(|(idx, (category, _))| rules.get(*category).map(|rule| (idx, rule)))
        .collect();
    ruled.sort_by(|(a, rule_a), (b, rule_b)| {
        (rule_a.priority, categories[*a].0).cmp(&(rule_b.priority, categories[*b].0))
    });

    let mut remaining = total_budget;
    for (idx, rule) in &ruled {
        let percentage = if rule.percentage.is_finite() {
            rule.percentage.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let granted = (percentage * total_budget).min(remaining);
        shares[*idx] = granted;
        remaining -= granted;
    }

    let unruled: Vec<usize> = categories
        .iter()
        .enumerate()
        .filter(|(_, (category, _))| !rules.contains_key(*category))
        .map(|(idx, _)| idx)
        .collect();

    if !unruled.is_empty() {
        let weights: Vec<f64> = unruled.iter().map(|idx| costs[*idx]).collect();
        for (idx, share) in unruled.iter().zip(apportion(remaining, &weights)) {
            shares[*idx] = share;
        }
    } else if remaining > 0.0 {
        let weights: Vec<f64> = ruled.iter().map(|(idx, _)| shares[*idx]).collect();
        for ((idx, _), extra) in ruled.iter().zip(apportion(remaining, &weights)) {
            shares[*idx] += extra;
        }
    }

    tracing::debug!(
        ruled = ruled.len(),
        unruled = unruled.len(),
        "Applied category allocation rules"
    );

    shares
}
