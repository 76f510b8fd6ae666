use std::io::Write;

use budgetree_core::{analyze_default, BudgetLevel, BudgetNode, ExpenseItem};
use chrono::NaiveDate;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::*;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn item(id: &str, cost: f64, category: &str) -> ExpenseItem {
    ExpenseItem::new(id, id, cost, category, "Paris", date("2024-07-01"))
}

fn write_plan(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

const PLAN: &str = r#"{
    "total_budget": 500,
    "items": [
        {"id": "1", "title": "Louvre", "cost": 20, "category": "Culture", "location": "Paris", "date": "2024-07-01"},
        {"id": "2", "title": "Dinner", "cost": 80, "category": "Food", "location": "Paris", "date": "2024-07-01"},
        {"id": "3", "title": "Lunch", "cost": 25, "category": "Food", "location": "Lyon", "date": "2024-07-02"}
    ]
}"#;

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer title", 10), "a much ...");
    assert_eq!(truncate("Café au lait", 7), "Café...");
}

#[test]
fn test_money() {
    assert_eq!(money(12.5), "$12.50");
    assert_eq!(money(0.0), "$0.00");
    assert_eq!(money(-3.0), "-$3.00");
}

#[test]
fn test_load_plan_with_budget_override() {
    let file = write_plan(PLAN);

    let plan = load_plan(file.path(), None).unwrap();
    assert_eq!(plan.total_budget, 500.0);
    assert_eq!(plan.items.len(), 3);

    let plan = load_plan(file.path(), Some(200.0)).unwrap();
    assert_eq!(plan.total_budget, 200.0);

    // Non-positive budgets are a degenerate plan, same as in the file
    let plan = load_plan(file.path(), Some(-1.0)).unwrap();
    assert_eq!(plan.total_budget, -1.0);
    let plan = load_plan(file.path(), Some(0.0)).unwrap();
    assert_eq!(plan.total_budget, 0.0);

    assert!(load_plan(file.path(), Some(f64::NAN)).is_err());
    assert!(load_plan(file.path(), Some(f64::INFINITY)).is_err());
}

#[test]
fn test_load_plan_errors() {
    let file = write_plan("{ not json");
    assert!(load_plan(file.path(), None).is_err());

    let dir = tempfile::tempdir().unwrap();
    assert!(load_plan(&dir.path().join("missing.json"), None).is_err());
}

#[test]
fn test_parse_criteria_inline_and_file() {
    let inline = parse_criteria(r#"{"category": "food"}"#).unwrap();
    assert_eq!(inline.predicates.len(), 1);

    let file = write_plan(r#"{"location": "Lyon", "or": {"category": "Culture"}}"#);
    let from_file = parse_criteria(file.path().to_str().unwrap()).unwrap();
    assert!(from_file.or.is_some());

    assert!(parse_criteria("{\"cost_range\": \"cheap\"}").is_err());
}

#[test]
fn test_render_tree_lists_every_node() {
    let root = BudgetNode::branch(
        "Total Budget",
        BudgetLevel::Root,
        200.0,
        vec![
            BudgetNode::leaf("Food", BudgetLevel::Category, 100.0, vec![item("a", 50.0, "Food")]),
            BudgetNode::leaf("Fun", BudgetLevel::Category, 100.0, vec![item("b", 50.0, "Fun")]),
        ],
    );

    let rendered = render_tree(&root);
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Total Budget"));
    assert!(lines[0].contains("$100.00"));
    assert!(lines[0].contains("50%"));
    assert!(lines[1].contains("  Food"));
    assert!(lines[2].contains("(1 items)"));
}

#[test]
fn test_render_tree_zero_allocation_reads_as_zero_percent() {
    let root = BudgetNode::leaf("Total Budget", BudgetLevel::Root, 0.0, vec![item("a", 5.0, "Food")]);
    let rendered = render_tree(&root);
    assert!(rendered.contains(" 0%"));
}

#[test]
fn test_render_report_balanced() {
    let root = BudgetNode::leaf("Total Budget", BudgetLevel::Root, 0.0, vec![]);
    let rendered = render_report(&analyze_default(&root));
    assert!(rendered.contains("looks balanced"));
    assert!(!rendered.contains("Suggested reallocation"));
}

#[test]
fn test_render_report_groups_by_severity() {
    let root = BudgetNode::branch(
        "Total Budget",
        BudgetLevel::Root,
        200.0,
        vec![
            BudgetNode::leaf("Food", BudgetLevel::Category, 100.0, vec![item("a", 150.0, "Food")]),
            BudgetNode::leaf("Fun", BudgetLevel::Category, 100.0, vec![item("b", 10.0, "Fun")]),
        ],
    );

    let rendered = render_report(&analyze_default(&root));
    let high = rendered.find("HIGH (1)").unwrap();
    let medium = rendered.find("MEDIUM (1)").unwrap();
    let low = rendered.find("LOW (1)").unwrap();
    assert!(high < medium && medium < low);
    assert!(rendered.contains("Reduce allocation or cost in Food"));
    assert!(rendered.contains("Move $10.00 from Fun to Food"));
    assert!(rendered.contains("Suggested reallocation: $10.00"));
}

#[test]
fn test_cli_parses_search() {
    let cli = Cli::try_parse_from([
        "budgetree",
        "--verbose",
        "search",
        "--plan",
        "trip.json",
        "-c",
        r#"{"category": "Food"}"#,
        "--max-depth",
        "2",
    ])
    .unwrap();

    assert!(cli.verbose);
    match cli.command {
        Commands::Search {
            max_depth, json, ..
        } => {
            assert_eq!(max_depth, Some(2));
            assert!(!json);
        }
        _ => panic!("expected search command"),
    }
}

#[test]
fn test_cli_accepts_negative_budget_override() {
    let cli = Cli::try_parse_from(["budgetree", "tree", "--plan", "trip.json", "--budget", "-50"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Tree { budget: Some(b), .. } if b == -50.0
    ));
}

#[test]
fn test_cli_global_config_after_subcommand() {
    let cli = Cli::try_parse_from([
        "budgetree",
        "optimize",
        "--plan",
        "trip.json",
        "--budget",
        "1000",
        "--config",
        "custom.toml",
    ])
    .unwrap();

    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("custom.toml")));
    assert!(matches!(
        cli.command,
        Commands::Optimize { budget: Some(b), .. } if b == 1000.0
    ));
}

#[test]
fn test_commands_run_end_to_end() {
    let plan = write_plan(PLAN);
    let config = load_config(None).unwrap();

    cmd_tree(plan.path(), None, &config, false).unwrap();
    cmd_tree(plan.path(), None, &config, true).unwrap();
    cmd_optimize(plan.path(), Some(100.0), &config, true).unwrap();
    cmd_search(plan.path(), r#"{"category": "food"}"#, 3, false).unwrap();
}
