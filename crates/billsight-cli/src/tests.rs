//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use billsight_core::db::{BillFilter, Database};
use billsight_core::models::{BillStatus, NewSuggestion, SuggestionType};
use billsight_core::{AnalyticsConfig, FixedClock};
use chrono::NaiveDate;
use tempfile::NamedTempFile;

use crate::commands::{self, truncate};

fn setup_test_db() -> (Database, i64) {
    let db = Database::in_memory().unwrap();
    let user_id = db.ensure_user("local").unwrap();
    (db, user_id)
}

fn clock() -> FixedClock {
    FixedClock(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap())
}

fn bill_file(json: serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", json).unwrap();
    file
}

fn add_test_bill(db: &Database, user_id: i64, vendor: &str, date: &str, total: &str) -> i64 {
    let file = bill_file(serde_json::json!({
        "vendor_name": vendor,
        "date": date,
        "total_amount": total,
        "items": [{
            "name": "line",
            "unit_price": total,
            "total_price": total,
            "category": "office"
        }]
    }));
    commands::cmd_bills_add(db, user_id, file.path()).unwrap();
    db.list_bills(user_id, &BillFilter::new()).unwrap()[0].id
}

// ========== Bills Command Tests ==========

#[test]
fn test_cmd_bills_add() {
    let (db, user_id) = setup_test_db();
    add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "12.50");

    let bills = db.list_bills(user_id, &BillFilter::new()).unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].vendor_name, "Paper Co");
    assert_eq!(bills[0].total_amount.to_string(), "12.50");
    assert_eq!(bills[0].items[0].quantity.to_string(), "1");
}

#[test]
fn test_cmd_bills_add_invalid_json() {
    let (db, user_id) = setup_test_db();
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();

    let result = commands::cmd_bills_add(&db, user_id, file.path());
    assert!(result.is_err());
}

#[test]
fn test_cmd_bills_add_missing_file() {
    let (db, user_id) = setup_test_db();
    let dir = tempfile::tempdir().unwrap();

    let result = commands::cmd_bills_add(&db, user_id, &dir.path().join("missing.json"));
    assert!(result.is_err());
}

#[test]
fn test_cmd_bills_add_negative_total() {
    let (db, user_id) = setup_test_db();
    let file = bill_file(serde_json::json!({
        "vendor_name": "Refund Co",
        "total_amount": "-5.00"
    }));

    let result = commands::cmd_bills_add(&db, user_id, file.path());
    assert!(result.is_err());
}

#[test]
fn test_cmd_bills_list() {
    let (db, user_id) = setup_test_db();
    assert!(commands::cmd_bills_list(&db, user_id, None, None, None, None).is_ok());

    add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "12.50");
    let result = commands::cmd_bills_list(
        &db,
        user_id,
        Some("pending"),
        Some("2024-05-01"),
        Some("2024-05-31"),
        Some("paper"),
    );
    assert!(result.is_ok());
}

#[test]
fn test_cmd_bills_list_invalid_args() {
    let (db, user_id) = setup_test_db();
    assert!(commands::cmd_bills_list(&db, user_id, Some("lost"), None, None, None).is_err());
    assert!(
        commands::cmd_bills_list(&db, user_id, None, Some("May 1"), None, None).is_err()
    );
}

#[test]
fn test_cmd_bills_show_and_delete() {
    let (db, user_id) = setup_test_db();
    let id = add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "12.50");

    assert!(commands::cmd_bills_show(&db, user_id, id).is_ok());
    assert!(commands::cmd_bills_delete(&db, user_id, id).is_ok());
    assert!(commands::cmd_bills_show(&db, user_id, id).is_err());
    assert!(commands::cmd_bills_delete(&db, user_id, id).is_err());
}

#[test]
fn test_cmd_bills_show_other_user() {
    let (db, user_id) = setup_test_db();
    let id = add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "12.50");
    let other = db.ensure_user("someone-else").unwrap();

    assert!(commands::cmd_bills_show(&db, other, id).is_err());
}

#[test]
fn test_cmd_bills_correct() {
    let (db, user_id) = setup_test_db();
    let id = add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "12.50");

    commands::cmd_bills_correct(&db, user_id, id, "vendor_name", "Paper Co", "Paper Company")
        .unwrap();

    let bill = db.get_bill(user_id, id).unwrap().unwrap();
    assert_eq!(bill.vendor_name, "Paper Company");
    assert_eq!(bill.status, BillStatus::Corrected);
    assert_eq!(db.list_corrections(user_id, id).unwrap().len(), 1);

    let result = commands::cmd_bills_correct(&db, user_id, id, "user_id", "1", "2");
    assert!(result.is_err());
}

#[test]
fn test_cmd_bills_verify_and_stats() {
    let (db, user_id) = setup_test_db();
    let id = add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "12.50");

    commands::cmd_bills_verify(&db, user_id, id).unwrap();
    let bill = db.get_bill(user_id, id).unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Verified);

    assert!(commands::cmd_bills_stats(&db, user_id).is_ok());
}

// ========== Analytics Command Tests ==========

#[test]
fn test_cmd_weekly_creates_snapshot() {
    let (db, user_id) = setup_test_db();
    add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "12.50");
    let clock = clock();

    commands::cmd_weekly(&db, &clock, AnalyticsConfig::default(), user_id, 0, false, false)
        .unwrap();

    let week = billsight_core::period::week_period(clock.0, 0).unwrap();
    let snapshot = db.find_weekly(user_id, &week).unwrap().unwrap();
    assert_eq!(snapshot.total_bills, 1);
    assert_eq!(snapshot.total_amount.to_string(), "12.50");
}

#[test]
fn test_cmd_weekly_json_and_refresh() {
    let (db, user_id) = setup_test_db();
    let clock = clock();
    let config = AnalyticsConfig::default();

    commands::cmd_weekly(&db, &clock, config, user_id, 0, false, true).unwrap();
    add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "12.50");
    commands::cmd_weekly(&db, &clock, config, user_id, 0, true, true).unwrap();

    let week = billsight_core::period::week_period(clock.0, 0).unwrap();
    let snapshot = db.find_weekly(user_id, &week).unwrap().unwrap();
    assert_eq!(snapshot.total_bills, 1);
}

#[test]
fn test_cmd_monthly() {
    let (db, user_id) = setup_test_db();
    add_test_bill(&db, user_id, "Paper Co", "2024-04-14", "10.00");
    add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "20.00");
    let clock = clock();
    let config = AnalyticsConfig::default();

    commands::cmd_monthly(&db, &clock, config, user_id, 1, false, false).unwrap();
    commands::cmd_monthly(&db, &clock, config, user_id, 0, false, false).unwrap();

    let may = billsight_core::MonthPeriod::new(2024, 5).unwrap();
    let snapshot = db.find_monthly(user_id, &may).unwrap().unwrap();
    assert_eq!(snapshot.growth_percentage.to_string(), "100.00");
}

#[test]
fn test_cmd_weekly_offset_beyond_date_range() {
    let (db, user_id) = setup_test_db();
    let config = AnalyticsConfig::default();

    let result = commands::cmd_weekly(&db, &clock(), config, user_id, 100_000_000, false, false);
    assert!(result.is_err());

    let result = commands::cmd_monthly(&db, &clock(), config, user_id, u32::MAX, false, false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_dashboard() {
    let (db, user_id) = setup_test_db();
    add_test_bill(&db, user_id, "Paper Co", "2024-05-14", "12.50");

    let result = commands::cmd_dashboard(&db, &clock(), AnalyticsConfig::default(), user_id);
    assert!(result.is_ok());
}

// ========== Suggestions Command Tests ==========

#[test]
fn test_cmd_suggestions_add_and_list() {
    let (db, user_id) = setup_test_db();

    commands::cmd_suggestions_add(&db, user_id, "cost-saving", "Bulk paper", "Buy by the case")
        .unwrap();
    assert!(commands::cmd_suggestions_list(&db, user_id, false).is_ok());

    let suggestions = db.list_suggestions(user_id, false).unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].suggestion_type, SuggestionType::CostSaving);
}

#[test]
fn test_cmd_suggestions_add_invalid_type() {
    let (db, user_id) = setup_test_db();
    let result = commands::cmd_suggestions_add(&db, user_id, "hunch", "Title", "");
    assert!(result.is_err());
}

#[test]
fn test_cmd_suggestions_read_and_dismiss() {
    let (db, user_id) = setup_test_db();
    let suggestion = db
        .create_suggestion(
            user_id,
            &NewSuggestion {
                suggestion_type: SuggestionType::Trend,
                title: "Spend rising".to_string(),
                description: String::new(),
                related_data: serde_json::json!({}),
            },
        )
        .unwrap();

    commands::cmd_suggestions_read(&db, user_id, suggestion.id).unwrap();
    commands::cmd_suggestions_dismiss(&db, user_id, suggestion.id).unwrap();

    assert!(db.list_suggestions(user_id, false).unwrap().is_empty());
    let all = db.list_suggestions(user_id, true).unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_read);
    assert!(all[0].is_dismissed);

    assert!(commands::cmd_suggestions_read(&db, user_id, 999).is_err());
}

// ========== Core Command Tests ==========

#[test]
fn test_cmd_init_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("init.db");

    commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());

    let (db, user_id) = commands::open_user_db(&path, "local", true).unwrap();
    assert!(!db.is_encrypted());
    assert_eq!(db.find_user("local").unwrap(), Some(user_id));
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly10!", 10), "exactly10!");
    assert_eq!(truncate("this is too long", 10), "this is...");
    assert_eq!(truncate("héllo wörld", 8), "héllo...");
}
