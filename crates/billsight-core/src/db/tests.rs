//! Database tests

use super::*;
use crate::analytics::AggregateResult;
use crate::models::*;
use crate::period::{MonthPeriod, WeekPeriod};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn new_bill(vendor: &str, day: NaiveDate, total: &str, tax: &str) -> NewBill {
        NewBill {
            bill_number: format!("INV-{}", day),
            vendor_name: vendor.to_string(),
            date: Some(day),
            total_amount: dec(total),
            tax_amount: dec(tax),
            notes: "weekly shop".to_string(),
            items: vec![
                NewBillItem {
                    name: "Bread".to_string(),
                    quantity: dec("2"),
                    unit_price: dec("1.50"),
                    total_price: dec("3.00"),
                    category: "food".to_string(),
                },
                NewBillItem {
                    name: "Soap".to_string(),
                    quantity: Decimal::ONE,
                    unit_price: dec("2.00"),
                    total_price: dec("2.00"),
                    category: String::new(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_schema_tables_exist() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('users', 'bills', 'bill_items', 'bill_corrections', 'weekly_analyses', \
                  'monthly_analyses', 'suggestions', 'audit_log')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 8);
    }

    #[test]
    fn test_ensure_user_is_stable() {
        let db = Database::in_memory().unwrap();

        let id = db.ensure_user("alice@example.com").unwrap();
        assert_eq!(db.ensure_user("  alice@example.com ").unwrap(), id);
        assert_ne!(db.ensure_user("bob@example.com").unwrap(), id);
        assert_eq!(db.find_user("alice@example.com").unwrap(), Some(id));
        assert_eq!(db.find_user("carol@example.com").unwrap(), None);

        assert!(matches!(db.ensure_user("  "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_bill_crud() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();

        let bill = db
            .create_bill(user, &new_bill("Corner Market", date(2024, 5, 13), "5.00", "0.40"))
            .unwrap();
        assert_eq!(bill.status, BillStatus::Pending);
        assert_eq!(bill.total_amount.to_string(), "5.00");
        assert_eq!(bill.items.len(), 2);
        assert_eq!(bill.items[0].name, "Bread");
        assert_eq!(bill.items[0].quantity.to_string(), "2.00");

        let fetched = db.get_bill(user, bill.id).unwrap().unwrap();
        assert_eq!(fetched.vendor_name, "Corner Market");
        assert_eq!(fetched.date, Some(date(2024, 5, 13)));

        db.update_bill_status(user, bill.id, BillStatus::Verified)
            .unwrap();
        let fetched = db.get_bill(user, bill.id).unwrap().unwrap();
        assert_eq!(fetched.status, BillStatus::Verified);

        db.delete_bill(user, bill.id).unwrap();
        assert!(db.get_bill(user, bill.id).unwrap().is_none());
        assert!(matches!(
            db.delete_bill(user, bill.id),
            Err(Error::NotFound(_))
        ));

        // Items cascade with the bill
        let conn = db.conn().unwrap();
        let items: i64 = conn
            .query_row("SELECT COUNT(*) FROM bill_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(items, 0);
    }

    #[test]
    fn test_bills_are_scoped_to_owner() {
        let db = Database::in_memory().unwrap();
        let alice = db.ensure_user("alice@example.com").unwrap();
        let bob = db.ensure_user("bob@example.com").unwrap();

        let bill = db
            .create_bill(alice, &new_bill("Market", date(2024, 5, 13), "5.00", "0"))
            .unwrap();

        assert!(db.get_bill(bob, bill.id).unwrap().is_none());
        assert!(db.list_bills(bob, &BillFilter::new()).unwrap().is_empty());
        assert!(matches!(
            db.update_bill_status(bob, bill.id, BillStatus::Verified),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_create_bill_rejects_negative_amounts() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();

        let result = db.create_bill(user, &new_bill("Market", date(2024, 5, 13), "-1.00", "0"));
        assert!(matches!(result, Err(Error::Validation(_))));

        let result = db.create_bill(user, &new_bill("Market", date(2024, 5, 13), "1.00", "-0.01"));
        assert!(matches!(result, Err(Error::Validation(_))));

        let mut bill = new_bill("Market", date(2024, 5, 13), "1.00", "0");
        bill.items[0].quantity = dec("-1");
        assert!(matches!(
            db.create_bill(user, &bill),
            Err(Error::Validation(_))
        ));

        assert!(db.list_bills(user, &BillFilter::new()).unwrap().is_empty());
    }

    #[test]
    fn test_list_bills_filters() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();

        let first = db
            .create_bill(user, &new_bill("Corner Market", date(2024, 5, 1), "10.00", "0"))
            .unwrap();
        let second = db
            .create_bill(user, &new_bill("Fuel Stop", date(2024, 5, 20), "40.00", "0"))
            .unwrap();
        db.create_bill(user, &new_bill("Corner Market", date(2024, 6, 2), "12.00", "0"))
            .unwrap();
        db.update_bill_status(user, second.id, BillStatus::Verified)
            .unwrap();

        // Newest first
        let all = db.list_bills(user, &BillFilter::new()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].id, first.id);

        let market = db
            .list_bills(user, &BillFilter::new().search(Some("corner")))
            .unwrap();
        assert_eq!(market.len(), 2);

        let verified = db
            .list_bills(user, &BillFilter::new().status(Some(BillStatus::Verified)))
            .unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].id, second.id);

        let may = db
            .list_bills(
                user,
                &BillFilter::new().year_month(Some(MonthPeriod::new(2024, 5).unwrap())),
            )
            .unwrap();
        assert_eq!(may.len(), 2);

        let range = db
            .list_bills(
                user,
                &BillFilter::new().date_range(Some((date(2024, 5, 20), date(2024, 6, 2)))),
            )
            .unwrap();
        assert_eq!(range.len(), 2);
    }

    #[test]
    fn test_bill_stats() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();

        let empty = db.bill_stats(user, &BillFilter::new()).unwrap();
        assert_eq!(empty.total_bills, 0);
        assert_eq!(empty.average_amount.to_string(), "0.00");

        db.create_bill(user, &new_bill("A", date(2024, 5, 1), "10.00", "1.00"))
            .unwrap();
        db.create_bill(user, &new_bill("B", date(2024, 5, 2), "10.00", "1.00"))
            .unwrap();
        db.create_bill(user, &new_bill("C", date(2024, 5, 3), "5.00", "0.50"))
            .unwrap();

        let stats = db.bill_stats(user, &BillFilter::new()).unwrap();
        assert_eq!(stats.total_bills, 3);
        assert_eq!(stats.total_amount.to_string(), "25.00");
        assert_eq!(stats.total_tax.to_string(), "2.50");
        assert_eq!(stats.average_amount.to_string(), "8.33");
    }

    #[test]
    fn test_correct_bill() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();
        let bill = db
            .create_bill(user, &new_bill("Markt", date(2024, 5, 1), "10.00", "0"))
            .unwrap();

        let correction = db
            .correct_bill(user, bill.id, CorrectableField::VendorName, "Markt", "Market")
            .unwrap();
        assert_eq!(correction.field_name, CorrectableField::VendorName);

        db.correct_bill(user, bill.id, CorrectableField::TotalAmount, "10.00", "12.5")
            .unwrap();
        db.correct_bill(user, bill.id, CorrectableField::Date, "2024-05-01", "2024-05-02")
            .unwrap();

        let fixed = db.get_bill(user, bill.id).unwrap().unwrap();
        assert_eq!(fixed.vendor_name, "Market");
        assert_eq!(fixed.total_amount.to_string(), "12.50");
        assert_eq!(fixed.date, Some(date(2024, 5, 2)));
        assert_eq!(fixed.status, BillStatus::Corrected);

        let history = db.list_corrections(user, bill.id).unwrap();
        assert_eq!(history.len(), 3);

        // Malformed values leave the bill untouched
        assert!(matches!(
            db.correct_bill(user, bill.id, CorrectableField::TotalAmount, "12.50", "lots"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.correct_bill(user, bill.id, CorrectableField::TaxAmount, "0", "-3"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.correct_bill(user, bill.id, CorrectableField::Notes, "", "x"),
            Err(Error::Validation(_))
        ));
        assert_eq!(db.list_corrections(user, bill.id).unwrap().len(), 3);

        let other = db.ensure_user("bob@example.com").unwrap();
        assert!(matches!(
            db.correct_bill(other, bill.id, CorrectableField::Notes, "a", "b"),
            Err(Error::NotFound(_))
        ));
        assert!(db.list_corrections(other, bill.id).unwrap().is_empty());
    }

    #[test]
    fn test_bill_totals_sum_decimals_exactly() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();

        for _ in 0..10 {
            db.create_bill(user, &new_bill("A", date(2024, 5, 1), "0.10", "0"))
                .unwrap();
        }

        let totals = db.bill_totals(user, &BillFilter::new()).unwrap();
        assert_eq!(totals.total_bills, 10);
        assert_eq!(totals.total_amount.to_string(), "1.00");
    }

    #[test]
    fn test_weekly_get_or_create_then_refresh() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();
        let week = WeekPeriod::containing(date(2024, 5, 15));

        let (created, was_created) = db.get_or_create_weekly(user, &week).unwrap();
        assert!(was_created);
        assert_eq!(created.week_start, date(2024, 5, 13));
        assert_eq!(created.week_end, date(2024, 5, 19));
        assert_eq!(created.total_bills, 0);
        assert_eq!(created.total_amount.to_string(), "0.00");
        assert!(created.category_breakdown.is_empty());

        let (again, was_created) = db.get_or_create_weekly(user, &week).unwrap();
        assert!(!was_created);
        assert_eq!(again.id, created.id);

        let mut category_breakdown = BTreeMap::new();
        category_breakdown.insert("food".to_string(), 50.0);
        let mut trend_data = BTreeMap::new();
        trend_data.insert("2024-05-14".to_string(), dec("50"));
        let aggregate = AggregateResult {
            total_bills: 1,
            total_amount: dec("50"),
            total_tax: dec("5"),
            average_bill_amount: dec("50"),
            category_breakdown,
            top_vendors: vec![VendorTotal {
                vendor_name: "Market".to_string(),
                total: dec("50"),
                count: 1,
            }],
            trend_data,
        };

        let refreshed = db.refresh_weekly(created.id, &aggregate).unwrap();
        assert_eq!(refreshed.total_bills, 1);
        assert_eq!(refreshed.total_amount.to_string(), "50.00");
        assert_eq!(refreshed.total_tax.to_string(), "5.00");
        assert_eq!(refreshed.average_bill_amount.to_string(), "50.00");
        assert_eq!(refreshed.category_breakdown.get("food"), Some(&50.0));
        assert_eq!(refreshed.top_vendors[0].total.to_string(), "50.00");
        assert_eq!(
            refreshed.trend_data.get("2024-05-14").map(|d| d.to_string()),
            Some("50.00".to_string())
        );

        let stored = db.find_weekly(user, &week).unwrap().unwrap();
        assert_eq!(stored, refreshed);
    }

    #[test]
    fn test_monthly_snapshot_stores_growth() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();
        let month = MonthPeriod::new(2024, 3).unwrap();

        assert!(db.find_monthly(user, &month).unwrap().is_none());

        let (created, was_created) = db.get_or_create_monthly(user, &month).unwrap();
        assert!(was_created);
        assert_eq!(created.month_name, "Mar");
        assert_eq!(created.growth_percentage.to_string(), "0.00");

        let aggregate = AggregateResult {
            total_bills: 1,
            total_amount: dec("150"),
            ..Default::default()
        };
        let refreshed = db
            .refresh_monthly(created.id, &aggregate, dec("-33.3333"))
            .unwrap();
        assert_eq!(refreshed.growth_percentage.to_string(), "-33.33");
        assert_eq!(refreshed.total_amount.to_string(), "150.00");

        assert!(matches!(
            db.refresh_monthly(created.id + 100, &aggregate, Decimal::ZERO),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_snapshots_unique_per_user_and_period() {
        let db = Database::in_memory().unwrap();
        let alice = db.ensure_user("alice@example.com").unwrap();
        let bob = db.ensure_user("bob@example.com").unwrap();
        let week = WeekPeriod::containing(date(2024, 5, 15));

        let (a, _) = db.get_or_create_weekly(alice, &week).unwrap();
        let (b, created) = db.get_or_create_weekly(bob, &week).unwrap();
        assert!(created);
        assert_ne!(a.id, b.id);

        let conn = db.conn().unwrap();
        let result = conn.execute(
            "INSERT INTO weekly_analyses (user_id, week_start, week_end) VALUES (?, ?, ?)",
            rusqlite::params![alice, "2024-05-13", "2024-05-19"],
        );
        assert!(result.is_err(), "duplicate (user, week) must be rejected");
    }

    #[test]
    fn test_concurrent_get_or_create_single_row() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();
        let month = MonthPeriod::new(2024, 5).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.get_or_create_monthly(user, &month).unwrap())
            })
            .collect();

        let results: Vec<(MonthlyAnalysis, bool)> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|(_, created)| *created).count(), 1);
        assert!(results.iter().all(|(a, _)| a.id == results[0].0.id));

        let conn = db.conn().unwrap();
        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM monthly_analyses WHERE user_id = ?",
                [user],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_suggestion_lifecycle() {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_user("alice@example.com").unwrap();

        let suggestion = db
            .create_suggestion(
                user,
                &NewSuggestion {
                    suggestion_type: SuggestionType::CostSaving,
                    title: "Fuel costs up".to_string(),
                    description: "You spent more on fuel this month".to_string(),
                    related_data: serde_json::json!({"vendor": "Fuel Stop"}),
                },
            )
            .unwrap();
        assert!(!suggestion.is_read);
        assert!(!suggestion.is_dismissed);
        assert_eq!(suggestion.related_data["vendor"], "Fuel Stop");

        let read = db.mark_suggestion_read(user, suggestion.id).unwrap();
        assert!(read.is_read);
        // Idempotent
        let read = db.mark_suggestion_read(user, suggestion.id).unwrap();
        assert!(read.is_read);

        db.dismiss_suggestion(user, suggestion.id).unwrap();
        assert!(db.list_suggestions(user, false).unwrap().is_empty());

        let all = db.list_suggestions(user, true).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_dismissed);
        assert!(db.get_suggestion(user, suggestion.id).unwrap().is_some());
    }

    #[test]
    fn test_suggestions_scoped_to_owner() {
        let db = Database::in_memory().unwrap();
        let alice = db.ensure_user("alice@example.com").unwrap();
        let bob = db.ensure_user("bob@example.com").unwrap();

        let suggestion = db
            .create_suggestion(
                alice,
                &NewSuggestion {
                    suggestion_type: SuggestionType::Trend,
                    title: "Spending rising".to_string(),
                    description: String::new(),
                    related_data: serde_json::json!({}),
                },
            )
            .unwrap();

        assert!(db.get_suggestion(bob, suggestion.id).unwrap().is_none());
        assert!(matches!(
            db.dismiss_suggestion(bob, suggestion.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.mark_suggestion_read(alice, 9999),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_audit_log() {
        let db = Database::in_memory().unwrap();
        db.log_audit("alice@example.com", "weekly_analysis", None, None, Some("offset=0"))
            .unwrap();
        db.log_audit("alice@example.com", "get_bill", Some("bill"), Some(3), None)
            .unwrap();

        db.log_audit("bob@example.com", "dashboard", None, None, None)
            .unwrap();

        let entries = db.list_audit_log("alice@example.com", 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "get_bill");
        assert_eq!(entries[0].entity_id, Some(3));
    }

    #[test]
    fn test_key_derivation_is_deterministic() {
        let key1 = derive_key("my-secret").unwrap();
        let key2 = derive_key("my-secret").unwrap();
        assert_eq!(key1, key2);

        // Different passphrase = different key
        let key3 = derive_key("other-secret").unwrap();
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_encrypted_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encrypted.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::new_with_key(path, Some("test-passphrase")).unwrap();
            assert!(db.is_encrypted());
            let user = db.ensure_user("alice@example.com").unwrap();
            db.create_bill(user, &new_bill("Market", date(2024, 5, 1), "10.00", "0"))
                .unwrap();
        }

        // Same key reopens
        {
            let db = Database::new_with_key(path, Some("test-passphrase")).unwrap();
            let user = db.ensure_user("alice@example.com").unwrap();
            assert_eq!(db.list_bills(user, &BillFilter::new()).unwrap().len(), 1);
        }

        assert!(
            Database::new_with_key(path, None).is_err(),
            "Should fail to open encrypted db without key"
        );
        assert!(
            Database::new_with_key(path, Some("wrong-passphrase")).is_err(),
            "Should fail to open encrypted db with wrong key"
        );
    }

    #[test]
    fn test_unencrypted_database_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::new_unencrypted(path).unwrap();
            db.ensure_user("alice@example.com").unwrap();
        }

        let db = Database::new_unencrypted(path).unwrap();
        assert!(!db.is_encrypted());
        assert!(db.find_user("alice@example.com").unwrap().is_some());
    }
}
