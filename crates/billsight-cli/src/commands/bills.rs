//! Bill command implementations

use std::path::Path;

use anyhow::{Context, Result};
use billsight_core::db::{BillFilter, Database};
use billsight_core::models::{BillStatus, CorrectableField, NewBill};
use chrono::NaiveDate;

use super::truncate;

fn parse_date_arg(raw: Option<&str>, name: &str) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid --{} date '{}' (use YYYY-MM-DD)", name, s))
    })
    .transpose()
}

pub fn cmd_bills_add(db: &Database, user_id: i64, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let new_bill: NewBill = serde_json::from_str(&content)
        .with_context(|| format!("Invalid bill JSON in {}", file.display()))?;

    let bill = db.create_bill(user_id, &new_bill)?;

    println!(
        "✅ Recorded bill #{} from {} ({} items, ${})",
        bill.id,
        bill.vendor_name,
        bill.items.len(),
        bill.total_amount
    );

    Ok(())
}

pub fn cmd_bills_list(
    db: &Database,
    user_id: i64,
    status: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    search: Option<&str>,
) -> Result<()> {
    let status = status
        .map(str::parse::<BillStatus>)
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let filter = BillFilter::new()
        .status(status)
        .search(search)
        .since(parse_date_arg(from, "from")?)
        .until(parse_date_arg(to, "to")?);

    let bills = db.list_bills(user_id, &filter)?;

    if bills.is_empty() {
        println!("No bills found. Record one with:");
        println!("  billsight bills add --file bill.json");
        return Ok(());
    }

    println!();
    println!("🧾 Bills");
    println!("   ─────────────────────────────────────────────────────────────");

    for bill in bills {
        let date = bill
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "----------".to_string());
        println!(
            "   [{}] {} │ {:>10} │ {:<9} │ {}",
            bill.id,
            date,
            format!("${}", bill.total_amount),
            bill.status.as_str(),
            truncate(&bill.vendor_name, 35)
        );
    }

    Ok(())
}

pub fn cmd_bills_show(db: &Database, user_id: i64, id: i64) -> Result<()> {
    let bill = db
        .get_bill(user_id, id)?
        .with_context(|| format!("Bill {} not found", id))?;

    println!();
    println!("🧾 Bill #{} - {}", bill.id, bill.vendor_name);
    println!("   ─────────────────────────────");
    if !bill.bill_number.is_empty() {
        println!("   Number: {}", bill.bill_number);
    }
    if let Some(date) = bill.date {
        println!("   Date:   {}", date);
    }
    println!("   Total:  ${}", bill.total_amount);
    println!("   Tax:    ${}", bill.tax_amount);
    println!("   Status: {}", bill.status);
    if !bill.notes.is_empty() {
        println!("   Notes:  {}", bill.notes);
    }

    if !bill.items.is_empty() {
        println!();
        println!("   Items:");
        for item in &bill.items {
            let category = if item.category.trim().is_empty() {
                "-"
            } else {
                item.category.as_str()
            };
            println!(
                "     {} x {} @ ${} = ${} [{}]",
                item.quantity,
                truncate(&item.name, 30),
                item.unit_price,
                item.total_price,
                category
            );
        }
    }

    let corrections = db.list_corrections(user_id, id)?;
    if !corrections.is_empty() {
        println!();
        println!("   Corrections:");
        for c in corrections {
            println!(
                "     {} {}: {} → {}",
                c.created_at.format("%Y-%m-%d"),
                c.field_name,
                c.original_value,
                c.corrected_value
            );
        }
    }

    Ok(())
}

pub fn cmd_bills_delete(db: &Database, user_id: i64, id: i64) -> Result<()> {
    db.delete_bill(user_id, id)?;
    println!("🗑️  Deleted bill #{}", id);
    Ok(())
}

pub fn cmd_bills_correct(
    db: &Database,
    user_id: i64,
    id: i64,
    field: &str,
    original: &str,
    corrected: &str,
) -> Result<()> {
    let field: CorrectableField = field.parse().map_err(anyhow::Error::msg)?;

    let correction = db.correct_bill(user_id, id, field, original, corrected)?;

    println!(
        "✏️  Corrected {} on bill #{}: {} → {}",
        correction.field_name, id, correction.original_value, correction.corrected_value
    );
    println!("   Refresh affected analyses with --refresh to pick up the change.");

    Ok(())
}

pub fn cmd_bills_verify(db: &Database, user_id: i64, id: i64) -> Result<()> {
    db.update_bill_status(user_id, id, BillStatus::Verified)?;
    println!("✅ Bill #{} marked verified", id);
    Ok(())
}

pub fn cmd_bills_stats(db: &Database, user_id: i64) -> Result<()> {
    let stats = db.bill_stats(user_id, &BillFilter::new())?;

    println!();
    println!("📊 Bill Statistics");
    println!("   ─────────────────────────────");
    println!("   Bills:   {}", stats.total_bills);
    println!("   Total:   ${}", stats.total_amount);
    println!("   Tax:     ${}", stats.total_tax);
    println!("   Average: ${}", stats.average_amount);

    Ok(())
}
