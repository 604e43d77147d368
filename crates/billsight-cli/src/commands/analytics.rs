//! Analytics command implementations (weekly, monthly, dashboard)

use std::collections::BTreeMap;

use anyhow::Result;
use billsight_core::db::Database;
use billsight_core::models::{PeriodTotals, VendorTotal};
use billsight_core::{AnalyticsConfig, AnalyticsEngine, Clock};
use rust_decimal::Decimal;

use super::truncate;

fn print_breakdown(
    total_bills: i64,
    total_amount: Decimal,
    total_tax: Decimal,
    average: Decimal,
    categories: &BTreeMap<String, f64>,
    vendors: &[VendorTotal],
) {
    println!("   Bills:   {}", total_bills);
    println!("   Total:   ${}", total_amount);
    println!("   Tax:     ${}", total_tax);
    println!("   Average: ${}", average);

    if !categories.is_empty() {
        println!();
        println!("   By category:");
        let mut sorted: Vec<_> = categories.iter().collect();
        sorted.sort_by(|a, b| b.1.total_cmp(a.1));
        for (category, amount) in sorted {
            println!("     {:<24} ${:>10.2}", truncate(category, 24), amount);
        }
    }

    if !vendors.is_empty() {
        println!();
        println!("   Top vendors:");
        for vendor in vendors {
            println!(
                "     {:<24} {:>11} ({} bills)",
                truncate(&vendor.vendor_name, 24),
                format!("${}", vendor.total),
                vendor.count
            );
        }
    }
}

pub fn cmd_weekly(
    db: &Database,
    clock: &dyn Clock,
    config: AnalyticsConfig,
    user_id: i64,
    offset: u32,
    refresh: bool,
    json: bool,
) -> Result<()> {
    let engine = AnalyticsEngine::new(db, clock, config);
    let analysis = engine.weekly_analysis(user_id, offset, refresh)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!();
    println!("📅 Week {} to {}", analysis.week_start, analysis.week_end);
    println!("   ─────────────────────────────");
    print_breakdown(
        analysis.total_bills,
        analysis.total_amount,
        analysis.total_tax,
        analysis.average_bill_amount,
        &analysis.category_breakdown,
        &analysis.top_vendors,
    );
    println!();
    println!(
        "   Computed {} (use --refresh to recompute)",
        analysis.updated_at.format("%Y-%m-%d %H:%M")
    );

    Ok(())
}

pub fn cmd_monthly(
    db: &Database,
    clock: &dyn Clock,
    config: AnalyticsConfig,
    user_id: i64,
    offset: u32,
    refresh: bool,
    json: bool,
) -> Result<()> {
    let engine = AnalyticsEngine::new(db, clock, config);
    let analysis = engine.monthly_analysis(user_id, offset, refresh)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    let growth = if analysis.growth_percentage > Decimal::ZERO {
        format!("📈 +{}%", analysis.growth_percentage)
    } else if analysis.growth_percentage < Decimal::ZERO {
        format!("📉 {}%", analysis.growth_percentage)
    } else {
        "➖ 0%".to_string()
    };

    println!();
    println!("📅 {} {}", analysis.month_name, analysis.year);
    println!("   ─────────────────────────────");
    print_breakdown(
        analysis.total_bills,
        analysis.total_amount,
        analysis.total_tax,
        analysis.average_bill_amount,
        &analysis.category_breakdown,
        &analysis.top_vendors,
    );
    println!();
    println!("   vs previous month: {}", growth);
    println!(
        "   Computed {} (use --refresh to recompute)",
        analysis.updated_at.format("%Y-%m-%d %H:%M")
    );

    Ok(())
}

fn print_totals(label: &str, totals: &PeriodTotals) {
    println!(
        "   {:<14} {:>11} ({} bills)",
        label,
        format!("${}", totals.total_amount),
        totals.total_bills
    );
}

pub fn cmd_dashboard(
    db: &Database,
    clock: &dyn Clock,
    config: AnalyticsConfig,
    user_id: i64,
) -> Result<()> {
    let engine = AnalyticsEngine::new(db, clock, config);
    let summary = engine.dashboard_summary(user_id)?;

    println!();
    println!("📊 Billsight Dashboard");
    println!("   ─────────────────────────────");
    print_totals("This month", &summary.current_month);
    print_totals("Last 7 days", &summary.last_7_days);
    print_totals("All time", &summary.all_time);

    Ok(())
}
