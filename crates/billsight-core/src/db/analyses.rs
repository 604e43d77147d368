//! Weekly and monthly analysis snapshots
//!
//! One row per (user, period). Creation goes through the UNIQUE constraint
//! so concurrent callers for the same period never produce duplicates;
//! refresh overwrites every metric in one UPDATE.

use rust_decimal::Decimal;
use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{date_column, decimal_column, json_column, money_text, parse_datetime, Database};
use crate::analytics::AggregateResult;
use crate::error::{Error, Result};
use crate::models::{round_money, MonthlyAnalysis, VendorTotal, WeeklyAnalysis};
use crate::period::{MonthPeriod, WeekPeriod};

const WEEKLY_COLUMNS: &str = "id, user_id, week_start, week_end, total_bills, total_amount, \
     total_tax, average_bill_amount, category_breakdown, top_vendors, trend_data, created_at, updated_at";

const MONTHLY_COLUMNS: &str = "id, user_id, year, month, total_bills, total_amount, \
     total_tax, average_bill_amount, category_breakdown, top_vendors, trend_data, growth_percentage, \
     created_at, updated_at";

/// JSON and money columns shared by both snapshot kinds
struct SnapshotColumns {
    total_amount: String,
    total_tax: String,
    average_bill_amount: String,
    category_breakdown: String,
    top_vendors: String,
    trend_data: String,
}

impl SnapshotColumns {
    fn from_aggregate(aggregate: &AggregateResult) -> Result<Self> {
        let top_vendors: Vec<VendorTotal> = aggregate
            .top_vendors
            .iter()
            .map(|v| VendorTotal {
                vendor_name: v.vendor_name.clone(),
                total: round_money(v.total),
                count: v.count,
            })
            .collect();
        let trend_data: std::collections::BTreeMap<&str, Decimal> = aggregate
            .trend_data
            .iter()
            .map(|(day, amount)| (day.as_str(), round_money(*amount)))
            .collect();

        Ok(Self {
            total_amount: money_text(aggregate.total_amount),
            total_tax: money_text(aggregate.total_tax),
            average_bill_amount: money_text(aggregate.average_bill_amount),
            category_breakdown: serde_json::to_string(&aggregate.category_breakdown)?,
            top_vendors: serde_json::to_string(&top_vendors)?,
            trend_data: serde_json::to_string(&trend_data)?,
        })
    }
}

impl Database {
    /// Get the weekly snapshot for a period, inserting an empty one if absent
    ///
    /// Returns `(snapshot, created)`; exactly one caller observes `created`
    /// for a given (user, week).
    pub fn get_or_create_weekly(
        &self,
        user_id: i64,
        week: &WeekPeriod,
    ) -> Result<(WeeklyAnalysis, bool)> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"
            INSERT INTO weekly_analyses (user_id, week_start, week_end)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, week_start) DO NOTHING
            "#,
            params![user_id, week.start.to_string(), week.end.to_string()],
        )?;

        let sql = format!(
            "SELECT {} FROM weekly_analyses WHERE user_id = ? AND week_start = ?",
            WEEKLY_COLUMNS
        );
        let analysis = conn.query_row(
            &sql,
            params![user_id, week.start.to_string()],
            row_to_weekly,
        )?;

        if inserted > 0 {
            info!(user_id, week_start = %week.start, "Created weekly analysis");
        }
        Ok((analysis, inserted > 0))
    }

    /// Get the monthly snapshot for a period, inserting an empty one if absent
    pub fn get_or_create_monthly(
        &self,
        user_id: i64,
        month: &MonthPeriod,
    ) -> Result<(MonthlyAnalysis, bool)> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"
            INSERT INTO monthly_analyses (user_id, year, month)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, year, month) DO NOTHING
            "#,
            params![user_id, month.year, month.month],
        )?;

        let sql = format!(
            "SELECT {} FROM monthly_analyses WHERE user_id = ? AND year = ? AND month = ?",
            MONTHLY_COLUMNS
        );
        let analysis = conn.query_row(
            &sql,
            params![user_id, month.year, month.month],
            row_to_monthly,
        )?;

        if inserted > 0 {
            info!(user_id, month = %month, "Created monthly analysis");
        }
        Ok((analysis, inserted > 0))
    }

    /// Read a weekly snapshot without creating it
    pub fn find_weekly(&self, user_id: i64, week: &WeekPeriod) -> Result<Option<WeeklyAnalysis>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM weekly_analyses WHERE user_id = ? AND week_start = ?",
            WEEKLY_COLUMNS
        );
        let analysis = conn
            .query_row(&sql, params![user_id, week.start.to_string()], row_to_weekly)
            .optional()?;
        Ok(analysis)
    }

    /// Read a monthly snapshot without creating it
    pub fn find_monthly(
        &self,
        user_id: i64,
        month: &MonthPeriod,
    ) -> Result<Option<MonthlyAnalysis>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM monthly_analyses WHERE user_id = ? AND year = ? AND month = ?",
            MONTHLY_COLUMNS
        );
        let analysis = conn
            .query_row(&sql, params![user_id, month.year, month.month], row_to_monthly)
            .optional()?;
        Ok(analysis)
    }

    /// Overwrite a weekly snapshot's metrics
    pub fn refresh_weekly(&self, id: i64, aggregate: &AggregateResult) -> Result<WeeklyAnalysis> {
        let cols = SnapshotColumns::from_aggregate(aggregate)?;
        let conn = self.conn()?;

        let updated = conn.execute(
            r#"
            UPDATE weekly_analyses
            SET total_bills = ?, total_amount = ?, total_tax = ?, average_bill_amount = ?,
                category_breakdown = ?, top_vendors = ?, trend_data = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                aggregate.total_bills,
                cols.total_amount,
                cols.total_tax,
                cols.average_bill_amount,
                cols.category_breakdown,
                cols.top_vendors,
                cols.trend_data,
                id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Weekly analysis {}", id)));
        }

        let sql = format!("SELECT {} FROM weekly_analyses WHERE id = ?", WEEKLY_COLUMNS);
        let analysis = conn.query_row(&sql, params![id], row_to_weekly)?;

        info!(
            id,
            week_start = %analysis.week_start,
            total_bills = analysis.total_bills,
            "Refreshed weekly analysis"
        );
        Ok(analysis)
    }

    /// Overwrite a monthly snapshot's metrics and growth
    pub fn refresh_monthly(
        &self,
        id: i64,
        aggregate: &AggregateResult,
        growth_percentage: Decimal,
    ) -> Result<MonthlyAnalysis> {
        let cols = SnapshotColumns::from_aggregate(aggregate)?;
        let conn = self.conn()?;

        let updated = conn.execute(
            r#"
            UPDATE monthly_analyses
            SET total_bills = ?, total_amount = ?, total_tax = ?, average_bill_amount = ?,
                category_breakdown = ?, top_vendors = ?, trend_data = ?, growth_percentage = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                aggregate.total_bills,
                cols.total_amount,
                cols.total_tax,
                cols.average_bill_amount,
                cols.category_breakdown,
                cols.top_vendors,
                cols.trend_data,
                money_text(growth_percentage),
                id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Monthly analysis {}", id)));
        }

        let sql = format!("SELECT {} FROM monthly_analyses WHERE id = ?", MONTHLY_COLUMNS);
        let analysis = conn.query_row(&sql, params![id], row_to_monthly)?;

        info!(
            id,
            year = analysis.year,
            month = analysis.month,
            total_bills = analysis.total_bills,
            growth = %analysis.growth_percentage,
            "Refreshed monthly analysis"
        );
        Ok(analysis)
    }
}

fn required_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<chrono::NaiveDate> {
    date_column(row, idx)?.ok_or(rusqlite::Error::InvalidColumnType(
        idx,
        "week date".to_string(),
        rusqlite::types::Type::Null,
    ))
}

fn row_to_weekly(row: &rusqlite::Row) -> rusqlite::Result<WeeklyAnalysis> {
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;
    Ok(WeeklyAnalysis {
        id: row.get(0)?,
        user_id: row.get(1)?,
        week_start: required_date(row, 2)?,
        week_end: required_date(row, 3)?,
        total_bills: row.get(4)?,
        total_amount: decimal_column(row, 5)?,
        total_tax: decimal_column(row, 6)?,
        average_bill_amount: decimal_column(row, 7)?,
        category_breakdown: json_column(row, 8)?,
        top_vendors: json_column(row, 9)?,
        trend_data: json_column(row, 10)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn row_to_monthly(row: &rusqlite::Row) -> rusqlite::Result<MonthlyAnalysis> {
    let year: i32 = row.get(2)?;
    let month: u32 = row.get(3)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;
    let month_name = MonthPeriod::new(year, month)
        .map(|p| p.name().to_string())
        .unwrap_or_default();
    Ok(MonthlyAnalysis {
        id: row.get(0)?,
        user_id: row.get(1)?,
        year,
        month,
        month_name,
        total_bills: row.get(4)?,
        total_amount: decimal_column(row, 5)?,
        total_tax: decimal_column(row, 6)?,
        average_bill_amount: decimal_column(row, 7)?,
        category_breakdown: json_column(row, 8)?,
        top_vendors: json_column(row, 9)?,
        trend_data: json_column(row, 10)?,
        growth_percentage: decimal_column(row, 11)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}
