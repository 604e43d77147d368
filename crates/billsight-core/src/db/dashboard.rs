//! Live dashboard aggregates

use rust_decimal::Decimal;

use super::bill_filter::BillFilter;
use super::{decimal_column, Database};
use crate::error::Result;
use crate::models::{round_money, PeriodTotals};

impl Database {
    /// Count and sum the bill totals matching a filter
    ///
    /// Amounts are summed as decimals here rather than with SQL `SUM`, which
    /// would coerce the TEXT columns to floating point.
    pub fn bill_totals(&self, user_id: i64, filter: &BillFilter) -> Result<PeriodTotals> {
        let conn = self.conn()?;
        let built = filter.build(user_id);

        let sql = format!("SELECT b.total_amount FROM bills b {}", built.where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            built.params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(param_refs.as_slice())?;

        let mut total_bills = 0i64;
        let mut total_amount = Decimal::ZERO;
        while let Some(row) = rows.next()? {
            total_bills += 1;
            total_amount += decimal_column(row, 0)?;
        }

        Ok(PeriodTotals {
            total_bills,
            total_amount: round_money(total_amount),
        })
    }
}
