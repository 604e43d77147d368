//! Read-only access to bill records for analytics

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::db::{BillFilter, Database};
use crate::error::Result;
use crate::models::{round_money, Bill, PeriodTotals};
use crate::period::MonthPeriod;

/// Which of a user's bills an analysis reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillQuery {
    /// Bills dated within the inclusive range
    DateRange(NaiveDate, NaiveDate),
    /// Bills dated within one calendar month
    YearMonth(MonthPeriod),
    /// Bills dated on or after this day
    Since(NaiveDate),
    /// Every bill, dated or not
    All,
}

impl BillQuery {
    /// Whether a bill belongs to this query's window
    pub fn matches(&self, bill: &Bill) -> bool {
        match (self, bill.date) {
            (Self::All, _) => true,
            (_, None) => false,
            (Self::DateRange(start, end), Some(date)) => date >= *start && date <= *end,
            (Self::YearMonth(month), Some(date)) => MonthPeriod::containing(date) == *month,
            (Self::Since(since), Some(date)) => date >= *since,
        }
    }

    fn to_filter(self) -> BillFilter<'static> {
        match self {
            Self::DateRange(start, end) => BillFilter::new().date_range(Some((start, end))),
            Self::YearMonth(month) => BillFilter::new().year_month(Some(month)),
            Self::Since(since) => BillFilter::new().since(Some(since)),
            Self::All => BillFilter::new(),
        }
    }
}

/// A user-scoped supply of bills
///
/// Implementations return bills ordered by (date, id) so that grouping
/// with first-seen order is reproducible.
pub trait BillSource: Send + Sync {
    /// Bills of `user_id` matching `query`, items included
    fn query_bills(&self, user_id: i64, query: &BillQuery) -> Result<Vec<Bill>>;

    /// Bill count and spend for `query`
    fn period_totals(&self, user_id: i64, query: &BillQuery) -> Result<PeriodTotals> {
        let bills = self.query_bills(user_id, query)?;
        let total_amount: Decimal = bills.iter().map(|b| b.total_amount).sum();
        Ok(PeriodTotals {
            total_bills: bills.len() as i64,
            total_amount: round_money(total_amount),
        })
    }
}

impl BillSource for Database {
    fn query_bills(&self, user_id: i64, query: &BillQuery) -> Result<Vec<Bill>> {
        self.list_bills_by_date(user_id, &query.to_filter())
    }

    fn period_totals(&self, user_id: i64, query: &BillQuery) -> Result<PeriodTotals> {
        self.bill_totals(user_id, &query.to_filter())
    }
}

/// In-memory bills, mostly for tests and one-off computations
impl BillSource for Vec<Bill> {
    fn query_bills(&self, user_id: i64, query: &BillQuery) -> Result<Vec<Bill>> {
        let mut bills: Vec<Bill> = self
            .iter()
            .filter(|b| b.user_id == user_id && query.matches(b))
            .cloned()
            .collect();
        bills.sort_by_key(|b| (b.date, b.id));
        Ok(bills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bill(id: i64, user_id: i64, date: Option<NaiveDate>, total: i64) -> Bill {
        Bill {
            id,
            user_id,
            bill_number: String::new(),
            vendor_name: String::new(),
            date,
            total_amount: Decimal::from(total),
            tax_amount: Decimal::ZERO,
            status: Default::default(),
            notes: String::new(),
            items: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_query_matches_windows() {
        let dated = bill(1, 1, Some(date(2024, 3, 10)), 5);
        let undated = bill(2, 1, None, 5);

        let range = BillQuery::DateRange(date(2024, 3, 4), date(2024, 3, 10));
        assert!(range.matches(&dated));
        assert!(!range.matches(&undated));

        let month = BillQuery::YearMonth(MonthPeriod::new(2024, 3).unwrap());
        assert!(month.matches(&dated));

        assert!(!BillQuery::Since(date(2024, 3, 11)).matches(&dated));
        assert!(BillQuery::All.matches(&undated));
    }

    #[test]
    fn test_vec_source_scopes_user_and_orders_by_date() {
        let bills = vec![
            bill(3, 1, Some(date(2024, 3, 12)), 10),
            bill(1, 2, Some(date(2024, 3, 11)), 99),
            bill(2, 1, Some(date(2024, 3, 11)), 20),
        ];

        let result = bills.query_bills(1, &BillQuery::All).unwrap();
        let ids: Vec<i64> = result.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let totals = bills.period_totals(1, &BillQuery::All).unwrap();
        assert_eq!(totals.total_bills, 2);
        assert_eq!(totals.total_amount.to_string(), "30.00");
    }
}
