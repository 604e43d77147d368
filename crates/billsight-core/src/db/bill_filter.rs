//! Bill filter builder for constructing dynamic SQL queries
//!
//! Shared by bill listing, bill stats and the analytics bill source so the
//! WHERE clause is built in exactly one place.

use chrono::NaiveDate;

use crate::models::BillStatus;
use crate::period::MonthPeriod;

/// Builder for constructing bill query filters
///
/// The lifetime `'query` represents how long borrowed filter parameters
/// (the search term) must remain valid.
#[derive(Debug, Default, Clone)]
pub struct BillFilter<'query> {
    pub status: Option<BillStatus>,
    pub search: Option<&'query str>,
    /// Inclusive on both ends
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub year_month: Option<MonthPeriod>,
    /// Only bills dated on or after this day
    pub since: Option<NaiveDate>,
    /// Only bills dated on or before this day
    pub until: Option<NaiveDate>,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword; always scopes to one user
    pub where_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl<'query> BillFilter<'query> {
    /// Create a new filter builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set status filter
    pub fn status(mut self, status: Option<BillStatus>) -> Self {
        self.status = status;
        self
    }

    /// Set search query (bill number, vendor name and notes)
    pub fn search(mut self, query: Option<&'query str>) -> Self {
        self.search = query;
        self
    }

    /// Set inclusive date range filter
    pub fn date_range(mut self, range: Option<(NaiveDate, NaiveDate)>) -> Self {
        self.date_range = range;
        self
    }

    /// Set calendar month filter
    pub fn year_month(mut self, month: Option<MonthPeriod>) -> Self {
        self.year_month = month;
        self
    }

    /// Set open-ended lower date bound
    pub fn since(mut self, date: Option<NaiveDate>) -> Self {
        self.since = date;
        self
    }

    /// Set open-ended upper date bound
    pub fn until(mut self, date: Option<NaiveDate>) -> Self {
        self.until = date;
        self
    }

    /// Build the filter components for bills of `user_id` (table alias `b`)
    pub fn build(&self, user_id: i64) -> FilterResult {
        let mut conditions = vec!["b.user_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(status) = self.status {
            conditions.push("b.status = ?".to_string());
            params.push(Box::new(status.as_str()));
        }

        if let Some(q) = self.search {
            if !q.trim().is_empty() {
                conditions.push(
                    "(b.bill_number LIKE ? COLLATE NOCASE OR b.vendor_name LIKE ? COLLATE NOCASE OR b.notes LIKE ? COLLATE NOCASE)"
                        .to_string(),
                );
                let pattern = format!("%{}%", q.trim());
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        if let Some((from_date, to_date)) = self.date_range {
            conditions.push("b.date >= ? AND b.date <= ?".to_string());
            params.push(Box::new(from_date.to_string()));
            params.push(Box::new(to_date.to_string()));
        }

        if let Some(month) = self.year_month {
            conditions.push("substr(b.date, 1, 7) = ?".to_string());
            params.push(Box::new(month.to_string()));
        }

        if let Some(since) = self.since {
            conditions.push("b.date >= ?".to_string());
            params.push(Box::new(since.to_string()));
        }

        if let Some(until) = self.until {
            conditions.push("b.date <= ?".to_string());
            params.push(Box::new(until.to_string()));
        }

        FilterResult {
            where_clause: format!("WHERE {}", conditions.join(" AND ")),
            params,
        }
    }
}
