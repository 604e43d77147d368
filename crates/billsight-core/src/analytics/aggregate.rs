//! Period aggregation over a set of bills

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::source::{BillQuery, BillSource};
use crate::error::Result;
use crate::models::{Bill, VendorTotal, UNCATEGORIZED};

/// Summary statistics for one user and period
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub total_bills: i64,
    pub total_amount: Decimal,
    pub total_tax: Decimal,
    /// Mean bill total; zero when there are no bills
    pub average_bill_amount: Decimal,
    pub category_breakdown: BTreeMap<String, f64>,
    /// Highest-spend vendors, descending by total
    pub top_vendors: Vec<VendorTotal>,
    /// Spend per bill date (ISO `YYYY-MM-DD` keys)
    pub trend_data: BTreeMap<String, Decimal>,
}

impl AggregateResult {
    /// Aggregate `bills` in a single pass
    ///
    /// Bills are expected in (date, id) order: vendors that tie on total keep
    /// the order in which they were first seen.
    pub fn from_bills(bills: &[Bill], top_vendor_limit: usize) -> Self {
        let mut total_amount = Decimal::ZERO;
        let mut total_tax = Decimal::ZERO;
        let mut category_breakdown: BTreeMap<String, f64> = BTreeMap::new();
        let mut vendors: Vec<VendorTotal> = Vec::new();
        let mut vendor_index: BTreeMap<&str, usize> = BTreeMap::new();
        let mut trend_data: BTreeMap<String, Decimal> = BTreeMap::new();

        for bill in bills {
            total_amount += bill.total_amount;
            total_tax += bill.tax_amount;

            for item in &bill.items {
                let category = if item.category.trim().is_empty() {
                    UNCATEGORIZED
                } else {
                    item.category.as_str()
                };
                *category_breakdown.entry(category.to_string()).or_insert(0.0) +=
                    item.total_price.to_f64().unwrap_or(0.0);
            }

            match vendor_index.get(bill.vendor_name.as_str()) {
                Some(&idx) => {
                    vendors[idx].total += bill.total_amount;
                    vendors[idx].count += 1;
                }
                None => {
                    vendor_index.insert(bill.vendor_name.as_str(), vendors.len());
                    vendors.push(VendorTotal {
                        vendor_name: bill.vendor_name.clone(),
                        total: bill.total_amount,
                        count: 1,
                    });
                }
            }

            if let Some(date) = bill.date {
                *trend_data.entry(day_key(date)).or_insert(Decimal::ZERO) += bill.total_amount;
            }
        }

        // sort_by is stable: equal totals stay in first-seen order
        vendors.sort_by(|a, b| b.total.cmp(&a.total));
        vendors.truncate(top_vendor_limit);

        let total_bills = bills.len() as i64;
        let average_bill_amount = if total_bills > 0 {
            total_amount / Decimal::from(total_bills)
        } else {
            Decimal::ZERO
        };

        Self {
            total_bills,
            total_amount,
            total_tax,
            average_bill_amount,
            category_breakdown,
            top_vendors: vendors,
            trend_data,
        }
    }
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Aggregate the bills of `user_id` dated within `[start, end]`
pub fn compute_aggregate(
    source: &dyn BillSource,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    top_vendor_limit: usize,
) -> Result<AggregateResult> {
    let bills = source.query_bills(user_id, &BillQuery::DateRange(start, end))?;
    debug!(user_id, %start, %end, bills = bills.len(), "Aggregating bills");
    Ok(AggregateResult::from_bills(&bills, top_vendor_limit))
}
