//! Analytics engine - cached weekly/monthly rollups and the live dashboard
//!
//! A request for "the week/month N periods ago" is resolved to a concrete
//! period, the stored snapshot for (user, period) is fetched or created, and
//! the snapshot is recomputed from bills only when it was just created or a
//! refresh was requested. Otherwise the cached snapshot is returned as is,
//! even if bills changed since it was computed.

mod aggregate;
mod growth;
mod source;

pub use aggregate::{compute_aggregate, AggregateResult};
pub use growth::compute_growth;
pub use source::{BillQuery, BillSource};

use chrono::Duration;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::AnalyticsConfig;
use crate::db::Database;
use crate::error::Result;
use crate::models::{DashboardSummary, MonthlyAnalysis, WeeklyAnalysis};
use crate::period::{month_period, week_period, Clock, MonthPeriod};

/// Orchestrates period resolution, aggregation and the snapshot store
pub struct AnalyticsEngine<'a> {
    source: &'a dyn BillSource,
    store: &'a Database,
    clock: &'a dyn Clock,
    config: AnalyticsConfig,
}

impl<'a> AnalyticsEngine<'a> {
    /// Engine reading bills from and storing snapshots in the same database
    pub fn new(db: &'a Database, clock: &'a dyn Clock, config: AnalyticsConfig) -> Self {
        Self::with_source(db, db, clock, config)
    }

    /// Engine reading bills from a separate source
    pub fn with_source(
        source: &'a dyn BillSource,
        store: &'a Database,
        clock: &'a dyn Clock,
        config: AnalyticsConfig,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            config,
        }
    }

    /// Weekly analysis for the week `week_offset` weeks before the current one
    pub fn weekly_analysis(
        &self,
        user_id: i64,
        week_offset: u32,
        force_refresh: bool,
    ) -> Result<WeeklyAnalysis> {
        let week = week_period(self.clock.today(), week_offset)?;
        let (analysis, created) = self.store.get_or_create_weekly(user_id, &week)?;

        if !created && !force_refresh {
            debug!(user_id, week_start = %week.start, "Weekly analysis cache hit");
            return Ok(analysis);
        }

        let aggregate = compute_aggregate(
            self.source,
            user_id,
            week.start,
            week.end,
            self.config.top_vendor_limit,
        )?;
        self.store.refresh_weekly(analysis.id, &aggregate)
    }

    /// Monthly analysis for the month `month_offset` months before the current one
    ///
    /// Growth compares against the stored snapshot of the previous calendar
    /// month; when that snapshot is missing or its total is zero, growth is 0.
    pub fn monthly_analysis(
        &self,
        user_id: i64,
        month_offset: u32,
        force_refresh: bool,
    ) -> Result<MonthlyAnalysis> {
        let month = month_period(
            self.clock.today(),
            month_offset,
            self.config.month_stepping,
        )?;
        let (analysis, created) = self.store.get_or_create_monthly(user_id, &month)?;

        if !created && !force_refresh {
            debug!(user_id, month = %month, "Monthly analysis cache hit");
            return Ok(analysis);
        }

        let aggregate = compute_aggregate(
            self.source,
            user_id,
            month.first_day()?,
            month.last_day()?,
            self.config.top_vendor_limit,
        )?;

        let previous_total = self
            .store
            .find_monthly(user_id, &month.previous())?
            .map(|prev| prev.total_amount);
        let growth =
            compute_growth(aggregate.total_amount, previous_total).unwrap_or(Decimal::ZERO);

        self.store.refresh_monthly(analysis.id, &aggregate, growth)
    }

    /// Live totals for the current month, the last seven days and all time
    pub fn dashboard_summary(&self, user_id: i64) -> Result<DashboardSummary> {
        let today = self.clock.today();

        let current_month = self.source.period_totals(
            user_id,
            &BillQuery::YearMonth(MonthPeriod::containing(today)),
        )?;
        let last_7_days = self
            .source
            .period_totals(user_id, &BillQuery::Since(today - Duration::days(7)))?;
        let all_time = self.source.period_totals(user_id, &BillQuery::All)?;

        Ok(DashboardSummary {
            current_month,
            last_7_days,
            all_time,
        })
    }
}
