//! Billsight Core Library
//!
//! Shared functionality for the Billsight bill tracking tool:
//! - Database access and migrations (SQLCipher, pooled)
//! - Bill records, corrections and the suggestion inbox
//! - Period resolution for weekly/monthly windows
//! - Analytics engine with cached weekly/monthly snapshots
//! - Layered TOML configuration

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod period;

pub use analytics::{
    compute_aggregate, compute_growth, AggregateResult, AnalyticsEngine, BillQuery, BillSource,
};
pub use config::{AnalyticsConfig, Config, ServerSettings};
pub use db::{AuditEntry, BillFilter, Database};
pub use error::{Error, Result};
pub use period::{Clock, FixedClock, MonthPeriod, MonthStepping, SystemClock, WeekPeriod};
