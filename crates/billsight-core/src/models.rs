//! Domain models for Billsight

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label used for bill items with no category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Round a money value to two fraction digits (banker's rounding), keeping
/// the scale at exactly two so it renders as "50.00"
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

// ========== Bill Models ==========

/// Verification status of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    /// Freshly recorded, not yet checked by the user
    #[default]
    Pending,
    /// User confirmed the recorded values
    Verified,
    /// User fixed at least one field
    Corrected,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Corrected => "corrected",
        }
    }
}

impl std::str::FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "corrected" => Ok(Self::Corrected),
            _ => Err(format!(
                "Unknown bill status: {} (valid: pending, verified, corrected)",
                s
            )),
        }
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A purchase bill owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    pub user_id: i64,
    pub bill_number: String,
    pub vendor_name: String,
    pub date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub status: BillStatus,
    pub notes: String,
    pub items: Vec<BillItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item within a bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillItem {
    pub id: i64,
    pub bill_id: i64,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    /// Free-text category; empty means uncategorized
    pub category: String,
}

/// A new bill to be recorded (before DB insertion)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBill {
    #[serde(default)]
    pub bill_number: String,
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub status: BillStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub items: Vec<NewBillItem>,
}

/// A new line item for a bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBillItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    #[serde(default)]
    pub category: String,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

/// Bill fields a user is allowed to correct
///
/// Corrections are dispatched through this closed set; arbitrary field
/// names from user input are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectableField {
    BillNumber,
    VendorName,
    Date,
    TotalAmount,
    TaxAmount,
    Notes,
}

impl CorrectableField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BillNumber => "bill_number",
            Self::VendorName => "vendor_name",
            Self::Date => "date",
            Self::TotalAmount => "total_amount",
            Self::TaxAmount => "tax_amount",
            Self::Notes => "notes",
        }
    }
}

impl std::str::FromStr for CorrectableField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "bill_number" => Ok(Self::BillNumber),
            "vendor_name" => Ok(Self::VendorName),
            "date" => Ok(Self::Date),
            "total_amount" => Ok(Self::TotalAmount),
            "tax_amount" => Ok(Self::TaxAmount),
            "notes" => Ok(Self::Notes),
            _ => Err(format!(
                "Field cannot be corrected: {} (valid: bill_number, vendor_name, date, total_amount, tax_amount, notes)",
                s
            )),
        }
    }
}

impl std::fmt::Display for CorrectableField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded user correction of a bill field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillCorrection {
    pub id: i64,
    pub bill_id: i64,
    pub field_name: CorrectableField,
    pub original_value: String,
    pub corrected_value: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate statistics over a filtered set of bills
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillStats {
    pub total_bills: i64,
    pub total_amount: Decimal,
    pub total_tax: Decimal,
    pub average_amount: Decimal,
}

// ========== Analysis Models ==========

/// Spend attributed to one vendor within a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorTotal {
    pub vendor_name: String,
    pub total: Decimal,
    pub count: i64,
}

/// Cached weekly rollup for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAnalysis {
    pub id: i64,
    pub user_id: i64,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_bills: i64,
    pub total_amount: Decimal,
    pub total_tax: Decimal,
    pub average_bill_amount: Decimal,
    pub category_breakdown: BTreeMap<String, f64>,
    pub top_vendors: Vec<VendorTotal>,
    /// Spend per day within the week, keyed by ISO date
    pub trend_data: BTreeMap<String, Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cached monthly rollup for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAnalysis {
    pub id: i64,
    pub user_id: i64,
    pub year: i32,
    pub month: u32,
    /// Three-letter month label ("Jan".."Dec")
    pub month_name: String,
    pub total_bills: i64,
    pub total_amount: Decimal,
    pub total_tax: Decimal,
    pub average_bill_amount: Decimal,
    pub category_breakdown: BTreeMap<String, f64>,
    pub top_vendors: Vec<VendorTotal>,
    /// Spend per day within the month, keyed by ISO date
    pub trend_data: BTreeMap<String, Decimal>,
    /// Percent change of total_amount vs the previous calendar month
    pub growth_percentage: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bill count and spend for one dashboard window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub total_bills: i64,
    pub total_amount: Decimal,
}

/// Live dashboard overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub current_month: PeriodTotals,
    pub last_7_days: PeriodTotals,
    pub all_time: PeriodTotals,
}

// ========== Suggestion Models ==========

/// Kinds of user-facing suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    CostSaving,
    Trend,
    Anomaly,
    Recommendation,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CostSaving => "cost_saving",
            Self::Trend => "trend",
            Self::Anomaly => "anomaly",
            Self::Recommendation => "recommendation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CostSaving => "Cost Saving",
            Self::Trend => "Trend Alert",
            Self::Anomaly => "Anomaly Detection",
            Self::Recommendation => "Recommendation",
        }
    }
}

impl std::str::FromStr for SuggestionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cost_saving" | "cost-saving" => Ok(Self::CostSaving),
            "trend" => Ok(Self::Trend),
            "anomaly" => Ok(Self::Anomaly),
            "recommendation" => Ok(Self::Recommendation),
            _ => Err(format!(
                "Unknown suggestion type: {} (valid: cost_saving, trend, anomaly, recommendation)",
                s
            )),
        }
    }
}

impl std::fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-facing notice derived from spending analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: i64,
    pub user_id: i64,
    pub suggestion_type: SuggestionType,
    pub title: String,
    pub description: String,
    pub related_data: serde_json::Value,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
}

/// New suggestion for creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSuggestion {
    pub suggestion_type: SuggestionType,
    pub title: String,
    pub description: String,
    #[serde(default = "empty_object")]
    pub related_data: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
