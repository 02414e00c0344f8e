//! Row bundles returned by the data store (§6.3).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The latest snapshot across every table the compiler can join,
/// fetched for a single ticker — what the alert evaluator needs without
/// having to re-run a full screen compile per subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub ticker: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    pub market_cap: Option<f64>,
    pub price: Option<f64>,
    pub price_at: Option<DateTime<Utc>>,
    pub rsi: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub revenue: Option<f64>,
    pub revenue_growth_yoy: Option<f64>,
    pub net_income: Option<f64>,
    pub net_income_growth_yoy: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub buyback_announced_date: Option<NaiveDate>,
    pub total_debt: Option<f64>,
    pub price_target_avg: Option<f64>,
    pub earnings_date: Option<NaiveDate>,
    pub is_profitable: Option<bool>,
}

/// One row of a compiled screen's result set: the fixed projection
/// columns from §4.4.3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "store-postgres", derive(sqlx::FromRow))]
pub struct ScreenResultRow {
    pub ticker: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    pub market_cap: Option<f64>,
    pub price: Option<f64>,
}

/// A point-in-time price sample, used for `price_change` alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub close: f64,
    pub time: DateTime<Utc>,
}
