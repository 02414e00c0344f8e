//! The static field table backing [`super::FieldCatalog`].
//!
//! This is the fixed financial-data schema the whole pipeline is built
//! against (§6.3). Adding a screenable attribute means adding one entry
//! here — nothing else in the crate hardcodes field names.

use super::field::{DerivedFormula, Field, FieldKind, FieldSource, Operator, Scale, TableRef, ValueRange};

use Operator::*;

const COMPARISON: &[Operator] = &[Lt, Gt, Le, Ge, Eq, Ne, Between, In, NotIn];
const COMPARISON_TS: &[Operator] = &[Lt, Gt, Le, Ge, Eq, Ne, Between, In, NotIn, Increasing, Decreasing, Stable];
const STRING_OPS: &[Operator] = &[Eq, Ne, In, NotIn, Exists];
const BOOL_OPS: &[Operator] = &[Eq, Ne, Exists];
const DATE_OPS: &[Operator] = &[Lt, Gt, Le, Ge, Eq, Ne, Between, Exists];

pub static FIELDS: &[Field] = &[
    // ---- Instrument identity / metadata --------------------------------
    Field {
        name: "ticker",
        kind: FieldKind::String,
        source: FieldSource::Column { table: TableRef::Instruments, column: "ticker" },
        time_series: false,
        allowed_operators: STRING_OPS,
        value_range: None,
        scale: Scale::Unit,
        aliases: &["ticker", "symbol"],
    },
    Field {
        name: "market_cap",
        kind: FieldKind::Numeric,
        source: FieldSource::Column { table: TableRef::Instruments, column: "market_cap" },
        time_series: false,
        allowed_operators: COMPARISON,
        value_range: Some(ValueRange { min: 0.0, max: 5e13 }),
        scale: Scale::Unit,
        aliases: &["market cap", "market capitalization", "mcap"],
    },
    Field {
        name: "sector",
        kind: FieldKind::String,
        source: FieldSource::Column { table: TableRef::Metadata, column: "sector" },
        time_series: false,
        allowed_operators: STRING_OPS,
        value_range: None,
        scale: Scale::Unit,
        aliases: &["sector"],
    },
    Field {
        name: "industry",
        kind: FieldKind::String,
        source: FieldSource::Column { table: TableRef::Metadata, column: "industry" },
        time_series: false,
        allowed_operators: STRING_OPS,
        value_range: None,
        scale: Scale::Unit,
        aliases: &["industry"],
    },
    Field {
        name: "exchange",
        kind: FieldKind::String,
        source: FieldSource::Column { table: TableRef::Metadata, column: "exchange" },
        time_series: false,
        allowed_operators: STRING_OPS,
        value_range: None,
        scale: Scale::Unit,
        aliases: &["exchange", "listed on"],
    },

    // ---- Price history --------------------------------------------------
    Field {
        name: "price",
        kind: FieldKind::Numeric,
        source: FieldSource::Column { table: TableRef::PriceHistory, column: "close" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: 0.0, max: 1e7 }),
        scale: Scale::Unit,
        aliases: &["price", "current price", "share price", "close", "closing price"],
    },
    Field {
        name: "rsi",
        kind: FieldKind::Numeric,
        source: FieldSource::Column { table: TableRef::PriceHistory, column: "rsi_14" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: 0.0, max: 100.0 }),
        scale: Scale::Unit,
        aliases: &["rsi", "relative strength index"],
    },

    // ---- Fundamentals ----------------------------------------------------
    Field {
        name: "pe_ratio",
        kind: FieldKind::Numeric,
        source: FieldSource::Column { table: TableRef::Fundamentals, column: "pe_ratio" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: -1000.0, max: 1000.0 }),
        scale: Scale::Unit,
        aliases: &["pe", "p/e", "pe ratio", "price to earnings", "price/earnings"],
    },
    Field {
        name: "revenue",
        kind: FieldKind::Numeric,
        source: FieldSource::Column { table: TableRef::Fundamentals, column: "revenue" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: 0.0, max: 5e12 }),
        scale: Scale::Unit,
        aliases: &["revenue", "sales", "top line"],
    },
    Field {
        name: "revenue_growth_yoy",
        kind: FieldKind::Percentage,
        source: FieldSource::Column { table: TableRef::Fundamentals, column: "revenue_growth_yoy" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: -1.0, max: 10.0 }),
        scale: Scale::Fraction,
        aliases: &["revenue growth", "sales growth"],
    },
    Field {
        name: "net_income",
        kind: FieldKind::Numeric,
        source: FieldSource::Column { table: TableRef::Fundamentals, column: "net_income" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: -1e12, max: 1e12 }),
        scale: Scale::Unit,
        aliases: &["net income", "earnings", "profit"],
    },
    Field {
        name: "net_income_growth_yoy",
        kind: FieldKind::Percentage,
        source: FieldSource::Column { table: TableRef::Fundamentals, column: "net_income_growth_yoy" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: -1.0, max: 10.0 }),
        scale: Scale::Fraction,
        aliases: &["earnings growth", "net income growth", "profit growth"],
    },
    Field {
        name: "dividend_yield",
        kind: FieldKind::Percentage,
        source: FieldSource::Column { table: TableRef::Fundamentals, column: "dividend_yield" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: 0.0, max: 0.5 }),
        scale: Scale::Fraction,
        aliases: &["dividend yield", "yield"],
    },

    // ---- Cash flow ---------------------------------------------------------
    Field {
        name: "free_cash_flow",
        kind: FieldKind::Numeric,
        source: FieldSource::Column { table: TableRef::CashFlow, column: "free_cash_flow" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: -1e12, max: 1e12 }),
        scale: Scale::Unit,
        aliases: &["free cash flow", "fcf"],
    },
    Field {
        name: "buyback_announced_date",
        kind: FieldKind::Date,
        source: FieldSource::Column { table: TableRef::CashFlow, column: "buyback_announced_date" },
        time_series: true,
        allowed_operators: DATE_OPS,
        value_range: None,
        scale: Scale::Unit,
        aliases: &["buyback", "share buyback", "buyback announced"],
    },

    // ---- Debt profile -------------------------------------------------------
    Field {
        name: "total_debt",
        kind: FieldKind::Numeric,
        source: FieldSource::Column { table: TableRef::DebtProfile, column: "total_debt" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: 0.0, max: 1e12 }),
        scale: Scale::Unit,
        aliases: &["total debt", "debt"],
    },
    Field {
        name: "debt_to_fcf",
        kind: FieldKind::Numeric,
        source: FieldSource::Derived(DerivedFormula {
            numerator: "total_debt",
            denominator: "free_cash_flow",
            guarded_inputs: &["free_cash_flow"],
        }),
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: -100.0, max: 100.0 }),
        scale: Scale::Unit,
        aliases: &["debt to fcf", "debt to free cash flow", "debt/fcf"],
    },

    // ---- Analyst estimates -----------------------------------------------
    Field {
        name: "price_target_avg",
        kind: FieldKind::Numeric,
        source: FieldSource::Column { table: TableRef::AnalystEstimates, column: "price_target_avg" },
        time_series: true,
        allowed_operators: COMPARISON_TS,
        value_range: Some(ValueRange { min: 0.0, max: 1e7 }),
        scale: Scale::Unit,
        aliases: &["analyst target", "price target", "target price"],
    },
    Field {
        name: "earnings_date",
        kind: FieldKind::Date,
        source: FieldSource::Column { table: TableRef::AnalystEstimates, column: "next_earnings_date" },
        time_series: true,
        allowed_operators: DATE_OPS,
        value_range: None,
        scale: Scale::Unit,
        aliases: &["earnings date", "next earnings"],
    },

    // ---- Booleans -----------------------------------------------------------
    Field {
        name: "is_profitable",
        kind: FieldKind::Boolean,
        source: FieldSource::Column { table: TableRef::Fundamentals, column: "is_profitable" },
        time_series: true,
        allowed_operators: BOOL_OPS,
        value_range: None,
        scale: Scale::Unit,
        aliases: &["profitable"],
    },
];
