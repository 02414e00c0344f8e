//! Field definitions for the screenable attribute catalog.

use std::collections::HashSet;

/// Kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Percentage,
    Fraction,
    String,
    Date,
    Boolean,
}

impl FieldKind {
    /// Whether `operator` is syntactically shaped correctly for this kind.
    /// Catalog-level `allowed_operators` is still the authority on legality;
    /// this only rules out nonsensical pairings (e.g. `increasing` on a string).
    pub fn supports(&self, op: Operator) -> bool {
        use FieldKind::*;
        use Operator::*;
        match self {
            String => matches!(op, Eq | Ne | In | NotIn | Exists),
            Boolean => matches!(op, Eq | Ne | Exists),
            Date => matches!(op, Lt | Gt | Le | Ge | Eq | Ne | Between | Exists),
            Numeric | Percentage | Fraction => true,
        }
    }
}

/// Comparison, range, membership, presence, and trend operators (§3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Between,
    In,
    NotIn,
    Exists,
    Increasing,
    Decreasing,
    Stable,
}

impl Operator {
    pub fn from_str(s: &str) -> Option<Self> {
        use Operator::*;
        Some(match s {
            "<" => Lt,
            ">" => Gt,
            "<=" => Le,
            ">=" => Ge,
            "=" => Eq,
            "!=" => Ne,
            "between" => Between,
            "in" => In,
            "not_in" => NotIn,
            "exists" => Exists,
            "increasing" => Increasing,
            "decreasing" => Decreasing,
            "stable" => Stable,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        use Operator::*;
        match self {
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            Eq => "=",
            Ne => "!=",
            Between => "between",
            In => "in",
            NotIn => "not_in",
            Exists => "exists",
            Increasing => "increasing",
            Decreasing => "decreasing",
            Stable => "stable",
        }
    }

    /// The logical inverse, used by the compiler's `all` aggregation mode
    /// (§4.4.4: `NOT EXISTS (... WHERE col INV_OP $v)`).
    pub fn invert(&self) -> Option<Operator> {
        use Operator::*;
        Some(match self {
            Lt => Ge,
            Gt => Le,
            Le => Gt,
            Ge => Lt,
            Eq => Ne,
            Ne => Eq,
            _ => return None,
        })
    }

    pub fn is_trend(&self) -> bool {
        matches!(self, Operator::Increasing | Operator::Decreasing | Operator::Stable)
    }
}

/// Where a field's value comes from: a plain table column, or a formula
/// over other (non-derived) catalog entries.
#[derive(Debug, Clone)]
pub enum FieldSource {
    Column { table: TableRef, column: &'static str },
    Derived(DerivedFormula),
}

/// One of the fixed logical tables the compiler knows how to join (§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableRef {
    /// Canonical instrument identity table.
    Instruments,
    /// One-row-per-snapshot fundamentals, keyed by `(ticker, id DESC)`.
    Fundamentals,
    /// Price history, keyed by `(ticker, time DESC)`.
    PriceHistory,
    /// Debt profile snapshots.
    DebtProfile,
    /// Cash flow snapshots.
    CashFlow,
    /// Analyst estimates, keyed by `(ticker, estimate_date DESC)`.
    AnalystEstimates,
    /// Sector/industry/exchange metadata.
    Metadata,
}

impl TableRef {
    /// The fixed alias used across the compiler for this table (§4.4.1).
    pub fn alias(&self) -> &'static str {
        match self {
            TableRef::Instruments => "i",
            TableRef::Fundamentals => "fq",
            TableRef::PriceHistory => "ph",
            TableRef::DebtProfile => "dp",
            TableRef::CashFlow => "cf",
            TableRef::AnalystEstimates => "ae",
            TableRef::Metadata => "md",
        }
    }

    /// The physical table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            TableRef::Instruments => "instruments",
            TableRef::Fundamentals => "fundamentals",
            TableRef::PriceHistory => "price_history",
            TableRef::DebtProfile => "debt_profile",
            TableRef::CashFlow => "cash_flow",
            TableRef::AnalystEstimates => "analyst_estimates",
            TableRef::Metadata => "instrument_metadata",
        }
    }

    /// True for tables with one-row-per-snapshot semantics that need a
    /// LEFT LATERAL "latest row" join (§4.4.1). The instruments and
    /// metadata tables are one-row-per-instrument and joined plainly.
    pub fn needs_lateral_join(&self) -> bool {
        !matches!(self, TableRef::Instruments | TableRef::Metadata)
    }

    /// The monotonic ordering column used to pick the latest snapshot.
    pub fn order_column(&self) -> &'static str {
        match self {
            TableRef::PriceHistory => "time",
            TableRef::AnalystEstimates => "estimate_date",
            _ => "id",
        }
    }

    /// The date column used to bound a rolling period window (§4.4.4).
    /// `None` for tables with no meaningful period (instrument identity
    /// and metadata are point-in-time, not snapshotted).
    pub fn period_column(&self) -> Option<&'static str> {
        match self {
            TableRef::Instruments | TableRef::Metadata => None,
            TableRef::PriceHistory => Some("time"),
            TableRef::AnalystEstimates => Some("estimate_date"),
            TableRef::Fundamentals | TableRef::DebtProfile | TableRef::CashFlow => {
                Some("period_end")
            }
        }
    }
}

/// A derived metric's formula: a numerator/denominator pair over other
/// catalog fields, with the denominator fields that must be guarded
/// against zero/negative (§4.3 phase 8, §7 `MetricSafety`).
#[derive(Debug, Clone)]
pub struct DerivedFormula {
    pub numerator: &'static str,
    pub denominator: &'static str,
    /// Catalog field names feeding the denominator; each must have a
    /// declared non-zero/positive guard before the formula is safe to
    /// compile for arbitrary inputs.
    pub guarded_inputs: &'static [&'static str],
}

/// Value-range sanity bounds (§3.1); advisory only (see §4.3 phase 5).
#[derive(Debug, Clone, Copy)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Unit scale for auto-normalization (§3.1, §4.1 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Unit,
    Fraction,
}

/// One entry in the field catalog.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub source: FieldSource,
    pub time_series: bool,
    pub allowed_operators: &'static [Operator],
    pub value_range: Option<ValueRange>,
    pub scale: Scale,
    pub aliases: &'static [&'static str],
}

impl Field {
    pub fn allows(&self, op: Operator) -> bool {
        self.allowed_operators.contains(&op) && self.kind.supports(op)
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.source, FieldSource::Derived(_))
    }

    pub fn table(&self) -> TableRef {
        match &self.source {
            FieldSource::Column { table, .. } => *table,
            // Derived fields are expanded at compile time and do not live
            // on a single table; conventionally reported as fundamentals
            // since today's only derived metrics are fundamentals ratios.
            FieldSource::Derived(_) => TableRef::Fundamentals,
        }
    }

    pub fn allowed_operator_set(&self) -> HashSet<Operator> {
        self.allowed_operators.iter().copied().collect()
    }
}
