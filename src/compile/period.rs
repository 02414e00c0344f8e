//! Period and aggregation compilation (§4.4.4 — "the design center").
//!
//! Five period types (`last_n_quarters`, `last_n_years`,
//! `trailing_12_months`, `quarter_over_quarter`, `year_over_year`) cross
//! eight aggregations (`all/any/avg/sum/min/max/trend/latest`). Rather
//! than special-casing all forty combinations, this module reduces them
//! to three compiled shapes:
//!
//! - `all`/`any` compile to a correlated `NOT EXISTS`/`EXISTS` over the
//!   window, deliberately vacuously true/false on a table with no rows
//!   in range (partial-data semantics, §4.4.4).
//! - `trend` compiles to a `FIRST_VALUE`/`LAST_VALUE` comparison ordered
//!   by the table's period column.
//! - everything else (`avg/sum/min/max/latest`) reduces to a scalar
//!   sub-expression that the caller then compares with the condition's
//!   operator and value exactly like a non-periodic condition.

use crate::catalog::{Field, FieldSource, Operator, TableRef, CATALOG};
use crate::compile::emitter::SqlEmitter;
use crate::compile::error::CompileError;
use crate::dsl::{Aggregation, Period, PeriodType};
use serde_json::Value;

/// SQL for the interval this period type steps by, used both for the
/// trailing-twelve-months window and the QoQ/YoY anchor point.
fn step_interval(period_type: PeriodType) -> &'static str {
    match period_type {
        PeriodType::LastNQuarters | PeriodType::QuarterOverQuarter => "3 months",
        PeriodType::LastNYears | PeriodType::YearOverYear => "1 year",
        PeriodType::TrailingTwelveMonths => "12 months",
    }
}

/// Emit the bounded row source this period selects from, as a derived
/// table aliased `w` exposing every column of `table` (§4.4.4: "the last
/// N rows for that instrument, ordered by the monotonic key" — a
/// row-count window, not a date-range filter, so a period's `n = 1`
/// reduces to exactly the single latest row regardless of how dense the
/// table's snapshot cadence is). `last_n_quarters`/`last_n_years` select
/// literally the last `n` rows ordered by the period column.
/// `trailing_12_months` and the QoQ/YoY anchor comparisons have no row
/// count and keep a calendar-range bound instead.
fn emit_window_source(emitter: &mut SqlEmitter, table: TableRef, period_col: &str, period: &Period) {
    let table_name = table.table_name();
    let i = TableRef::Instruments.alias();
    match period.period_type {
        PeriodType::LastNQuarters | PeriodType::LastNYears => {
            emitter.raw(format!("(SELECT * FROM {table_name} WHERE ticker = {i}.ticker ORDER BY {period_col} DESC LIMIT "));
            emitter.bind(Value::from(period.n));
            emitter.raw(") w");
        }
        PeriodType::TrailingTwelveMonths => {
            emitter.raw(format!(
                "(SELECT * FROM {table_name} WHERE ticker = {i}.ticker AND {period_col} >= CURRENT_DATE - INTERVAL '12 months') w"
            ));
        }
        PeriodType::QuarterOverQuarter | PeriodType::YearOverYear => {
            let unit = step_interval(period.period_type);
            emitter.raw(format!(
                "(SELECT * FROM {table_name} WHERE ticker = {i}.ticker AND {period_col} <= CURRENT_DATE - INTERVAL '{unit}') w"
            ));
        }
    }
}

fn require_column(field: &Field) -> Result<(TableRef, &'static str), CompileError> {
    match &field.source {
        FieldSource::Column { table, column } => Ok((*table, column)),
        FieldSource::Derived(_) => Err(CompileError::Internal(format!(
            "period aggregation other than 'latest' is not supported on the cross-table derived field '{}'",
            field.name
        ))),
    }
}

/// Compile the `all`/`any` aggregation modes: a correlated existence
/// check over every snapshot row in the window.
pub fn compile_exists(
    emitter: &mut SqlEmitter,
    field: &Field,
    op: Operator,
    period: &Period,
    value: &Value,
    negate_with_inverse: bool,
) -> Result<(), CompileError> {
    let (table, column) = require_column(field)?;
    let period_col = table
        .period_column()
        .ok_or_else(|| CompileError::Internal(format!("table for '{}' has no period column", field.name)))?;

    let row_op = if negate_with_inverse {
        op.invert()
            .ok_or_else(|| CompileError::UnsupportedOperator(op.as_str().to_string(), field.name.to_string()))?
    } else {
        op
    };

    emitter.raw(if negate_with_inverse { "NOT EXISTS (" } else { "EXISTS (" });
    emitter.raw("SELECT 1 FROM ");
    emit_window_source(emitter, table, period_col, period);
    emitter.raw(format!(" WHERE {column} {} ", super::predicate::comparison_sql(row_op)));
    emitter.bind(value.clone());
    emitter.raw(")");
    Ok(())
}

/// Compile the `trend` aggregation: compare the window's first and last
/// snapshot values. `op` must be one of `increasing`/`decreasing`/`stable`.
pub fn compile_trend(
    emitter: &mut SqlEmitter,
    field: &Field,
    op: Operator,
    period: &Period,
) -> Result<(), CompileError> {
    let (table, column) = require_column(field)?;
    let period_col = table
        .period_column()
        .ok_or_else(|| CompileError::Internal(format!("table for '{}' has no period column", field.name)))?;

    let cmp = match op {
        Operator::Increasing => ">",
        Operator::Decreasing => "<",
        Operator::Stable => "=",
        other => {
            return Err(CompileError::UnsupportedOperator(other.as_str().to_string(), field.name.to_string()))
        }
    };

    emitter.raw(format!(
        "(SELECT (array_agg({column} ORDER BY {period_col} DESC))[1] {cmp} (array_agg({column} ORDER BY {period_col} ASC))[1] FROM "
    ));
    emit_window_source(emitter, table, period_col, period);
    emitter.raw(")");
    Ok(())
}

/// Build the scalar sub-expression for `avg/sum/min/max/latest`
/// aggregations, recursing through a derived field's formula.
pub fn build_scalar(emitter: &mut SqlEmitter, field: &Field, period: &Period) -> Result<String, CompileError> {
    match &field.source {
        FieldSource::Column { table, column } => {
            let period_col = table.period_column().ok_or_else(|| {
                CompileError::Internal(format!("table for '{}' has no period column", field.name))
            })?;
            let agg_fn = match period.aggregation {
                Aggregation::Avg => "AVG",
                Aggregation::Sum => "SUM",
                Aggregation::Min => "MIN",
                Aggregation::Max => "MAX",
                Aggregation::Latest => "",
                other => {
                    return Err(CompileError::Internal(format!(
                        "{other:?} aggregation has no scalar form"
                    )))
                }
            };

            let mut inner = SqlEmitter::new();
            if agg_fn.is_empty() {
                inner.raw(format!("SELECT {column} FROM "));
                emit_window_source(&mut inner, *table, period_col, period);
                inner.raw(format!(" ORDER BY {period_col} DESC LIMIT 1"));
            } else {
                inner.raw(format!("SELECT {agg_fn}({column}) FROM "));
                emit_window_source(&mut inner, *table, period_col, period);
            }
            let (sql, params) = inner.finish();
            for p in params {
                emitter.bind(p);
            }
            Ok(format!("({sql})"))
        }
        FieldSource::Derived(formula) => {
            if !matches!(period.aggregation, Aggregation::Latest) {
                return Err(CompileError::Internal(format!(
                    "period aggregation other than 'latest' is not supported on the cross-table derived field '{}'",
                    field.name
                )));
            }
            let num = CATALOG
                .resolve(formula.numerator)
                .ok_or_else(|| CompileError::UnknownField(formula.numerator.to_string()))?;
            let den = CATALOG
                .resolve(formula.denominator)
                .ok_or_else(|| CompileError::UnknownField(formula.denominator.to_string()))?;
            let num_expr = build_scalar(emitter, num, period)?;
            let den_expr = build_scalar(emitter, den, period)?;
            Ok(format!("({num_expr} / NULLIF({den_expr}, 0))"))
        }
    }
}
