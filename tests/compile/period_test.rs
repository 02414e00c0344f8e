use screener::catalog::CATALOG;
use screener::compile::compile;
use screener::config::CompilerSettings;
use screener::dsl::{Aggregation, Cond, Node, Period, PeriodType, Rule};
use serde_json::json;

fn settings() -> CompilerSettings {
    CompilerSettings { default_limit: 50, max_nesting_depth: 5 }
}

fn periodic_cond(field: &str, op: &str, value: serde_json::Value, period_type: PeriodType, n: u32, agg: Aggregation) -> Node {
    Node::Cond(Cond {
        field: field.to_string(),
        operator: op.to_string(),
        value,
        period: Some(Period { period_type, n, aggregation: agg }),
        null_handling: None,
        value_is_field: false,
    })
}

#[test]
fn all_aggregation_compiles_to_not_exists() {
    let rule = Rule {
        meta: None,
        filter: periodic_cond("pe_ratio", "<", json!(15), PeriodType::LastNQuarters, 4, Aggregation::All),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("NOT EXISTS"));
    assert!(compiled.sql_text.contains(">="), "the inverse of '<' should appear inside the NOT EXISTS");
    assert!(compiled.sql_text.contains("ORDER BY period_end DESC LIMIT"), "last_n_quarters must window by row count, not a date cutoff");
}

#[test]
fn a_single_period_window_reduces_to_exactly_the_latest_row() {
    let rule = Rule {
        meta: None,
        filter: periodic_cond("revenue", ">", json!(1e9), PeriodType::LastNQuarters, 1, Aggregation::Any),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("ORDER BY period_end DESC LIMIT"));
    assert_eq!(compiled.params[0], json!(1), "n=1 must bind a one-row window, matching 'latest' semantics");
}

#[test]
fn any_aggregation_compiles_to_exists_without_negation() {
    let rule = Rule {
        meta: None,
        filter: periodic_cond("revenue", ">", json!(1e9), PeriodType::LastNYears, 3, Aggregation::Any),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("EXISTS ("));
    assert!(!compiled.sql_text.contains("NOT EXISTS"));
}

#[test]
fn trend_aggregation_compiles_to_an_array_agg_comparison() {
    let rule = Rule {
        meta: None,
        filter: periodic_cond("revenue_growth_yoy", "increasing", serde_json::Value::Null, PeriodType::LastNQuarters, 4, Aggregation::Trend),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("array_agg"));
}

#[test]
fn avg_aggregation_compiles_to_a_scalar_subquery() {
    let rule = Rule {
        meta: None,
        filter: periodic_cond("revenue", ">", json!(1e9), PeriodType::LastNQuarters, 4, Aggregation::Avg),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("AVG(revenue)"));
}

#[test]
fn trailing_twelve_months_uses_a_fixed_interval_with_no_bound_n() {
    let rule = Rule {
        meta: None,
        filter: periodic_cond("revenue", ">", json!(1e9), PeriodType::TrailingTwelveMonths, 1, Aggregation::Any),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("INTERVAL '12 months'"));
}

#[test]
fn period_on_a_derived_field_with_a_non_latest_aggregation_is_rejected() {
    let rule = Rule {
        meta: None,
        filter: periodic_cond("debt_to_fcf", ">", json!(1.5), PeriodType::LastNQuarters, 4, Aggregation::Avg),
        sort: None,
        limit: None,
    };
    assert!(compile(&rule, &CATALOG, &settings()).is_err());
}

#[test]
fn latest_aggregation_on_a_derived_field_is_accepted() {
    let rule = Rule {
        meta: None,
        filter: periodic_cond("debt_to_fcf", ">", json!(1.5), PeriodType::LastNQuarters, 4, Aggregation::Latest),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("NULLIF"));
}
