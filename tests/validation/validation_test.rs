use screener::catalog::CATALOG;
use screener::dsl::{Aggregation, Cond, Node, Period, PeriodType, Rule};
use screener::validation::{validate, ErrorKind, ValidatorSettings};
use serde_json::json;

fn cond(field: &str, operator: &str, value: serde_json::Value) -> Node {
    Node::Cond(Cond {
        field: field.to_string(),
        operator: operator.to_string(),
        value,
        period: None,
        null_handling: None,
        value_is_field: false,
    })
}

fn settings() -> ValidatorSettings {
    ValidatorSettings::default()
}

#[test]
fn valid_rule_passes_with_no_warnings() {
    let rule = Rule {
        meta: None,
        filter: Node::And(vec![cond("market_cap", ">", json!(1e9)), cond("pe_ratio", "<", json!(15))]),
        sort: None,
        limit: Some(25),
    };
    let validated = validate(rule, &CATALOG, &settings()).unwrap();
    assert!(validated.warnings.is_empty());
}

#[test]
fn unknown_field_is_rejected() {
    let rule = Rule { meta: None, filter: cond("not_a_real_field", ">", json!(1)), sort: None, limit: None };
    let diagnostics = validate(rule, &CATALOG, &settings()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.kind == ErrorKind::RuleValidity));
}

#[test]
fn alias_is_rewritten_to_the_canonical_field_name() {
    let rule = Rule { meta: None, filter: cond("mcap", ">", json!(1e9)), sort: None, limit: None };
    let validated = validate(rule, &CATALOG, &settings()).unwrap();
    let Node::Cond(c) = validated.rule.filter else { panic!("expected a single condition") };
    assert_eq!(c.field, "market_cap");
}

#[test]
fn legacy_above_below_spellings_are_canonicalized() {
    let rule = Rule { meta: None, filter: cond("market_cap", "above", json!(1e9)), sort: None, limit: None };
    let validated = validate(rule, &CATALOG, &settings()).unwrap();
    let Node::Cond(c) = validated.rule.filter else { panic!("expected a single condition") };
    assert_eq!(c.operator, ">");
}

#[test]
fn conflicting_bounds_on_the_same_field_raise_a_logical_conflict() {
    let rule = Rule {
        meta: None,
        filter: Node::And(vec![cond("market_cap", ">", json!(2e9)), cond("market_cap", "<", json!(1e9))]),
        sort: None,
        limit: None,
    };
    let diagnostics = validate(rule, &CATALOG, &settings()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.kind == ErrorKind::LogicalConflict));
}

#[test]
fn time_series_field_without_a_period_warns_but_does_not_block() {
    let rule = Rule { meta: None, filter: cond("pe_ratio", "<", json!(15)), sort: None, limit: None };
    let validated = validate(rule, &CATALOG, &settings()).unwrap();
    assert!(validated.warnings.iter().any(|w| w.kind == ErrorKind::Ambiguity));
}

#[test]
fn strict_mode_promotes_warnings_to_blocking() {
    let rule = Rule { meta: None, filter: cond("pe_ratio", "<", json!(15)), sort: None, limit: None };
    let strict = ValidatorSettings { strict_mode: true, ..settings() };
    let result = validate(rule, &CATALOG, &strict);
    assert!(result.is_err());
}

#[test]
fn trend_operator_without_a_period_is_rejected() {
    let rule = Rule { meta: None, filter: cond("revenue_growth_yoy", "increasing", serde_json::Value::Null), sort: None, limit: None };
    let diagnostics = validate(rule, &CATALOG, &settings()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.kind == ErrorKind::RuleValidity));
}

#[test]
fn trend_with_a_single_period_count_is_rejected() {
    let rule = Rule {
        meta: None,
        filter: Node::Cond(Cond {
            field: "revenue_growth_yoy".to_string(),
            operator: "increasing".to_string(),
            value: serde_json::Value::Null,
            period: Some(Period { period_type: PeriodType::LastNQuarters, n: 1, aggregation: Aggregation::Trend }),
            null_handling: None,
            value_is_field: false,
        }),
        sort: None,
        limit: None,
    };
    let diagnostics = validate(rule, &CATALOG, &settings()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.kind == ErrorKind::RuleValidity));
}

#[test]
fn percent_literal_entered_as_a_whole_number_is_rescaled_to_a_fraction() {
    let rule = Rule { meta: None, filter: cond("dividend_yield", ">", json!(3)), sort: None, limit: None };
    let validated = validate(rule, &CATALOG, &settings()).unwrap();
    let Node::Cond(c) = validated.rule.filter else { panic!("expected a single condition") };
    assert!((c.value.as_f64().unwrap() - 0.03).abs() < 1e-9);
}

#[test]
fn between_with_an_inverted_range_is_rejected() {
    let rule = Rule { meta: None, filter: cond("pe_ratio", "between", json!([20, 10])), sort: None, limit: None };
    let diagnostics = validate(rule, &CATALOG, &settings()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.kind == ErrorKind::RuleValidity));
}

#[test]
fn limit_outside_the_configured_range_is_rejected() {
    let rule = Rule { meta: None, filter: Node::Empty, sort: None, limit: Some(0) };
    let diagnostics = validate(rule, &CATALOG, &settings()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.kind == ErrorKind::RuleValidity));
}

#[test]
fn unsatisfiable_nesting_depth_is_rejected() {
    let mut filter = cond("pe_ratio", "<", json!(15));
    for _ in 0..10 {
        filter = Node::And(vec![filter]);
    }
    let rule = Rule { meta: None, filter, sort: None, limit: None };
    let diagnostics = validate(rule, &CATALOG, &settings()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.kind == ErrorKind::RuleValidity));
}
