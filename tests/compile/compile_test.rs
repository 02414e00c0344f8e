use screener::catalog::CATALOG;
use screener::compile::compile;
use screener::config::CompilerSettings;
use screener::dsl::{Cond, Node, Rule, Sort, SortOrder};
use serde_json::json;

fn settings() -> CompilerSettings {
    CompilerSettings { default_limit: 50, max_nesting_depth: 5 }
}

fn cond(field: &str, op: &str, value: serde_json::Value) -> Node {
    Node::Cond(Cond {
        field: field.to_string(),
        operator: op.to_string(),
        value,
        period: None,
        null_handling: None,
        value_is_field: false,
    })
}

#[test]
fn compiled_sql_never_contains_a_raw_string_literal() {
    let rule = Rule {
        meta: None,
        filter: Node::Or(vec![cond("sector", "=", json!("technology")), cond("exchange", "=", json!("NASDAQ"))]),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(!compiled.sql_text.contains('\''));
    assert_eq!(compiled.params.len(), 3, "two condition values plus the limit");
}

#[test]
fn cross_field_comparison_expands_both_sides_and_binds_nothing() {
    let rule = Rule {
        meta: None,
        filter: Node::Cond(Cond {
            field: "price".to_string(),
            operator: "<".to_string(),
            value: json!("price_target_avg"),
            period: None,
            null_handling: None,
            value_is_field: true,
        }),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("ph.close"));
    assert!(compiled.sql_text.contains("ae.price_target_avg"));
    assert_eq!(compiled.params.len(), 1, "only the limit is bound");
}

#[test]
fn derived_field_expands_to_a_guarded_ratio() {
    let rule = Rule { meta: None, filter: cond("debt_to_fcf", ">", json!(1.5)), sort: None, limit: None };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("NULLIF"));
    assert!(compiled.sql_text.contains("total_debt"));
    assert!(compiled.sql_text.contains("free_cash_flow"));
    assert!(compiled.sql_text.contains("IS NOT NULL"), "both sides must skip a null latest snapshot");
}

#[test]
fn membership_operators_compile_to_any_and_all() {
    let rule = Rule {
        meta: None,
        filter: cond("sector", "in", json!(["technology", "healthcare"])),
        sort: None,
        limit: None,
    };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert!(compiled.sql_text.contains("= ANY("));
}

#[test]
fn unknown_sort_field_is_rejected() {
    let rule = Rule {
        meta: None,
        filter: Node::Empty,
        sort: Some(Sort { field: "not_a_field".to_string(), order: SortOrder::Desc }),
        limit: None,
    };
    assert!(compile(&rule, &CATALOG, &settings()).is_err());
}

#[test]
fn default_limit_is_used_when_the_rule_does_not_specify_one() {
    let rule = Rule { meta: None, filter: Node::Empty, sort: None, limit: None };
    let compiled = compile(&rule, &CATALOG, &settings()).unwrap();
    assert_eq!(*compiled.params.last().unwrap(), json!(50));
}

#[test]
fn nesting_beyond_the_configured_maximum_is_rejected() {
    let mut filter = cond("pe_ratio", "<", json!(15));
    for _ in 0..10 {
        filter = Node::And(vec![filter]);
    }
    let rule = Rule { meta: None, filter, sort: None, limit: None };
    assert!(compile(&rule, &CATALOG, &settings()).is_err());
}
