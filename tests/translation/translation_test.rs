use screener::catalog::CATALOG;
use screener::dsl::Node;
use screener::translation::translate;

#[test]
fn translates_a_conjunction_of_two_scalar_comparisons() {
    let rule = translate("market cap above 10 billion and pe ratio below 20", &CATALOG);
    match rule.filter {
        Node::And(children) => assert_eq!(children.len(), 2),
        other => panic!("expected an And node, got {other:?}"),
    }
}

#[test]
fn translates_a_disjunction() {
    let rule = translate("sector is technology or sector is healthcare", &CATALOG);
    match rule.filter {
        Node::Or(children) => assert_eq!(children.len(), 2),
        other => panic!("expected an Or node, got {other:?}"),
    }
}

#[test]
fn resolves_aliases_to_canonical_field_names() {
    let rule = translate("market capitalization over 5 billion", &CATALOG);
    let Node::Cond(cond) = rule.filter else { panic!("expected a single condition") };
    assert_eq!(cond.field, "market_cap");
    assert_eq!(cond.value, serde_json::json!(5e9));
}

#[test]
fn single_clause_yields_a_bare_cond_not_a_junction() {
    let rule = translate("dividend yield at least 3%", &CATALOG);
    assert!(matches!(rule.filter, Node::Cond(_)));
}

#[test]
fn unparseable_text_yields_the_empty_rule() {
    let rule = translate("what is the weather like today", &CATALOG);
    assert_eq!(rule.filter, Node::Empty);
}

#[test]
fn between_clause_survives_the_and_splitter() {
    let rule = translate("pe ratio between 10 and 20", &CATALOG);
    let Node::Cond(cond) = rule.filter else { panic!("expected a single between condition") };
    assert_eq!(cond.operator, "between");
    assert_eq!(cond.value, serde_json::json!([10.0, 20.0]));
}
