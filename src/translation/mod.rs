//! The Translator (§4.1): turns free-form natural language into a best-
//! effort [`Rule`]. Never rejects input — a phrase it can't place becomes
//! a dropped clause, and a sentence it understands nothing of becomes
//! [`Rule::empty`].

use crate::catalog::{Field, FieldCatalog, FieldKind, Operator, Scale};
use crate::dsl::{Cond, Node, NullHandling, Period, PeriodType, Rule, Aggregation};
use chrono::{Duration, Utc};
use serde_json::Value;

/// Translate `text` into a best-effort rule against `catalog`.
pub fn translate(text: &str, catalog: &FieldCatalog) -> Rule {
    let normalized = text.to_lowercase();
    let (clauses, joiner) = split_clauses(&normalized);

    let conditions: Vec<Node> = clauses
        .iter()
        .filter_map(|clause| translate_clause(clause.trim(), catalog))
        .collect();

    let filter = match conditions.len() {
        0 => Node::Empty,
        1 => conditions.into_iter().next().unwrap(),
        _ => match joiner {
            Joiner::Or => Node::Or(conditions),
            Joiner::And => Node::And(conditions),
        },
    };

    Rule { meta: None, filter, sort: None, limit: None }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    And,
    Or,
}

/// Split on top-level "and"/"or", protecting "between X and Y" phrases
/// from being split on their internal "and" (§4.1 step 4).
fn split_clauses(text: &str) -> (Vec<String>, Joiner) {
    const GUARD: &str = "\u{0}AND\u{0}";
    let protected = {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find("between") {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            // Protect only the first " and " after "between" — the one
            // joining the two range bounds.
            if let Some(and_pos) = tail.find(" and ") {
                out.push_str(&tail[..and_pos]);
                out.push_str(GUARD);
                rest = &tail[and_pos + 5..];
            } else {
                out.push_str(tail);
                rest = "";
                break;
            }
        }
        out.push_str(rest);
        out
    };

    let has_or = protected.contains(" or ");
    let joiner = if has_or { Joiner::Or } else { Joiner::And };
    let sep = if has_or { " or " } else { " and " };

    let clauses = protected
        .split(sep)
        .map(|s| s.replace(GUARD, " and "))
        .collect();
    (clauses, joiner)
}

fn translate_clause(clause: &str, catalog: &FieldCatalog) -> Option<Node> {
    if let Some(node) = translate_event_clause(clause, catalog) {
        return Some(node);
    }
    if let Some(node) = translate_cross_field_clause(clause, catalog) {
        return Some(node);
    }
    if let Some(node) = translate_growth_clause(clause, catalog) {
        return Some(node);
    }
    translate_comparison_clause(clause, catalog)
}

/// "earnings in the next 30 days", "buyback announced within 90 days".
fn translate_event_clause(clause: &str, catalog: &FieldCatalog) -> Option<Node> {
    let within_days = extract_within_days(clause)?;
    let field = catalog.resolve_alias(clause)?;
    if field.kind != FieldKind::Date {
        return None;
    }
    let today = Utc::now().date_naive();
    let until = today + Duration::days(within_days as i64);
    Some(Node::Cond(Cond {
        field: field.name.to_string(),
        operator: "between".to_string(),
        value: Value::Array(vec![
            Value::String(today.to_string()),
            Value::String(until.to_string()),
        ]),
        period: None,
        null_handling: Some(NullHandling::Exclude),
        value_is_field: false,
    }))
}

fn extract_within_days(clause: &str) -> Option<u32> {
    let markers = ["in the next", "within the next", "within"];
    for marker in markers {
        if let Some(pos) = clause.find(marker) {
            let rest = &clause[pos + marker.len()..];
            let digits: String = rest.trim_start().chars().take_while(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                return digits.parse().ok();
            }
        }
    }
    None
}

/// "price below price target", "price above analyst target".
fn translate_cross_field_clause(clause: &str, catalog: &FieldCatalog) -> Option<Node> {
    let (op_str, op) = find_operator_phrase(clause)?;
    let (lhs_phrase, rhs_phrase) = split_once_on(clause, op_str)?;
    let lhs = catalog.resolve_alias(lhs_phrase.trim())?;
    let rhs = catalog.resolve_alias(rhs_phrase.trim())?;
    if lhs.name == rhs.name || lhs.kind != rhs.kind {
        return None;
    }
    // Distinguish from a literal-value comparison: the right-hand phrase
    // must resolve to a field and must NOT itself contain a bare number.
    if rhs_phrase.trim().chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(Node::Cond(Cond {
        field: lhs.name.to_string(),
        operator: op.as_str().to_string(),
        value: Value::String(rhs.name.to_string()),
        period: None,
        null_handling: None,
        value_is_field: true,
    }))
}

/// "revenue is increasing", "growing net income", "declining free cash flow".
fn translate_growth_clause(clause: &str, catalog: &FieldCatalog) -> Option<Node> {
    let (marker, trend_op) = [
        ("increasing", Operator::Increasing),
        ("growing", Operator::Increasing),
        ("decreasing", Operator::Decreasing),
        ("declining", Operator::Decreasing),
        ("falling", Operator::Decreasing),
        ("stable", Operator::Stable),
        ("flat", Operator::Stable),
    ]
    .into_iter()
    .find(|(m, _)| clause.contains(m))?;

    let field_phrase = clause.replace(marker, "").replace("is", "");
    let base = catalog.resolve_alias(field_phrase.trim())?;
    let field = catalog.growth_sibling(base.name).unwrap_or(base);

    Some(Node::Cond(Cond {
        field: field.name.to_string(),
        operator: trend_op.as_str().to_string(),
        value: Value::Null,
        period: Some(Period {
            period_type: PeriodType::LastNQuarters,
            n: 4,
            aggregation: Aggregation::Trend,
        }),
        null_handling: None,
        value_is_field: false,
    }))
}

const OPERATOR_PHRASES: &[(&str, Operator)] = &[
    ("at least", Operator::Ge),
    ("at most", Operator::Le),
    ("greater than or equal to", Operator::Ge),
    ("less than or equal to", Operator::Le),
    ("greater than", Operator::Gt),
    ("more than", Operator::Gt),
    ("above", Operator::Gt),
    ("over", Operator::Gt),
    ("less than", Operator::Lt),
    ("under", Operator::Lt),
    ("below", Operator::Lt),
    ("not equal to", Operator::Ne),
    ("equal to", Operator::Eq),
    ("equals", Operator::Eq),
    ("is", Operator::Eq),
];

fn find_operator_phrase(clause: &str) -> Option<(&'static str, Operator)> {
    OPERATOR_PHRASES.iter().find(|(phrase, _)| clause.contains(phrase)).map(|(p, op)| (*p, *op))
}

fn split_once_on<'a>(clause: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    clause.split_once(marker)
}

/// "market cap above 10 billion", "pe ratio between 10 and 20",
/// "dividend yield at least 3%".
fn translate_comparison_clause(clause: &str, catalog: &FieldCatalog) -> Option<Node> {
    if clause.contains("between") {
        return translate_between_clause(clause, catalog);
    }
    if let Some(field_phrase) = clause.strip_prefix("not ").map(str::trim) {
        if let Some((phrase, list)) = extract_membership(field_phrase, "in") {
            return build_membership(catalog, phrase, list, true);
        }
    }
    if let Some((phrase, list)) = extract_membership(clause, "in") {
        return build_membership(catalog, phrase, list, false);
    }

    let (phrase, op) = find_operator_phrase(clause)?;
    let (field_phrase, value_phrase) = split_once_on(clause, phrase)?;
    let field = catalog.resolve_alias(field_phrase.trim())?;
    let value = parse_value(value_phrase.trim(), field)?;
    Some(Node::Cond(Cond {
        field: field.name.to_string(),
        operator: op.as_str().to_string(),
        value,
        period: None,
        null_handling: None,
        value_is_field: false,
    }))
}

fn translate_between_clause(clause: &str, catalog: &FieldCatalog) -> Option<Node> {
    let pos = clause.find("between")?;
    let (field_phrase, rest) = clause.split_at(pos);
    let rest = rest.trim_start_matches("between").trim();
    let (lo_str, hi_str) = rest.split_once(" and ")?;
    let field = catalog.resolve_alias(field_phrase.trim())?;
    let lo = parse_value(lo_str.trim(), field)?;
    let hi = parse_value(hi_str.trim(), field)?;
    Some(Node::Cond(Cond {
        field: field.name.to_string(),
        operator: "between".to_string(),
        value: Value::Array(vec![lo, hi]),
        period: None,
        null_handling: None,
        value_is_field: false,
    }))
}

/// "sector in technology, healthcare" (comma-separated membership list).
fn extract_membership<'a>(clause: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    let needle = format!(" {marker} ");
    let pos = clause.find(&needle)?;
    Some((&clause[..pos], &clause[pos + needle.len()..]))
}

fn build_membership(catalog: &FieldCatalog, field_phrase: &str, list: &str, negate: bool) -> Option<Node> {
    let field = catalog.resolve_alias(field_phrase.trim())?;
    let items: Vec<Value> = list.split(',').map(|s| Value::String(s.trim().to_string())).collect();
    if items.is_empty() {
        return None;
    }
    Some(Node::Cond(Cond {
        field: field.name.to_string(),
        operator: if negate { "not_in" } else { "in" }.to_string(),
        value: Value::Array(items),
        period: None,
        null_handling: None,
        value_is_field: false,
    }))
}

/// Parse a numeric phrase with optional scale words (crore, lakh,
/// thousand, million, billion, trillion) and a trailing `%`, rescaling
/// percent-like values down to the fraction the field's catalog entry
/// expects (§4.1 step 5).
fn parse_value(phrase: &str, field: &Field) -> Option<Value> {
    if field.kind == FieldKind::String || field.kind == FieldKind::Boolean {
        return Some(Value::String(phrase.trim_matches('"').to_string()));
    }

    let phrase = phrase.trim();
    let is_percent = phrase.ends_with('%');
    let phrase = phrase.trim_end_matches('%').trim();

    let (number_part, multiplier) = strip_scale_word(phrase);
    let mut n: f64 = number_part.trim().parse().ok()?;
    n *= multiplier;

    if field.kind == FieldKind::Percentage && field.scale == Scale::Fraction && (is_percent || n.abs() > 1.0) {
        n /= 100.0;
    }

    Some(serde_json::json!(n))
}

fn strip_scale_word(phrase: &str) -> (&str, f64) {
    const SCALES: &[(&str, f64)] = &[
        ("trillion", 1e12),
        ("billion", 1e9),
        ("crore", 1e7),
        ("million", 1e6),
        ("lakh", 1e5),
        ("thousand", 1e3),
    ];
    for (word, scale) in SCALES {
        if let Some(stripped) = phrase.strip_suffix(word) {
            return (stripped.trim(), *scale);
        }
    }
    (phrase, 1.0)
}
