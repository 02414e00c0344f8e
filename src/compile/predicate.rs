//! Predicate compilation: walks a (validated, normalized) [`Node`] tree
//! and emits a boolean SQL expression plus its bound parameters.

use crate::catalog::{Field, FieldSource, Operator, CATALOG};
use crate::compile::emitter::SqlEmitter;
use crate::compile::error::CompileError;
use crate::compile::period;
use crate::dsl::{Aggregation, Cond, Node};

pub fn compile_node(node: &Node, emitter: &mut SqlEmitter) -> Result<(), CompileError> {
    match node {
        Node::And(children) => compile_junction(children, "AND", emitter),
        Node::Or(children) => compile_junction(children, "OR", emitter),
        Node::Not(child) => {
            emitter.raw("NOT (");
            compile_node(child, emitter)?;
            emitter.raw(")");
            Ok(())
        }
        Node::Cond(cond) => compile_cond(cond, emitter),
        // The degenerate empty filter compiles to a tautology (§3.2).
        Node::Empty => {
            emitter.raw("1 = 1");
            Ok(())
        }
    }
}

fn compile_junction(children: &[Node], joiner: &str, emitter: &mut SqlEmitter) -> Result<(), CompileError> {
    emitter.raw("(");
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            emitter.raw(format!(" {joiner} "));
        }
        compile_node(child, emitter)?;
    }
    emitter.raw(")");
    Ok(())
}

/// The operator's SQL spelling (`!=` becomes Postgres's preferred `<>`).
pub(crate) fn comparison_sql(op: Operator) -> &'static str {
    match op {
        Operator::Lt => "<",
        Operator::Gt => ">",
        Operator::Le => "<=",
        Operator::Ge => ">=",
        Operator::Eq => "=",
        Operator::Ne => "<>",
        _ => unreachable!("comparison_sql called with a non-scalar operator"),
    }
}

/// The fully-expanded SQL expression for a field's current (latest)
/// value — a plain `alias.column` for a stored column, or the ratio
/// expression for a derived metric (§4.4.6: derived fields are always
/// expanded, never referenced as a raw column).
pub(crate) fn expr_for_field(field: &Field) -> Result<String, CompileError> {
    match &field.source {
        FieldSource::Column { table, column } => Ok(format!("{}.{}", table.alias(), column)),
        FieldSource::Derived(formula) => {
            let num = CATALOG
                .resolve(formula.numerator)
                .ok_or_else(|| CompileError::UnknownField(formula.numerator.to_string()))?;
            let den = CATALOG
                .resolve(formula.denominator)
                .ok_or_else(|| CompileError::UnknownField(formula.denominator.to_string()))?;
            Ok(format!("({} / NULLIF({}, 0))", expr_for_field(num)?, expr_for_field(den)?))
        }
    }
}

fn compile_cond(cond: &Cond, emitter: &mut SqlEmitter) -> Result<(), CompileError> {
    let field = CATALOG
        .resolve(&cond.field)
        .ok_or_else(|| CompileError::UnknownField(cond.field.clone()))?;
    let op = Operator::from_str(&cond.operator)
        .ok_or_else(|| CompileError::UnsupportedOperator(cond.operator.clone(), field.name.to_string()))?;

    if cond.value_is_field {
        return compile_cross_field(field, op, cond, emitter);
    }

    if let Some(period) = &cond.period {
        return compile_periodic_cond(field, op, period, cond, emitter);
    }

    let lhs = latest_non_null_expr(field)?;
    compile_scalar_comparison(&lhs, op, &cond.value, emitter)
}

/// The SQL expression for a field's latest *non-null* value (§4.4.3: a
/// bare, non-periodic comparison against a time-series column must not
/// silently read a null from the "latest row" LATERAL when an older row
/// has data). Stored time-series columns expand to a correlated
/// subquery that skips nulls; everything else (identity/metadata
/// columns, which are joined plainly rather than via a LATERAL) is a
/// direct column reference, and a derived metric recurses into the same
/// non-null expansion on both sides of its ratio.
fn latest_non_null_expr(field: &Field) -> Result<String, CompileError> {
    match &field.source {
        FieldSource::Column { table, column } => {
            if field.time_series {
                Ok(format!(
                    "(SELECT {column} FROM {} WHERE ticker = {}.ticker AND {column} IS NOT NULL ORDER BY {} DESC LIMIT 1)",
                    table.table_name(),
                    crate::catalog::TableRef::Instruments.alias(),
                    table.order_column(),
                ))
            } else {
                Ok(format!("{}.{}", table.alias(), column))
            }
        }
        FieldSource::Derived(formula) => {
            let num = CATALOG
                .resolve(formula.numerator)
                .ok_or_else(|| CompileError::UnknownField(formula.numerator.to_string()))?;
            let den = CATALOG
                .resolve(formula.denominator)
                .ok_or_else(|| CompileError::UnknownField(formula.denominator.to_string()))?;
            Ok(format!("({} / NULLIF({}, 0))", latest_non_null_expr(num)?, latest_non_null_expr(den)?))
        }
    }
}

fn compile_cross_field(field: &Field, op: Operator, cond: &Cond, emitter: &mut SqlEmitter) -> Result<(), CompileError> {
    let other_name = cond
        .value
        .as_str()
        .ok_or_else(|| CompileError::Internal("value_is_field condition without a string value".to_string()))?;
    let other = CATALOG
        .resolve(other_name)
        .or_else(|| CATALOG.resolve_alias(other_name))
        .ok_or_else(|| CompileError::UnknownComparisonField(other_name.to_string()))?;

    let lhs = expr_for_field(field)?;
    let rhs = expr_for_field(other)?;
    emitter.raw(format!("{lhs} {} {rhs}", comparison_sql(op)));
    Ok(())
}

fn compile_periodic_cond(
    field: &Field,
    op: Operator,
    period_spec: &crate::dsl::Period,
    cond: &Cond,
    emitter: &mut SqlEmitter,
) -> Result<(), CompileError> {
    match period_spec.aggregation {
        Aggregation::All => period::compile_exists(emitter, field, op, period_spec, &cond.value, true),
        Aggregation::Any => period::compile_exists(emitter, field, op, period_spec, &cond.value, false),
        Aggregation::Trend => period::compile_trend(emitter, field, op, period_spec),
        Aggregation::Avg | Aggregation::Sum | Aggregation::Min | Aggregation::Max | Aggregation::Latest => {
            let lhs = period::build_scalar(emitter, field, period_spec)?;
            compile_scalar_comparison(&lhs, op, &cond.value, emitter)
        }
    }
}

fn compile_scalar_comparison(
    lhs: &str,
    op: Operator,
    value: &serde_json::Value,
    emitter: &mut SqlEmitter,
) -> Result<(), CompileError> {
    match op {
        Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge | Operator::Eq | Operator::Ne => {
            emitter.raw(format!("{lhs} {} ", comparison_sql(op)));
            emitter.bind(value.clone());
        }
        Operator::Between => {
            let arr = value
                .as_array()
                .ok_or_else(|| CompileError::Internal("between requires a 2-element array".to_string()))?;
            emitter.raw(format!("{lhs} BETWEEN "));
            emitter.bind(arr[0].clone());
            emitter.raw(" AND ");
            emitter.bind(arr[1].clone());
        }
        Operator::In => {
            emitter.raw(format!("{lhs} = ANY("));
            emitter.bind(value.clone());
            emitter.raw(")");
        }
        Operator::NotIn => {
            emitter.raw(format!("{lhs} <> ALL("));
            emitter.bind(value.clone());
            emitter.raw(")");
        }
        Operator::Exists => {
            let present = value.as_bool().unwrap_or(true);
            emitter.raw(format!("{lhs} IS {}NULL", if present { "NOT " } else { "" }));
        }
        Operator::Increasing | Operator::Decreasing | Operator::Stable => {
            return Err(CompileError::Internal(
                "trend operators require a period and are handled by compile_periodic_cond".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::Cond;
    use serde_json::json;

    fn cond(field: &str, op: &str, value: serde_json::Value) -> Cond {
        Cond {
            field: field.to_string(),
            operator: op.to_string(),
            value,
            period: None,
            null_handling: None,
            value_is_field: false,
        }
    }

    #[test]
    fn scalar_condition_binds_one_param() {
        let mut e = SqlEmitter::new();
        compile_cond(&cond("market_cap", ">", json!(1_000_000_000.0)), &mut e).unwrap();
        let (sql, params) = e.finish();
        assert_eq!(sql, "i.market_cap > $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn between_binds_two_params_in_order() {
        let mut e = SqlEmitter::new();
        compile_cond(&cond("pe_ratio", "between", json!([10, 20])), &mut e).unwrap();
        let (sql, params) = e.finish();
        assert_eq!(
            sql,
            "(SELECT pe_ratio FROM fundamentals WHERE ticker = i.ticker AND pe_ratio IS NOT NULL ORDER BY id DESC LIMIT 1) BETWEEN $1 AND $2"
        );
        assert_eq!(params, vec![json!(10), json!(20)]);
    }

    #[test]
    fn scalar_comparison_on_a_time_series_field_skips_a_null_latest_row() {
        let mut e = SqlEmitter::new();
        compile_cond(&cond("revenue", ">", json!(1e9)), &mut e).unwrap();
        let (sql, _) = e.finish();
        assert!(sql.contains("IS NOT NULL"));
        assert!(sql.contains("ORDER BY id DESC LIMIT 1"));
        assert!(!sql.contains("fq.revenue"), "must not read straight off the possibly-null latest lateral row");
    }

    #[test]
    fn derived_field_expands_to_ratio_never_a_raw_column_ref() {
        let mut e = SqlEmitter::new();
        compile_cond(&cond("debt_to_fcf", ">", json!(2.0)), &mut e).unwrap();
        let (sql, _) = e.finish();
        assert!(sql.contains("NULLIF"));
        assert!(sql.contains("total_debt"));
        assert!(sql.contains("free_cash_flow"));
        assert!(sql.contains("debt_profile"));
        assert!(sql.contains("cash_flow"));
        assert!(!sql.contains("dp.total_debt"), "must read the latest non-null debt snapshot, not the bare lateral row");
    }

    #[test]
    fn and_node_joins_children_with_parens() {
        let node = Node::And(vec![
            Node::Cond(cond("market_cap", ">", json!(1e9))),
            Node::Cond(cond("pe_ratio", "<", json!(15))),
        ]);
        let mut e = SqlEmitter::new();
        compile_node(&node, &mut e).unwrap();
        let (sql, params) = e.finish();
        assert!(sql.starts_with("(i.market_cap > $1 AND (SELECT pe_ratio FROM fundamentals"));
        assert!(sql.ends_with("< $2)"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn all_aggregation_compiles_to_not_exists_with_inverted_operator() {
        let mut e = SqlEmitter::new();
        let c = Cond {
            field: "pe_ratio".to_string(),
            operator: "<".to_string(),
            value: json!(15),
            period: Some(crate::dsl::Period {
                period_type: crate::dsl::PeriodType::LastNQuarters,
                n: 4,
                aggregation: Aggregation::All,
            }),
            null_handling: None,
            value_is_field: false,
        };
        compile_cond(&c, &mut e).unwrap();
        let (sql, params) = e.finish();
        assert!(sql.starts_with("NOT EXISTS"));
        assert!(sql.contains(">="), "inverted '<' should become '>='");
        assert_eq!(params.len(), 2, "window count + comparison value");
    }
}
