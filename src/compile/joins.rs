//! LEFT LATERAL "latest row per instrument" joins (§4.4.1).
//!
//! Every snapshot table (fundamentals, price history, debt profile, cash
//! flow, analyst estimates) is one-row-per-snapshot; the compiler always
//! joins in the single latest row per instrument under a fixed alias, so
//! a bare (no-period) condition reads the most recent value.

use crate::catalog::TableRef;
use crate::compile::emitter::SqlEmitter;
use crate::dsl::{Cond, Node};
use std::collections::BTreeSet;

/// Collect the distinct snapshot tables a filter tree (plus an optional
/// sort field) touches, so the compiler only joins what it needs.
pub fn collect_tables(node: &Node, extra: &[TableRef]) -> BTreeSet<TableRef> {
    let mut tables = BTreeSet::new();
    walk(node, &mut tables);
    tables.extend(extra.iter().copied());
    tables
}

fn walk(node: &Node, tables: &mut BTreeSet<TableRef>) {
    match node {
        Node::And(children) | Node::Or(children) => {
            children.iter().for_each(|c| walk(c, tables));
        }
        Node::Not(child) => walk(child, tables),
        Node::Cond(cond) => {
            if let Some(table) = cond_table(cond) {
                tables.insert(table);
            }
        }
        Node::Empty => {}
    }
}

fn cond_table(cond: &Cond) -> Option<TableRef> {
    let field = crate::catalog::CATALOG.resolve(&cond.field)?;
    match &field.source {
        crate::catalog::FieldSource::Column { table, .. } => Some(*table),
        crate::catalog::FieldSource::Derived(formula) => {
            // Both sides of today's derived formulas live on the same
            // table; resolving either gives the join target.
            crate::catalog::CATALOG.resolve(formula.numerator).map(|f| f.table())
        }
    }
}

/// Emit the fixed `FROM instruments i JOIN instrument_metadata md ...`
/// head plus one `LEFT JOIN LATERAL` per table in `tables`, each pinned
/// to the latest row by `ORDER BY <order_column> DESC LIMIT 1`.
pub fn emit_from_clause(emitter: &mut SqlEmitter, tables: &BTreeSet<TableRef>) {
    emitter.raw(format!(
        "FROM {} {} JOIN {} {} ON {}.ticker = {}.ticker",
        TableRef::Instruments.table_name(),
        TableRef::Instruments.alias(),
        TableRef::Metadata.table_name(),
        TableRef::Metadata.alias(),
        TableRef::Metadata.alias(),
        TableRef::Instruments.alias(),
    ));

    for table in tables {
        if !table.needs_lateral_join() {
            continue;
        }
        emitter.raw(format!(
            " LEFT JOIN LATERAL (SELECT * FROM {} WHERE ticker = {}.ticker ORDER BY {} DESC LIMIT 1) {} ON true",
            table.table_name(),
            TableRef::Instruments.alias(),
            table.order_column(),
            table.alias(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::Cond;
    use serde_json::json;

    fn cond(field: &str) -> Node {
        Node::Cond(Cond {
            field: field.to_string(),
            operator: "<".to_string(),
            value: json!(1),
            period: None,
            null_handling: None,
            value_is_field: false,
        })
    }

    #[test]
    fn collects_distinct_tables_across_and() {
        let node = Node::And(vec![cond("pe_ratio"), cond("total_debt"), cond("revenue")]);
        let tables = collect_tables(&node, &[]);
        assert!(tables.contains(&TableRef::Fundamentals));
        assert!(tables.contains(&TableRef::DebtProfile));
    }

    #[test]
    fn emits_lateral_join_per_table() {
        let mut e = SqlEmitter::new();
        let mut tables = BTreeSet::new();
        tables.insert(TableRef::Fundamentals);
        emit_from_clause(&mut e, &tables);
        let (sql, _) = e.finish();
        assert!(sql.contains("LEFT JOIN LATERAL"));
        assert!(sql.contains("fundamentals"));
        assert!(sql.contains("ORDER BY id DESC LIMIT 1"));
    }
}
