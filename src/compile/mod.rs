//! The Compiler (§4.4): turns a validated, normalized [`crate::dsl::Rule`]
//! into parameterized Postgres SQL. Pure and stateless — every call
//! starts a fresh [`emitter::SqlEmitter`] and touches no shared state.

mod emitter;
mod error;
mod joins;
mod period;
mod predicate;
mod projection;

pub use emitter::SqlEmitter;
pub use error::CompileError;

use crate::catalog::{FieldCatalog, TableRef};
use crate::config::CompilerSettings;
use crate::dsl::{Rule, SortOrder};
use serde_json::Value;

/// A compiled screen: SQL text with numbered placeholders, the
/// parameters bound to them in order (§4.4.6 safety properties —
/// `params.len()` always matches the placeholder count, and `sql_text`
/// never contains a user-supplied literal), and the set of tables the
/// query touches (§4.4, the compiler's `(sql, params, required_tables)`
/// output contract) — every lateral-joined snapshot table the filter or
/// sort reference, plus the instrument identity/metadata tables and
/// price history, which are always joined regardless of the filter.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql_text: String,
    pub params: Vec<Value>,
    pub required_tables: Vec<TableRef>,
}

/// Compile `rule` against `catalog` using `settings` for the default
/// limit and nesting cap. `rule` is expected to already have passed
/// [`crate::validation::validate`]; this still checks defensively since
/// nothing enforces that at the type level.
pub fn compile(rule: &Rule, catalog: &FieldCatalog, settings: &CompilerSettings) -> Result<CompiledQuery, CompileError> {
    let depth = rule.filter.depth();
    if depth > settings.max_nesting_depth {
        return Err(CompileError::NestingTooDeep(depth, settings.max_nesting_depth));
    }

    let sort_table = match &rule.sort {
        Some(sort) => {
            let field = catalog
                .resolve(&sort.field)
                .ok_or_else(|| CompileError::UnknownField(sort.field.clone()))?;
            Some(field.table())
        }
        None => None,
    };
    let extra: Vec<TableRef> = sort_table.into_iter().collect();
    let mut tables = joins::collect_tables(&rule.filter, &extra);

    // Every table this query actually depends on: whatever the filter or
    // sort touched, plus the tables that are always joined regardless.
    let mut required_tables: Vec<TableRef> = tables.iter().copied().collect();
    required_tables.extend([TableRef::PriceHistory, TableRef::Instruments, TableRef::Metadata]);
    required_tables.sort();
    required_tables.dedup();

    // Price is always joined via the dedicated projection lateral.
    tables.remove(&TableRef::PriceHistory);

    let mut emitter = SqlEmitter::new();
    projection::emit_select(&mut emitter);
    joins::emit_from_clause(&mut emitter, &tables);
    emitter.raw(" ");
    projection::emit_price_join(&mut emitter);
    emitter.raw("WHERE ");
    predicate::compile_node(&rule.filter, &mut emitter)?;

    if let Some(sort) = &rule.sort {
        let field = catalog
            .resolve(&sort.field)
            .ok_or_else(|| CompileError::UnknownField(sort.field.clone()))?;
        let expr = predicate::expr_for_field(field)?;
        let order = match sort.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        emitter.raw(format!(" ORDER BY {expr} {order}"));
    }

    let limit = rule.limit.unwrap_or(settings.default_limit);
    emitter.raw(" LIMIT ");
    emitter.bind(Value::from(limit));

    let (sql_text, params) = emitter.finish();
    Ok(CompiledQuery { sql_text, params, required_tables })
}
