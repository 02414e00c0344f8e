//! The DSL tree (§3.2): created by the Translator or API input, mutated
//! only by the Validator for normalization, frozen before the Compiler
//! consumes it, discarded per request.

pub mod ast;

pub use ast::{
    Aggregation, Cond, Node, NodeDecodeError, NullHandling, Period, PeriodType, Rule, Sort,
    SortOrder, DEFAULT_MAX_NESTING_DEPTH,
};

/// Parse a DSL tree from raw wire JSON (§6.2). This only checks the JSON
/// shape described in §3.2 (exactly one of and/or/not, non-empty arrays,
/// condition field presence) — it performs none of the semantic checks
/// the Validator owns (§4.3).
pub fn parse(json: &serde_json::Value) -> Result<Rule, NodeDecodeError> {
    serde_json::from_value(json.clone()).map_err(|e| NodeDecodeError(e.to_string()))
}
