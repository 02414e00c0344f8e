//! Compiler error taxonomy (§7 `CompilationError`).
//!
//! Everything here should be unreachable for a tree that has passed the
//! Validator; the compiler still checks defensively rather than trusting
//! its caller, since nothing stops a future caller from skipping
//! validation.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("operator '{0}' is not valid SQL-side for field '{1}'")]
    UnsupportedOperator(String, String),

    #[error("filter nests {0} levels deep, exceeding the compiler's configured maximum of {1}")]
    NestingTooDeep(usize, usize),

    #[error("cross-field comparison references unknown field '{0}'")]
    UnknownComparisonField(String),

    #[error("internal compiler error: {0}")]
    Internal(String),
}
