//! Crate-wide error aggregation, used at the HTTP boundary and in the
//! binaries where a single `Result` alias is more convenient than naming
//! every module's error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenerError {
    #[error("rule failed validation: {0:?}")]
    Validation(Vec<crate::validation::Diagnostic>),

    #[error(transparent)]
    Compile(#[from] crate::compile::CompileError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error(transparent)]
    Evaluator(#[from] crate::alerts::EvaluatorError),

    #[error(transparent)]
    Settings(#[from] crate::config::SettingsError),

    #[error("invalid DSL JSON: {0}")]
    InvalidDsl(#[from] crate::dsl::NodeDecodeError),
}

pub type ScreenerResult<T> = Result<T, ScreenerError>;
