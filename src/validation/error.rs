//! The validator's error taxonomy (§7).

use std::fmt;

/// Closed set of diagnostic kinds, in ascending severity per §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Recoverable; the query proceeds.
    Ambiguity,
    /// Unknown field/operator, bad value shape, missing required property.
    RuleValidity,
    /// Unsatisfiable constraint set.
    LogicalConflict,
    /// Period exceeds likely historical coverage.
    DataAvailability,
    /// Derived metric would require a divide-by-zero/negative guard
    /// violation, detectable at validate-time.
    MetricSafety,
}

impl ErrorKind {
    /// `Ambiguity` and `DataAvailability` are warnings; everything else
    /// blocks execution.
    pub fn is_warning(&self) -> bool {
        matches!(self, ErrorKind::Ambiguity | ErrorKind::DataAvailability)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Ambiguity => "ambiguity",
            ErrorKind::RuleValidity => "rule_validity",
            ErrorKind::LogicalConflict => "logical_conflict",
            ErrorKind::DataAvailability => "data_availability",
            ErrorKind::MetricSafety => "metric_safety",
        };
        write!(f, "{s}")
    }
}

/// One diagnostic: `{path, kind, message, suggestion?}` (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// A JSON-pointer-like dotted address, e.g. `filter.and[1].operator`.
    pub path: String,
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.kind.is_warning()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
    }
}

impl std::error::Error for Diagnostic {}
