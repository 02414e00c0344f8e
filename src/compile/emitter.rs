//! The SQL emitter (§9 design note): a small accumulator of SQL text
//! fragments and bound parameters. Every value that ever touches
//! `fragments` arrives as a numbered placeholder — nothing user-supplied
//! is ever interpolated into `sql_text` (§4.4.6 safety properties).

use serde_json::Value;

/// Accumulates SQL text and parameters for a single compiled query.
/// `counter` always equals `params.len()`; kept explicit since several
/// emission sites need the next placeholder number before pushing.
#[derive(Debug, Default)]
pub struct SqlEmitter {
    fragments: Vec<String>,
    params: Vec<Value>,
    counter: usize,
}

impl SqlEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw SQL syntax. Never pass a user-controlled string here —
    /// identifiers come only from the closed catalog/table-alias set, and
    /// values go through [`Self::bind`].
    pub fn raw(&mut self, sql: impl AsRef<str>) -> &mut Self {
        self.fragments.push(sql.as_ref().to_string());
        self
    }

    /// Bind a value, emitting its numbered placeholder (`$n`) into the
    /// SQL text and recording the value in `params`.
    pub fn bind(&mut self, value: Value) -> &mut Self {
        self.counter += 1;
        self.fragments.push(format!("${}", self.counter));
        self.params.push(value);
        self
    }

    /// The placeholder that the *next* [`Self::bind`] call will emit,
    /// without emitting anything — used when a caller needs to reference
    /// a parameter number before deciding whether to actually bind it.
    pub fn next_placeholder(&self) -> usize {
        self.counter + 1
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        debug_assert_eq!(self.params.len(), self.counter);
        (self.fragments.join(""), self.params)
    }
}
