//! The data store: the one shared mutable resource in the pipeline
//! (§6.3). The Translator, Validator, and Compiler are pure; only this
//! module talks to Postgres.

mod types;

#[cfg(feature = "store-postgres")]
mod postgres;

pub use types::{InstrumentSnapshot, PricePoint, ScreenResultRow};

#[cfg(feature = "store-postgres")]
pub use postgres::PostgresStore;

use crate::compile::CompiledQuery;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("instrument not found: {0}")]
    NotFound(String),
}

/// Abstraction over the screening datastore, so the evaluator and HTTP
/// layer don't depend on `sqlx` directly (§9 design note: keep the pure
/// pipeline stages decoupled from the store's concrete driver).
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Run a compiled screen, returning matching rows in the order the
    /// compiled `ORDER BY`/`LIMIT` produced.
    async fn run_screen(&self, query: &CompiledQuery) -> Result<Vec<ScreenResultRow>, StoreError>;

    /// Fetch the latest cross-table snapshot for one ticker, used by the
    /// alert evaluator.
    async fn latest_snapshot(&self, ticker: &str) -> Result<InstrumentSnapshot, StoreError>;

    /// Fetch the most recent price sample at or before `window_hours`
    /// ago, used by `price_change` alerts.
    async fn price_at_or_before(
        &self,
        ticker: &str,
        window_hours: u32,
    ) -> Result<Option<PricePoint>, StoreError>;
}
