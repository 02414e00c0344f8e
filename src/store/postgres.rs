//! Postgres-backed [`super::DataStore`], grounded on the `sqlx::PgPool` +
//! `FromRow` service-layer pattern the adjacent onboarding-pipeline
//! example uses for its screening service.

use super::{DataStore, InstrumentSnapshot, PricePoint, ScreenResultRow, StoreError};
use crate::compile::CompiledQuery;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::{Arguments, PgPool, Row};
use tracing::{debug, instrument};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(connection_string: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self { pool })
    }

    fn bind_params(params: &[Value]) -> Result<PgArguments, StoreError> {
        let mut args = PgArguments::default();
        for value in params {
            match value {
                Value::Null => args.add(Option::<i64>::None),
                Value::Bool(b) => args.add(*b),
                Value::Number(n) if n.is_i64() => args.add(n.as_i64().unwrap()),
                Value::Number(n) => args.add(n.as_f64().unwrap_or_default()),
                Value::String(s) => args.add(s.clone()),
                Value::Array(items) => {
                    if items.iter().all(|v| v.is_string()) {
                        let strs: Vec<String> = items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                        args.add(strs);
                    } else {
                        let nums: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
                        args.add(nums);
                    }
                }
                Value::Object(_) => {
                    return Err(StoreError::Database("cannot bind an object-shaped parameter".to_string()))
                }
            }
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        Ok(args)
    }
}

#[async_trait]
impl DataStore for PostgresStore {
    #[instrument(skip(self, query), fields(param_count = query.params.len()))]
    async fn run_screen(&self, query: &CompiledQuery) -> Result<Vec<ScreenResultRow>, StoreError> {
        debug!(sql = %query.sql_text, "running compiled screen");
        let args = Self::bind_params(&query.params)?;
        let rows: Vec<ScreenResultRow> = sqlx::query_as_with(&query.sql_text, args)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn latest_snapshot(&self, ticker: &str) -> Result<InstrumentSnapshot, StoreError> {
        let row = sqlx::query(
            "SELECT i.ticker, md.sector, md.industry, md.exchange, i.market_cap, \
                    ph.close AS price, ph.time AS price_at, ph.rsi_14 AS rsi, \
                    fq.pe_ratio, fq.revenue, fq.revenue_growth_yoy, fq.net_income, \
                    fq.net_income_growth_yoy, fq.dividend_yield, fq.is_profitable, \
                    cf.free_cash_flow, cf.buyback_announced_date, dp.total_debt, \
                    ae.price_target_avg, ae.next_earnings_date AS earnings_date \
             FROM instruments i \
             LEFT JOIN instrument_metadata md ON md.ticker = i.ticker \
             LEFT JOIN LATERAL (SELECT * FROM price_history WHERE ticker = i.ticker ORDER BY time DESC LIMIT 1) ph ON true \
             LEFT JOIN LATERAL (SELECT * FROM fundamentals WHERE ticker = i.ticker ORDER BY id DESC LIMIT 1) fq ON true \
             LEFT JOIN LATERAL (SELECT * FROM cash_flow WHERE ticker = i.ticker ORDER BY id DESC LIMIT 1) cf ON true \
             LEFT JOIN LATERAL (SELECT * FROM debt_profile WHERE ticker = i.ticker ORDER BY id DESC LIMIT 1) dp ON true \
             LEFT JOIN LATERAL (SELECT * FROM analyst_estimates WHERE ticker = i.ticker ORDER BY estimate_date DESC LIMIT 1) ae ON true \
             WHERE i.ticker = $1",
        )
        .bind(ticker)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .ok_or_else(|| StoreError::NotFound(ticker.to_string()))?;

        Ok(InstrumentSnapshot {
            ticker: row.try_get("ticker").map_err(|e| StoreError::Database(e.to_string()))?,
            sector: row.try_get("sector").ok(),
            industry: row.try_get("industry").ok(),
            exchange: row.try_get("exchange").ok(),
            market_cap: row.try_get("market_cap").ok(),
            price: row.try_get("price").ok(),
            price_at: row.try_get("price_at").ok(),
            rsi: row.try_get("rsi").ok(),
            pe_ratio: row.try_get("pe_ratio").ok(),
            revenue: row.try_get("revenue").ok(),
            revenue_growth_yoy: row.try_get("revenue_growth_yoy").ok(),
            net_income: row.try_get("net_income").ok(),
            net_income_growth_yoy: row.try_get("net_income_growth_yoy").ok(),
            dividend_yield: row.try_get("dividend_yield").ok(),
            free_cash_flow: row.try_get("free_cash_flow").ok(),
            buyback_announced_date: row.try_get("buyback_announced_date").ok(),
            total_debt: row.try_get("total_debt").ok(),
            price_target_avg: row.try_get("price_target_avg").ok(),
            earnings_date: row.try_get("earnings_date").ok(),
            is_profitable: row.try_get("is_profitable").ok(),
        })
    }

    #[instrument(skip(self))]
    async fn price_at_or_before(&self, ticker: &str, window_hours: u32) -> Result<Option<PricePoint>, StoreError> {
        let row = sqlx::query(
            "SELECT close, time FROM price_history \
             WHERE ticker = $1 AND time <= NOW() - ($2 * INTERVAL '1 hour') \
             ORDER BY time DESC LIMIT 1",
        )
        .bind(ticker)
        .bind(window_hours as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(PricePoint {
                close: row.try_get("close").map_err(|e| StoreError::Database(e.to_string()))?,
                time: row.try_get("time").map_err(|e| StoreError::Database(e.to_string()))?,
            })),
            None => Ok(None),
        }
    }
}
