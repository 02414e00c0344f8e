//! Market data (§6.1): quote and top-movers. Ranking here only orders
//! numbers the store already computed — no market-data computation of
//! our own, per the crate's non-goals.

use crate::http::error::ApiError;
use crate::http::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

pub async fn quote(State(state): State<AppState>, Path(ticker): Path<String>) -> Result<Json<Value>, ApiError> {
    let snapshot = state.store.latest_snapshot(&ticker).await?;
    Ok(Json(json!({ "success": true, "results": snapshot })))
}

#[derive(Debug, Deserialize)]
pub struct TopMoversQuery {
    tickers: String,
    #[serde(default = "default_window_hours")]
    window_hours: u32,
    #[serde(default = "default_top_n")]
    limit: usize,
}

fn default_window_hours() -> u32 {
    24
}

fn default_top_n() -> usize {
    10
}

pub async fn top_movers(State(state): State<AppState>, Query(q): Query<TopMoversQuery>) -> Result<Json<Value>, ApiError> {
    let mut movers = Vec::new();
    for ticker in q.tickers.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let snapshot = state.store.latest_snapshot(ticker).await?;
        let Some(current) = snapshot.price else { continue };
        let Some(past) = state.store.price_at_or_before(ticker, q.window_hours).await? else { continue };
        if past.close == 0.0 {
            continue;
        }
        let pct_change = (current - past.close) / past.close;
        movers.push(json!({ "ticker": ticker, "price": current, "pct_change": pct_change }));
    }
    movers.sort_by(|a, b| {
        let a = a["pct_change"].as_f64().unwrap_or(0.0).abs();
        let b = b["pct_change"].as_f64().unwrap_or(0.0).abs();
        b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
    });
    movers.truncate(q.limit);
    Ok(Json(json!({ "success": true, "results": movers })))
}
