//! POST /screener/run (§6.1): translate-or-parse, validate, compile, run.

use crate::dsl::{self, Rule};
use crate::http::error::ApiError;
use crate::http::state::AppState;
use crate::translation::translate;
use crate::validation::validate;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScreenerRequest {
    Query { query: String },
    Dsl { dsl: Value },
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

pub async fn run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ScreenerRequest>,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let request_id = header(&headers, "x-request-id").unwrap_or_default();
    let session_id = header(&headers, "x-session-id").unwrap_or_default();

    let (original, rule): (Option<String>, Rule) = match body {
        ScreenerRequest::Query { query } => {
            let rule = translate(&query, state.catalog);
            (Some(query), rule)
        }
        ScreenerRequest::Dsl { dsl: raw } => {
            let rule = dsl::parse(&raw).map_err(|e| ApiError::Unparseable(e.to_string()))?;
            (None, rule)
        }
    };

    let validated = validate(rule, state.catalog, &state.validator_settings)
        .map_err(ApiError::Validation)?;

    let compiled = crate::compile::compile(&validated.rule, state.catalog, &state.compiler_settings)?;
    let results = state.store.run_screen(&compiled).await?;
    let count = results.len();

    tracing::debug!(sql = %compiled.sql_text, "compiled screener SQL");

    Ok(Json(json!({
        "success": true,
        "results": results,
        "count": count,
        "execution": { "time_ms": started.elapsed().as_millis() },
        "query": {
            "original": original,
            "dsl": validated.rule,
        },
        "metadata": {
            "requestId": request_id,
            "sessionId": session_id,
        },
    })))
}
