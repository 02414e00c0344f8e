//! Alert subscription CRUD (§6.1 Alert CRUD).

use crate::alerts::{AlertKind, Cadence};
use crate::http::error::ApiError;
use crate::http::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub user_id: String,
    pub ticker: String,
    pub kind: AlertKind,
    #[serde(default = "default_cadence")]
    pub cadence: Cadence,
}

fn default_cadence() -> Cadence {
    Cadence::Hourly
}

#[derive(Debug, Deserialize)]
pub struct UpdateAlertRequest {
    pub active: bool,
}

pub async fn list(State(state): State<AppState>) -> Json<Value> {
    let subs = state.alerts.list().await;
    Json(json!({ "success": true, "data": subs }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let sub = state
        .alerts
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("alert subscription {id} not found")))?;
    Ok(Json(json!({ "success": true, "data": sub })))
}

pub async fn create(State(state): State<AppState>, Json(req): Json<CreateAlertRequest>) -> Json<Value> {
    let sub = state.alerts.create(&req.user_id, &req.ticker, req.kind, req.cadence).await;
    Json(json!({ "success": true, "data": sub }))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAlertRequest>,
) -> Result<Json<Value>, ApiError> {
    let sub = state
        .alerts
        .update(id, req.active)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("alert subscription {id} not found")))?;
    Ok(Json(json!({ "success": true, "data": sub })))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    if !state.alerts.delete(id).await {
        return Err(ApiError::NotFound(format!("alert subscription {id} not found")));
    }
    Ok(Json(json!({ "success": true, "data": null })))
}
