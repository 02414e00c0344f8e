//! Router construction (§6.1): screener, alert CRUD, market data, health.

use crate::http::handlers;
use crate::http::state::AppState;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/screener/run", post(handlers::screener::run))
        .route("/alerts", get(handlers::alerts::list))
        .route("/alerts", post(handlers::alerts::create))
        .route("/alerts/:id", get(handlers::alerts::get))
        .route("/alerts/:id", put(handlers::alerts::update))
        .route("/alerts/:id", delete(handlers::alerts::delete))
        .route("/market/quote/:ticker", get(handlers::market::quote))
        .route("/market/top-movers", get(handlers::market::top_movers))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
