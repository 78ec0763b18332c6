//! Read-only HTTP surface over the latest published snapshot.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::metrics::Metrics;
use crate::sink::SharedSnapshot;

pub fn router(snapshot: SharedSnapshot, metrics: Option<&Metrics>) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/snapshot", get(latest_snapshot))
        .with_state(snapshot);

    if let Some(m) = metrics {
        app = app.merge(m.router());
    }
    app.layer(CorsLayer::very_permissive())
}

async fn latest_snapshot(State(shared): State<SharedSnapshot>) -> Response {
    match shared.latest() {
        Some(s) => Json(s).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
