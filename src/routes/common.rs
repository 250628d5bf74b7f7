//! Service routes served next to the resources: liveness, readiness and build info.

use crate::store::DocumentStore;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

async fn alive() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 200 while the store answers a ping, 503 otherwise.
async fn ready(State(store): State<Arc<dyn DocumentStore>>) -> (StatusCode, Json<Value>) {
    match store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "database": "ok" }))),
        Err(e) => {
            tracing::warn!(error = %e, "store ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable" })),
            )
        }
    }
}

async fn build_info() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn service_routes<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new()
        .route("/health", get(alive))
        .route("/version", get(build_info))
}

/// `GET /health` and `GET /version`.
pub fn common_routes() -> Router {
    service_routes()
}

/// [`common_routes`] plus `GET /ready` backed by `store`.
pub fn common_routes_with_ready(store: Arc<dyn DocumentStore>) -> Router {
    service_routes()
        .route("/ready", get(ready))
        .with_state(store)
}
