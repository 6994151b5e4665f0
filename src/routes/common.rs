//! Common routes: health, readiness, version.

use crate::store::DocumentStore;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub type Stores = Arc<[Arc<dyn DocumentStore>]>;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    store: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(State(stores): State<Stores>) -> Result<Json<ReadyBody>, (StatusCode, Json<ReadyBody>)> {
    for store in stores.iter() {
        if let Err(e) = store.ping().await {
            tracing::warn!(collection = %store.schema().name, error = %e, "readiness check failed");
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyBody {
                    status: "degraded",
                    store: "unavailable",
                }),
            ));
        }
    }
    Ok(Json(ReadyBody {
        status: "ok",
        store: "ok",
    }))
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health, GET /version.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

/// GET /ready: pings every store.
pub fn ready_routes(stores: Stores) -> Router {
    Router::new().route("/ready", get(ready)).with_state(stores)
}
