//! HTTP transport: the device poll and preview endpoints and device configuration management.

mod devices;
mod middleware;
mod render;

use std::sync::Arc;

use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::application::ports::ConfigWriteStore;
use crate::application::request::RequestOrchestrator;

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub orchestrator: Arc<RequestOrchestrator>,
    pub store: Arc<dyn ConfigWriteStore>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/render", get(render::render))
        .route("/api/preview", get(render::preview))
        .route("/api/config", post(devices::save_config))
        .route("/api/config/{mac}", get(devices::active_config))
        .route("/api/config/{mac}/history", get(devices::config_history))
        .route(
            "/api/config/{mac}/activate/{id}",
            put(devices::activate_config),
        )
        .route("/api/health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
