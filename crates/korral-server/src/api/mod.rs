/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # API Routes Aggregator Module
//!
//! Mounts the versioned API under `/api/v1` next to the probe and metrics
//! endpoints.

pub mod error;
pub mod v1;

use crate::dal::DAL;
use crate::metrics;
use crate::registry::ClusterRegistry;
use crate::shutdown::Shutdown;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::{response::IntoResponse, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub dal: DAL,
    pub registry: Arc<ClusterRegistry>,
    pub shutdown: Shutdown,
    /// Command started by exec sessions that do not override it.
    pub exec_command: Arc<Vec<String>>,
}

/// Configures and returns the main application router with all API routes.
pub fn configure_api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", v1::routes())
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ready once at least one cluster is registered.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.registry.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "No clusters registered")
    } else {
        (StatusCode::OK, "Ready")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}
