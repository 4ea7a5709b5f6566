/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Stored watched events.

use crate::api::{ApiError, AppState};
use crate::dal::EventQuery;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use korral_models::models::watched_events::WatchedEvent;
use serde::Serialize;

pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(list_events))
}

#[derive(Debug, Serialize)]
pub struct EventPage {
    pub total: i64,
    pub items: Vec<WatchedEvent>,
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<EventPage>, ApiError> {
    let dal = state.dal.clone();
    let (total, items) = tokio::task::spawn_blocking(move || dal.watched_events().list(&query))
        .await
        .map_err(|e| ApiError::Internal(format!("event query task failed: {}", e)))??;

    Ok(Json(EventPage { total, items }))
}
