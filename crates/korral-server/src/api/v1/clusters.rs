/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Cluster API endpoints: names, summaries and resource listings.

use crate::api::{ApiError, AppState};
use crate::resources::{self, ResourceKind};
use crate::selector::{Selection, SelectionQuery};
use crate::summary::{self, ClusterSummary};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use korral_utils::logging::prelude::*;
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    info!("Setting up cluster routes");
    Router::new()
        .route("/clusters", get(list_clusters))
        .route("/clusters/:cluster/summary", get(cluster_summary))
        .route("/clusters/:cluster/resources/:kind", get(list_resources))
}

/// Query string of a resource listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResourceQuery {
    pub namespace: Option<String>,
    pub filter: String,
    pub limit: i64,
    pub page: i64,
}

async fn list_clusters(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.list())
}

async fn cluster_summary(
    State(state): State<AppState>,
    Path(cluster): Path<String>,
) -> Result<Json<ClusterSummary>, ApiError> {
    let connection = state.registry.get(&cluster)?;
    let summary = summary::summarize(&connection).await?;
    Ok(Json(summary))
}

async fn list_resources(
    State(state): State<AppState>,
    Path((cluster, kind)): Path<(String, String)>,
    Query(query): Query<ResourceQuery>,
) -> Result<Json<Selection<serde_json::Value>>, ApiError> {
    let kind = ResourceKind::from_path(&kind)
        .ok_or_else(|| ApiError::NotFound(format!("unknown resource kind '{}'", kind)))?;
    let connection = state.registry.get(&cluster)?;

    let selection_query = SelectionQuery::new(query.filter, query.limit, query.page);
    let selection = resources::list(
        connection.client(),
        kind,
        query.namespace.as_deref(),
        &selection_query,
    )
    .await?;

    debug!(
        cluster = %cluster,
        kind = %kind,
        total = selection.total,
        returned = selection.items.len(),
        "Listed resources"
    );
    Ok(Json(selection))
}
