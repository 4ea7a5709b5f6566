/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Per-kind object counts for one cluster.
//!
//! Every kind is counted by its own list call. The calls run concurrently and
//! are joined before any result is merged, so one failing kind never hides
//! the others.

use crate::metrics;
use crate::registry::ClusterConnection;
use crate::resources::{self, ResourceError, ResourceKind};
use futures::future::join_all;
use korral_utils::logging::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("cluster {cluster} is unreachable: {message}")]
    ClusterUnreachable { cluster: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub cluster: String,
    pub counts: BTreeMap<ResourceKind, usize>,
    /// Kinds whose list call failed, with the failure message.
    pub errors: BTreeMap<ResourceKind, String>,
}

/// Counts every listed kind on the cluster.
///
/// Fails only when no kind could be counted at all.
#[instrument(skip(connection), fields(cluster = %connection.name()))]
pub async fn summarize(connection: &ClusterConnection) -> Result<ClusterSummary, SummaryError> {
    let timer = metrics::summary_duration_seconds()
        .with_label_values(&[connection.name()])
        .start_timer();

    let results = join_all(ResourceKind::ALL.iter().map(|&kind| {
        let client = connection.client();
        async move { (kind, resources::count(client, kind).await) }
    }))
    .await;
    timer.observe_duration();

    let summary = merge(connection.name(), results);
    if summary.counts.is_empty() {
        if let Some(message) = summary.errors.values().next() {
            return Err(SummaryError::ClusterUnreachable {
                cluster: summary.cluster,
                message: message.clone(),
            });
        }
    }
    Ok(summary)
}

fn merge(
    cluster: &str,
    results: Vec<(ResourceKind, Result<usize, ResourceError>)>,
) -> ClusterSummary {
    let mut summary = ClusterSummary {
        cluster: cluster.to_string(),
        counts: BTreeMap::new(),
        errors: BTreeMap::new(),
    };

    for (kind, result) in results {
        match result {
            Ok(count) => {
                summary.counts.insert(kind, count);
            }
            Err(e) => {
                warn!(cluster = %cluster, kind = %kind, error = %e, "Failed to count resources");
                summary.errors.insert(kind, e.to_string());
            }
        }
    }

    summary
}
