/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Event Ingestor
//!
//! One background task per cluster that watches core/v1 `Event` objects and
//! persists each new notification exactly once.
//!
//! ## Lifecycle
//!
//! `Starting -> Watching -> Stopped`
//!
//! - `Starting`: the watch is established and the initial list is being
//!   replayed. Transient errors are retried by the watcher's backoff; an
//!   initial list the API server refuses (401, 403, 404) stops the task.
//! - `Watching`: steady state after the initial list completed. Watch errors
//!   are logged and the watcher re-lists after its backoff.
//! - `Stopped`: reached on shutdown, when the stream ends, or after a refused
//!   initial sync. The task is never restarted by this module.
//!
//! Storage failures only drop the event being processed; the watch continues.

use crate::events::store::EventStore;
use crate::metrics;
use crate::registry::{ClusterRegistry, RegistryError};
use crate::shutdown::Shutdown;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Event as CoreEvent;
use korral_models::models::watched_events::NewWatchedEvent;
use korral_utils::logging::prelude::*;
use kube::runtime::watcher::{self, Event as WatchEvent};
use kube::runtime::WatchStreamExt;
use kube::Api;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestorState {
    Starting,
    Watching,
    Stopped,
}

/// Why an ingestor stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestorExit {
    Shutdown,
    StreamEnded,
    SyncFailed(String),
    Panicked(String),
}

/// Result of processing one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored,
    Duplicate,
    Failed,
    Skipped,
}

impl IngestOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestOutcome::Stored => "stored",
            IngestOutcome::Duplicate => "duplicate",
            IngestOutcome::Failed => "failed",
            IngestOutcome::Skipped => "skipped",
        }
    }
}

/// A running ingestor task.
pub struct IngestorHandle {
    cluster: String,
    state: watch::Receiver<IngestorState>,
    task: JoinHandle<IngestorExit>,
}

impl IngestorHandle {
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn state(&self) -> IngestorState {
        *self.state.borrow()
    }

    /// Waits for the task to stop.
    pub async fn join(self) -> IngestorExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => IngestorExit::Panicked(e.to_string()),
        }
    }

    pub fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.task.abort_handle()
    }
}

/// Starts the ingestor for one registered cluster.
///
/// # Arguments
///
/// * `cluster_name` - Name of a cluster in `registry`
/// * `registry` - The cluster registry
/// * `store` - Where new events are persisted
/// * `shutdown` - Signal that stops the task
///
/// # Returns
///
/// A handle to the spawned task, or `RegistryError::ClusterNotFound`.
pub fn start<S>(
    cluster_name: &str,
    registry: &ClusterRegistry,
    store: Arc<S>,
    shutdown: Shutdown,
) -> Result<IngestorHandle, RegistryError>
where
    S: EventStore + 'static,
{
    let connection = registry.get(cluster_name)?;
    let api: Api<CoreEvent> = Api::all(connection.client());
    let stream = watcher::watcher(api, watcher::Config::default()).default_backoff();
    Ok(spawn(cluster_name, stream, store, shutdown))
}

/// Spawns the watch loop over an arbitrary notification stream.
pub fn spawn<S, W>(cluster_name: &str, stream: W, store: Arc<S>, shutdown: Shutdown) -> IngestorHandle
where
    S: EventStore + 'static,
    W: Stream<Item = Result<WatchEvent<CoreEvent>, watcher::Error>> + Send + 'static,
{
    let (state_tx, state_rx) = watch::channel(IngestorState::Starting);
    let cluster = cluster_name.to_string();
    let span = info_span!("event_ingestor", cluster = %cluster);

    let task = {
        let cluster = cluster.clone();
        tokio::spawn(
            async move { run_watch_loop(&cluster, stream, store, shutdown, &state_tx).await }
                .instrument(span),
        )
    };

    IngestorHandle {
        cluster,
        state: state_rx,
        task,
    }
}

/// Consumes notifications until shutdown, stream end or a failed initial sync.
pub async fn run_watch_loop<S, W>(
    cluster: &str,
    stream: W,
    store: Arc<S>,
    mut shutdown: Shutdown,
    state: &watch::Sender<IngestorState>,
) -> IngestorExit
where
    S: EventStore + 'static,
    W: Stream<Item = Result<WatchEvent<CoreEvent>, watcher::Error>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut phase = IngestorState::Starting;
    state.send_replace(phase);
    metrics::ingestors_running().inc();
    info!("Starting event watch");

    let exit = loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => {
                info!("Shutdown requested, stopping event watch");
                break IngestorExit::Shutdown;
            }
            next = stream.next() => match next {
                None => {
                    warn!("Event watch stream ended");
                    break IngestorExit::StreamEnded;
                }
                Some(Ok(WatchEvent::Init)) => debug!("Listing existing events"),
                Some(Ok(WatchEvent::InitApply(event))) | Some(Ok(WatchEvent::Apply(event))) => {
                    handle_notification(cluster, &store, &event).await;
                }
                Some(Ok(WatchEvent::InitDone)) => {
                    if phase == IngestorState::Starting {
                        phase = IngestorState::Watching;
                        state.send_replace(phase);
                        info!("Initial event list synchronized");
                    }
                }
                Some(Ok(WatchEvent::Delete(_))) => {}
                Some(Err(e)) => {
                    if phase == IngestorState::Starting && is_unrecoverable(&e) {
                        error!(error = %e, "Event watch refused before initial sync");
                        break IngestorExit::SyncFailed(e.to_string());
                    }
                    warn!(error = %e, "Event watch error, re-listing after backoff");
                }
            }
        }
    };

    state.send_replace(IngestorState::Stopped);
    metrics::ingestors_running().dec();
    exit
}

/// Errors no amount of re-listing will fix: the API server rejected our
/// credentials or does not serve events at all.
fn is_unrecoverable(error: &watcher::Error) -> bool {
    match error {
        watcher::Error::InitialListFailed(kube::Error::Api(response))
        | watcher::Error::WatchStartFailed(kube::Error::Api(response)) => {
            matches!(response.code, 401 | 403 | 404)
        }
        _ => false,
    }
}

async fn handle_notification<S>(cluster: &str, store: &Arc<S>, event: &CoreEvent) -> IngestOutcome
where
    S: EventStore + 'static,
{
    let outcome = match extract(event, cluster) {
        Some(record) => ingest(store.clone(), record).await,
        None => {
            debug!(
                event = event.metadata.name.as_deref().unwrap_or_default(),
                "Skipping event without any timestamp"
            );
            IngestOutcome::Skipped
        }
    };
    metrics::events_ingested_total()
        .with_label_values(&[cluster, outcome.as_str()])
        .inc();
    outcome
}

/// Builds the record for one notification.
///
/// The record time is the event's creation timestamp, falling back to
/// `eventTime` and then `firstTimestamp`. Returns `None` when all are absent.
pub fn extract(event: &CoreEvent, cluster: &str) -> Option<NewWatchedEvent> {
    let event_time = event
        .metadata
        .creation_timestamp
        .as_ref()
        .map(|t| t.0)
        .or_else(|| event.event_time.as_ref().map(|t| t.0))
        .or_else(|| event.first_timestamp.as_ref().map(|t| t.0))?;
    let object = &event.involved_object;

    Some(NewWatchedEvent {
        name: object.name.clone().unwrap_or_default(),
        kind: object.kind.clone().unwrap_or_default(),
        namespace: object.namespace.clone().unwrap_or_default(),
        event_type: event.type_.clone().unwrap_or_default(),
        reason: event.reason.clone().unwrap_or_default(),
        message: event.message.clone().unwrap_or_default(),
        event_time,
        cluster: cluster.to_string(),
    })
}

/// Check-then-insert for one record. Never fails; errors are logged.
pub async fn ingest<S>(store: Arc<S>, record: NewWatchedEvent) -> IngestOutcome
where
    S: EventStore + 'static,
{
    let key = record.key();
    let result = tokio::task::spawn_blocking(move || {
        if store.exists(&record.key())? {
            return Ok(false);
        }
        store.insert(&record)
    })
    .await;

    match result {
        Ok(Ok(true)) => {
            debug!(name = %key.name, kind = %key.kind, reason = %key.reason, "Stored event");
            IngestOutcome::Stored
        }
        Ok(Ok(false)) => IngestOutcome::Duplicate,
        Ok(Err(e)) => {
            warn!(
                name = %key.name,
                kind = %key.kind,
                reason = %key.reason,
                error = %e,
                "Failed to persist event, dropping it"
            );
            IngestOutcome::Failed
        }
        Err(e) => {
            error!(error = %e, "Event persistence task failed");
            IngestOutcome::Failed
        }
    }
}
