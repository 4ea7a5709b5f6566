/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Watched event records.
//!
//! A watched event is one cluster change notification that has been delivered
//! to storage. Records are never updated; uniqueness is defined by the
//! [`EventKey`] tuple `(name, kind, namespace, reason, event_time, cluster)`.

use crate::schema::watched_events;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = watched_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WatchedEvent {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub kind: String,
    pub namespace: String,
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub event_time: DateTime<Utc>,
    pub cluster: String,
}

#[derive(Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = watched_events)]
pub struct NewWatchedEvent {
    /// Name of the involved object
    pub name: String,
    /// Kind of the involved object
    pub kind: String,
    pub namespace: String,
    /// "Normal" or "Warning"
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub event_time: DateTime<Utc>,
    /// Cluster the notification came from
    pub cluster: String,
}

/// The uniqueness tuple of a watched event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub name: String,
    pub kind: String,
    pub namespace: String,
    pub reason: String,
    pub event_time: DateTime<Utc>,
    pub cluster: String,
}

impl NewWatchedEvent {
    /// Returns the tuple this record is deduplicated on.
    pub fn key(&self) -> EventKey {
        EventKey {
            name: self.name.clone(),
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            reason: self.reason.clone(),
            event_time: self.event_time,
            cluster: self.cluster.clone(),
        }
    }
}

impl WatchedEvent {
    pub fn key(&self) -> EventKey {
        EventKey {
            name: self.name.clone(),
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            reason: self.reason.clone(),
            event_time: self.event_time,
            cluster: self.cluster.clone(),
        }
    }
}
