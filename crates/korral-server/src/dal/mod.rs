/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer.
//!
//! `DAL` owns the connection pool and hands out one accessor per table.

use crate::db::ConnectionPool;
use crate::events::store::{EventStore, StoreError};
use korral_models::models::watched_events::{EventKey, NewWatchedEvent};

mod watched_events;

pub use watched_events::{EventQuery, WatchedEventsDAL};

#[derive(Clone)]
pub struct DAL {
    pub pool: ConnectionPool,
}

impl DAL {
    pub fn new(pool: ConnectionPool) -> Self {
        DAL { pool }
    }

    pub fn watched_events(&self) -> WatchedEventsDAL {
        WatchedEventsDAL { dal: self }
    }
}

impl EventStore for DAL {
    fn exists(&self, key: &EventKey) -> Result<bool, StoreError> {
        self.watched_events().exists(key)
    }

    fn insert(&self, event: &NewWatchedEvent) -> Result<bool, StoreError> {
        self.watched_events().create(event)
    }
}
