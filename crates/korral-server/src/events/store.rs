/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Storage seam for watched events.

use korral_models::models::watched_events::{EventKey, NewWatchedEvent};
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key-based existence check and insert for watched events.
pub trait EventStore: Send + Sync {
    /// Whether a record with this uniqueness tuple is already stored.
    fn exists(&self, key: &EventKey) -> Result<bool, StoreError>;

    /// Stores the record. Returns `false` when an identical tuple was
    /// already present and nothing was written.
    fn insert(&self, event: &NewWatchedEvent) -> Result<bool, StoreError>;
}

/// In-process store with the same uniqueness rule as the database table.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    keys: HashSet<EventKey>,
    records: Vec<NewWatchedEvent>,
    unavailable: bool,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.unavailable = unavailable;
        }
    }

    /// Stored records in insertion order.
    pub fn records(&self) -> Vec<NewWatchedEvent> {
        self.inner
            .lock()
            .map(|inner| inner.records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut MemoryInner) -> T) -> Result<T, StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if inner.unavailable {
            return Err(StoreError::Unavailable("store marked unavailable".to_string()));
        }
        Ok(f(&mut inner))
    }
}

impl EventStore for MemoryEventStore {
    fn exists(&self, key: &EventKey) -> Result<bool, StoreError> {
        self.with_inner(|inner| inner.keys.contains(key))
    }

    fn insert(&self, event: &NewWatchedEvent) -> Result<bool, StoreError> {
        self.with_inner(|inner| {
            if !inner.keys.insert(event.key()) {
                return false;
            }
            inner.records.push(event.clone());
            true
        })
    }
}
