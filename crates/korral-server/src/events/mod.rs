/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Cluster event ingestion and its storage seam.

pub mod ingestor;
pub mod store;

pub use ingestor::{IngestOutcome, IngestorExit, IngestorHandle, IngestorState};
pub use store::{EventStore, MemoryEventStore, StoreError};
