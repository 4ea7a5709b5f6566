/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Korral Server
//!
//! Multi-cluster Kubernetes administration backend.
//!
//! - [`registry`]: named connections to every configured cluster
//! - [`selector`]: filter, sort and paginate resource listings
//! - [`events`]: per-cluster event watch with de-duplicated persistence
//! - [`exec`]: interactive shells bridged over WebSocket
//!
//! The HTTP surface in [`api`] is a thin layer over these.

pub mod api;
pub mod cli;
pub mod dal;
pub mod db;
pub mod events;
pub mod exec;
pub mod metrics;
pub mod registry;
pub mod resources;
pub mod selector;
pub mod shutdown;
pub mod summary;
