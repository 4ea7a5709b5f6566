/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Exec Bridge
//!
//! Bridges a client WebSocket speaking a small JSON protocol to a remote
//! command running inside a container.
//!
//! - [`protocol`]: frame types and session parameters
//! - [`session`]: the stdin source, output sink and terminal-size provider
//! - [`bridge`]: the session loop and its teardown
//! - [`remote`]: the Kubernetes `pods/exec` transport

use crate::registry::RegistryError;
use thiserror::Error;

pub mod bridge;
pub mod protocol;
pub mod remote;
pub mod session;

pub use bridge::{serve, SessionEnd};
pub use protocol::{ExecParams, ExecTarget, Frame, TerminalMessage, TerminalSize};
pub use remote::RemoteProcess;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to attach to {pod}/{container}: {source}")]
    Attach {
        pod: String,
        container: String,
        #[source]
        source: kube::Error,
    },

    #[error("{0}")]
    Remote(String),

    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session closed")]
    SessionClosed,
}
