/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Wire protocol spoken over the client WebSocket.
//!
//! Every frame is a JSON text message:
//!
//! ```json
//! {"operation": "stdin", "data": "ls\r"}
//! {"operation": "resize", "rows": 40, "cols": 120}
//! {"operation": "ping"}
//! {"operation": "stdout", "data": "total 0\r\n"}
//! ```

use crate::exec::ExecError;
use serde::{Deserialize, Serialize};

/// One frame in either direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalMessage {
    pub operation: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub rows: u16,
    #[serde(default)]
    pub cols: u16,
}

impl TerminalMessage {
    pub fn stdout(data: impl Into<String>) -> Self {
        TerminalMessage {
            operation: "stdout".to_string(),
            data: data.into(),
            ..Default::default()
        }
    }

    /// The readable frame sent to the client when a session fails.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::stdout(format!("Exec to pod error! err: {}", message))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub rows: u16,
    pub cols: u16,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Stdin(String),
    Resize(TerminalSize),
    Ping,
}

/// Decodes one inbound text frame.
pub fn parse_frame(text: &str) -> Result<Frame, ExecError> {
    let msg: TerminalMessage = serde_json::from_str(text)?;
    match msg.operation.as_str() {
        "stdin" => Ok(Frame::Stdin(msg.data)),
        "resize" => Ok(Frame::Resize(TerminalSize {
            rows: msg.rows,
            cols: msg.cols,
        })),
        "ping" => Ok(Frame::Ping),
        _ => Err(ExecError::UnknownOperation(msg.operation)),
    }
}

/// Raw session request parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecParams {
    pub namespace: Option<String>,
    pub pod_name: Option<String>,
    pub container_name: Option<String>,
    pub cluster: Option<String>,
    /// Overrides the configured command. Whitespace separated.
    pub command: Option<String>,
}

/// Validated session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecTarget {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub cluster: String,
}

impl ExecTarget {
    /// Requires all four parameters to be present and non-empty.
    pub fn from_params(params: &ExecParams) -> Result<Self, ExecError> {
        Ok(ExecTarget {
            namespace: required(&params.namespace, "namespace")?,
            pod: required(&params.pod_name, "pod_name")?,
            container: required(&params.container_name, "container_name")?,
            cluster: required(&params.cluster, "cluster")?,
        })
    }
}

impl ExecParams {
    /// The command to run, falling back to `default` when no override is given.
    pub fn command_or(&self, default: &[String]) -> Vec<String> {
        match self.command.as_deref().map(str::trim) {
            Some(command) if !command.is_empty() => {
                command.split_whitespace().map(String::from).collect()
            }
            _ => default.to_vec(),
        }
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ExecError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ExecError::MissingParameter(name)),
    }
}
