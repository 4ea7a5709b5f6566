/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Interactive exec over WebSocket.
//!
//! Parameters and the cluster name are checked before the upgrade, so a bad
//! request gets a plain HTTP error and no remote connection is attempted.

use crate::api::{ApiError, AppState};
use crate::exec::{bridge, remote, ExecParams, ExecTarget, TerminalMessage};
use crate::registry::ClusterConnection;
use crate::shutdown::Shutdown;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use korral_utils::logging::prelude::*;
use std::sync::Arc;

pub fn routes() -> Router<AppState> {
    Router::new().route("/exec", get(exec_session))
}

async fn exec_session(
    State(state): State<AppState>,
    Query(params): Query<ExecParams>,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ApiError> {
    let target = ExecTarget::from_params(&params)?;
    let connection = state.registry.get(&target.cluster)?;
    let ws = ws.ok_or_else(|| ApiError::BadRequest("expected a WebSocket upgrade".to_string()))?;

    let command = params.command_or(&state.exec_command);
    let shutdown = state.shutdown.clone();
    let span = info_span!(
        "exec_session",
        cluster = %target.cluster,
        namespace = %target.namespace,
        pod = %target.pod,
        container = %target.container,
    );

    Ok(ws.on_upgrade(move |socket| {
        run_session(socket, connection, target, command, shutdown).instrument(span)
    }))
}

async fn run_session(
    socket: WebSocket,
    connection: Arc<ClusterConnection>,
    target: ExecTarget,
    command: Vec<String>,
    shutdown: Shutdown,
) {
    let (mut sink, stream) = socket.split();

    match remote::attach(connection.client(), &target, &command).await {
        Ok(process) => {
            let end = bridge::serve(sink, stream, process, shutdown).await;
            info!(outcome = end.as_str(), "Exec session ended");
        }
        Err(e) => {
            warn!(error = %e, "Failed to start exec session");
            if let Ok(text) = serde_json::to_string(&TerminalMessage::error(&e)) {
                let _ = sink.send(Message::Text(text)).await;
            }
            let close = CloseFrame {
                code: close_code::ERROR,
                reason: "exec failed".into(),
            };
            let _ = sink.send(Message::Close(Some(close))).await;
        }
    }
}
