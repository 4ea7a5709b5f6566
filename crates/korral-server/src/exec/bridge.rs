/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Session loop for one interactive exec.
//!
//! [`serve`] runs until the first of:
//!
//! - the remote command exits (all output forwarded, then close `1000`)
//! - the remote transport fails (an error frame, then close `1011`)
//! - the client goes away
//! - process shutdown (close `1001`)
//!
//! Whatever ends the session, it is marked done before teardown so the
//! terminal-size provider stops waiting.

use crate::exec::protocol::TerminalMessage;
use crate::exec::remote::RemoteProcess;
use crate::exec::session::{pump_output, send_stdout, TerminalSession};
use crate::exec::ExecError;
use crate::metrics;
use crate::shutdown::Shutdown;
use axum::extract::ws::{close_code, CloseFrame, Message};
use futures::{Sink, SinkExt, Stream, StreamExt};
use korral_utils::logging::prelude::*;
use std::fmt::Display;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

const OUTPUT_QUEUE_DEPTH: usize = 64;
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    RemoteExited,
    RemoteFailed(String),
    ClientClosed,
    Shutdown,
}

impl SessionEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEnd::RemoteExited => "remote_exited",
            SessionEnd::RemoteFailed(_) => "remote_failed",
            SessionEnd::ClientClosed => "client_closed",
            SessionEnd::Shutdown => "shutdown",
        }
    }
}

/// Bridges a client frame channel to a remote process for the session's lifetime.
///
/// # Arguments
///
/// * `client_tx` - Sink for frames to the client
/// * `client_rx` - Stream of frames from the client
/// * `remote` - The attached remote process
/// * `shutdown` - Process shutdown signal
pub async fn serve<W, R, E>(
    client_tx: W,
    mut client_rx: R,
    remote: RemoteProcess,
    mut shutdown: Shutdown,
) -> SessionEnd
where
    W: Sink<Message> + Send + Unpin + 'static,
    W::Error: Display,
    R: Stream<Item = Result<Message, E>> + Send + Unpin,
    E: Display + Send,
{
    metrics::exec_sessions_active().inc();
    info!("Exec session started");

    let (session, input, mut sizes) = TerminalSession::new();
    let (out_tx, out_rx) = mpsc::channel(OUTPUT_QUEUE_DEPTH);
    let writer = tokio::spawn(write_frames(client_tx, out_rx).in_current_span());

    let RemoteProcess {
        mut stdin,
        stdout,
        stderr,
        resize,
        completion,
    } = remote;

    let stdin_pump = tokio::spawn(
        async move {
            let mut input = input;
            if let Err(e) = tokio::io::copy(&mut input, &mut stdin).await {
                debug!(error = %e, "Remote stdin closed");
            }
            let _ = stdin.shutdown().await;
        }
        .in_current_span(),
    );

    let resize_pump = resize.map(|mut sink| {
        tokio::spawn(
            async move {
                while let Some(size) = sizes.next().await {
                    if let Err(e) = sink.send(size).await {
                        debug!(error = %e, "Remote resize channel closed");
                        break;
                    }
                }
            }
            .in_current_span(),
        )
    });

    let mut remote_side = {
        let out = out_tx.clone();
        Box::pin(async move {
            let out = &out;
            let stdout_pump = pump_output(stdout, out);
            let stderr_pump = async move {
                match stderr {
                    Some(stderr) => pump_output(stderr, out).await,
                    None => Ok(()),
                }
            };
            let (stdout_result, stderr_result) = tokio::join!(stdout_pump, stderr_pump);
            stdout_result?;
            stderr_result?;
            completion.await
        })
    };

    let mut client_side = Box::pin(read_client(&mut client_rx, &session));

    let end = tokio::select! {
        result = &mut remote_side => match result {
            Ok(()) => SessionEnd::RemoteExited,
            Err(ExecError::SessionClosed) => SessionEnd::ClientClosed,
            Err(e) => SessionEnd::RemoteFailed(e.to_string()),
        },
        _ = shutdown.wait() => SessionEnd::Shutdown,
        end = &mut client_side => end,
    };

    drop(client_side);
    session.mark_done();

    let farewell = async {
        match &end {
            SessionEnd::RemoteExited => {
                info!("Remote command exited");
                send_close(&out_tx, close_code::NORMAL, "").await;
            }
            SessionEnd::RemoteFailed(message) => {
                warn!(error = %message, "Exec session failed");
                send_error(&out_tx, message).await;
                send_close(&out_tx, close_code::ERROR, "exec failed").await;
            }
            SessionEnd::Shutdown => {
                send_close(&out_tx, close_code::AWAY, "server shutting down").await
            }
            SessionEnd::ClientClosed => info!("Client disconnected"),
        }
    };
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, farewell).await.is_err() {
        warn!("Timed out queueing final frames for client");
    }

    drop(session);
    drop(remote_side);
    drop(out_tx);
    stdin_pump.abort();
    if let Some(resize_pump) = resize_pump {
        resize_pump.abort();
    }
    let mut writer = writer;
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        warn!("Timed out flushing frames to client");
        writer.abort();
    }

    metrics::exec_sessions_active().dec();
    metrics::exec_sessions_total()
        .with_label_values(&[end.as_str()])
        .inc();
    end
}

/// Applies client frames until the client goes away.
///
/// Stdin is enqueued here, so a remote that stops reading only stalls this
/// future and never the rest of the session.
async fn read_client<R, E>(client_rx: &mut R, session: &TerminalSession) -> SessionEnd
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        match client_rx.next().await {
            Some(Ok(Message::Text(text))) => match session.handle_frame(&text).await {
                Ok(()) => {}
                Err(ExecError::SessionClosed) => debug!("Dropping stdin, remote input is closed"),
                Err(e) => warn!(error = %e, "Dropping client frame"),
            },
            Some(Ok(Message::Close(_))) | None => return SessionEnd::ClientClosed,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(error = %e, "Client read failed");
                return SessionEnd::ClientClosed;
            }
        }
    }
}

/// Sends the readable error frame for a failed session.
pub async fn send_error(output: &mpsc::Sender<Message>, message: &str) {
    if let Err(e) = send_stdout(output, TerminalMessage::error(message).data).await {
        debug!(error = %e, "Could not deliver error frame");
    }
}

async fn send_close(output: &mpsc::Sender<Message>, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    let _ = output.send(Message::Close(Some(frame))).await;
}

async fn write_frames<W>(mut sink: W, mut frames: mpsc::Receiver<Message>)
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    while let Some(frame) = frames.recv().await {
        let closing = matches!(frame, Message::Close(_));
        if let Err(e) = sink.send(frame).await {
            debug!(error = %e, "Client write failed");
            return;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}
