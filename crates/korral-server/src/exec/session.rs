/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Per-session plumbing between client frames and the remote streams.
//!
//! [`TerminalSession`] is the client-facing half. It feeds two consumers that
//! the remote transport reads at its own pace:
//!
//! - [`SessionInput`], an `AsyncRead` over queued stdin bytes
//! - [`TerminalSizeQueue`], which yields each new terminal size and returns
//!   `None` once the session is marked done
//!
//! Resizes go through a single `watch` slot. A resize that has not been
//! consumed yet is overwritten by the next one.

use crate::exec::protocol::{parse_frame, Frame, TerminalMessage, TerminalSize};
use crate::exec::ExecError;
use axum::extract::ws::Message;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::sync::{mpsc, watch};

const STDIN_QUEUE_DEPTH: usize = 64;
const OUTPUT_CHUNK_SIZE: usize = 8192;

/// Client-facing half of an exec session.
pub struct TerminalSession {
    stdin_tx: mpsc::Sender<Vec<u8>>,
    size_tx: watch::Sender<Option<TerminalSize>>,
    done_tx: watch::Sender<bool>,
}

impl TerminalSession {
    pub fn new() -> (TerminalSession, SessionInput, TerminalSizeQueue) {
        let (stdin_tx, stdin_rx) = mpsc::channel(STDIN_QUEUE_DEPTH);
        let (size_tx, size_rx) = watch::channel(None);
        let (done_tx, done_rx) = watch::channel(false);

        let session = TerminalSession {
            stdin_tx,
            size_tx,
            done_tx,
        };
        let input = SessionInput {
            rx: stdin_rx,
            pending: Vec::new(),
            offset: 0,
        };
        let sizes = TerminalSizeQueue {
            sizes: size_rx,
            done: done_rx,
        };
        (session, input, sizes)
    }

    /// Applies one inbound text frame.
    ///
    /// Unknown operations and undecodable frames return an error and change
    /// nothing; the session stays usable.
    pub async fn handle_frame(&self, text: &str) -> Result<(), ExecError> {
        match parse_frame(text)? {
            Frame::Stdin(data) => {
                if data.is_empty() {
                    return Ok(());
                }
                self.stdin_tx
                    .send(data.into_bytes())
                    .await
                    .map_err(|_| ExecError::SessionClosed)
            }
            Frame::Resize(size) => {
                self.size_tx.send_replace(Some(size));
                Ok(())
            }
            Frame::Ping => Ok(()),
        }
    }

    /// Marks the session done and releases any pending terminal-size wait.
    pub fn mark_done(&self) {
        self.done_tx.send_replace(true);
    }

    pub fn is_done(&self) -> bool {
        *self.done_tx.borrow()
    }
}

/// Remote stdin source. Reads return EOF once the session is dropped.
pub struct SessionInput {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
}

impl AsyncRead for SessionInput {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.offset >= this.pending.len() {
            match ready!(this.rx.poll_recv(cx)) {
                Some(chunk) => {
                    this.pending = chunk;
                    this.offset = 0;
                }
                None => return Poll::Ready(Ok(())),
            }
        }

        let remaining = &this.pending[this.offset..];
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        this.offset += n;
        Poll::Ready(Ok(()))
    }
}

/// Terminal-size provider for the remote transport.
pub struct TerminalSizeQueue {
    sizes: watch::Receiver<Option<TerminalSize>>,
    done: watch::Receiver<bool>,
}

impl TerminalSizeQueue {
    /// Waits for the next resize. Returns `None` once the session is done.
    pub async fn next(&mut self) -> Option<TerminalSize> {
        loop {
            if *self.done.borrow_and_update() {
                return None;
            }
            tokio::select! {
                biased;
                changed = self.done.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
                changed = self.sizes.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                    let size = *self.sizes.borrow_and_update();
                    if size.is_some() {
                        return size;
                    }
                }
            }
        }
    }
}

/// Sends one `stdout` frame to the client writer.
pub async fn send_stdout(
    output: &mpsc::Sender<Message>,
    data: impl Into<String>,
) -> Result<(), ExecError> {
    let text = serde_json::to_string(&TerminalMessage::stdout(data))?;
    output
        .send(Message::Text(text))
        .await
        .map_err(|_| ExecError::SessionClosed)
}

/// Forwards a remote output stream to the client as `stdout` frames until EOF.
///
/// Multi-byte characters split across reads are held back until complete.
pub async fn pump_output<R>(mut reader: R, output: &mpsc::Sender<Message>) -> Result<(), ExecError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; OUTPUT_CHUNK_SIZE];
    let mut carry = Vec::new();

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            if !carry.is_empty() {
                send_stdout(output, String::from_utf8_lossy(&carry).into_owned()).await?;
            }
            return Ok(());
        }

        carry.extend_from_slice(&buf[..n]);
        let text = drain_utf8(&mut carry);
        if !text.is_empty() {
            send_stdout(output, text).await?;
        }
    }
}

/// Takes the longest decodable prefix out of `bytes`, leaving an incomplete
/// trailing sequence in place. Invalid sequences become U+FFFD.
fn drain_utf8(bytes: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                out.push_str(s);
                bytes.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&bytes[..valid]));
                match e.error_len() {
                    None => {
                        bytes.drain(..valid);
                        return out;
                    }
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        bytes.drain(..valid + len);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    async fn read_some(input: &mut SessionInput) -> Vec<u8> {
        let mut buf = vec![0u8; 64];
        let n = input.read(&mut buf).await.expect("read");
        buf.truncate(n);
        buf
    }

    fn frame_data(msg: Message) -> String {
        match msg {
            Message::Text(text) => {
                let frame: TerminalMessage = serde_json::from_str(&text).expect("json frame");
                assert_eq!(frame.operation, "stdout");
                frame.data
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resize_then_stdin() {
        let (session, mut input, mut sizes) = TerminalSession::new();

        session
            .handle_frame(r#"{"operation":"resize","rows":40,"cols":100}"#)
            .await
            .unwrap();
        session
            .handle_frame(r#"{"operation":"stdin","data":"ls\n"}"#)
            .await
            .unwrap();

        assert_eq!(sizes.next().await, Some(TerminalSize { rows: 40, cols: 100 }));
        assert_eq!(read_some(&mut input).await, b"ls\n");

        // The size is yielded once; the next wait only ends with the session.
        let pending = tokio::time::timeout(Duration::from_millis(50), sizes.next()).await;
        assert!(pending.is_err());
        session.mark_done();
        assert_eq!(sizes.next().await, None);
    }

    #[tokio::test]
    async fn test_mark_done_releases_waiting_provider() {
        let (session, _input, mut sizes) = TerminalSession::new();
        let waiter = tokio::spawn(async move { sizes.next().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        session.mark_done();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("provider should stop waiting")
            .expect("task");
        assert_eq!(result, None);
        assert!(session.is_done());
    }

    #[tokio::test]
    async fn test_newer_resize_supersedes_unconsumed_one() {
        let (session, _input, mut sizes) = TerminalSession::new();
        for (rows, cols) in [(24, 80), (30, 90), (50, 200)] {
            let frame = format!(r#"{{"operation":"resize","rows":{rows},"cols":{cols}}}"#);
            session.handle_frame(&frame).await.unwrap();
        }

        assert_eq!(sizes.next().await, Some(TerminalSize { rows: 50, cols: 200 }));
    }

    #[tokio::test]
    async fn test_unknown_frame_leaves_session_usable() {
        let (session, mut input, _sizes) = TerminalSession::new();

        assert!(session.handle_frame(r#"{"operation":"bogus"}"#).await.is_err());
        assert!(session.handle_frame("{").await.is_err());
        session.handle_frame(r#"{"operation":"ping"}"#).await.unwrap();
        session
            .handle_frame(r#"{"operation":"stdin","data":"pwd\n"}"#)
            .await
            .unwrap();

        assert_eq!(read_some(&mut input).await, b"pwd\n");
    }

    #[tokio::test]
    async fn test_input_reads_across_small_buffers_then_eof() {
        let (session, mut input, _sizes) = TerminalSession::new();
        session
            .handle_frame(r#"{"operation":"stdin","data":"abcdef"}"#)
            .await
            .unwrap();
        drop(session);

        let mut small = [0u8; 4];
        let n = input.read(&mut small).await.unwrap();
        assert_eq!(&small[..n], b"abcd");
        let n = input.read(&mut small).await.unwrap();
        assert_eq!(&small[..n], b"ef");
        assert_eq!(input.read(&mut small).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pump_output_keeps_split_characters_whole() {
        let (tx, mut rx) = mpsc::channel(16);
        let (mut remote, local) = tokio::io::duplex(64);

        let pump = tokio::spawn(async move { pump_output(local, &tx).await });

        let bytes = "héllo".as_bytes();
        remote.write_all(&bytes[..2]).await.unwrap();
        remote.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        remote.write_all(&bytes[2..]).await.unwrap();
        drop(remote);

        pump.await.unwrap().unwrap();
        let mut text = String::new();
        while let Some(msg) = rx.recv().await {
            text.push_str(&frame_data(msg));
        }
        assert_eq!(text, "héllo");
    }

    #[test]
    fn test_drain_utf8() {
        let mut bytes = vec![b'a', 0xC3];
        assert_eq!(drain_utf8(&mut bytes), "a");
        assert_eq!(bytes, vec![0xC3]);

        bytes.push(0xA9);
        assert_eq!(drain_utf8(&mut bytes), "é");
        assert!(bytes.is_empty());

        let mut invalid = vec![b'x', 0xFF, b'y'];
        assert_eq!(drain_utf8(&mut invalid), "x\u{FFFD}y");
    }
}
