/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Kubernetes `pods/exec` transport.

use crate::exec::protocol::{ExecTarget, TerminalSize};
use crate::exec::ExecError;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, Sink, SinkExt};
use k8s_openapi::api::core::v1::Pod;
use korral_utils::logging::prelude::*;
use kube::api::{Api, AttachParams};
use kube::Client;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};

pub type ResizeSink = Pin<Box<dyn Sink<TerminalSize, Error = ExecError> + Send>>;

/// The streams of a remote command, detached from any particular transport.
pub struct RemoteProcess {
    pub stdin: Box<dyn AsyncWrite + Send + Unpin>,
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    /// Absent when stderr is merged into the tty stream.
    pub stderr: Option<Box<dyn AsyncRead + Send + Unpin>>,
    /// Absent when the transport has no resize channel.
    pub resize: Option<ResizeSink>,
    /// Resolves when the remote command has exited.
    pub completion: BoxFuture<'static, Result<(), ExecError>>,
}

/// Starts `command` in the target container with an interactive tty.
pub async fn attach(
    client: Client,
    target: &ExecTarget,
    command: &[String],
) -> Result<RemoteProcess, ExecError> {
    let pods: Api<Pod> = Api::namespaced(client, &target.namespace);
    let params = AttachParams::interactive_tty().container(target.container.clone());

    debug!(command = ?command, "Attaching to pod");
    let mut process = pods
        .exec(&target.pod, command.to_vec(), &params)
        .await
        .map_err(|source| ExecError::Attach {
            pod: target.pod.clone(),
            container: target.container.clone(),
            source,
        })?;

    let stdin = process
        .stdin()
        .ok_or_else(|| ExecError::Remote("exec stream has no stdin".to_string()))?;
    let stdout = process
        .stdout()
        .ok_or_else(|| ExecError::Remote("exec stream has no stdout".to_string()))?;
    let stderr = process
        .stderr()
        .map(|s| Box::new(s) as Box<dyn AsyncRead + Send + Unpin>);

    let resize = process.terminal_size().map(|sender| {
        let sink = sender
            .sink_map_err(|e| ExecError::Remote(e.to_string()))
            .with(|size: TerminalSize| {
                future::ready(Ok::<_, ExecError>(kube::api::TerminalSize {
                    width: size.cols,
                    height: size.rows,
                }))
            });
        Box::pin(sink) as ResizeSink
    });

    let status = process.take_status();
    let completion = async move {
        let status = match status {
            Some(status) => status.await,
            None => None,
        };
        process
            .join()
            .await
            .map_err(|e| ExecError::Remote(e.to_string()))?;

        match status {
            Some(status) if status.status.as_deref() == Some("Failure") => Err(ExecError::Remote(
                status
                    .message
                    .unwrap_or_else(|| "command failed".to_string()),
            )),
            _ => Ok(()),
        }
    }
    .boxed();

    Ok(RemoteProcess {
        stdin: Box::new(stdin),
        stdout: Box::new(stdout),
        stderr,
        resize,
        completion,
    })
}
