/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Process-wide shutdown signal.
//!
//! A single [`ShutdownTrigger`] flips the signal; every long-running task
//! holds a cloned [`Shutdown`] and selects on [`Shutdown::wait`] next to its
//! normal work.

use korral_utils::logging::prelude::*;
use std::sync::Arc;
use tokio::sync::watch;

/// Sending half of the shutdown signal.
#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

/// Receiving half of the shutdown signal.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Creates a connected trigger/signal pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, Shutdown { rx })
}

impl ShutdownTrigger {
    /// Flips the signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered or every trigger is gone.
    ///
    /// Cancel safe, so it can sit in a `tokio::select!` loop.
    pub async fn wait(&mut self) {
        loop {
            let triggered = *self.rx.borrow_and_update();
            if triggered || self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Consuming form of [`Shutdown::wait`], for `with_graceful_shutdown`.
    pub async fn signalled(mut self) {
        self.wait().await
    }
}

/// Waits for Ctrl-C or SIGTERM and then flips the trigger.
pub async fn listen_for_signals(trigger: ShutdownTrigger) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
    trigger.trigger();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_resolves_after_trigger() {
        let (trigger, shutdown) = channel();
        assert!(!shutdown.is_triggered());

        let mut waiter = shutdown.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait should resolve")
            .expect("task should not panic");
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_wait_is_pending_until_triggered() {
        let (trigger, mut shutdown) = channel();

        let pending = tokio::time::timeout(Duration::from_millis(50), shutdown.wait()).await;
        assert!(pending.is_err());

        trigger.trigger();
        trigger.trigger();
        shutdown.wait().await;
    }

    #[tokio::test]
    async fn test_subscribers_created_late_see_the_signal() {
        let (trigger, _shutdown) = channel();
        trigger.trigger();

        let mut late = trigger.subscribe();
        assert!(late.is_triggered());
        late.wait().await;
    }

    #[tokio::test]
    async fn test_dropped_trigger_releases_waiters() {
        let (trigger, shutdown) = channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), shutdown.signalled())
            .await
            .expect("wait should resolve when the trigger is dropped");
    }
}
