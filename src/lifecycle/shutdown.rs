//! Shutdown coordination for the gateway.
//!
//! One trigger stops the listener and starts the drain clock. The futures
//! handed out here subscribe when they are created, not when first polled,
//! so a trigger that races server startup is never missed.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;

/// Broadcast handle shared by everything that must stop on shutdown.
///
/// Clones share one channel; a trigger from any clone reaches every
/// subscriber of every clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal. Only triggers after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. A trigger with no subscribers is dropped.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Resolves once the signal fires.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Resolves `grace` after the signal fires: the point where draining
    /// connections stops and the server exits regardless.
    pub fn grace_elapsed(&self, grace: Duration) -> impl Future<Output = ()> + Send + 'static {
        let signalled = self.signalled();
        async move {
            signalled.await;
            tokio::time::sleep(grace).await;
        }
    }

    /// Number of receivers still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
