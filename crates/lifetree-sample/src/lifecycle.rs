//! # System Lifecycle & Orchestration
//!
//! The [`WorkerSystem`] is the conductor for the demo: it builds the scope
//! tree, spawns the workers into it, registers the cleanup hooks, and offers
//! one-call graceful shutdown.
//!
//! The interesting property is what it does *not* have to do: no join-handle
//! bookkeeping, no per-worker shutdown channels. The scope tree already knows
//! every worker, waits for each one to wind down, and runs the hooks in
//! order once they have.

use crate::workers::{Heartbeat, QueueDrainer};
use lifetree::{CancellationToken, Scope};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A root scope with a heartbeat and a queue drainer running inside it.
pub struct WorkerSystem {
    root: Scope,
    workers: Vec<Scope>,
    work_token: CancellationToken,
    drained: Arc<AtomicUsize>,
}

impl WorkerSystem {
    /// Builds the tree and starts the workers.
    ///
    /// Cancelling `shutdown` from anywhere (a signal handler, another
    /// subsystem) gracefully stops the whole system.
    pub fn start(shutdown: CancellationToken, backlog: Vec<String>) -> Self {
        let (root, work_token) = Scope::with_token(shutdown);

        // Hooks run leaf-to-root after every worker has exited; within this
        // scope, prepend puts the intake barrier ahead of the flush.
        root.on_terminate_append(|| info!("metrics flushed"));
        root.on_terminate_prepend(|| info!("intake closed"));

        let drainer = QueueDrainer::new(backlog, Duration::from_millis(25));
        let drained = drainer.drained();

        let workers = vec![
            root.spawn_worker(Heartbeat::new(Duration::from_millis(50))),
            root.spawn_worker(drainer),
        ];

        Self {
            root,
            workers,
            work_token,
            drained,
        }
    }

    /// Gracefully stops everything: workers first, then the hooks.
    pub async fn shutdown(&self) {
        info!("shutting down worker system");
        self.root.kill().await;
        info!("worker system shutdown complete");
    }

    /// Completes once the system has fully shut down, whoever triggered it.
    pub async fn wait_done(&self) {
        self.root.wait_done().await;
    }

    pub fn root(&self) -> &Scope {
        &self.root
    }

    pub fn workers(&self) -> &[Scope] {
        &self.workers
    }

    /// Token for consumers outside the tree; cancelled once the system is
    /// done, whatever triggered the shutdown.
    pub fn work_token(&self) -> &CancellationToken {
        &self.work_token
    }

    /// Number of backlog jobs completed so far.
    pub fn drained(&self) -> &Arc<AtomicUsize> {
        &self.drained
    }
}
