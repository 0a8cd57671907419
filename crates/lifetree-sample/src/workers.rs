//! Demo workers: concrete [`Worker`] implementations that wind down by
//! racing [`hold`](Scope::hold) against their work inside a `select!`, once
//! per tick for the heartbeat and once per job for the drainer.

use async_trait::async_trait;
use lifetree::{Scope, Worker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Emits a periodic liveness tick until its scope starts dying.
pub struct Heartbeat {
    interval: Duration,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl Worker for Heartbeat {
    fn name(&self) -> &str {
        "heartbeat"
    }

    async fn run(&self, scope: Scope) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = scope.hold() => return,
                _ = ticker.tick() => info!("tick"),
            }
        }
    }
}

/// Works through a fixed backlog of jobs, abandoning the remainder when the
/// scope goes away. The dying signal is raced against each job, so at most
/// one job of latency separates the kill from the exit.
pub struct QueueDrainer {
    jobs: Vec<String>,
    pace: Duration,
    drained: Arc<AtomicUsize>,
}

impl QueueDrainer {
    pub fn new(jobs: Vec<String>, pace: Duration) -> Self {
        Self {
            jobs,
            pace,
            drained: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of completed jobs, shared so callers can observe progress.
    pub fn drained(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.drained)
    }
}

#[async_trait]
impl Worker for QueueDrainer {
    fn name(&self) -> &str {
        "queue-drainer"
    }

    async fn run(&self, scope: Scope) {
        for job in &self.jobs {
            tokio::select! {
                _ = scope.hold() => {
                    info!(job = %job, "abandoning remaining jobs");
                    return;
                }
                _ = tokio::time::sleep(self.pace) => {
                    self.drained.fetch_add(1, Ordering::Relaxed);
                    info!(job = %job, "job drained");
                }
            }
        }
        info!("backlog empty");
    }
}
