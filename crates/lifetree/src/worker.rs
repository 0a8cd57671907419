//! # Worker Trait
//!
//! The [`Worker`] trait is the ergonomic seam for long-running units of work
//! managed by a scope tree. Implementing it instead of passing bare closures
//! to [`go`](Scope::go) buys a name for tracing and a place to hang worker
//! state.
//!
//! # Architecture Note
//! The contract is intentionally small: a worker is given the child [`Scope`]
//! it runs inside and must return once that scope starts dying, typically by
//! racing `scope.hold()` in a `select!` or checking `scope.alive()` between
//! units of work. A derived token is not an exit signal for the worker's own
//! body: derived tokens cancel only after tracked activity has drained.

use crate::scope::Scope;
use async_trait::async_trait;
use tracing::{info, Instrument};

/// A named, long-running unit of work driven inside its own child scope.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Name used for the worker's tracing span.
    fn name(&self) -> &str;

    /// Runs the worker until `scope` starts dying.
    async fn run(&self, scope: Scope);
}

impl Scope {
    /// Spawns `worker` as a tracked task inside a fresh child scope, wrapped
    /// in a tracing span carrying the worker's name. Returns the child
    /// handle, which is how the worker is stopped individually.
    pub fn spawn_worker<W: Worker>(&self, worker: W) -> Scope {
        self.go(move |scope| async move {
            let span = tracing::info_span!("worker", name = worker.name());
            async {
                info!("worker started");
                worker.run(scope).await;
                info!("worker stopped");
            }
            .instrument(span)
            .await
        })
    }
}
