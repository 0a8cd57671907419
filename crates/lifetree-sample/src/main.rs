//! Demo entry point: start the worker system, let it make progress, then
//! shut it down gracefully. Run with `RUST_LOG=debug cargo run` to watch the
//! per-scope shutdown phases.

use lifetree::tracing::setup_tracing;
use lifetree::CancellationToken;
use lifetree_sample::lifecycle::WorkerSystem;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() {
    setup_tracing();
    info!("starting worker system");

    let shutdown = CancellationToken::new();
    let backlog = (1..=20).map(|n| format!("job-{n}")).collect();
    let system = WorkerSystem::start(shutdown.clone(), backlog);

    // A Ctrl-C flows through the same token as any other shutdown trigger.
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                shutdown.cancel();
            }
        }
    });

    // A consumer outside the tree, parked on the derived token. It unwinds
    // once the system is done, whoever pulled the trigger.
    tokio::spawn({
        let work_token = system.work_token().clone();
        async move {
            work_token.cancelled().await;
            info!("io layer unwound");
        }
    });

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(400)) => system.shutdown().await,
        _ = system.wait_done() => {}
    }

    info!(
        jobs_drained = system.drained().load(Ordering::Relaxed),
        "worker system stopped"
    );
}
