use lifetree::CancellationToken;
use lifetree_sample::lifecycle::WorkerSystem;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::timeout;

const LONG: Duration = Duration::from_secs(2);

fn backlog(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("job-{i}")).collect()
}

#[tokio::test]
async fn external_cancel_stops_the_whole_system() {
    let shutdown = CancellationToken::new();
    let system = WorkerSystem::start(shutdown.clone(), backlog(100));

    // Let the workers get going, then pull the plug from outside.
    tokio::time::sleep(Duration::from_millis(60)).await;
    shutdown.cancel();

    timeout(LONG, system.wait_done())
        .await
        .expect("system should reach done after the token is cancelled");
    assert!(system.root().is_dead());
    assert!(system.work_token().is_cancelled());
    for worker in system.workers() {
        assert!(worker.done().is_raised());
    }

    let drained = system.drained().load(Ordering::Relaxed);
    assert!(drained > 0, "the drainer should have made progress");
    assert!(drained < 100, "the drainer should have abandoned the backlog");
}

#[tokio::test]
async fn graceful_shutdown_waits_for_every_worker() {
    let shutdown = CancellationToken::new();
    let system = WorkerSystem::start(shutdown, backlog(3));

    tokio::time::sleep(Duration::from_millis(30)).await;
    timeout(LONG, system.shutdown())
        .await
        .expect("shutdown should complete");

    assert!(system.root().done().is_raised());
    for worker in system.workers() {
        assert!(worker.done().is_raised());
    }
    assert!(system.root().error().is_none());
}
