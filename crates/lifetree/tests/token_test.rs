use lifetree::{CancellationToken, Scope};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const LONG: Duration = Duration::from_secs(2);

#[tokio::test]
async fn cancelling_the_bound_token_kills_the_scope() {
    let token = CancellationToken::new();
    let (scope, derived) = Scope::with_token(token.clone());

    let hook_ran = Arc::new(AtomicBool::new(false));
    scope.on_terminate_append({
        let hook_ran = Arc::clone(&hook_ran);
        move || hook_ran.store(true, Ordering::Relaxed)
    });

    token.cancel();

    timeout(LONG, scope.wait_done()).await.expect("scope should reach done");
    assert!(derived.is_cancelled());
    assert!(token.is_cancelled());
    // An inbound cancellation is a graceful kill, so hooks run.
    assert!(hook_ran.load(Ordering::Relaxed));
}

#[tokio::test]
async fn killing_the_scope_cancels_derived_but_not_the_source() {
    let token = CancellationToken::new();
    let (scope, derived) = Scope::with_token(token.clone());

    timeout(LONG, scope.kill()).await.expect("kill should finish");

    assert!(derived.is_cancelled());
    assert!(!token.is_cancelled(), "the bound token belongs to the caller");
}

#[tokio::test]
async fn child_binding_leaves_the_parent_scope_alone() {
    let root = Scope::new_root();
    let token = CancellationToken::new();
    let (child, derived) = root.child_with_token(token.clone());

    token.cancel();

    timeout(LONG, child.wait_done()).await.expect("child should reach done");
    assert!(derived.is_cancelled());
    assert!(root.alive());

    timeout(LONG, root.kill()).await.expect("root kill");
}

#[tokio::test]
async fn derive_without_parent_reuses_the_live_token() {
    let scope = Scope::new_root();
    let first = scope.derive_token(None);
    let second = scope.derive_token(None);

    // Clones of one token share state: cancelling the first proves the
    // second is the same derivation.
    first.cancel();
    assert!(second.is_cancelled());

    // A cancelled cached token is evicted and replaced with a fresh one.
    let third = scope.derive_token(None);
    assert!(!third.is_cancelled());

    timeout(LONG, scope.kill()).await.expect("kill");
    assert!(third.is_cancelled());
}

#[tokio::test]
async fn derive_with_parent_inherits_the_parent_cancellation() {
    let scope = Scope::new_root();
    let parent = CancellationToken::new();
    let derived = scope.derive_token(Some(&parent));

    parent.cancel();
    timeout(LONG, derived.cancelled()).await.expect("derivation follows its parent");
    // A plain derivation parent is not a bound token; the scope stays up.
    assert!(scope.alive());

    timeout(LONG, scope.kill()).await.expect("kill");
}

#[tokio::test]
async fn derive_on_a_dead_scope_returns_a_cancelled_token() {
    let scope = Scope::new_root();
    timeout(LONG, scope.kill()).await.expect("kill");

    let from_none = scope.derive_token(None);
    assert!(from_none.is_cancelled());

    let parent = CancellationToken::new();
    let from_parent = scope.derive_token(Some(&parent));
    assert!(from_parent.is_cancelled());
    assert!(!parent.is_cancelled());
}

#[tokio::test]
async fn every_issued_token_is_cancelled_by_done() {
    let scope = Scope::new_root();
    let parent_a = CancellationToken::new();
    let parent_b = CancellationToken::new();
    let issued = vec![
        scope.derive_token(None),
        scope.derive_token(Some(&parent_a)),
        scope.derive_token(Some(&parent_b)),
    ];

    timeout(LONG, scope.cancel()).await.expect("cancel should finish");
    assert!(scope.done().is_raised());
    for token in &issued {
        assert!(token.is_cancelled());
    }
    assert!(!parent_a.is_cancelled());
    assert!(!parent_b.is_cancelled());
}

#[tokio::test]
async fn derived_token_unparks_selects_when_the_scope_dies() {
    let scope = Scope::new_root();
    let token = scope.derive_token(None);

    let parked = tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => true,
            _ = tokio::time::sleep(Duration::from_secs(5)) => false,
        }
    });
    tokio::task::yield_now().await;

    timeout(LONG, scope.kill()).await.expect("kill");
    let woke_by_token = timeout(LONG, parked)
        .await
        .expect("parked task should settle promptly")
        .expect("parked task should not panic");
    assert!(woke_by_token);
}
