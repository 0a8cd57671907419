//! # Scope Tree & Shutdown Driver
//!
//! This module defines the [`Scope`], the core structure of the crate. Scopes
//! form a tree: each scope tracks its own in-flight activities and its direct
//! children, and shutting a scope down always finishes every descendant first.
//!
//! ## Concurrency Model
//!
//! A `Scope` is a cheap clonable handle (`Arc` inside) that can be shared
//! freely across tasks. Internally each concern sits behind its own small
//! lock: the child set, the activity counter, the hook queue, the token
//! registry, and the error slot are independent critical sections, and none
//! of them is held across an `.await`. Cross-scope coordination happens only
//! through the phase latches, so the wait graph during shutdown is exactly
//! the scope tree, which is acyclic.
//!
//! ## Shutdown Phases
//!
//! Termination moves a scope through three monotonic phases, each announced
//! by a [`Latch`]:
//!
//! 1. *dying* is raised the instant shutdown begins.
//! 2. *dead* is raised once every descendant is done and the activity
//!    counter has drained to zero.
//! 3. *done* is raised after the hooks have run (graceful mode only) and
//!    every issued cancellation token has been cancelled.
//!
//! [`kill`](Scope::kill) and [`cancel`](Scope::cancel) drive the same
//! protocol; the only difference is whether the hook queue executes.

use crate::error::{ScopeError, SharedError};
use crate::hook::HookQueue;
use crate::latch::Latch;
use crate::token::TokenLinks;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Which half of the termination protocol to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Run the hook queue before completing.
    Graceful,
    /// Skip the hook queue entirely.
    Abortive,
}

/// A node in the lifecycle tree: the unit of activity tracking and shutdown.
///
/// Construct a root with [`Scope::new_root`] and grow the tree with
/// [`Scope::new_child`]. Every created scope must eventually be terminated
/// with [`kill`](Scope::kill) or [`cancel`](Scope::cancel) (directly or via a
/// parent); a scope that is never terminated stays reachable from its parent
/// forever.
///
/// # Example
///
/// ```rust
/// use lifetree::Scope;
///
/// #[tokio::main]
/// async fn main() {
///     let root = Scope::new_root();
///     let worker = root.go(|scope| async move {
///         // Do work until told to stop.
///         scope.hold().await;
///     });
///     root.on_terminate_append(|| println!("cleanup"));
///     root.kill().await;
///     assert!(worker.is_dead());
/// }
/// ```
#[derive(Clone)]
pub struct Scope {
    pub(crate) inner: Arc<ScopeInner>,
}

pub(crate) struct ScopeInner {
    pub(crate) id: u64,
    parent: Option<Weak<ScopeInner>>,
    children: Mutex<Vec<Scope>>,
    dying: Latch,
    dead: Latch,
    done: Latch,
    dead_flag: AtomicBool,
    tracked: Mutex<usize>,
    hooks: HookQueue,
    pub(crate) links: Mutex<TokenLinks>,
    error: Mutex<Option<SharedError>>,
}

impl ScopeInner {
    fn new(parent: Option<Weak<ScopeInner>>) -> Self {
        Self {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            parent,
            children: Mutex::new(Vec::new()),
            dying: Latch::new(),
            dead: Latch::new(),
            done: Latch::new(),
            dead_flag: AtomicBool::new(false),
            tracked: Mutex::new(0),
            hooks: HookQueue::new(),
            links: Mutex::new(TokenLinks::default()),
            error: Mutex::new(None),
        }
    }

    fn remove_child(&self, child: &Arc<ScopeInner>) {
        self.children
            .lock()
            .retain(|c| !Arc::ptr_eq(&c.inner, child));
    }
}

impl Scope {
    // --- Construction & tree maintenance ---

    /// Creates a fresh scope with no parent.
    pub fn new_root() -> Scope {
        Scope {
            inner: Arc::new(ScopeInner::new(None)),
        }
    }

    /// Creates a fresh child scope of `self`.
    ///
    /// The parent holds the child strongly until the child finishes its
    /// shutdown, so the child stays coordinated even if the caller drops the
    /// returned handle. Terminating the child does not affect the parent;
    /// terminating the parent terminates the child first.
    pub fn new_child(&self) -> Scope {
        let child = Scope {
            inner: Arc::new(ScopeInner::new(Some(Arc::downgrade(&self.inner)))),
        };
        self.inner.children.lock().push(child.clone());
        debug!(scope = self.inner.id, child = child.inner.id, "child created");
        child
    }

    fn parent(&self) -> Option<Scope> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Scope { inner })
    }

    fn root(&self) -> Scope {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    // --- Activity marking ---

    /// Marks one unit of in-flight activity on this scope.
    ///
    /// Shutdown will not raise *dead* while marks are outstanding. Every
    /// `mark` must be balanced by exactly one [`unmark`](Scope::unmark);
    /// marking an already-dying scope is legal (the late arrival is expected
    /// to unmark shortly after observing *dying*).
    pub fn mark(&self) {
        let mut tracked = self.inner.tracked.lock();
        *tracked += 1;
        self.check_dead_gate(*tracked);
    }

    /// Removes one unit of in-flight activity from this scope.
    ///
    /// If the scope is dying and this was the last outstanding mark, the
    /// *dead* phase is raised. The counter saturates at zero.
    pub fn unmark(&self) {
        let mut tracked = self.inner.tracked.lock();
        *tracked = tracked.saturating_sub(1);
        self.check_dead_gate(*tracked);
    }

    /// Must be called with the `tracked` lock held so the gate read and the
    /// counter change are a single atomic step with respect to the driver.
    fn check_dead_gate(&self, tracked: usize) {
        if tracked == 0 && self.inner.dying.is_raised() {
            self.inner.dead.raise();
        }
    }

    // --- Observation ---

    /// Waits until the scope starts dying. This is the signal tracked
    /// activities should use to decide when to wind down.
    pub async fn hold(&self) {
        self.inner.dying.wait().await;
    }

    /// Waits until the scope is dead: every descendant is done and all
    /// tracked activity has unmarked. Hooks may not have run yet.
    pub async fn wait(&self) {
        self.inner.dead.wait().await;
    }

    /// Waits until the scope is completely done, hooks included.
    pub async fn wait_done(&self) {
        self.inner.done.wait().await;
    }

    /// The raw *dying* event, for composing with other signals.
    pub fn dying(&self) -> Latch {
        self.inner.dying.clone()
    }

    /// The raw *dead* event.
    pub fn dead(&self) -> Latch {
        self.inner.dead.clone()
    }

    /// The raw *done* event.
    pub fn done(&self) -> Latch {
        self.inner.done.clone()
    }

    /// Returns `true` once shutdown has begun (in any mode).
    pub fn is_dead(&self) -> bool {
        self.inner.dead_flag.load(Ordering::Acquire)
    }

    /// Returns `true` while shutdown has not begun.
    pub fn alive(&self) -> bool {
        !self.is_dead()
    }

    // --- Hooks ---

    /// Queues `hook` to run at the tail of the hook queue on graceful
    /// shutdown. Hooks run sequentially, head-to-tail, after the scope is
    /// dead and before it is done. They never run on [`cancel`](Scope::cancel).
    pub fn on_terminate_append<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.hooks.append(Box::new(hook));
    }

    /// Queues `hook` at the head of the hook queue, ahead of everything
    /// queued so far.
    pub fn on_terminate_prepend<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.hooks.prepend(Box::new(hook));
    }

    // --- Error slot ---

    /// Returns the error attached by a `_with_error` shutdown call, if any.
    pub fn error(&self) -> Option<SharedError> {
        self.inner.error.lock().clone()
    }

    fn set_error(&self, error: Box<dyn std::error::Error + Send + Sync>) -> Result<(), ScopeError> {
        let mut slot = self.inner.error.lock();
        if slot.is_some() {
            return Err(ScopeError::ErrorAlreadySet);
        }
        *slot = Some(Arc::from(error));
        Ok(())
    }

    // --- Shutdown ---

    /// Gracefully terminates this scope and every descendant, running the
    /// hook queues along the way.
    ///
    /// Resolves once this scope is *done*: all descendants finished first,
    /// all tracked activity unmarked, hooks executed, issued tokens
    /// cancelled. Idempotent; a second caller simply waits for *done*.
    pub async fn kill(&self) {
        self.shutdown(Mode::Graceful).await;
    }

    /// Abortively terminates this scope and every descendant. Identical to
    /// [`kill`](Scope::kill) except that no hooks run anywhere in the
    /// subtree.
    pub async fn cancel(&self) {
        self.shutdown(Mode::Abortive).await;
    }

    /// Gracefully terminates the whole tree, from the root down.
    pub async fn kill_all(&self) {
        self.root().kill().await;
    }

    /// Abortively terminates the whole tree, from the root down.
    pub async fn cancel_all(&self) {
        self.root().cancel().await;
    }

    /// Like [`kill`](Scope::kill), but first attaches `error` to this scope.
    ///
    /// The slot is write-once: if an error is already attached the call
    /// returns [`ScopeError::ErrorAlreadySet`] and does not drive shutdown
    /// (another caller may still be driving it).
    pub async fn kill_with_error<E>(&self, error: E) -> Result<(), ScopeError>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.set_error(error.into())?;
        self.kill().await;
        Ok(())
    }

    /// Like [`cancel`](Scope::cancel), but first attaches `error` to this
    /// scope. Write-once, as with [`kill_with_error`](Scope::kill_with_error).
    pub async fn cancel_with_error<E>(&self, error: E) -> Result<(), ScopeError>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.set_error(error.into())?;
        self.cancel().await;
        Ok(())
    }

    /// Like [`kill_all`](Scope::kill_all), but attaches `error` to the root.
    /// Only the root receives the error; children never inherit it.
    pub async fn kill_all_with_error<E>(&self, error: E) -> Result<(), ScopeError>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.root().kill_with_error(error).await
    }

    /// Like [`cancel_all`](Scope::cancel_all), but attaches `error` to the
    /// root.
    pub async fn cancel_all_with_error<E>(&self, error: E) -> Result<(), ScopeError>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.root().cancel_with_error(error).await
    }

    /// The termination protocol. Exactly one caller wins the flag transition
    /// and drives the steps below; everyone else joins on *done*.
    async fn shutdown(&self, mode: Mode) {
        if self.inner.dead_flag.swap(true, Ordering::AcqRel) {
            self.inner.done.wait().await;
            return;
        }
        debug!(scope = self.inner.id, ?mode, "shutdown started");
        self.inner.dying.raise();

        // Snapshot the children and release the lock before fanning out, so
        // no lock is held while waiting on another scope.
        let children = std::mem::take(&mut *self.inner.children.lock());
        let mut pending = Vec::with_capacity(children.len());
        for child in children {
            let handle = tokio::spawn(shutdown_subtree(child.clone(), mode));
            pending.push((child, handle));
        }
        // The ordering contract is on the child's *done* latch, not on the
        // fan-out task exiting, so both are awaited.
        for (child, handle) in pending {
            if handle.await.is_err() {
                warn!(
                    scope = self.inner.id,
                    child = child.inner.id,
                    "child shutdown task panicked"
                );
            }
            child.wait_done().await;
        }

        // Children are done; now drain our own activity. The counter lock is
        // held across the zero-check and the raise, so a late mark serializes
        // either before the read (gating *dead*) or after the raise. In the
        // non-zero branch the lock is released before parking: the unmark
        // that reaches zero takes it to raise *dead* for us.
        let is_zero = {
            let tracked = self.inner.tracked.lock();
            *tracked == 0
        };
        if is_zero {
            self.inner.dead.raise();
        } else {
            debug!(scope = self.inner.id, "waiting for tracked activity");
            self.inner.dead.wait().await;
        }

        if mode == Mode::Graceful {
            self.inner.hooks.fire(self.inner.id);
        }

        let cancelled = self.cancel_issued_tokens();
        if cancelled > 0 {
            debug!(scope = self.inner.id, tokens = cancelled, "issued tokens cancelled");
        }

        if let Some(parent) = self.inner.parent.as_ref().and_then(Weak::upgrade) {
            parent.remove_child(&self.inner);
        }
        self.inner.done.raise();
        debug!(scope = self.inner.id, "shutdown complete");
    }
}

/// Boxed recursion point for the shutdown fan-out: each child is driven in
/// its own ephemeral task and the box breaks the otherwise infinite future
/// type.
fn shutdown_subtree(scope: Scope, mode: Mode) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move { scope.shutdown(mode).await })
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("dying", &self.inner.dying.is_raised())
            .field("dead", &self.inner.dead.is_raised())
            .field("done", &self.inner.done.is_raised())
            .field("tracked", &*self.inner.tracked.lock())
            .finish()
    }
}
