//! # Tracked Execution Helpers
//!
//! Thin sugar over [`mark`](Scope::mark)/[`unmark`](Scope::unmark) and
//! [`new_child`](Scope::new_child): run a future as tracked activity on the
//! caller's task (`wrap*`), or spawn it on the runtime inside a fresh child
//! scope (`go*`). The mark is released through a drop guard, so a body that
//! panics or is torn down with its task still unblocks shutdown.

use crate::scope::Scope;
use std::future::Future;

/// Balances a `mark` on drop, whatever way the wrapped body exits.
struct MarkGuard(Scope);

impl Drop for MarkGuard {
    fn drop(&mut self) {
        self.0.unmark();
    }
}

impl Scope {
    /// Runs `f` on the caller's task as tracked activity on this scope.
    ///
    /// Blocks until `f` completes. The body receives a handle to this scope
    /// and must wind down once it observes *dying*, typically by selecting on
    /// [`hold`](Scope::hold).
    pub async fn wrap<F, Fut>(&self, f: F)
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.mark();
        let _guard = MarkGuard(self.clone());
        f(self.clone()).await;
    }

    /// Repeatedly runs `f` as tracked activity until this scope starts dying.
    ///
    /// The exit condition is checked between iterations, so the only way out
    /// is terminating the scope. A body that is ready immediately does not
    /// starve the runtime; the loop yields after every iteration.
    pub async fn wrap_in_loop<F, Fut>(&self, mut f: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        self.mark();
        let _guard = MarkGuard(self.clone());
        while self.alive() {
            f().await;
            tokio::task::yield_now().await;
        }
    }

    /// Like [`wrap_in_loop`](Scope::wrap_in_loop), but also stops as soon as
    /// `f` resolves to `false`.
    pub async fn wrap_in_loop_while<F, Fut>(&self, mut f: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        self.mark();
        let _guard = MarkGuard(self.clone());
        while self.alive() {
            if !f().await {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Spawns `f` as a tracked task inside a fresh child scope and returns
    /// the child handle.
    ///
    /// The child is what gets terminated to stop the task; killing the child
    /// does not touch `self`, while killing `self` stops the task along with
    /// everything else.
    ///
    /// ```rust
    /// # use lifetree::Scope;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let root = Scope::new_root();
    /// let child = root.go(|scope| async move {
    ///     scope.hold().await; // exit condition
    /// });
    /// child.kill().await;
    /// # root.kill().await;
    /// # }
    /// ```
    pub fn go<F, Fut>(&self, f: F) -> Scope
    where
        F: FnOnce(Scope) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let child = self.new_child();
        let scope = child.clone();
        tokio::spawn(async move { scope.wrap(f).await });
        child
    }

    /// Spawns `f` in a loop as a tracked task inside a fresh child scope.
    /// The loop runs until the child (or an ancestor) is terminated.
    pub fn go_in_loop<F, Fut>(&self, f: F) -> Scope
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let child = self.new_child();
        let scope = child.clone();
        tokio::spawn(async move { scope.wrap_in_loop(f).await });
        child
    }

    /// Spawns `f` in a loop as a tracked task inside a fresh child scope,
    /// stopping on termination or when `f` resolves to `false`.
    pub fn go_in_loop_while<F, Fut>(&self, f: F) -> Scope
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let child = self.new_child();
        let scope = child.clone();
        tokio::spawn(async move { scope.wrap_in_loop_while(f).await });
        child
    }
}
