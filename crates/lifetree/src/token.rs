//! # Cancellation Token Bridge
//!
//! This module links a [`Scope`] to the wider `tokio` ecosystem through
//! [`CancellationToken`]. The linkage runs both ways:
//!
//! - **Inbound**: a token bound with [`Scope::with_token`] or
//!   [`Scope::child_with_token`] terminates the scope (gracefully) when it is
//!   cancelled. A single watcher task per binding races the token against the
//!   scope's own *dying* event and acts on whichever fires first.
//! - **Outbound**: every token minted by [`Scope::derive_token`] is cancelled
//!   no later than the scope's *done* phase, so futures parked on a derived
//!   token always unwind when the scope goes away.
//!
//! Killing or cancelling a scope never cancels the bound inbound token; the
//! outside world owns that token, the scope only listens to it.

use crate::scope::Scope;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Token state carried by each scope: the inbound source, the cached
/// derivation of it, and every derived token still owed a cancellation.
#[derive(Default)]
pub(crate) struct TokenLinks {
    /// Inbound cancellation source, installed by a `with_token` binding or
    /// lazily by `derive_token(None)`.
    bound: Option<CancellationToken>,
    /// Cached derivation of `bound`, reused while it is still live.
    primary: Option<CancellationToken>,
    /// All derived tokens handed out and not yet observed cancelled.
    issued: Vec<CancellationToken>,
}

impl Scope {
    /// Creates a root scope bound to `token` and returns it together with a
    /// derived token.
    ///
    /// Cancelling `token` kills the scope. The returned derived token is
    /// cancelled as the scope shuts down, whatever triggered that, so it is
    /// the handle to hand to consumers outside the tree that should unwind
    /// with the scope.
    pub fn with_token(token: CancellationToken) -> (Scope, CancellationToken) {
        let scope = Scope::new_root();
        let derived = scope.bind_token(token);
        (scope, derived)
    }

    /// Creates a child scope of `self` bound to `token`, as
    /// [`with_token`](Scope::with_token) does for a root.
    ///
    /// Cancelling `token` kills only the child subtree; `self` is untouched.
    pub fn child_with_token(&self, token: CancellationToken) -> (Scope, CancellationToken) {
        let child = self.new_child();
        let derived = child.bind_token(token);
        (child, derived)
    }

    /// Returns a token that is cancelled no later than this scope's *done*.
    ///
    /// With `Some(parent)` the result is a fresh child of `parent`, so it
    /// also inherits the parent's cancellation. With `None` the result
    /// derives from the bound inbound token, installing a detached background
    /// source first if the scope has none; repeated `None` calls share one
    /// cached token until it is cancelled, after which a fresh one is minted.
    ///
    /// On a scope that is already shutting down the returned token is
    /// cancelled before it is handed back.
    pub fn derive_token(&self, parent: Option<&CancellationToken>) -> CancellationToken {
        let mut links = self.inner.links.lock();

        if parent.is_none() && !self.is_dead() {
            // Reuse the cached derivation while it is live; evict it if some
            // caller has already cancelled it.
            match links.primary.take() {
                Some(primary) if !primary.is_cancelled() => {
                    links.primary = Some(primary.clone());
                    return primary;
                }
                _ => {}
            }
        }

        let derived = match parent {
            Some(source) => source.child_token(),
            None => links
                .bound
                .get_or_insert_with(CancellationToken::new)
                .child_token(),
        };

        // The dead check happens under the registry lock: either we register
        // before the shutdown driver drains the registry, or we observe the
        // dead flag and cancel here. No derived token escapes both.
        if self.is_dead() {
            drop(links);
            derived.cancel();
            return derived;
        }

        links.issued.retain(|t| !t.is_cancelled());
        links.issued.push(derived.clone());
        if parent.is_none() {
            links.primary = Some(derived.clone());
        }
        derived
    }

    fn bind_token(&self, token: CancellationToken) -> CancellationToken {
        debug!(scope = self.inner.id, "binding cancellation token");
        self.watch_token(token.clone());
        self.inner.links.lock().bound = Some(token);
        self.derive_token(None)
    }

    /// One auxiliary task per binding: whichever of the scope's *dying* and
    /// the token's cancellation fires first settles the race. An inbound
    /// cancellation turns into a graceful kill.
    fn watch_token(&self, token: CancellationToken) {
        let scope = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = scope.hold() => {}
                _ = token.cancelled() => scope.kill().await,
            }
        });
    }

    /// Shutdown step: cancel everything handed out, then forget it. The
    /// bound inbound token is deliberately left alone.
    pub(crate) fn cancel_issued_tokens(&self) -> usize {
        let issued = {
            let mut links = self.inner.links.lock();
            links.primary = None;
            std::mem::take(&mut links.issued)
        };
        let count = issued.len();
        for token in issued {
            token.cancel();
        }
        count
    }
}
