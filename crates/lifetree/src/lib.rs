//! # Lifetree
//!
//! > **A tree of lifecycles with ordered, graceful shutdown.**
//!
//! This crate organizes a process's long-running concurrent work into a tree
//! of [`Scope`]s. Each scope tracks a set of in-flight activities, propagates
//! shutdown from parent toward the leaves, and guarantees that a parent never
//! finishes shutting down before every descendant has finished first. Ordered
//! cleanup hooks and a two-way bridge to [`CancellationToken`] round out the
//! model.
//!
//! ## Core Concepts
//!
//! ### The Scope Tree
//!
//! A [`Scope`] is a clonable handle to one node of the tree. Roots come from
//! [`Scope::new_root`]; the tree grows through [`Scope::new_child`] and the
//! spawning helpers ([`go`](Scope::go), [`spawn_worker`](Scope::spawn_worker)),
//! which give each spawned task its own child scope.
//!
//! ### Tracking
//!
//! [`mark`](Scope::mark) and [`unmark`](Scope::unmark) bracket units of
//! in-flight work, like a `WaitGroup`. A scope does not report itself *dead*
//! until every mark has been balanced, so shutdown reliably waits for work
//! in progress. The `wrap*`/`go*` helpers do the bracketing for you, panic
//! and cancellation included.
//!
//! ### The Three Phases
//!
//! Termination walks a scope through three latched, monotonic phases:
//!
//! | Phase | Raised when | Await with |
//! |-------|-------------|------------|
//! | *dying* | shutdown begins | [`hold`](Scope::hold) |
//! | *dead* | children done, activity drained | [`wait`](Scope::wait) |
//! | *done* | hooks ran, tokens cancelled | [`wait_done`](Scope::wait_done) |
//!
//! Tracked activities typically park on `hold()` and treat its return as the
//! order to wind down. The raw [`Latch`]es behind the phases are exposed
//! ([`dying()`](Scope::dying), [`dead()`](Scope::dead), [`done()`](Scope::done))
//! for composing with timers or other branches of a `tokio::select!`.
//!
//! ### Kill vs. Cancel
//!
//! [`kill`](Scope::kill) and [`cancel`](Scope::cancel) run the identical
//! protocol, children first, and differ in exactly one way: `kill` executes
//! the termination hooks, `cancel` skips them. Both suspend until the scope
//! is *done*, so either call doubles as a join. [`kill_all`](Scope::kill_all)
//! and [`cancel_all`](Scope::cancel_all) walk to the root first and take the
//! whole tree down. The `_with_error` variants attach a caller error to the
//! entry-point scope on the way in; the error slot is write-once.
//!
//! ### Token Bridge
//!
//! [`Scope::with_token`] ties a scope to a [`CancellationToken`] in both
//! directions: cancelling the token kills the scope, and every token the
//! scope [derives](Scope::derive_token) is cancelled by the time the scope is
//! done. This is the glue for code that speaks tokens rather than scopes.
//!
//! ## Quick Start
//!
//! ```rust
//! use lifetree::Scope;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let root = Scope::new_root();
//!
//!     // A worker that polls until told to stop.
//!     root.go_in_loop(|| async {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!     });
//!
//!     // Cleanup runs on kill, in order, after all workers have exited.
//!     root.on_terminate_append(|| println!("connections closed"));
//!     root.on_terminate_prepend(|| println!("intake stopped"));
//!
//!     tokio::time::sleep(Duration::from_millis(30)).await;
//!     root.kill().await; // prints "intake stopped", then "connections closed"
//! }
//! ```
//!
//! ## Module Tour
//!
//! - [`scope`] — the tree, the phase machine, and the shutdown driver.
//! - [`latch`] — the one-shot broadcast event behind each phase.
//! - [`worker`] — the [`Worker`] trait for named long-running units.
//! - [`error`] — [`ScopeError`] and the attached-error slot type.
//! - [`tracing`] — subscriber setup for binaries.

pub mod error;
pub mod latch;
pub mod scope;
pub mod tracing;
pub mod worker;

mod hook;
mod spawn;
mod token;

// Re-export core types for convenience
pub use error::{ScopeError, SharedError};
pub use latch::Latch;
pub use scope::Scope;
pub use worker::Worker;

/// The external cancellation primitive the token bridge speaks.
pub use tokio_util::sync::CancellationToken;
