//! # Observability & Tracing
//!
//! Structured logging for the scope tree. The library itself only emits
//! `tracing` events (`debug!` for phase transitions, `warn!` for hook
//! panics), each carrying the numeric scope id as a structured field, so a
//! shutdown can be reconstructed from logs:
//!
//! ```text
//! DEBUG shutdown started scope=1 mode=Graceful
//! DEBUG waiting for tracked activity scope=1
//! DEBUG issued tokens cancelled scope=1 tokens=2
//! DEBUG shutdown complete scope=1
//! ```
//!
//! [`setup_tracing`] installs a subscriber suitable for binaries and demos.
//! Log levels are configured through `RUST_LOG`:
//!
//! ```bash
//! # Application-level events only
//! RUST_LOG=info cargo run
//!
//! # Include per-scope shutdown phases
//! RUST_LOG=debug cargo run
//! ```

/// Initializes a compact, env-filtered tracing subscriber.
///
/// Call once at process startup. Library users with their own subscriber
/// should skip this and let their subscriber receive the crate's events.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Scope ids carry the context; module paths just add noise
        .compact()
        .init();
}
