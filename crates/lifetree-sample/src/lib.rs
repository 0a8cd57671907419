//! # Lifetree Sample
//!
//! A small worker system coordinated by a `lifetree` scope tree.
//!
//! ## Core Components
//!
//! - **[workers]**: Two [`Worker`](lifetree::Worker) implementations, a
//!   periodic [`Heartbeat`](workers::Heartbeat) and a backlog-consuming
//!   [`QueueDrainer`](workers::QueueDrainer), each showing a different way to
//!   observe shutdown.
//! - **[lifecycle]**: The [`WorkerSystem`](lifecycle::WorkerSystem)
//!   orchestrator that wires the workers into one tree and shuts them down
//!   in order.
//!
//! The binary entry point in `main` runs the system for a moment and then
//! stops it, logging the whole shutdown sequence. A Ctrl-C stops it early
//! through the same cancellation token.

pub mod lifecycle;
pub mod workers;
