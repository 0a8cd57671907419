//! # Scope Errors
//!
//! This module defines the error types used throughout the crate. The error
//! attached to a scope by a `_with_error` shutdown call is stored as a shared
//! trait object so any caller error type fits the slot.

use std::sync::Arc;

/// A caller-supplied error carried by a scope to shutdown.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when operating on a scope.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// A `_with_error` shutdown call found the error slot already occupied.
    /// The slot is write-once; shutdown is not driven by the failed call.
    #[error("scope error already set")]
    ErrorAlreadySet,
}
