// MIT License
// Copyright 2025--present optq developers

//! Error type for the safe boundary layer.
//!
//! The C surface never exposes this type directly: `c_api` converts every
//! variant into a status code plus the thread-local last-error message, or
//! into the null/zero sentinel the lenient contract promises. Rust callers
//! going through [`crate::session`] get the full `Result`.

use thiserror::Error;

/// Failures that can occur at the adapter boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// A handle was null, never allocated, or its session was destroyed.
    #[error("invalid or stale handle")]
    InvalidHandle,

    /// Handles from different engine sessions were combined in one call.
    #[error("handle belongs to a different engine session")]
    SessionMismatch,

    /// The engine rejected the forwarded operation without detail.
    #[error("engine rejected the operation")]
    Rejected,

    /// The engine reported a failure.
    #[error("engine failure: {0}")]
    Engine(String),
}

/// Result type alias for boundary operations.
pub type Result<T> = std::result::Result<T, Error>;
