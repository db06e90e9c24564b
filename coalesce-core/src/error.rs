//! Error types for the coalesce core library
//!
//! This module provides structured error types using `thiserror` for
//! type-safe error handling across the library.
//!
//! # Error Hierarchy
//!
//! ```text
//! ScheduleError  - Observed by callers awaiting a QueryHandle
//! ResolveError   - Returned by Resolver implementations
//! ```
//!
//! Committing results never fails outward: unknown tokens and callers that
//! went away are reported through [`CommitOutcome`](crate::CommitOutcome)
//! and logged instead.
//!
//! # Usage
//!
//! Library code should use the specific error types:
//!
//! ```rust,ignore
//! use coalesce_core::ResolveError;
//!
//! async fn fetch(ids: Vec<String>) -> Result<Vec<Item>, ResolveError> {
//!     // ...
//! }
//! ```
//!
//! Application code should use `anyhow` with context:
//!
//! ```rust,ignore
//! use anyhow::Context;
//!
//! let item = scheduler.schedule(id).await.context("Lookup abandoned")?;
//! ```

use thiserror::Error;

/// Errors observed by a caller awaiting a scheduled query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The scheduler was dropped while the query was still queued or pending
    #[error("Scheduler dropped before the query was committed")]
    Abandoned,
}

/// Errors that can occur while resolving a batch of queries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// The resolver returned a different number of results than queries
    #[error("Resolver returned {actual} results for {expected} queries")]
    LengthMismatch { expected: usize, actual: usize },

    /// The resolver failed to answer the batch
    #[error("Resolver failed: {0}")]
    Failed(String),
}

impl ResolveError {
    /// Create a resolver failure error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Create a length mismatch error
    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self::LengthMismatch { expected, actual }
    }
}
