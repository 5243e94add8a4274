//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! currently path pairing failures between the source and target roots.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path is not located under the root it was paired against
    #[error("Path not within root: {0}")]
    PathNotInRoot(String),
}
