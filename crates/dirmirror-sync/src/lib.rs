//! dirmirror Sync - One-way mirror engine
//!
//! Provides:
//! - Pre-order walking of the source tree
//! - Fresh metadata probes on both sides for every decision
//! - Execution of reconciliation actions against the target tree
//! - Optional before/after diff reporting
//!
//! ## Modules
//!
//! - [`engine`] - Orchestrator driving walk -> probe -> decide -> execute
//! - [`filesystem`] - Local filesystem adapter (probe, copy, times, attributes)
//! - [`attributes`] - Native attribute stores selected per platform
//! - [`walker`] - Depth-first, pre-order source traversal
//! - [`executor`] - Applies one action and re-probes the target
//! - [`diff`] - Before/after descriptor comparison output

pub mod attributes;
pub mod diff;
pub mod engine;
pub mod executor;
pub mod filesystem;
pub mod walker;

use std::path::PathBuf;

use dirmirror_core::domain::descriptor::EntryKind;
use thiserror::Error;

/// Errors that abort a mirror run
///
/// "Path does not exist" is never an error: probes report it as `None` and
/// it drives the create actions. Every variant here is fatal.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Traversal of the source tree failed
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Reading metadata failed for a reason other than absence
    #[error("cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source and target kinds are incompatible
    #[error("{path} should be a {expected} but is a {found}")]
    KindConflict {
        path: PathBuf,
        expected: EntryKind,
        found: EntryKind,
    },

    /// A target directory could not be created
    #[error("cannot create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content could not be copied (or the stale target could not be removed)
    #[error("cannot copy to {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The modification time could not be set
    #[error("cannot set modification time of {path}: {source}")]
    TimeUpdate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Native attributes could not be set
    #[error("cannot set attributes of {path}: {source}")]
    Attribute {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A walked source entry disappeared before it could be probed
    #[error("source entry vanished during the walk: {0}")]
    SourceVanished(PathBuf),

    /// A target entry disappeared right after an action was applied to it
    #[error("target entry vanished after update: {0}")]
    TargetVanished(PathBuf),

    /// A domain-level error propagated from dirmirror-core
    #[error("domain error: {0}")]
    Domain(#[from] dirmirror_core::domain::errors::DomainError),
}

impl SyncError {
    /// Wraps a stat failure with the path it concerns
    pub fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }
}
