//! Domain entities
//!
//! This module contains the core domain types for dirmirror:
//! - File descriptors and the platform attribute bitset
//! - Reconciliation actions
//! - Source/target path pairs
//! - Domain-specific error types

pub mod action;
pub mod descriptor;
pub mod errors;
pub mod path;

// Re-export commonly used types
pub use action::{Action, ConflictReason};
pub use descriptor::{EntryKind, FileDescriptor, PlatformAttributes};
pub use errors::DomainError;
pub use path::EntryPath;
