//! Local filesystem port (driven/secondary port)
//!
//! This module defines the interface the mirror engine uses to look at and
//! change entries on disk.
//!
//! ## Design Notes
//!
//! - Uses `std::io::Result` so callers can classify failures (stat, copy,
//!   time update, attribute update) with the path they concern.
//! - `probe` distinguishes "does not exist" (`Ok(None)`) from every other
//!   stat failure (`Err`).
//! - Every call hits the filesystem; nothing is cached between calls.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::descriptor::{FileDescriptor, PlatformAttributes};

/// Port trait for local filesystem operations
pub trait ILocalFileSystem: Send + Sync {
    /// Returns a fresh descriptor for `path`, or `None` if it does not exist
    ///
    /// Symbolic links are followed.
    fn probe(&self, path: &Path) -> io::Result<Option<FileDescriptor>>;

    /// Creates a single directory with the given permission bits
    ///
    /// The parent must already exist.
    fn create_directory(&self, path: &Path, permission_bits: u32) -> io::Result<()>;

    /// Streams all bytes of `source` into `target`, creating or truncating
    /// it, and applies `permission_bits` to the result
    ///
    /// Both handles are released before this returns, on every path.
    ///
    /// # Returns
    /// The number of bytes copied
    fn copy_file(&self, source: &Path, target: &Path, permission_bits: u32) -> io::Result<u64>;

    /// Removes a regular file
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Sets only the modification time of `path`
    fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> io::Result<()>;

    /// Replaces the native attribute set of `path`
    fn set_attributes(&self, path: &Path, attributes: PlatformAttributes) -> io::Result<()>;
}
