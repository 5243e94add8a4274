//! Source tree walker
//!
//! Depth-first, pre-order traversal of the source root: a directory is
//! always yielded before anything inside it, so by the time a child is
//! reconciled its parent already exists on the target side. Siblings are
//! visited in file name order. The root itself is the first entry.

use std::path::PathBuf;

use dirmirror_core::domain::descriptor::EntryKind;
use walkdir::WalkDir;

/// One entry produced by the walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path of the entry under the source root, as walked
    pub path: PathBuf,
    /// Distance from the root (the root has depth 0)
    pub depth: usize,
    /// Kind of the entry itself; symbolic links are reported as `Other`
    pub kind: EntryKind,
}

/// Pre-order walker over a source tree
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
}

impl Walker {
    /// Creates a walker rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Iterates over every entry exactly once
    ///
    /// The first traversal error is yielded as-is; callers stop there.
    pub fn entries(&self) -> impl Iterator<Item = Result<WalkEntry, walkdir::Error>> {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| {
                entry.map(|e| {
                    let file_type = e.file_type();
                    let kind = if file_type.is_dir() {
                        EntryKind::Directory
                    } else if file_type.is_file() {
                        EntryKind::RegularFile
                    } else {
                        EntryKind::Other
                    };
                    WalkEntry {
                        depth: e.depth(),
                        path: e.into_path(),
                        kind,
                    }
                })
            })
    }
}
