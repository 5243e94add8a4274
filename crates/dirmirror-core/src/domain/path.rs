//! Source/target path pairs
//!
//! Every walked entry is addressed by an [`EntryPath`]: its absolute source
//! path, the path relative to the source root, and the same relative path
//! joined onto the target root.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};

use super::errors::DomainError;

/// A walked entry addressed on both sides of the mirror
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPath {
    source: PathBuf,
    relative: PathBuf,
    target: PathBuf,
}

impl EntryPath {
    /// Pairs `source` (which must lie under `source_root`) with its
    /// counterpart under `target_root`
    ///
    /// # Errors
    /// Returns `DomainError::PathNotInRoot` if `source` is not under
    /// `source_root`, or `DomainError::InvalidPath` if the relative part
    /// would climb out of the target root.
    pub fn new(source_root: &Path, target_root: &Path, source: &Path) -> Result<Self, DomainError> {
        let relative = source.strip_prefix(source_root).map_err(|_| {
            DomainError::PathNotInRoot(format!(
                "{} is not within {}",
                source.display(),
                source_root.display()
            ))
        })?;

        Self::from_relative(source_root, target_root, relative)
    }

    /// Builds a pair from a path already relative to the source root
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if `relative` is absolute or
    /// contains `..` components.
    pub fn from_relative(
        source_root: &Path,
        target_root: &Path,
        relative: &Path,
    ) -> Result<Self, DomainError> {
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(DomainError::InvalidPath(format!(
                "Relative entry path must stay within the root: {}",
                relative.display()
            )));
        }

        let relative: PathBuf = relative
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();

        Ok(Self {
            source: join_relative(source_root, &relative),
            target: join_relative(target_root, &relative),
            relative,
        })
    }

    /// Absolute (or root-anchored) path on the source side
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Path relative to both roots; empty for the roots themselves
    #[must_use]
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Path on the target side
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Returns true if this pair addresses the two roots
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }
}

fn join_relative(root: &Path, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

/// Displays the relative path, with `.` for the roots
impl Display for EntryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            write!(f, "{}", self.relative.display())
        }
    }
}
