//! Action executor
//!
//! Applies one [`Action`] to the target tree and re-probes the target so
//! the caller always continues from the state actually on disk. I/O
//! failures are mapped to the [`SyncError`] variant of the operation that
//! failed.

use std::sync::Arc;
use std::time::Instant;

use dirmirror_core::domain::action::Action;
use dirmirror_core::domain::descriptor::FileDescriptor;
use dirmirror_core::domain::path::EntryPath;
use dirmirror_core::ports::local_filesystem::ILocalFileSystem;
use tracing::{info, warn};

use crate::diff::{DiffReporter, DiffStage};
use crate::SyncError;

/// Result of applying one action
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Target descriptor re-probed after the action
    pub target: FileDescriptor,
    /// Bytes written by a content copy (0 for every other action)
    pub bytes_copied: u64,
}

/// Applies reconciliation actions through an [`ILocalFileSystem`]
pub struct Executor {
    fs: Arc<dyn ILocalFileSystem>,
    diff: DiffReporter,
}

impl Executor {
    /// Creates an executor writing through `fs` and reporting through `diff`
    pub fn new(fs: Arc<dyn ILocalFileSystem>, diff: DiffReporter) -> Self {
        Self { fs, diff }
    }

    /// Applies `action` for `entry`
    ///
    /// `before` is the target descriptor the action was decided against.
    /// A [`Action::Conflict`] is turned into [`SyncError::KindConflict`]
    /// without touching the filesystem.
    pub fn apply(
        &self,
        entry: &EntryPath,
        source: &FileDescriptor,
        before: Option<&FileDescriptor>,
        action: &Action,
    ) -> Result<ExecutionOutcome, SyncError> {
        let target_path = entry.target();
        let mut bytes_copied = 0;

        match action {
            Action::NoOp => {
                return before
                    .cloned()
                    .map(|target| ExecutionOutcome {
                        target,
                        bytes_copied: 0,
                    })
                    .ok_or_else(|| SyncError::TargetVanished(target_path.to_path_buf()));
            }

            Action::Conflict(reason) => {
                return Err(SyncError::KindConflict {
                    path: target_path.to_path_buf(),
                    expected: reason.expected,
                    found: reason.found,
                });
            }

            Action::CreateDirectory => {
                info!(path = %entry, "Creating directory");
                self.fs
                    .create_directory(target_path, source.permission_bits)
                    .map_err(|source| SyncError::CreateDirectory {
                        path: target_path.to_path_buf(),
                        source,
                    })?;
                self.set_modified(entry, source)?;
            }

            Action::CreateFile => {
                info!(path = %entry, size = source.size, "Copying file");
                bytes_copied = self.copy_with_time(entry, source)?;
            }

            Action::UpdateContent { remove_first } => {
                self.report_before(entry, source, before);
                info!(path = %entry, size = source.size, "Updating file");
                if *remove_first {
                    warn!(path = %entry, "Removing hidden target before update");
                    self.fs
                        .remove_file(target_path)
                        .map_err(|source| SyncError::Copy {
                            path: target_path.to_path_buf(),
                            source,
                        })?;
                }
                bytes_copied = self.copy_with_time(entry, source)?;
            }

            Action::UpdateModTime => {
                self.report_before(entry, source, before);
                info!(
                    path = %entry,
                    modified = %source.modified,
                    "Updating modification time"
                );
                self.set_modified(entry, source)?;
            }

            Action::UpdateAttributes(attributes) => {
                self.report_before(entry, source, before);
                info!(path = %entry, attributes = %attributes, "Updating attributes");
                self.fs
                    .set_attributes(target_path, *attributes)
                    .map_err(|source| SyncError::Attribute {
                        path: target_path.to_path_buf(),
                        source,
                    })?;
            }
        }

        let target = self
            .fs
            .probe(target_path)
            .map_err(|e| SyncError::stat(target_path, e))?
            .ok_or_else(|| SyncError::TargetVanished(target_path.to_path_buf()))?;

        self.diff
            .report(DiffStage::After, &entry.to_string(), source, &target);

        Ok(ExecutionOutcome {
            target,
            bytes_copied,
        })
    }

    fn report_before(
        &self,
        entry: &EntryPath,
        source: &FileDescriptor,
        before: Option<&FileDescriptor>,
    ) {
        if let Some(before) = before {
            self.diff
                .report(DiffStage::Before, &entry.to_string(), source, before);
        }
    }

    /// Copies the content and then the modification time; the logged
    /// throughput covers both steps.
    fn copy_with_time(
        &self,
        entry: &EntryPath,
        source: &FileDescriptor,
    ) -> Result<u64, SyncError> {
        let started = Instant::now();
        let bytes = self
            .fs
            .copy_file(entry.source(), entry.target(), source.permission_bits)
            .map_err(|e| SyncError::Copy {
                path: entry.target().to_path_buf(),
                source: e,
            })?;
        self.set_modified(entry, source)?;

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        let secs = elapsed.as_secs_f64();
        let kib_per_sec = if secs > 0.0 {
            (bytes as f64 / 1024.0) / secs
        } else {
            0.0
        };
        info!(
            path = %entry,
            bytes,
            elapsed_ms,
            kib_per_sec = %format!("{kib_per_sec:.1}"),
            "Copy finished"
        );

        Ok(bytes)
    }

    fn set_modified(&self, entry: &EntryPath, source: &FileDescriptor) -> Result<(), SyncError> {
        self.fs
            .set_modified(entry.target(), source.modified)
            .map_err(|e| SyncError::TimeUpdate {
                path: entry.target().to_path_buf(),
                source: e,
            })
    }
}
