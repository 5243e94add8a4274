//! One-way mirror engine
//!
//! The [`MirrorEngine`] makes a target directory tree converge on a source
//! tree.
//!
//! ## Mirror Flow
//!
//! 1. **Walk**: visit every source entry in pre-order
//! 2. **Probe**: read fresh metadata for the source entry and its target
//! 3. **Decide**: ask [`ReconciliationPolicy`] for the content action
//! 4. **Execute**: apply it and re-probe the target
//! 5. **Attributes**: compare attributes against the re-probed target
//! 6. **Directory times**: once a directory's subtree is done, put its
//!    modification time back (creating children bumps it)
//!
//! The run stops at the first error. Entries already reconciled stay
//! reconciled; nothing is rolled back.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use dirmirror_core::config::Config;
use dirmirror_core::domain::action::Action;
use dirmirror_core::domain::descriptor::{EntryKind, FileDescriptor};
use dirmirror_core::domain::path::EntryPath;
use dirmirror_core::policy::ReconciliationPolicy;
use dirmirror_core::ports::local_filesystem::ILocalFileSystem;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::diff::{DiffReporter, DiffStage};
use crate::executor::Executor;
use crate::walker::Walker;
use crate::SyncError;

// ============================================================================
// MirrorResult
// ============================================================================

/// Summary of a completed mirror run
///
/// In a dry run the counters describe what would have been done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorResult {
    /// Source entries visited, the root included
    pub entries_visited: u64,
    /// Source entries that are neither directories nor regular files
    pub entries_skipped: u64,
    /// Target directories created
    pub directories_created: u64,
    /// Target files created
    pub files_copied: u64,
    /// Existing target files whose content was replaced
    pub files_updated: u64,
    /// Entries whose modification time alone was corrected
    pub mod_times_updated: u64,
    /// Entries whose native attributes were updated
    pub attributes_updated: u64,
    /// Directory times put back after their subtree changed them
    pub directory_times_restored: u64,
    /// Bytes written by content copies
    pub bytes_copied: u64,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
    /// Whether the run only planned actions
    pub dry_run: bool,
}

impl MirrorResult {
    /// Number of changes made (or planned) to the target tree
    pub fn total_changes(&self) -> u64 {
        self.directories_created
            + self.files_copied
            + self.files_updated
            + self.mod_times_updated
            + self.attributes_updated
            + self.directory_times_restored
    }

    /// Returns true if the target already matched the source
    pub fn is_unchanged(&self) -> bool {
        self.total_changes() == 0
    }

    fn record(&mut self, action: &Action, bytes: u64) {
        match action {
            Action::CreateDirectory => self.directories_created += 1,
            Action::CreateFile => self.files_copied += 1,
            Action::UpdateContent { .. } => self.files_updated += 1,
            Action::UpdateModTime => self.mod_times_updated += 1,
            Action::UpdateAttributes(_) => self.attributes_updated += 1,
            Action::NoOp | Action::Conflict(_) => {}
        }
        self.bytes_copied += bytes;
    }
}

// ============================================================================
// MirrorEngine
// ============================================================================

/// A directory whose time is restored once its subtree has been walked
struct PendingDirectory {
    depth: usize,
    entry: EntryPath,
}

/// Drives walk -> probe -> decide -> execute over a source tree
pub struct MirrorEngine {
    fs: Arc<dyn ILocalFileSystem>,
    executor: Executor,
    diff: DiffReporter,
    dry_run: bool,
}

impl MirrorEngine {
    /// Creates an engine that mirrors through `fs`
    pub fn new(fs: Arc<dyn ILocalFileSystem>, diff: DiffReporter) -> Self {
        Self {
            executor: Executor::new(Arc::clone(&fs), diff),
            fs,
            diff,
            dry_run: false,
        }
    }

    /// Creates an engine with the diff report switched per `config`
    pub fn from_config(fs: Arc<dyn ILocalFileSystem>, config: &Config) -> Self {
        Self::new(fs, DiffReporter::new(config.report.diff))
    }

    /// Only plan actions; the target tree is never modified
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns true if the engine only plans actions
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Mirrors `source_root` onto `target_root`
    ///
    /// The target root is created if missing; its parent must exist.
    #[instrument(skip(self), fields(
        source = %source_root.display(),
        target = %target_root.display(),
        dry_run = self.dry_run
    ))]
    pub fn run(&self, source_root: &Path, target_root: &Path) -> Result<MirrorResult, SyncError> {
        let started = Instant::now();
        let mut result = MirrorResult {
            dry_run: self.dry_run,
            ..MirrorResult::default()
        };
        let mut pending: Vec<PendingDirectory> = Vec::new();

        info!("Walking directory {}", source_root.display());

        for walked in Walker::new(source_root).entries() {
            let walked = walked?;

            while pending.last().is_some_and(|p| p.depth >= walked.depth) {
                if let Some(done) = pending.pop() {
                    self.restore_directory_time(&done.entry, &mut result)?;
                }
            }

            result.entries_visited += 1;
            let entry = EntryPath::new(source_root, target_root, &walked.path)?;

            let source = match self.probe(entry.source())? {
                Some(source) => source,
                None if walked.kind == EntryKind::Other => {
                    warn!(path = %entry, "Skipping dangling link");
                    result.entries_skipped += 1;
                    continue;
                }
                None => return Err(SyncError::SourceVanished(entry.source().to_path_buf())),
            };

            if source.kind == EntryKind::Other {
                warn!(
                    path = %entry,
                    kind = %source.kind,
                    "Skipping entry that is neither a directory nor a regular file"
                );
                result.entries_skipped += 1;
                continue;
            }

            if walked.kind == EntryKind::Directory {
                debug!(path = %entry, depth = walked.depth, "Entering directory");
            }

            let target = self.probe(entry.target())?;

            if self.dry_run {
                self.plan(&entry, &source, target.as_ref(), &mut result)?;
            } else {
                self.reconcile(&entry, &source, target, &mut result)?;
            }

            // Symlinked directories are mirrored as directories but never
            // descended, so only walked directories get a pending restore.
            if walked.kind == EntryKind::Directory {
                pending.push(PendingDirectory {
                    depth: walked.depth,
                    entry,
                });
            }
        }

        while let Some(done) = pending.pop() {
            self.restore_directory_time(&done.entry, &mut result)?;
        }

        result.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            visited = result.entries_visited,
            skipped = result.entries_skipped,
            changes = result.total_changes(),
            bytes_copied = result.bytes_copied,
            duration_ms = result.duration_ms,
            dry_run = result.dry_run,
            "Mirror complete"
        );

        Ok(result)
    }

    fn probe(&self, path: &Path) -> Result<Option<FileDescriptor>, SyncError> {
        self.fs.probe(path).map_err(|e| SyncError::stat(path, e))
    }

    /// Applies content actions, then attributes against the fresh target
    fn reconcile(
        &self,
        entry: &EntryPath,
        source: &FileDescriptor,
        target: Option<FileDescriptor>,
        result: &mut MirrorResult,
    ) -> Result<(), SyncError> {
        let mut current = target;

        for action in ReconciliationPolicy::decide_content(source, current.as_ref()) {
            if action == Action::NoOp {
                continue;
            }
            let outcome = self
                .executor
                .apply(entry, source, current.as_ref(), &action)?;
            result.record(&action, outcome.bytes_copied);
            current = Some(outcome.target);
        }

        let Some(target) = current else {
            return Err(SyncError::TargetVanished(entry.target().to_path_buf()));
        };

        if let Some(action) = ReconciliationPolicy::decide_attributes(source, &target) {
            let outcome = self.executor.apply(entry, source, Some(&target), &action)?;
            result.record(&action, outcome.bytes_copied);
        }

        Ok(())
    }

    /// Records the actions a live run would take, touching nothing
    fn plan(
        &self,
        entry: &EntryPath,
        source: &FileDescriptor,
        target: Option<&FileDescriptor>,
        result: &mut MirrorResult,
    ) -> Result<(), SyncError> {
        let mut actions = ReconciliationPolicy::decide(source, target);

        // Attributes of an entry about to be created would be set on it too.
        if target.is_none() && !source.attributes.is_empty() {
            actions.push(Action::UpdateAttributes(source.attributes));
        }

        for action in actions {
            if let Action::Conflict(reason) = &action {
                return Err(SyncError::KindConflict {
                    path: entry.target().to_path_buf(),
                    expected: reason.expected,
                    found: reason.found,
                });
            }
            if !action.is_change() {
                continue;
            }

            info!(path = %entry, action = %action, "Planned action");
            if let Some(target) = target {
                self.diff
                    .report(DiffStage::Planned, &entry.to_string(), source, target);
            }
            let bytes = if action.copies_content() { source.size } else { 0 };
            result.record(&action, bytes);
        }

        Ok(())
    }

    /// Puts a directory's modification time back after its subtree was
    /// reconciled, if the subtree moved it
    fn restore_directory_time(
        &self,
        entry: &EntryPath,
        result: &mut MirrorResult,
    ) -> Result<(), SyncError> {
        if self.dry_run {
            return Ok(());
        }

        let source = self
            .probe(entry.source())?
            .ok_or_else(|| SyncError::SourceVanished(entry.source().to_path_buf()))?;
        let target = self
            .probe(entry.target())?
            .ok_or_else(|| SyncError::TargetVanished(entry.target().to_path_buf()))?;

        if ReconciliationPolicy::decide_content(&source, Some(&target)) != [Action::UpdateModTime] {
            return Ok(());
        }

        debug!(path = %entry, "Restoring directory time");
        self.executor
            .apply(entry, &source, Some(&target), &Action::UpdateModTime)?;
        result.directory_times_restored += 1;
        Ok(())
    }
}

impl std::fmt::Debug for MirrorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorEngine")
            .field("diff", &self.diff)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Unit tests
// ============================================================================
