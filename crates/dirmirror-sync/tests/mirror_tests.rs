//! Integration tests for MirrorEngine
//!
//! Each test builds a fresh source/target pair under a temporary
//! directory and runs the engine against the real filesystem. Native
//! attributes go through an in-memory store so they can be exercised on
//! every platform.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use dirmirror_core::domain::descriptor::{EntryKind, FileDescriptor, PlatformAttributes};
use dirmirror_core::ports::{IAttributeStore, ILocalFileSystem};
use dirmirror_sync::diff::DiffReporter;
use dirmirror_sync::engine::{MirrorEngine, MirrorResult};
use dirmirror_sync::filesystem::LocalFileSystemAdapter;
use dirmirror_sync::SyncError;

// ============================================================================
// Test helpers
// ============================================================================

/// Attribute store backed by a map, shared between source and target
#[derive(Default)]
struct MemoryAttributes(Mutex<HashMap<PathBuf, PlatformAttributes>>);

impl IAttributeStore for MemoryAttributes {
    fn query_attributes(&self, path: &Path) -> io::Result<PlatformAttributes> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or_default())
    }

    fn set_attributes(&self, path: &Path, attributes: PlatformAttributes) -> io::Result<()> {
        self.0.lock().unwrap().insert(path.to_path_buf(), attributes);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct Harness {
    _dir: TempDir,
    source: PathBuf,
    target: PathBuf,
    attributes: Arc<MemoryAttributes>,
    fs: Arc<LocalFileSystemAdapter>,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let target = dir.path().join("target");
        std::fs::create_dir(&source).unwrap();

        let attributes = Arc::new(MemoryAttributes::default());
        let fs = Arc::new(LocalFileSystemAdapter::with_attribute_store(
            attributes.clone(),
        ));

        Self {
            _dir: dir,
            source,
            target,
            attributes,
            fs,
        }
    }

    fn run(&self) -> Result<MirrorResult, SyncError> {
        MirrorEngine::new(self.fs.clone(), DiffReporter::new(true)).run(&self.source, &self.target)
    }

    fn dry_run(&self) -> Result<MirrorResult, SyncError> {
        MirrorEngine::new(self.fs.clone(), DiffReporter::new(false))
            .with_dry_run(true)
            .run(&self.source, &self.target)
    }

    fn write(root: &Path, relative: &str, content: &[u8], modified: DateTime<Utc>) {
        let fs = LocalFileSystemAdapter::new();
        let path = root.join(relative);
        std::fs::write(&path, content).unwrap();
        fs.set_modified(&path, modified).unwrap();
    }

    fn mkdir(root: &Path, relative: &str) {
        std::fs::create_dir_all(root.join(relative)).unwrap();
    }

    fn touch(root: &Path, relative: &str, modified: DateTime<Utc>) {
        LocalFileSystemAdapter::new()
            .set_modified(&root.join(relative), modified)
            .unwrap();
    }

    fn target_entry(&self, relative: &str) -> Option<FileDescriptor> {
        self.fs.probe(&self.target.join(relative)).unwrap()
    }
}

/// Reference instant T
fn t() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn assert_time(actual: DateTime<Utc>, expected: DateTime<Utc>) {
    let drift = actual.signed_duration_since(expected);
    assert!(drift.abs() <= Duration::nanoseconds(100), "off by {drift:?}");
}

// ============================================================================
// Full runs
// ============================================================================

#[test]
fn test_empty_target_receives_whole_tree() {
    let h = Harness::new();
    Harness::write(&h.source, "a.txt", &[b'a'; 100], t());
    Harness::mkdir(&h.source, "subdir");
    Harness::write(&h.source, "subdir/b.txt", b"bee", t() + Duration::seconds(5));
    Harness::touch(&h.source, "subdir", t());

    let result = h.run().unwrap();

    let a = h.target_entry("a.txt").unwrap();
    assert_eq!(a.kind, EntryKind::RegularFile);
    assert_eq!(a.size, 100);
    assert_time(a.modified, t());

    let subdir = h.target_entry("subdir").unwrap();
    assert!(subdir.is_directory());
    assert_time(subdir.modified, t());

    let b = h.target_entry("subdir/b.txt").unwrap();
    assert_eq!(std::fs::read(h.target.join("subdir/b.txt")).unwrap(), b"bee");
    assert_time(b.modified, t() + Duration::seconds(5));

    assert_eq!(result.files_copied, 2);
    assert_eq!(result.directories_created, 2);
    assert_eq!(result.bytes_copied, 103);
}

#[test]
fn test_second_run_performs_no_changes() {
    let h = Harness::new();
    Harness::mkdir(&h.source, "one/two");
    Harness::write(&h.source, "one/two/deep.bin", &[0u8; 4096], t());
    Harness::write(&h.source, "one/top.txt", b"top", t() - Duration::days(3));
    Harness::write(&h.source, "root.txt", b"", t());

    h.run().unwrap();
    let second = h.run().unwrap();

    assert!(second.is_unchanged(), "{second:?}");
    assert_eq!(second.entries_visited, 6);
    assert_eq!(second.bytes_copied, 0);
}

#[test]
fn test_mirrored_tree_matches_source() {
    let h = Harness::new();
    Harness::mkdir(&h.source, "docs/archive");
    Harness::write(&h.source, "docs/readme.md", b"# readme", t());
    Harness::write(&h.source, "docs/archive/2019.tar", &[1u8; 2048], t() - Duration::days(900));
    Harness::touch(&h.source, "docs/archive", t() - Duration::days(10));
    Harness::touch(&h.source, "docs", t() - Duration::days(1));

    h.run().unwrap();

    for relative in ["docs", "docs/archive", "docs/readme.md", "docs/archive/2019.tar"] {
        let source = h.fs.probe(&h.source.join(relative)).unwrap().unwrap();
        let target = h.target_entry(relative).unwrap();
        assert_eq!(source.kind, target.kind, "{relative}");
        if source.is_regular_file() {
            assert_eq!(source.size, target.size, "{relative}");
        }
        assert_time(target.modified, source.modified);
        assert_eq!(source.attributes, target.attributes, "{relative}");
    }
}

// ============================================================================
// Time and size reconciliation
// ============================================================================

#[test]
fn test_target_newer_within_noise_is_left_alone() {
    let h = Harness::new();
    Harness::write(&h.source, "a.txt", b"same!", t());
    Harness::mkdir(&h.target, "");
    Harness::write(&h.target, "a.txt", b"other", t() + Duration::milliseconds(300));
    Harness::touch(&h.target, "", h.fs.probe(&h.source).unwrap().unwrap().modified);

    let result = h.run().unwrap();

    assert_eq!(result.files_updated, 0);
    assert_eq!(result.mod_times_updated, 0);
    // Same size and within the noise band: content is not compared.
    assert_eq!(std::fs::read(h.target.join("a.txt")).unwrap(), b"other");
}

#[test]
fn test_target_newer_by_two_seconds_only_gets_time() {
    let h = Harness::new();
    Harness::write(&h.source, "a.txt", b"same!", t());
    Harness::mkdir(&h.target, "");
    Harness::write(&h.target, "a.txt", b"other", t() + Duration::seconds(2));
    Harness::touch(&h.target, "", h.fs.probe(&h.source).unwrap().unwrap().modified);

    let result = h.run().unwrap();

    assert_eq!(result.files_updated, 0);
    assert_eq!(result.mod_times_updated, 1);
    assert_eq!(std::fs::read(h.target.join("a.txt")).unwrap(), b"other");
    assert_time(h.target_entry("a.txt").unwrap().modified, t());
}

#[test]
fn test_target_older_gets_new_content() {
    let h = Harness::new();
    Harness::write(&h.source, "a.txt", b"fresh", t());
    Harness::mkdir(&h.target, "");
    Harness::write(&h.target, "a.txt", b"stale", t() - Duration::seconds(2));

    let result = h.run().unwrap();

    assert_eq!(result.files_updated, 1);
    assert_eq!(std::fs::read(h.target.join("a.txt")).unwrap(), b"fresh");
    assert_time(h.target_entry("a.txt").unwrap().modified, t());
}

#[test]
fn test_size_mismatch_always_copies() {
    for offset in [
        Duration::zero(),
        Duration::milliseconds(-500),
        Duration::seconds(30),
        Duration::seconds(-30),
    ] {
        let h = Harness::new();
        Harness::write(&h.source, "a.txt", b"twelve bytes", t());
        Harness::mkdir(&h.target, "");
        Harness::write(&h.target, "a.txt", b"short", t() + offset);

        let result = h.run().unwrap();

        assert_eq!(result.files_updated, 1, "offset {offset:?}");
        assert_eq!(std::fs::read(h.target.join("a.txt")).unwrap(), b"twelve bytes");
    }
}

#[test]
fn test_existing_directory_time_is_corrected() {
    let h = Harness::new();
    Harness::mkdir(&h.source, "sub");
    Harness::touch(&h.source, "sub", t());
    Harness::mkdir(&h.target, "sub");
    Harness::touch(&h.target, "sub", t() - Duration::hours(1));

    h.run().unwrap();

    assert_time(h.target_entry("sub").unwrap().modified, t());
}

// ============================================================================
// Kind conflicts
// ============================================================================

#[test]
fn test_directory_over_file_aborts() {
    let h = Harness::new();
    Harness::write(&h.source, "a.txt", b"first", t());
    Harness::mkdir(&h.source, "photos");
    Harness::write(&h.source, "photos/1.jpg", b"jpg", t());
    Harness::mkdir(&h.target, "");
    Harness::write(&h.target, "photos", b"not a dir", t());

    let err = h.run().unwrap_err();

    match err {
        SyncError::KindConflict {
            path,
            expected,
            found,
        } => {
            assert_eq!(path, h.target.join("photos"));
            assert_eq!(expected, EntryKind::Directory);
            assert_eq!(found, EntryKind::RegularFile);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Entries reconciled before the conflict stay in place.
    assert_eq!(std::fs::read(h.target.join("a.txt")).unwrap(), b"first");
    assert_eq!(std::fs::read(h.target.join("photos")).unwrap(), b"not a dir");
}

#[test]
fn test_file_over_directory_aborts() {
    let h = Harness::new();
    Harness::write(&h.source, "report", b"data", t());
    Harness::mkdir(&h.target, "report");

    let err = h.run().unwrap_err();

    assert!(matches!(
        err,
        SyncError::KindConflict {
            expected: EntryKind::RegularFile,
            found: EntryKind::Directory,
            ..
        }
    ));
    assert!(h.target.join("report").is_dir());
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_attributes_follow_source() {
    let h = Harness::new();
    Harness::write(&h.source, "secret.txt", b"s", t());
    h.attributes
        .set_attributes(
            &h.source.join("secret.txt"),
            PlatformAttributes::HIDDEN | PlatformAttributes::ARCHIVE,
        )
        .unwrap();

    let first = h.run().unwrap();
    assert_eq!(first.attributes_updated, 1);
    assert_eq!(
        h.target_entry("secret.txt").unwrap().attributes,
        PlatformAttributes::HIDDEN | PlatformAttributes::ARCHIVE
    );

    let second = h.run().unwrap();
    assert!(second.is_unchanged(), "{second:?}");
}

#[test]
fn test_attribute_drift_alone_is_corrected() {
    let h = Harness::new();
    Harness::write(&h.source, "a.txt", b"a", t());
    h.run().unwrap();

    h.attributes
        .set_attributes(&h.target.join("a.txt"), PlatformAttributes::READ_ONLY)
        .unwrap();

    let result = h.run().unwrap();
    assert_eq!(result.attributes_updated, 1);
    assert_eq!(result.files_updated, 0);
    assert!(h.target_entry("a.txt").unwrap().attributes.is_empty());
}

#[cfg(unix)]
#[test]
fn test_hidden_target_is_removed_before_update() {
    let h = Harness::new();
    Harness::write(&h.source, "a.txt", b"new content", t());
    Harness::mkdir(&h.target, "");
    Harness::write(&h.target, "a.txt", b"old", t() - Duration::days(1));
    h.attributes
        .set_attributes(&h.target.join("a.txt"), PlatformAttributes::HIDDEN)
        .unwrap();
    let witness = h.target.join("..").join("witness");
    std::fs::hard_link(h.target.join("a.txt"), &witness).unwrap();

    let result = h.run().unwrap();

    assert_eq!(result.files_updated, 1);
    assert_eq!(std::fs::read(h.target.join("a.txt")).unwrap(), b"new content");
    // A fresh file was created; the old inode still holds the old bytes.
    assert_eq!(std::fs::read(&witness).unwrap(), b"old");
    assert!(h.target_entry("a.txt").unwrap().attributes.is_empty());
}

// ============================================================================
// Dry run and failures
// ============================================================================

#[test]
fn test_dry_run_plans_without_writing() {
    let h = Harness::new();
    Harness::write(&h.source, "a.txt", b"abc", t());
    Harness::mkdir(&h.source, "sub");
    Harness::write(&h.source, "sub/b.txt", b"defg", t());

    let planned = h.dry_run().unwrap();

    assert!(planned.dry_run);
    assert_eq!(planned.directories_created, 2);
    assert_eq!(planned.files_copied, 2);
    assert_eq!(planned.bytes_copied, 7);
    assert!(!h.target.exists());

    let applied = h.run().unwrap();
    assert_eq!(applied.files_copied, planned.files_copied);
    assert_eq!(applied.directories_created, planned.directories_created);
}

#[test]
fn test_missing_source_root_fails() {
    let h = Harness::new();
    std::fs::remove_dir(&h.source).unwrap();

    assert!(matches!(h.run().unwrap_err(), SyncError::Walk(_)));
    assert!(!h.target.exists());
}

#[test]
fn test_target_parent_must_exist() {
    let h = Harness::new();
    Harness::write(&h.source, "a.txt", b"a", t());

    let err = MirrorEngine::new(h.fs.clone(), DiffReporter::default())
        .run(&h.source, &h.target.join("nested/deeper"))
        .unwrap_err();

    assert!(matches!(err, SyncError::CreateDirectory { .. }));
}
