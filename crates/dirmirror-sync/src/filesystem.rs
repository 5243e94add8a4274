//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] on top of `std::fs`.
//!
//! ## Design Decisions
//!
//! - **Probe**: follows symlinks, maps `NotFound` to `None` and reads the
//!   native attribute word through the injected [`IAttributeStore`].
//! - **Copy**: streams through a fixed-size read buffer; both handles are
//!   scoped to the call so they are closed on success and on error.
//! - **Times**: only the modification time is written, by path on Unix;
//!   the access time is left untouched.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dirmirror_core::domain::descriptor::{EntryKind, FileDescriptor, PlatformAttributes};
use dirmirror_core::ports::attribute_store::IAttributeStore;
use dirmirror_core::ports::local_filesystem::ILocalFileSystem;
use tracing::{debug, instrument};

use crate::attributes::platform_store;

/// Default read buffer for content copies (64 KiB)
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Adapter that bridges the [`ILocalFileSystem`] port to the real filesystem.
#[derive(Clone)]
pub struct LocalFileSystemAdapter {
    attributes: Arc<dyn IAttributeStore>,
    buffer_size: usize,
}

impl LocalFileSystemAdapter {
    /// Create an adapter using the attribute store native to this platform.
    #[must_use]
    pub fn new() -> Self {
        Self::with_attribute_store(platform_store())
    }

    /// Create an adapter backed by a specific attribute store.
    #[must_use]
    pub fn with_attribute_store(attributes: Arc<dyn IAttributeStore>) -> Self {
        Self {
            attributes,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the read buffer used for content copies.
    #[must_use]
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes.max(1);
        self
    }

    /// Name of the attribute store in use.
    #[must_use]
    pub fn attribute_store_name(&self) -> &'static str {
        self.attributes.name()
    }
}

impl Default for LocalFileSystemAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalFileSystemAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileSystemAdapter")
            .field("attributes", &self.attributes.name())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

// ============================================================================
// ILocalFileSystem implementation
// ============================================================================

impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn probe(&self, path: &Path) -> io::Result<Option<FileDescriptor>> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("path not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else if metadata.is_file() {
            EntryKind::RegularFile
        } else {
            EntryKind::Other
        };

        let modified = DateTime::<Utc>::from(metadata.modified()?);
        let attributes = self.attributes.query_attributes(path)?;

        let descriptor = FileDescriptor {
            kind,
            modified,
            size: metadata.len(),
            permission_bits: permission_bits(&metadata),
            attributes,
        };

        debug!(
            kind = %descriptor.kind,
            size = descriptor.size,
            modified = %descriptor.modified,
            "probed"
        );
        Ok(Some(descriptor))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn create_directory(&self, path: &Path, permission_bits: u32) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(permission_bits);
        }
        #[cfg(not(unix))]
        let _ = permission_bits;

        builder.create(path)?;
        debug!("directory created");
        Ok(())
    }

    #[instrument(skip(self), fields(source = %source.display(), target = %target.display()))]
    fn copy_file(&self, source: &Path, target: &Path, permission_bits: u32) -> io::Result<u64> {
        let source_file = File::open(source)?;
        let mut reader = BufReader::with_capacity(self.buffer_size, source_file);

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(permission_bits);
        }
        let mut target_file = options.open(target)?;

        let bytes = io::copy(&mut reader, &mut target_file)?;

        // `mode` only applies on creation; an overwritten file keeps its old
        // bits unless they are set explicitly.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            target_file.set_permissions(fs::Permissions::from_mode(permission_bits))?;
        }
        #[cfg(not(unix))]
        let _ = permission_bits;

        debug!(bytes, "content copied");
        Ok(bytes)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)?;
        debug!("file removed");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display(), modified = %modified))]
    fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> io::Result<()> {
        write_modified(path, modified)?;
        debug!("modification time set");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display(), attributes = %attributes))]
    fn set_attributes(&self, path: &Path, attributes: PlatformAttributes) -> io::Result<()> {
        self.attributes.set_attributes(path, attributes)?;
        debug!(store = self.attributes.name(), "attributes set");
        Ok(())
    }
}

// ============================================================================
// Platform helpers
// ============================================================================

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    let base = if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    };
    if metadata.is_dir() {
        base | 0o111
    } else {
        base
    }
}

/// Sets the modification time by path and leaves the access time alone.
///
/// Only ownership of the entry is required; it is never opened.
#[cfg(unix)]
fn write_modified(path: &Path, modified: DateTime<Utc>) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "path contains a NUL byte"))?;

    // SAFETY: `timespec` is plain data; every field the call reads is set below.
    let mut times: [libc::timespec; 2] = unsafe { std::mem::zeroed() };
    times[0].tv_nsec = libc::UTIME_OMIT;
    times[1].tv_sec = modified.timestamp() as libc::time_t;
    times[1].tv_nsec = modified.timestamp_subsec_nanos() as _;

    // SAFETY: `c_path` is NUL-terminated and `times` holds exactly two entries.
    let rc = unsafe { libc::utimensat(libc::AT_FDCWD, c_path.as_ptr(), times.as_ptr(), 0) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Sets the modification time through a handle opened for attribute
/// writes only, which also works on directories.
#[cfg(windows)]
fn write_modified(path: &Path, modified: DateTime<Utc>) -> io::Result<()> {
    use std::fs::FileTimes;
    use std::os::windows::fs::OpenOptionsExt;
    use std::time::SystemTime;
    use windows_sys::Win32::Storage::FileSystem::{
        FILE_FLAG_BACKUP_SEMANTICS, FILE_WRITE_ATTRIBUTES,
    };

    let handle = OpenOptions::new()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
        .open(path)?;
    handle.set_times(FileTimes::new().set_modified(SystemTime::from(modified)))
}

#[cfg(not(any(unix, windows)))]
fn write_modified(path: &Path, modified: DateTime<Utc>) -> io::Result<()> {
    use std::fs::FileTimes;
    use std::time::SystemTime;

    let handle = OpenOptions::new().write(true).open(path)?;
    handle.set_times(FileTimes::new().set_modified(SystemTime::from(modified)))
}

// ============================================================================
// Unit tests
// ============================================================================
