//! Native attribute stores
//!
//! [`platform_store`] picks the [`IAttributeStore`] for the build target:
//! the Win32 attribute word on Windows, and [`NoopAttributeStore`] everywhere
//! else. With the no-op store every descriptor carries an empty attribute
//! set, so attribute reconciliation never fires.

use std::io;
use std::path::Path;
use std::sync::Arc;

use dirmirror_core::domain::descriptor::PlatformAttributes;
use dirmirror_core::ports::attribute_store::IAttributeStore;

/// Attribute store for platforms without a native attribute word
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAttributeStore;

impl IAttributeStore for NoopAttributeStore {
    fn query_attributes(&self, _path: &Path) -> io::Result<PlatformAttributes> {
        Ok(PlatformAttributes::empty())
    }

    fn set_attributes(&self, _path: &Path, _attributes: PlatformAttributes) -> io::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(windows)]
pub use self::windows::WindowsAttributeStore;

/// Returns the attribute store native to the build target
#[must_use]
pub fn platform_store() -> Arc<dyn IAttributeStore> {
    #[cfg(windows)]
    {
        Arc::new(WindowsAttributeStore)
    }
    #[cfg(not(windows))]
    {
        Arc::new(NoopAttributeStore)
    }
}

#[cfg(windows)]
mod windows {
    use std::ffi::OsStr;
    use std::io;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr;

    use dirmirror_core::domain::descriptor::PlatformAttributes;
    use dirmirror_core::ports::attribute_store::IAttributeStore;
    use windows_sys::Win32::Storage::FileSystem::{
        GetFileAttributesW, GetFullPathNameW, SetFileAttributesW, INVALID_FILE_ATTRIBUTES,
    };

    /// Win32 `GetFileAttributesW` / `SetFileAttributesW` store
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WindowsAttributeStore;

    impl IAttributeStore for WindowsAttributeStore {
        fn query_attributes(&self, path: &Path) -> io::Result<PlatformAttributes> {
            let wide = extended_length_path(path)?;
            // SAFETY: `wide` is a NUL-terminated UTF-16 buffer that outlives the call.
            let raw = unsafe { GetFileAttributesW(wide.as_ptr()) };
            if raw == INVALID_FILE_ATTRIBUTES {
                return Err(io::Error::last_os_error());
            }
            Ok(PlatformAttributes::from_raw(raw))
        }

        fn set_attributes(&self, path: &Path, attributes: PlatformAttributes) -> io::Result<()> {
            let wide = extended_length_path(path)?;
            // SAFETY: `wide` is a NUL-terminated UTF-16 buffer that outlives the call.
            let ok = unsafe { SetFileAttributesW(wide.as_ptr(), u32::from(attributes.bits())) };
            if ok == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "win32"
        }
    }

    /// Resolves `path` against the working directory, collapsing `.` and
    /// `..` and turning `/` into `\`, then adds the `\\?\` prefix so long
    /// paths are accepted.
    pub(super) fn extended_length_path(path: &Path) -> io::Result<Vec<u16>> {
        let mut input: Vec<u16> = path.as_os_str().encode_wide().collect();
        if input.starts_with(&VERBATIM_PREFIX) {
            input.push(0);
            return Ok(input);
        }
        input.push(0);

        let full = full_path_name(&input)?;
        let mut wide: Vec<u16> = Vec::with_capacity(full.len() + 8);
        if let Some(share) = full.strip_prefix(&UNC_PREFIX) {
            wide.extend(OsStr::new(r"\\?\UNC\").encode_wide());
            wide.extend_from_slice(share);
        } else {
            wide.extend_from_slice(&VERBATIM_PREFIX);
            wide.extend_from_slice(&full);
        }
        wide.push(0);
        Ok(wide)
    }

    const VERBATIM_PREFIX: [u16; 4] = [b'\\' as u16, b'\\' as u16, b'?' as u16, b'\\' as u16];
    const UNC_PREFIX: [u16; 2] = [b'\\' as u16, b'\\' as u16];

    /// `GetFullPathNameW` over a NUL-terminated input, without the trailing NUL
    fn full_path_name(input: &[u16]) -> io::Result<Vec<u16>> {
        let mut buffer: Vec<u16> = vec![0; 260];
        loop {
            let capacity = u32::try_from(buffer.len())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path too long"))?;
            // SAFETY: `input` is NUL-terminated and `buffer` holds `capacity` elements.
            let written = unsafe {
                GetFullPathNameW(input.as_ptr(), capacity, buffer.as_mut_ptr(), ptr::null_mut())
            };
            if written == 0 {
                return Err(io::Error::last_os_error());
            }
            // On overflow the return value is the size needed, NUL included.
            if written < capacity {
                buffer.truncate(written as usize);
                return Ok(buffer);
            }
            buffer.resize(written as usize, 0);
        }
    }
}
