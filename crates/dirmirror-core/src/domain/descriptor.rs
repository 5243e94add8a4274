//! File descriptors
//!
//! A [`FileDescriptor`] is a snapshot of one filesystem entry's metadata at a
//! single probe instant. Descriptors are created fresh for every comparison
//! and never carried from one entry to the next.

use std::fmt::{self, Display, Formatter};
use std::ops::BitOr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// EntryKind
// ============================================================================

/// Kind of a filesystem entry as far as mirroring is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A directory
    Directory,
    /// A regular file with byte content
    RegularFile,
    /// Anything else (FIFO, socket, device node)
    Other,
}

impl EntryKind {
    /// Returns the lowercase display name of this kind
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::RegularFile => "regular file",
            Self::Other => "other",
        }
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// PlatformAttributes
// ============================================================================

/// Native file attribute bitset, masked to its low 8 bits
///
/// The bit layout is the one used by the Windows attribute store, so values
/// can be passed to it unchanged. On platforms without such a store the set
/// is always empty.
///
/// `FILE_ATTRIBUTE_REPARSE_POINT` (0x400) lives above the low byte and is
/// therefore never part of a masked set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformAttributes(u8);

impl PlatformAttributes {
    /// `FILE_ATTRIBUTE_READONLY`
    pub const READ_ONLY: Self = Self(0x01);
    /// `FILE_ATTRIBUTE_HIDDEN`
    pub const HIDDEN: Self = Self(0x02);
    /// `FILE_ATTRIBUTE_SYSTEM`
    pub const SYSTEM: Self = Self(0x04);
    /// `FILE_ATTRIBUTE_DIRECTORY`
    pub const DIRECTORY: Self = Self(0x10);
    /// `FILE_ATTRIBUTE_ARCHIVE`
    pub const ARCHIVE: Self = Self(0x20);
    /// `FILE_ATTRIBUTE_NORMAL`
    pub const NORMAL: Self = Self(0x80);

    /// Short labels used when decoding a set for display, in bit order.
    const LABELS: [(Self, &'static str); 6] = [
        (Self::READ_ONLY, "RO"),
        (Self::HIDDEN, "H"),
        (Self::SYSTEM, "S"),
        (Self::DIRECTORY, "D"),
        (Self::ARCHIVE, "A"),
        (Self::NORMAL, "N"),
    ];

    /// The empty set
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Masks a raw native attribute word down to its low 8 bits
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self((raw & 0xFF) as u8)
    }

    /// Returns the 8-bit value
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Returns true if every bit of `other` is set in `self`
    #[must_use]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no bit is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Decodes the known flags into their short labels
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        Self::LABELS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, label)| *label)
            .collect()
    }
}

impl BitOr for PlatformAttributes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Display for PlatformAttributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)?;
        for label in self.labels() {
            write!(f, " {label}")?;
        }
        Ok(())
    }
}

// ============================================================================
// FileDescriptor
// ============================================================================

/// Snapshot of a filesystem entry's metadata
///
/// "Absent" is not a descriptor: probes return `None` when the path does not
/// exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Directory, regular file, or other
    pub kind: EntryKind,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Size in bytes as reported by the filesystem
    pub size: u64,
    /// Permission bits (Unix mode bits, or a synthesised mode elsewhere)
    pub permission_bits: u32,
    /// Native attribute bitset (always empty where unsupported)
    pub attributes: PlatformAttributes,
}

impl FileDescriptor {
    /// Returns true if this entry is a directory
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Returns true if this entry is a regular file
    #[must_use]
    pub fn is_regular_file(&self) -> bool {
        self.kind == EntryKind::RegularFile
    }

    /// Modification time of `self` minus that of `other`
    ///
    /// Positive when `self` is newer.
    #[must_use]
    pub fn time_delta(&self, other: &FileDescriptor) -> Duration {
        self.modified.signed_duration_since(other.modified)
    }

    /// Size of `self` minus that of `other`, in bytes
    #[must_use]
    pub fn size_delta(&self, other: &FileDescriptor) -> i128 {
        i128::from(self.size) - i128::from(other.size)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn descriptor(kind: EntryKind, secs: i64, nanos: u32, size: u64) -> FileDescriptor {
        FileDescriptor {
            kind,
            modified: Utc.timestamp_opt(secs, nanos).unwrap(),
            size,
            permission_bits: 0o644,
            attributes: PlatformAttributes::empty(),
        }
    }

    #[test]
    fn test_from_raw_masks_low_byte() {
        // FILE_ATTRIBUTE_REPARSE_POINT | FILE_ATTRIBUTE_ARCHIVE
        let attrs = PlatformAttributes::from_raw(0x400 | 0x20);
        assert_eq!(attrs.bits(), 0x20);
        assert_eq!(attrs, PlatformAttributes::ARCHIVE);
    }

    #[test]
    fn test_contains_and_union() {
        let attrs = PlatformAttributes::HIDDEN | PlatformAttributes::READ_ONLY;
        assert!(attrs.contains(PlatformAttributes::HIDDEN));
        assert!(attrs.contains(PlatformAttributes::READ_ONLY));
        assert!(!attrs.contains(PlatformAttributes::SYSTEM));
        assert!(!attrs.is_empty());
        assert!(PlatformAttributes::empty().is_empty());
    }

    #[test]
    fn test_labels_in_bit_order() {
        let attrs = PlatformAttributes::ARCHIVE
            | PlatformAttributes::HIDDEN
            | PlatformAttributes::READ_ONLY
            | PlatformAttributes::NORMAL;
        assert_eq!(attrs.labels(), vec!["RO", "H", "A", "N"]);
    }

    #[test]
    fn test_display_shows_bits_and_labels() {
        let attrs = PlatformAttributes::HIDDEN | PlatformAttributes::SYSTEM;
        assert_eq!(attrs.to_string(), "00000110 H S");
        assert_eq!(PlatformAttributes::empty().to_string(), "00000000");
    }

    #[test]
    fn test_time_delta_sign() {
        let newer = descriptor(EntryKind::RegularFile, 1_700_000_010, 0, 10);
        let older = descriptor(EntryKind::RegularFile, 1_700_000_000, 500, 10);

        assert!(newer.time_delta(&older) > Duration::zero());
        assert!(older.time_delta(&newer) < Duration::zero());
        assert_eq!(
            newer.time_delta(&older).num_nanoseconds(),
            Some(9_999_999_500)
        );
    }

    #[test]
    fn test_size_delta() {
        let big = descriptor(EntryKind::RegularFile, 0, 0, 100);
        let small = descriptor(EntryKind::RegularFile, 0, 0, 40);
        assert_eq!(big.size_delta(&small), 60);
        assert_eq!(small.size_delta(&big), -60);
    }

    #[test]
    fn test_kind_helpers() {
        let dir = descriptor(EntryKind::Directory, 0, 0, 0);
        let file = descriptor(EntryKind::RegularFile, 0, 0, 0);
        assert!(dir.is_directory());
        assert!(!dir.is_regular_file());
        assert!(file.is_regular_file());
        assert_eq!(EntryKind::RegularFile.to_string(), "regular file");
    }

    #[test]
    fn test_descriptor_serializes_attributes_as_number() {
        let mut desc = descriptor(EntryKind::RegularFile, 0, 0, 3);
        desc.attributes = PlatformAttributes::HIDDEN;
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["attributes"], 2);
        assert_eq!(json["kind"], "regular_file");
    }
}
