//! Reconciliation actions
//!
//! An [`Action`] is one step the executor takes to bring a target entry in
//! line with its source. Several actions may apply to the same entry; they
//! are always applied in the order the policy produced them.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::descriptor::{EntryKind, PlatformAttributes};

/// Why an entry cannot be reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReason {
    /// Kind of the source entry
    pub expected: EntryKind,
    /// Kind found at the target path
    pub found: EntryKind,
}

impl Display for ConflictReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "target should be a {} but is a {}", self.expected, self.found)
    }
}

/// A single reconciliation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "detail", rename_all = "snake_case")]
pub enum Action {
    /// Nothing to do for content and time
    NoOp,
    /// Create the target directory, then set its modification time
    CreateDirectory,
    /// Copy the full content to a new target file, then set its modification time
    CreateFile,
    /// Overwrite the target content, then set its modification time
    UpdateContent {
        /// The target must be removed before it can be rewritten
        /// (hidden files cannot be overwritten in place)
        remove_first: bool,
    },
    /// Set only the target modification time
    UpdateModTime,
    /// Set the target attribute bitset
    UpdateAttributes(PlatformAttributes),
    /// Source and target kinds are incompatible; fatal
    Conflict(ConflictReason),
}

impl Action {
    /// Returns true if the action modifies the target
    #[must_use]
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp | Self::Conflict(_))
    }

    /// Returns true if the action copies content
    #[must_use]
    pub fn copies_content(&self) -> bool {
        matches!(self, Self::CreateFile | Self::UpdateContent { .. })
    }

    /// Short snake_case name of the action
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoOp => "no_op",
            Self::CreateDirectory => "create_directory",
            Self::CreateFile => "create_file",
            Self::UpdateContent { .. } => "update_content",
            Self::UpdateModTime => "update_mod_time",
            Self::UpdateAttributes(_) => "update_attributes",
            Self::Conflict(_) => "conflict",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateContent { remove_first: true } => {
                write!(f, "{} (remove first)", self.name())
            }
            Self::UpdateAttributes(attrs) => write!(f, "{} [{}]", self.name(), attrs),
            Self::Conflict(reason) => write!(f, "{}: {}", self.name(), reason),
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_change() {
        assert!(!Action::NoOp.is_change());
        assert!(Action::CreateDirectory.is_change());
        assert!(Action::UpdateModTime.is_change());
        assert!(Action::UpdateAttributes(PlatformAttributes::HIDDEN).is_change());
        assert!(!Action::Conflict(ConflictReason {
            expected: EntryKind::Directory,
            found: EntryKind::RegularFile,
        })
        .is_change());
    }

    #[test]
    fn test_copies_content() {
        assert!(Action::CreateFile.copies_content());
        assert!(Action::UpdateContent { remove_first: false }.copies_content());
        assert!(!Action::UpdateModTime.copies_content());
        assert!(!Action::CreateDirectory.copies_content());
    }

    #[test]
    fn test_display() {
        assert_eq!(Action::CreateFile.to_string(), "create_file");
        assert_eq!(
            Action::UpdateContent { remove_first: true }.to_string(),
            "update_content (remove first)"
        );
        let conflict = Action::Conflict(ConflictReason {
            expected: EntryKind::Directory,
            found: EntryKind::RegularFile,
        });
        assert_eq!(
            conflict.to_string(),
            "conflict: target should be a directory but is a regular file"
        );
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(Action::UpdateContent { remove_first: true }).unwrap();
        assert_eq!(json["action"], "update_content");
        assert_eq!(json["detail"]["remove_first"], true);

        let json =
            serde_json::to_value(Action::UpdateAttributes(PlatformAttributes::HIDDEN)).unwrap();
        assert_eq!(json["detail"], 2);
    }
}
