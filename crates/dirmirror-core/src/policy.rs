//! Reconciliation policy
//!
//! Maps a (source, target) descriptor pair to the ordered list of actions
//! that mirrors the source onto the target. The policy is a pure function
//! of the two descriptors: it performs no I/O and keeps no state.
//!
//! ## Timestamp tolerance
//!
//! Copies round-trip modification times through filesystems of different
//! resolution (whole seconds on some, 100ns or 1ns on others). A plain
//! inequality would re-copy every file whose time was merely rounded, so
//! the delta `source - target` is classified asymmetrically:
//!
//! - `delta > 100ns` : the source is genuinely newer
//! - `delta <= -1s`  : the target time regressed by at least a second
//! - otherwise       : resolution noise, ignored

use chrono::Duration;
use tracing::trace;

use crate::domain::action::{Action, ConflictReason};
use crate::domain::descriptor::{EntryKind, FileDescriptor, PlatformAttributes};

/// Largest forward drift (source newer) still treated as noise, in nanoseconds
pub const FORWARD_DRIFT_TOLERANCE_NANOS: i64 = 100;

/// Backward drift (target newer) at or beyond which the target time is corrected
pub const BACKWARD_DRIFT_THRESHOLD_SECS: i64 = 1;

/// Classification of a modification time delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeDrift {
    /// Source is newer than the target by more than the forward tolerance
    SourceNewer,
    /// Target is newer than the source by at least the backward threshold
    TargetNewer,
    /// Difference is within resolution noise
    WithinNoise,
}

/// Decides how each entry is reconciled
pub struct ReconciliationPolicy;

impl ReconciliationPolicy {
    /// Classifies `delta = source.modified - target.modified`
    #[must_use]
    pub fn classify_drift(delta: Duration) -> TimeDrift {
        if delta > Duration::nanoseconds(FORWARD_DRIFT_TOLERANCE_NANOS) {
            TimeDrift::SourceNewer
        } else if delta <= Duration::seconds(-BACKWARD_DRIFT_THRESHOLD_SECS) {
            TimeDrift::TargetNewer
        } else {
            TimeDrift::WithinNoise
        }
    }

    /// Full decision for one entry against a single snapshot of the target
    ///
    /// Content/existence actions come first, followed by the attribute
    /// action when the attribute sets differ. When the target is absent the
    /// attribute decision is deferred: it can only be made against the
    /// freshly created entry, see [`Self::decide_attributes`].
    #[must_use]
    pub fn decide(source: &FileDescriptor, target: Option<&FileDescriptor>) -> Vec<Action> {
        let mut actions = Self::decide_content(source, target);

        if actions.iter().any(|a| matches!(a, Action::Conflict(_))) {
            return actions;
        }

        if let Some(target) = target {
            if let Some(attributes) = Self::decide_attributes(source, target) {
                actions.retain(|a| *a != Action::NoOp);
                actions.push(attributes);
            }
        }

        actions
    }

    /// Content, existence and modification time actions for one entry
    ///
    /// Sources of kind [`EntryKind::Other`] are never mirrored and always
    /// yield [`Action::NoOp`].
    #[must_use]
    pub fn decide_content(source: &FileDescriptor, target: Option<&FileDescriptor>) -> Vec<Action> {
        let action = match source.kind {
            EntryKind::Directory => Self::decide_directory(source, target),
            EntryKind::RegularFile => Self::decide_file(source, target),
            EntryKind::Other => Action::NoOp,
        };

        trace!(
            source_kind = %source.kind,
            target_kind = ?target.map(|t| t.kind),
            action = %action,
            "Content decision"
        );

        vec![action]
    }

    /// Attribute action for one entry, evaluated against the target as it
    /// stands after its content has been reconciled
    #[must_use]
    pub fn decide_attributes(source: &FileDescriptor, target: &FileDescriptor) -> Option<Action> {
        if source.attributes == target.attributes {
            return None;
        }

        trace!(
            source_attributes = %source.attributes,
            target_attributes = %target.attributes,
            "Attribute sets differ"
        );
        Some(Action::UpdateAttributes(source.attributes))
    }

    fn decide_directory(source: &FileDescriptor, target: Option<&FileDescriptor>) -> Action {
        let Some(target) = target else {
            return Action::CreateDirectory;
        };

        if !target.is_directory() {
            return Action::Conflict(ConflictReason {
                expected: EntryKind::Directory,
                found: target.kind,
            });
        }

        match Self::classify_drift(source.time_delta(target)) {
            TimeDrift::SourceNewer | TimeDrift::TargetNewer => Action::UpdateModTime,
            TimeDrift::WithinNoise => Action::NoOp,
        }
    }

    fn decide_file(source: &FileDescriptor, target: Option<&FileDescriptor>) -> Action {
        let Some(target) = target else {
            return Action::CreateFile;
        };

        if !target.is_regular_file() {
            return Action::Conflict(ConflictReason {
                expected: EntryKind::RegularFile,
                found: target.kind,
            });
        }

        let drift = Self::classify_drift(source.time_delta(target));
        let size_changed = source.size_delta(target) != 0;

        if drift == TimeDrift::SourceNewer || size_changed {
            Action::UpdateContent {
                remove_first: target.attributes.contains(PlatformAttributes::HIDDEN),
            }
        } else if drift == TimeDrift::TargetNewer {
            Action::UpdateModTime
        } else {
            Action::NoOp
        }
    }
}
