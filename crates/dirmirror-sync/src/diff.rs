//! Before/after descriptor comparison
//!
//! [`DiffReporter`] renders the source descriptor next to the target
//! descriptor around every action that changes the target. It is purely
//! observational and has no say in what the engine does.

use std::fmt::{self, Display, Formatter};

use dirmirror_core::domain::descriptor::FileDescriptor;
use tracing::info;

/// When a comparison was taken relative to the action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStage {
    /// Target state before the action
    Before,
    /// Target state re-probed after the action
    After,
    /// Target state compared without acting (dry run)
    Planned,
}

impl Display for DiffStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
            Self::Planned => "PLANNED",
        })
    }
}

/// A rendered comparison of one source/target pair
pub struct DescriptorDiff<'a> {
    /// When the comparison was taken
    pub stage: DiffStage,
    /// Entry path relative to the mirror roots
    pub path: &'a str,
    /// Descriptor of the source entry
    pub source: &'a FileDescriptor,
    /// Descriptor of the target entry at `stage`
    pub target: &'a FileDescriptor,
}

impl DescriptorDiff<'_> {
    /// Source minus target modification time, in nanoseconds
    pub fn delta_nanos(&self) -> i64 {
        let delta = self.source.time_delta(self.target);
        delta.num_nanoseconds().unwrap_or_else(|| {
            if delta.num_seconds() < 0 {
                i64::MIN
            } else {
                i64::MAX
            }
        })
    }
}

fn write_side(f: &mut Formatter<'_>, label: &str, desc: &FileDescriptor) -> fmt::Result {
    writeln!(
        f,
        "{label}: {:<36} {:>12} bytes {:>6o} {}",
        desc.modified.format("%Y-%m-%d %H:%M:%S%.9f %Z").to_string(),
        desc.size,
        desc.permission_bits,
        desc.attributes,
    )
}

impl Display for DescriptorDiff<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.stage)?;
        writeln!(f, "File: {}", self.path)?;
        write_side(f, "Source", self.source)?;
        write_side(f, "Target", self.target)?;
        write!(f, "\u{0394}T: {}ns", self.delta_nanos())
    }
}

/// Emits descriptor comparisons when enabled
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffReporter {
    enabled: bool,
}

impl DiffReporter {
    /// Creates a reporter; a disabled reporter emits nothing
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Returns true if comparisons are emitted
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emits one comparison through `tracing`
    pub fn report(
        &self,
        stage: DiffStage,
        path: &str,
        source: &FileDescriptor,
        target: &FileDescriptor,
    ) {
        if !self.enabled {
            return;
        }

        let diff = DescriptorDiff {
            stage,
            path,
            source,
            target,
        };

        info!(
            target: "dirmirror::diff",
            stage = %stage,
            path,
            source_modified = %source.modified,
            source_size = source.size,
            source_mode = %format!("{:o}", source.permission_bits),
            source_attributes = ?source.attributes.labels(),
            target_modified = %target.modified,
            target_size = target.size,
            target_mode = %format!("{:o}", target.permission_bits),
            target_attributes = ?target.attributes.labels(),
            delta_ns = diff.delta_nanos(),
            "\n{diff}"
        );
    }
}
