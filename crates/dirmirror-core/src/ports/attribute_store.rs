//! Native attribute store port
//!
//! Some filesystems keep a small attribute word next to the regular
//! permission bits (read-only, hidden, system, archive...). Access to it is
//! isolated behind [`IAttributeStore`] so the reconciliation logic never
//! branches on the host platform: hosts without such a store plug in an
//! implementation that always reports the empty set.

use std::io;
use std::path::Path;

use crate::domain::descriptor::PlatformAttributes;

/// Capability interface over a native file attribute store
pub trait IAttributeStore: Send + Sync {
    /// Reads the attribute set of `path`, masked to its low 8 bits
    ///
    /// # Errors
    /// Returns the underlying OS error if the attributes cannot be read
    fn query_attributes(&self, path: &Path) -> io::Result<PlatformAttributes>;

    /// Replaces the attribute set of `path`
    ///
    /// # Errors
    /// Returns the underlying OS error if the attributes cannot be written
    fn set_attributes(&self, path: &Path, attributes: PlatformAttributes) -> io::Result<()>;

    /// Short name of the store, for logging
    fn name(&self) -> &'static str;
}
