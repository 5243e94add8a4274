//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The engine depends on these interfaces; their
//! implementations live in the sync crate.
//!
//! ## Ports Overview
//!
//! - [`ILocalFileSystem`] - Probing and mutating entries on the local filesystem
//! - [`IAttributeStore`] - Native file attribute query/update capability

pub mod attribute_store;
pub mod local_filesystem;

pub use attribute_store::IAttributeStore;
pub use local_filesystem::ILocalFileSystem;
