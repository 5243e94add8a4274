//! dirmirror Core - Domain logic and reconciliation rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `FileDescriptor`, `PlatformAttributes`, `Action`, `EntryPath`
//! - **Reconciliation policy** - the pure decision function mapping a
//!   (source, target) descriptor pair to the actions that mirror it
//! - **Port definitions** - Traits for adapters: `ILocalFileSystem`, `IAttributeStore`
//! - **Configuration** - YAML-backed settings with validation and a builder
//!
//! # Architecture
//!
//! The domain module contains plain data with no I/O. Ports define the
//! trait interfaces that the sync crate implements against the real
//! filesystem. The policy only ever sees descriptors, never paths on disk.

pub mod config;
pub mod domain;
pub mod policy;
pub mod ports;
