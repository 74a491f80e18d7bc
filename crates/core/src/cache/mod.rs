//! SQLite-backed cache partitions.
//!
//! This module provides the persistent store behind the cache orchestrator,
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions, versioned as `{prefix}-{role}-{version}`
//! - Request entries keyed by a SHA-256 of method and URL
//! - Atomic batch writes for install-time pre-population
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod naming;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedResponse;
pub use naming::{PartitionNames, Role};
pub use partitions::PartitionSummary;
