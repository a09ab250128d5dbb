//! SQLite-backed application cache store.
//!
//! This module writes the `ApplicationCache.db` layout read by WebKit's
//! offline application cache, with async access via tokio-rusqlite. It
//! provides:
//!
//! - Idempotent schema creation, including the cascading-delete triggers
//! - Host hashing for cache-group lookup
//! - Upserts for cache groups, caches, resources, bodies, entries and origins

pub mod connection;
pub mod groups;
pub mod hash;
pub mod models;
pub mod resources;
pub mod schema;

pub use crate::Error;

pub use connection::CacheStore;
pub use groups::MANIFEST_NAME;
pub use models::{Cache, CacheEntry, CacheGroup, CacheResource, ResourceType, StoreStats};
