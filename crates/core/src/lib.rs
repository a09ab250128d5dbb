//! Core types and shared functionality for appcache.
//!
//! This crate provides:
//! - The `ApplicationCache.db` store with its SQLite schema
//! - Directory import and redirect resources
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod import;
pub mod redirect;
pub mod store;
pub mod url;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use import::{DirectoryImporter, ImportOptions, ImportSummary, WalkStats};
pub use redirect::{Redirect, RedirectBuilder};
pub use store::{CacheStore, ResourceType, StoreStats};
