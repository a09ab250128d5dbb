//! Row types of the application cache tables.

use serde::{Deserialize, Serialize};

/// Role of a resource within a cache.
///
/// The discriminants are the flag values the runtime stores in
/// `CacheEntries.type`. This writer only ever stores one role per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    Master = 1 << 0,
    Manifest = 1 << 1,
    Explicit = 1 << 2,
    Foreign = 1 << 3,
    Fallback = 1 << 4,
}

impl ResourceType {
    /// Value stored in `CacheEntries.type`.
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Master),
            2 => Some(Self::Manifest),
            4 => Some(Self::Explicit),
            8 => Some(Self::Foreign),
            16 => Some(Self::Fallback),
            _ => None,
        }
    }
}

/// A row of `CacheGroups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheGroup {
    pub id: i64,
    pub manifest_host_hash: i64,
    pub manifest_url: String,
    pub newest_cache: i64,
    pub origin: String,
}

/// A row of `Caches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    pub id: i64,
    pub cache_group: i64,
    pub size: i64,
}

/// A row of `CacheEntries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache: i64,
    pub resource_type: Option<ResourceType>,
    pub resource: i64,
}

/// A row of `CacheResources`: one stored HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheResource {
    pub id: i64,
    pub url: String,
    pub status_code: i64,
    pub response_url: String,
    pub mime_type: Option<String>,
    pub text_encoding_name: Option<String>,
    pub headers: Option<String>,
    /// Id of the `CacheResourceData` row holding the body.
    pub data: i64,
}

/// Row counts per table, reported after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub cache_groups: i64,
    pub caches: i64,
    pub resources: i64,
    pub resource_data: i64,
    pub entries: i64,
    pub origins: i64,
}
