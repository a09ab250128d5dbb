//! Directory import into an application cache.
//!
//! Every regular file below a directory becomes a 200 response under a URL
//! prefix, next to the manifest resource the runtime requires for each
//! cache group.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use tracing::instrument;
use walkdir::WalkDir;

use crate::Error;
use crate::store::{CacheStore, MANIFEST_NAME, ResourceType};
use crate::url::{join, with_trailing_slash};

/// Body written for the manifest resource of every imported directory.
pub const MANIFEST_BODY: &str = "CACHE MANIFEST\n# v2.5.5 Self-Host\n";

/// MIME type of the manifest resource.
pub const MANIFEST_MIME_TYPE: &str = "application/octet-stream";

/// Settings for directory imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// MIME type recorded for every imported file; content is not sniffed.
    pub mime_type: String,
    /// Follow symbolic links instead of skipping them.
    pub follow_symlinks: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { mime_type: "text/html".into(), follow_symlinks: false }
    }
}

/// Counts from walking one directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    /// Files written as resources.
    pub files: usize,
    /// Bytes of file content written.
    pub bytes: u64,
    /// Entries that were neither directories nor regular files.
    pub skipped: usize,
}

/// Result of importing a directory under a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub url: String,
    pub cache_group_id: i64,
    pub manifest_resource_id: i64,
    #[serde(flatten)]
    pub walk: WalkStats,
}

/// Writes directory trees into a [`CacheStore`].
#[derive(Clone, Debug)]
pub struct DirectoryImporter {
    store: CacheStore,
    options: ImportOptions,
}

impl DirectoryImporter {
    pub fn new(store: CacheStore) -> Self {
        Self::with_options(store, ImportOptions::default())
    }

    pub fn with_options(store: CacheStore, options: ImportOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Store `body` as the resource `relative` below `base_url`.
    ///
    /// An existing resource with the same URL is updated in place. The body
    /// length is always added to the cache size, even when the URL was
    /// already imported. Returns the resource id.
    pub async fn add_resource_to_url(
        &self, base_url: &str, relative: &str, mime_type: &str, body: Vec<u8>,
    ) -> Result<i64, Error> {
        let relative = relative.strip_prefix('/').unwrap_or(relative);
        let url = join(base_url, relative);
        let ty = if relative == MANIFEST_NAME { ResourceType::Manifest } else { ResourceType::Master };

        let resource_id = match self.store.resource_id_for_url(&url).await {
            Ok(id) => id,
            Err(Error::NotFound(_)) => self.store.next_free_resource_id().await?,
            Err(e) => return Err(e),
        };

        let cache_id = self.store.cache_group_id_for_url(base_url).await?;
        let size = body.len() as u64;

        self.store.link_entry(cache_id, ty, resource_id).await?;
        self.store
            .upsert_resource(resource_id, &url, mime_type, size, None)
            .await?;
        self.store.upsert_resource_body(resource_id, body).await?;
        self.store.accumulate_cache_size(cache_id, size).await?;

        tracing::debug!(resource_id, cache_id, url = %url, size, ?ty, "added resource");
        Ok(resource_id)
    }

    /// Import `dir` so its files are served below `url`.
    ///
    /// Sets up the cache group (network wildcard off, origin registered) and
    /// writes the manifest before any file.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn cache_directory(&self, url: &str, dir: impl AsRef<Path>) -> Result<ImportSummary, Error> {
        let dir = dir.as_ref();
        let url = with_trailing_slash(url);

        let metadata = tokio::fs::metadata(dir)
            .await
            .map_err(|e| Error::filesystem(dir, e))?;
        if !metadata.is_dir() {
            return Err(Error::filesystem(dir, std::io::ErrorKind::NotADirectory.into()));
        }

        let cache_group_id = self.store.prepare_cache_group(&url).await?;
        let manifest_resource_id = self
            .add_resource_to_url(&url, MANIFEST_NAME, MANIFEST_MIME_TYPE, MANIFEST_BODY.as_bytes().to_vec())
            .await?;

        let walk = self.recursive_walk(&url, dir).await?;

        tracing::info!(
            cache_group_id,
            files = walk.files,
            bytes = walk.bytes,
            skipped = walk.skipped,
            "cached directory"
        );

        Ok(ImportSummary { url, cache_group_id, manifest_resource_id, walk })
    }

    /// Import every regular file below `dir`, mirroring subdirectories as URL
    /// path segments below `url`.
    ///
    /// Entries are visited in file-name order so repeated runs allocate the
    /// same ids. Symlinks (unless followed), sockets, devices and FIFOs are
    /// skipped with a warning.
    pub async fn recursive_walk(&self, url: &str, dir: impl AsRef<Path>) -> Result<WalkStats, Error> {
        let dir = dir.as_ref();
        let mut stats = WalkStats::default();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .follow_links(self.options.follow_symlinks)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                tracing::warn!(path = %path.display(), "skipping entry that is not a regular file");
                stats.skipped += 1;
                continue;
            }

            let relative = path
                .strip_prefix(dir)
                .map_err(|_| Error::filesystem(path, std::io::Error::other("entry outside of import root")))?;
            let (Some(name), Some(_)) = (entry.file_name().to_str(), relative.to_str()) else {
                tracing::warn!(path = %path.display(), "skipping entry whose path is not valid UTF-8");
                stats.skipped += 1;
                continue;
            };
            let parent_url = match relative.parent() {
                Some(parent) => url_for_dir(url, parent),
                None => with_trailing_slash(url),
            };

            let body = tokio::fs::read(path)
                .await
                .map_err(|e| Error::filesystem(path, e))?;
            let size = body.len() as u64;

            self.add_resource_to_url(&parent_url, name, &self.options.mime_type, body)
                .await?;

            stats.files += 1;
            stats.bytes += size;
        }

        Ok(stats)
    }
}

/// URL of a directory below `base`, ending in `/`. Components that are not
/// valid UTF-8 are dropped; callers check the path first.
fn url_for_dir(base: &str, relative_dir: &Path) -> String {
    let url = relative_dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .fold(base.to_string(), |url, name| join(&url, name));
    with_trailing_slash(&url)
}
