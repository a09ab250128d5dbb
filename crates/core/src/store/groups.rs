//! Cache group, cache, network-allowance and origin operations.
//!
//! A cache group is keyed by the hash of its host. Its single cache shares
//! the group's id.

use super::connection::CacheStore;
use super::hash::host_hash;
use super::models::{Cache, CacheGroup};
use crate::Error;
use crate::url::{origin_for_url, with_trailing_slash};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// Reserved file name of the cache manifest resource.
pub const MANIFEST_NAME: &str = "cache.cache";

impl CacheStore {
    /// Id of the cache group serving `url`'s host, creating the group if needed.
    ///
    /// Groups are matched by host hash only; when several share a hash the
    /// lowest id wins. New groups get `max(id) + 1` and point their newest
    /// cache at that same id.
    pub async fn cache_group_id_for_url(&self, url: &str) -> Result<i64, Error> {
        let url = with_trailing_slash(url);
        let hash = i64::from(host_hash(&url));
        let manifest_url = format!("{url}{MANIFEST_NAME}");
        let origin = origin_for_url(&url);

        self.conn
            .call(move |conn| -> Result<i64, Error> {
                let tx = conn.transaction()?;

                let existing: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM CacheGroups WHERE manifestHostHash = ?1 ORDER BY id ASC LIMIT 1",
                        params![hash],
                        |row| row.get(0),
                    )
                    .optional()?;

                let id = match existing {
                    Some(id) => id,
                    None => {
                        let id: i64 =
                            tx.query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM CacheGroups", [], |row| row.get(0))?;
                        tx.execute(
                            "INSERT INTO CacheGroups (id, manifestHostHash, manifestURL, newestCache, origin)
                            VALUES (?1, ?2, ?3, ?1, ?4)",
                            params![id, hash, manifest_url, origin],
                        )?;
                        tracing::debug!(id, hash, manifest_url = %manifest_url, "created cache group");
                        id
                    }
                };

                tx.commit()?;
                Ok(id)
            })
            .await
            .map_err(Error::from)
    }

    /// Make sure the cache never allows unrestricted network access.
    ///
    /// Existing allowance rows for the cache are set to 0; a row is inserted
    /// only when the cache has none.
    pub async fn ensure_wildcard_disabled(&self, cache_id: i64) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let updated = tx.execute(
                    "UPDATE CacheAllowsAllNetworkRequests SET wildcard = 0 WHERE cache = ?1",
                    params![cache_id],
                )?;
                if updated == 0 {
                    tx.execute(
                        "INSERT INTO CacheAllowsAllNetworkRequests (wildcard, cache) VALUES (0, ?1)",
                        params![cache_id],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Register the security origin of `url` with a quota of 0.
    ///
    /// Inserts the origin if absent and resets its quota to 0 otherwise.
    /// Returns the origin identifier.
    pub async fn register_origin(&self, url: &str) -> Result<String, Error> {
        let origin = origin_for_url(url);
        let key = origin.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let updated = tx.execute("UPDATE Origins SET quota = 0 WHERE origin = ?1", params![key])?;
                if updated == 0 {
                    tx.execute("INSERT INTO Origins (origin, quota) VALUES (?1, 0)", params![key])?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(origin)
    }

    /// Add `delta` bytes to the size of cache `cache_id`.
    ///
    /// The cache row is created with size 0 under its group's id on first
    /// use. Sizes only ever grow.
    pub async fn accumulate_cache_size(&self, cache_id: i64, delta: u64) -> Result<(), Error> {
        let delta = i64::try_from(delta)
            .map_err(|_| Error::InvalidArgument(format!("cache size delta {delta} does not fit in a signed 64-bit integer")))?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO Caches (id, cacheGroup, size) VALUES (?1, ?1, ?2)
                    ON CONFLICT(id) DO UPDATE SET size = size + excluded.size",
                    params![cache_id, delta],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Resolve the cache group for `url` and apply the per-group setup shared
    /// by directory imports and redirects: network wildcard disabled and
    /// origin registered.
    pub async fn prepare_cache_group(&self, url: &str) -> Result<i64, Error> {
        let cache_id = self.cache_group_id_for_url(url).await?;
        self.ensure_wildcard_disabled(cache_id).await?;
        let origin = self.register_origin(url).await?;
        tracing::debug!(cache_id, origin = %origin, "prepared cache group");
        Ok(cache_id)
    }

    /// Get a cache group by id.
    pub async fn cache_group(&self, id: i64) -> Result<Option<CacheGroup>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<CacheGroup>, Error> {
                let group = conn
                    .query_row(
                        "SELECT id, manifestHostHash, manifestURL, newestCache, origin FROM CacheGroups WHERE id = ?1",
                        params![id],
                        |row| {
                            Ok(CacheGroup {
                                id: row.get(0)?,
                                manifest_host_hash: row.get(1)?,
                                manifest_url: row.get(2)?,
                                newest_cache: row.get(3)?,
                                origin: row.get(4)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(group)
            })
            .await
            .map_err(Error::from)
    }

    /// Get a cache by id.
    pub async fn cache(&self, id: i64) -> Result<Option<Cache>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<Cache>, Error> {
                let cache = conn
                    .query_row("SELECT id, cacheGroup, size FROM Caches WHERE id = ?1", params![id], |row| {
                        Ok(Cache { id: row.get(0)?, cache_group: row.get(1)?, size: row.get(2)? })
                    })
                    .optional()?;
                Ok(cache)
            })
            .await
            .map_err(Error::from)
    }

    /// Quota recorded for an origin identifier, if registered.
    pub async fn origin_quota(&self, origin: &str) -> Result<Option<i64>, Error> {
        let origin = origin.to_string();
        self.conn
            .call(move |conn| -> Result<Option<i64>, Error> {
                let quota = conn
                    .query_row("SELECT quota FROM Origins WHERE origin = ?1", params![origin], |row| row.get(0))
                    .optional()?;
                Ok(quota)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn wildcard_rows(store: &CacheStore, cache_id: i64) -> Vec<i64> {
        store
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT wildcard FROM CacheAllowsAllNetworkRequests WHERE cache = ?1")?;
                let rows = stmt.query_map(params![cache_id], |row| row.get(0))?;
                rows.collect::<Result<Vec<i64>, _>>()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cache_group_idempotent() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let first = store.cache_group_id_for_url("http://site.test/").await.unwrap();
        let second = store.cache_group_id_for_url("http://site.test").await.unwrap();
        let deep = store.cache_group_id_for_url("http://site.test/a/b.html").await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(first, second);
        assert_eq!(first, deep);
    }

    #[tokio::test]
    async fn test_cache_group_distinct_hosts() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let site = store.cache_group_id_for_url("http://site.test/").await.unwrap();
        let other = store.cache_group_id_for_url("http://other.test/").await.unwrap();

        assert_eq!(site, 1);
        assert_eq!(other, 2);
    }

    #[tokio::test]
    async fn test_cache_group_row() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let id = store.cache_group_id_for_url("http://site.test").await.unwrap();

        let group = store.cache_group(id).await.unwrap().unwrap();
        assert_eq!(group.manifest_url, "http://site.test/cache.cache");
        assert_eq!(group.manifest_host_hash, 0x00CB_8906);
        assert_eq!(group.newest_cache, id);
        assert_eq!(group.origin, "http_site.test_0");
    }

    #[tokio::test]
    async fn test_cache_group_allocates_after_max() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store
            .conn
            .call(|conn| {
                conn.execute(
                    "INSERT INTO CacheGroups (id, manifestHostHash, manifestURL, newestCache, origin)
                    VALUES (7, 1, 'http://seeded.test/cache.cache', 7, 'http_seeded.test_0')",
                    [],
                )
            })
            .await
            .unwrap();

        let id = store.cache_group_id_for_url("http://site.test/").await.unwrap();
        assert_eq!(id, 8);
    }

    #[tokio::test]
    async fn test_wildcard_disabled_once() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store.ensure_wildcard_disabled(1).await.unwrap();
        store.ensure_wildcard_disabled(1).await.unwrap();

        assert_eq!(wildcard_rows(&store, 1).await, vec![0]);
    }

    #[tokio::test]
    async fn test_wildcard_enabled_row_is_reset() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store
            .conn
            .call(|conn| conn.execute("INSERT INTO CacheAllowsAllNetworkRequests (wildcard, cache) VALUES (1, 3)", []))
            .await
            .unwrap();

        store.ensure_wildcard_disabled(3).await.unwrap();
        assert_eq!(wildcard_rows(&store, 3).await, vec![0]);
    }

    #[tokio::test]
    async fn test_register_origin_resets_quota() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let origin = store.register_origin("http://site.test/").await.unwrap();
        assert_eq!(origin, "http_site.test_0");

        store
            .conn
            .call(|conn| conn.execute("UPDATE Origins SET quota = 5000 WHERE origin = 'http_site.test_0'", []))
            .await
            .unwrap();

        store.register_origin("http://site.test/other").await.unwrap();
        assert_eq!(store.origin_quota("http_site.test_0").await.unwrap(), Some(0));
        assert_eq!(store.stats().await.unwrap().origins, 1);
    }

    #[tokio::test]
    async fn test_accumulate_cache_size() {
        let store = CacheStore::open_in_memory().await.unwrap();
        assert!(store.cache(2).await.unwrap().is_none());

        store.accumulate_cache_size(2, 10).await.unwrap();
        store.accumulate_cache_size(2, 0).await.unwrap();
        store.accumulate_cache_size(2, 5).await.unwrap();

        let cache = store.cache(2).await.unwrap().unwrap();
        assert_eq!(cache, Cache { id: 2, cache_group: 2, size: 15 });
    }

    #[tokio::test]
    async fn test_accumulate_cache_size_rejects_oversized_delta() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store.accumulate_cache_size(1, 3).await.unwrap();

        let result = store.accumulate_cache_size(1, u64::MAX).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(store.cache(1).await.unwrap().unwrap().size, 3);
    }

    #[tokio::test]
    async fn test_prepare_cache_group() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let id = store.prepare_cache_group("https://example.com/app/").await.unwrap();

        assert_eq!(wildcard_rows(&store, id).await, vec![0]);
        assert_eq!(store.origin_quota("https_example.com_0").await.unwrap(), Some(0));
    }
}
