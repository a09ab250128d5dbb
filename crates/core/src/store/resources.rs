//! Resource, resource body and cache entry operations.

use super::connection::CacheStore;
use super::models::{CacheEntry, CacheResource, ResourceType, StoreStats};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// Response headers stored for a synthesized 200 response.
pub fn synthesize_headers(mime_type: &str, size: u64) -> String {
    format!("Accept-Ranges:bytes\nContent-Type:{mime_type}\nContent-Length:{size}\n")
}

impl CacheStore {
    /// Id of the resource stored under exactly `url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no resource has that URL.
    pub async fn resource_id_for_url(&self, url: &str) -> Result<i64, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.query_row(
                    "SELECT id FROM CacheResources WHERE url = ?1 ORDER BY id ASC LIMIT 1",
                    params![url],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| Error::NotFound(format!("no resource for URL '{url}'")))
            })
            .await
            .map_err(Error::from)
    }

    /// Next unused resource id: highest existing id plus one, or 1.
    pub async fn next_free_resource_id(&self) -> Result<i64, Error> {
        self.conn
            .call(|conn| -> Result<i64, Error> {
                let id = conn.query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM CacheResources", [], |row| row.get(0))?;
                Ok(id)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or update the resource row `id` as a 200 response for `url`.
    ///
    /// `data_id` points at the body row and defaults to `id`; redirects pass
    /// another resource's body row instead.
    pub async fn upsert_resource(
        &self, id: i64, url: &str, mime_type: &str, size: u64, data_id: Option<i64>,
    ) -> Result<(), Error> {
        let url = url.to_string();
        let mime_type = mime_type.to_string();
        let headers = synthesize_headers(&mime_type, size);
        let data_id = data_id.unwrap_or(id);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO CacheResources (id, url, statusCode, responseURL, mimeType, textEncodingName, headers, data)
                    VALUES (?1, ?2, 200, ?2, ?3, '', ?4, ?5)
                    ON CONFLICT(id) DO UPDATE SET
                        url = excluded.url,
                        statusCode = 200,
                        responseURL = excluded.responseURL,
                        mimeType = excluded.mimeType,
                        headers = excluded.headers,
                        data = excluded.data",
                    params![id, url, mime_type, headers, data_id],
                )?;
                tracing::debug!(id, url = %url, data_id, "wrote cache resource");
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or update the inline body of data row `id`.
    ///
    /// The `path` column is never set: bodies are always stored as blobs.
    pub async fn upsert_resource_body(&self, id: i64, body: Vec<u8>) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO CacheResourceData (id, data, path) VALUES (?1, ?2, NULL)
                    ON CONFLICT(id) DO UPDATE SET data = excluded.data",
                    params![id, body],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Link resource `resource_id` into cache `cache_id` with role `ty`.
    ///
    /// A resource has at most one entry; linking it again moves the entry
    /// and overwrites its role.
    pub async fn link_entry(&self, cache_id: i64, ty: ResourceType, resource_id: i64) -> Result<(), Error> {
        let code = ty.code();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let updated = tx.execute(
                    "UPDATE CacheEntries SET cache = ?1, type = ?2 WHERE resource = ?3",
                    params![cache_id, code, resource_id],
                )?;
                if updated == 0 {
                    tx.execute(
                        "INSERT INTO CacheEntries (cache, type, resource) VALUES (?1, ?2, ?3)",
                        params![cache_id, code, resource_id],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a resource by id.
    pub async fn resource(&self, id: i64) -> Result<Option<CacheResource>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<CacheResource>, Error> {
                let resource = conn
                    .query_row(
                        "SELECT id, url, statusCode, responseURL, mimeType, textEncodingName, headers, data
                        FROM CacheResources WHERE id = ?1",
                        params![id],
                        |row| {
                            Ok(CacheResource {
                                id: row.get(0)?,
                                url: row.get(1)?,
                                status_code: row.get(2)?,
                                response_url: row.get(3)?,
                                mime_type: row.get(4)?,
                                text_encoding_name: row.get(5)?,
                                headers: row.get(6)?,
                                data: row.get(7)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(resource)
            })
            .await
            .map_err(Error::from)
    }

    /// Get the inline body stored in data row `data_id`.
    ///
    /// Returns None if the row doesn't exist or holds no blob.
    pub async fn resource_body(&self, data_id: i64) -> Result<Option<Vec<u8>>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let body: Option<Option<Vec<u8>>> = conn
                    .query_row("SELECT data FROM CacheResourceData WHERE id = ?1", params![data_id], |row| row.get(0))
                    .optional()?;
                Ok(body.flatten())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry linking `resource_id` into a cache.
    pub async fn entry_for_resource(&self, resource_id: i64) -> Result<Option<CacheEntry>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let entry = conn
                    .query_row(
                        "SELECT cache, type, resource FROM CacheEntries WHERE resource = ?1",
                        params![resource_id],
                        |row| {
                            let code: Option<i64> = row.get(1)?;
                            Ok(CacheEntry {
                                cache: row.get(0)?,
                                resource_type: code.and_then(ResourceType::from_code),
                                resource: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(entry)
            })
            .await
            .map_err(Error::from)
    }

    /// Count rows in the populated tables.
    pub async fn stats(&self) -> Result<StoreStats, Error> {
        self.conn
            .call(|conn| -> Result<StoreStats, Error> {
                let stats = conn.query_row(
                    "SELECT
                        (SELECT COUNT(*) FROM CacheGroups),
                        (SELECT COUNT(*) FROM Caches),
                        (SELECT COUNT(*) FROM CacheResources),
                        (SELECT COUNT(*) FROM CacheResourceData),
                        (SELECT COUNT(*) FROM CacheEntries),
                        (SELECT COUNT(*) FROM Origins)",
                    [],
                    |row| {
                        Ok(StoreStats {
                            cache_groups: row.get(0)?,
                            caches: row.get(1)?,
                            resources: row.get(2)?,
                            resource_data: row.get(3)?,
                            entries: row.get(4)?,
                            origins: row.get(5)?,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}
