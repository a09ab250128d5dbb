//! ApplicationCache.db schema creation.
//!
//! The consumer reads the file directly, so there is no version table: the
//! whole layout is a single idempotent batch of `CREATE ... IF NOT EXISTS`
//! statements applied on every open.

use super::Error;
use tokio_rusqlite::Connection;

/// Tables and cascade triggers of the application cache layout.
const SCHEMA: &str = include_str!("../../schema/application_cache.sql");

/// Table names in the order they are created.
pub const TABLES: &[&str] = &[
    "CacheAllowsAllNetworkRequests",
    "CacheEntries",
    "CacheGroups",
    "CacheResourceData",
    "CacheResources",
    "CacheWhitelistURLs",
    "Caches",
    "DeletedCacheResources",
    "FallbackURLs",
    "Origins",
];

/// Trigger names implementing the cascading deletes.
pub const TRIGGERS: &[&str] = &["CacheDeleted", "CacheEntryDeleted", "CacheResourceDataDeleted", "CacheResourceDeleted"];

/// Create any missing tables and triggers.
///
/// # Errors
///
/// Returns `Error::SchemaInit` if the batch fails to execute.
pub async fn ensure(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| conn.execute_batch(SCHEMA))
        .await
        .map_err(|e| Error::SchemaInit(e.to_string()))?;
    tracing::debug!(tables = TABLES.len(), triggers = TRIGGERS.len(), "application cache schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn count_objects(conn: &Connection, kind: &'static str) -> i64 {
        conn.call(move |conn| {
            conn.query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = ?1", [kind], |row| row.get(0))
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        ensure(&conn).await.unwrap();
        ensure(&conn).await.unwrap();

        assert_eq!(count_objects(&conn, "trigger").await, TRIGGERS.len() as i64);
    }

    #[tokio::test]
    async fn test_schema_creates_exact_tables() {
        let conn = Connection::open_in_memory().await.unwrap();
        ensure(&conn).await.unwrap();

        let names: Vec<String> = conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                     ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()
            })
            .await
            .unwrap();

        let mut expected: Vec<String> = TABLES.iter().map(|t| t.to_string()).collect();
        expected.sort();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_cache_resources_columns() {
        let conn = Connection::open_in_memory().await.unwrap();
        ensure(&conn).await.unwrap();

        let columns: Vec<String> = conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('CacheResources') ORDER BY cid")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()
            })
            .await
            .unwrap();

        assert_eq!(
            columns,
            ["id", "url", "statusCode", "responseURL", "mimeType", "textEncodingName", "headers", "data"]
        );
    }
}
