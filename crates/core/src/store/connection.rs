//! Store connection management with pragma configuration.
//!
//! This module opens the SQLite file, applies pragmas suited to a single
//! writer producing a portable artifact, and ensures the schema exists.

use super::schema;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Pragmas applied to every connection.
///
/// The output file is copied onto a device afterwards, so it keeps a rollback
/// journal rather than WAL and is held exclusively for the whole run.
const PRAGMAS: &str = "PRAGMA journal_mode=DELETE;
     PRAGMA locking_mode=EXCLUSIVE;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;";

/// Application cache store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Clones share that one connection.
#[derive(Clone, Debug)]
pub struct CacheStore {
    pub(crate) conn: Connection,
}

impl CacheStore {
    /// Open a store at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas,
    /// and creates any missing tables and triggers.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .await
            .map_err(|e| Error::SchemaInit(format!("failed to open {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "opened application cache store");
        Self::init(conn).await
    }

    /// Open an in-memory store for testing.
    ///
    /// Uses the same pragma and schema setup as file-based stores.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::SchemaInit(e.to_string()))?;

        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(|e| Error::SchemaInit(e.to_string()))?;

        schema::ensure(&conn).await?;

        Ok(Self { conn })
    }

    /// Flush and close the underlying connection.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await.map_err(Error::Database)
    }
}
