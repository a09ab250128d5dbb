//! Unified error types for appcache.
//!
//! Every variant is fatal for a conversion run except `NotFound`, which the
//! importer turns into "allocate a new resource".

use std::path::PathBuf;

use tokio_rusqlite::rusqlite;

/// Unified error types for the application cache writer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The store could not be opened or its schema could not be created.
    #[error("SCHEMA_INIT: {0}")]
    SchemaInit(String),

    /// A prepare/bind/step against the store failed.
    #[error("STATEMENT_FAILED: {0}")]
    Database(tokio_rusqlite::Error),

    /// A lookup by URL found no row.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// A directory or file could not be opened, stat'd or read.
    #[error("FILESYSTEM: {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed user input, e.g. a redirect without a delimiter.
    #[error("INVALID_ARGUMENT: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem { path: path.into(), source }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        Error::Filesystem { path, source: err.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("http://site.test/missing".to_string());
        assert!(err.to_string().contains("NOT_FOUND"));
        assert!(err.to_string().contains("http://site.test/missing"));
    }

    #[test]
    fn test_filesystem_error_names_path() {
        let err = Error::filesystem("/tmp/nowhere", std::io::Error::from(std::io::ErrorKind::NotFound));
        let msg = err.to_string();
        assert!(msg.starts_with("FILESYSTEM: /tmp/nowhere"));
    }

    #[test]
    fn test_rusqlite_error_maps_to_database() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().contains("STATEMENT_FAILED"));
    }
}
