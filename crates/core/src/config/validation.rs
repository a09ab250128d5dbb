//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `mime_type` is not of the form
    /// `type/subtype` or contains whitespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some((kind, subtype)) = self.mime_type.split_once('/') else {
            return Err(ConfigError::Invalid { field: "mime_type".into(), reason: "must be type/subtype".into() });
        };

        if kind.is_empty() || subtype.is_empty() {
            return Err(ConfigError::Invalid { field: "mime_type".into(), reason: "must be type/subtype".into() });
        }

        if self.mime_type.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "mime_type".into(),
                reason: "must not contain whitespace".into(),
            });
        }

        if self.mime_type != "text/html" {
            tracing::debug!(mime_type = %self.mime_type, "imported files will not be served as text/html");
        }

        Ok(())
    }
}
