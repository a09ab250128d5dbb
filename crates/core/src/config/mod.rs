//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (APPCACHE_*)
//! 2. TOML config file (if APPCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::import::ImportOptions;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (APPCACHE_*)
/// 2. TOML config file (if APPCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// MIME type recorded for every file imported from a directory.
    ///
    /// Set via APPCACHE_MIME_TYPE environment variable.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// Follow symbolic links while walking instead of skipping them.
    ///
    /// Set via APPCACHE_FOLLOW_SYMLINKS environment variable.
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Emit log lines as JSON.
    ///
    /// Set via APPCACHE_JSON_LOGS environment variable.
    #[serde(default)]
    pub json_logs: bool,
}

fn default_mime_type() -> String {
    "text/html".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { mime_type: default_mime_type(), follow_symlinks: false, json_logs: false }
    }
}

impl AppConfig {
    /// Importer settings derived from this configuration.
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions { mime_type: self.mime_type.clone(), follow_symlinks: self.follow_symlinks }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `APPCACHE_`
    /// 2. TOML file from `APPCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("APPCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("APPCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
