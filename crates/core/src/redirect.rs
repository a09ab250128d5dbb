//! Redirect resources.
//!
//! The application cache has no notion of HTTP redirects, so a redirect is
//! stored as a zero-length resource under the source URL whose body pointer
//! aliases the target resource's body row.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::Error;
use crate::store::{CacheStore, ResourceType};

/// Separates source and target in a redirect argument.
pub const REDIRECT_DELIMITER: char = '=';

/// MIME type declared by redirect resources.
const REDIRECT_MIME_TYPE: &str = "text/html";

/// A `source=target` redirect request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub source: String,
    pub target: String,
}

impl FromStr for Redirect {
    type Err = Error;

    /// Split at the first `=`; the target may itself contain `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s.split_once(REDIRECT_DELIMITER).ok_or_else(|| {
            Error::InvalidArgument(format!("redirect '{s}' must have the form <source>{REDIRECT_DELIMITER}<target>"))
        })?;
        Ok(Self { source: source.to_string(), target: target.to_string() })
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{REDIRECT_DELIMITER}{}", self.source, self.target)
    }
}

/// Writes redirect resources into a [`CacheStore`].
#[derive(Clone, Debug)]
pub struct RedirectBuilder {
    store: CacheStore,
}

impl RedirectBuilder {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    /// Make `source` resolve to the body already cached for `target`.
    ///
    /// Returns the id of the new source resource. Each call allocates a
    /// fresh resource id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `target` was never cached.
    #[instrument(skip(self))]
    pub async fn add_redirect(&self, source: &str, target: &str) -> Result<i64, Error> {
        let cache_id = self.store.prepare_cache_group(source).await?;

        let target_id = self.store.resource_id_for_url(target).await?;
        let target_data = self
            .store
            .resource(target_id)
            .await?
            .map(|r| r.data)
            .ok_or_else(|| Error::NotFound(format!("resource {target_id} for URL '{target}'")))?;

        let source_id = self.store.next_free_resource_id().await?;
        self.store
            .link_entry(cache_id, ResourceType::Master, source_id)
            .await?;
        self.store
            .upsert_resource(source_id, source, REDIRECT_MIME_TYPE, 0, Some(target_data))
            .await?;

        tracing::info!(source_id, target_id, data_id = target_data, "added redirect");
        Ok(source_id)
    }

    /// Apply [`Self::add_redirect`] to a parsed redirect argument.
    pub async fn apply(&self, redirect: &Redirect) -> Result<i64, Error> {
        self.add_redirect(&redirect.source, &redirect.target).await
    }
}
