//! Keyword → URL catalog.
//!
//! Built once from [`CatalogConfig`] at start-up and never mutated; the relay
//! pipeline does not depend on it.

use crate::config::{CatalogConfig, CatalogEntry};
use crate::error::{Error, Result};

/// Immutable keyword lookup table
#[derive(Clone, Debug, Default)]
pub struct KeywordCatalog {
    entries: Vec<CatalogEntry>,
}

impl KeywordCatalog {
    /// Build the catalog, lower-casing every keyword
    pub fn from_config(config: &CatalogConfig) -> Self {
        let entries = config
            .entries
            .iter()
            .map(|entry| CatalogEntry {
                keyword: entry.keyword.trim().to_lowercase(),
                urls: entry.urls.clone(),
            })
            .collect();
        Self { entries }
    }

    /// Number of keywords in the catalog
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no keywords
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect the URLs of every keyword containing `query`
    ///
    /// The query is trimmed and lower-cased; results keep catalog order.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if the query is blank
    /// - [`Error::NotFound`] if no keyword matches
    pub fn lookup(&self, query: &str) -> Result<Vec<String>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(Error::InvalidRequest("keyword is required".into()));
        }

        let urls: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.keyword.contains(&query))
            .flat_map(|entry| entry.urls.iter().cloned())
            .collect();

        if urls.is_empty() {
            return Err(Error::NotFound(format!("no URLs for keyword '{}'", query)));
        }
        Ok(urls)
    }
}
