//! Product search and the local recent-search list.

use std::sync::Arc;

use apparel_core::Product;
use tracing::{instrument, warn};

use crate::backend::{BackendClient, BackendError};
use crate::storage::{LocalStore, StorageError, keys, read_json, write_json};

/// Most terms kept in the recent-search list.
pub const MAX_RECENT_SEARCHES: usize = 10;

/// Recent search terms, newest first, persisted in the local store.
#[derive(Clone)]
pub struct RecentSearches {
    store: Arc<dyn LocalStore>,
}

impl RecentSearches {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Stored terms, newest first. An unreadable store reads as empty.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        match read_json::<Vec<String>>(self.store.as_ref(), keys::RECENT_SEARCHES) {
            Ok(terms) => terms.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to read recent searches");
                Vec::new()
            }
        }
    }

    /// Record a term at the front. A repeat (ignoring case) moves to the
    /// front instead of duplicating; the oldest terms fall off past the cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn record(&self, term: &str) -> Result<Vec<String>, StorageError> {
        let term = term.trim();
        let mut terms = self.list();
        if term.is_empty() {
            return Ok(terms);
        }
        terms.retain(|t| !t.eq_ignore_ascii_case(term));
        terms.insert(0, term.to_owned());
        terms.truncate(MAX_RECENT_SEARCHES);
        write_json(self.store.as_ref(), keys::RECENT_SEARCHES, &terms)?;
        Ok(terms)
    }

    /// Drop one term.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn remove(&self, term: &str) -> Result<Vec<String>, StorageError> {
        let mut terms = self.list();
        terms.retain(|t| !t.eq_ignore_ascii_case(term.trim()));
        write_json(self.store.as_ref(), keys::RECENT_SEARCHES, &terms)?;
        Ok(terms)
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(keys::RECENT_SEARCHES)
    }
}

/// Case-insensitive match on name, category or sub-category.
#[must_use]
pub fn matches(product: &Product, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return false;
    }
    [
        Some(product.name.as_str()),
        product.category.as_deref(),
        product.sub_category.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&query))
}

/// Searches the full catalog and remembers what was searched for.
#[derive(Clone)]
pub struct ProductSearch {
    client: BackendClient,
    recent: RecentSearches,
}

impl ProductSearch {
    #[must_use]
    pub const fn new(client: BackendClient, recent: RecentSearches) -> Self {
        Self { client, recent }
    }

    #[must_use]
    pub const fn recent(&self) -> &RecentSearches {
        &self.recent
    }

    /// Products matching `query`. The term is recorded even when nothing
    /// matches; a storage failure only logs.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the catalog cannot be loaded.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, BackendError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        if let Err(e) = self.recent.record(query) {
            warn!(error = %e, "failed to record search term");
        }
        let products = self.client.all_products().await?;
        Ok(products
            .into_iter()
            .filter(|p| p.is_displayable() && matches(p, query))
            .collect())
    }
}
