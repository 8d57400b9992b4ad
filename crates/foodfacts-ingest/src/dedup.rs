//! Duplicate suppression by natural key

use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::store::ProductStore;

/// Checks the primary store for a product with the same code before an insert
#[derive(Clone)]
pub struct DedupGuard {
    store: Arc<dyn ProductStore>,
}

impl DedupGuard {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    /// Whether a product with `code` is already stored.
    ///
    /// A failed lookup is an error, never a guess: the caller cannot know
    /// whether inserting would create a duplicate.
    pub async fn already_exists(&self, code: &str) -> Result<bool> {
        let existing = self.store.find_by_code(code).await?;
        if let Some(product) = &existing {
            debug!(code, id = %product.id, "Product already stored");
        }
        Ok(existing.is_some())
    }
}
