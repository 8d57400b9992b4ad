//! Catalog maintenance on already imported products
//!
//! Same dual-write policy as the import: the primary store is written first
//! and decides the result, the search index is then brought in line on a
//! best-effort basis.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::StoreError;
use crate::index::SearchIndex;
use crate::models::{ProductUpdate, StoredProduct};
use crate::store::ProductStore;

pub struct ProductCatalog {
    store: Arc<dyn ProductStore>,
    index: Arc<dyn SearchIndex>,
}

impl ProductCatalog {
    pub fn new(store: Arc<dyn ProductStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self { store, index }
    }

    /// Update name and/or status. `None` when no product has this code.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        code: &str,
        update: ProductUpdate,
    ) -> Result<Option<StoredProduct>, StoreError> {
        let update = update.sanitized();
        let Some(stored) = self.store.update_by_code(code, &update).await? else {
            info!("No product with this code");
            return Ok(None);
        };

        if let Err(e) = self.index.patch(&stored.id, &stored.index_patch()).await {
            warn!(id = %stored.id, error = %e, "Search index patch failed, store already updated");
        }

        info!(id = %stored.id, status = %stored.product.status, "Product updated");
        Ok(Some(stored))
    }

    /// Soft-delete in the store and drop the product from the index
    #[instrument(skip(self))]
    pub async fn trash(&self, code: &str) -> Result<Option<StoredProduct>, StoreError> {
        let Some(stored) = self.store.mark_trash(code).await? else {
            info!("No product with this code");
            return Ok(None);
        };

        if let Err(e) = self.index.remove(&stored.id).await {
            warn!(id = %stored.id, error = %e, "Search index removal failed, product already trashed");
        }

        info!(id = %stored.id, "Product moved to trash");
        Ok(Some(stored))
    }
}
