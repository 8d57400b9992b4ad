//! Primary product store
//!
//! The primary store is the source of truth. [`ProductStore`] is the port the
//! pipeline and the catalog depend on; [`PgProductStore`] is the PostgreSQL
//! implementation.

pub mod postgres;

pub use postgres::PgProductStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{NormalizedProduct, ProductUpdate, StoredProduct};

/// Result type alias for primary store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Look a product up by its natural key
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<StoredProduct>>;

    /// Persist a new product, assigning its identifier.
    ///
    /// Fails with [`StoreError::DuplicateKey`] when the code is already taken.
    async fn insert(&self, product: &NormalizedProduct) -> StoreResult<StoredProduct>;

    /// Apply a partial update; `None` when no product has this code
    async fn update_by_code(
        &self,
        code: &str,
        update: &ProductUpdate,
    ) -> StoreResult<Option<StoredProduct>>;

    /// Soft-delete by setting the status to trash; `None` when no product has this code
    async fn mark_trash(&self, code: &str) -> StoreResult<Option<StoredProduct>>;
}
