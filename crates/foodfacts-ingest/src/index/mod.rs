//! Search index mirror
//!
//! The index holds a denormalized projection of each stored product. It is a
//! best-effort mirror: callers log failures and move on, the primary store
//! stays authoritative.

pub mod elasticsearch;

pub use elasticsearch::ElasticsearchIndex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::IndexError;
use crate::models::ProductId;

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or replace the document for `id`
    async fn upsert(&self, id: &ProductId, document: &Value) -> Result<(), IndexError>;

    /// Merge `fields` into the existing document for `id`
    async fn patch(&self, id: &ProductId, fields: &Value) -> Result<(), IndexError>;

    /// Delete the document for `id`. Removing an absent document succeeds.
    async fn remove(&self, id: &ProductId) -> Result<(), IndexError>;
}
