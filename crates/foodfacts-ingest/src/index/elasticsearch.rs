//! Elasticsearch-compatible REST document API

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::SearchIndex;
use crate::config::SearchConfig;
use crate::error::IndexError;
use crate::models::ProductId;

/// [`SearchIndex`] talking to one index of an Elasticsearch/OpenSearch cluster
#[derive(Clone)]
pub struct ElasticsearchIndex {
    client: Client,
    base_url: String,
    index: String,
}

impl ElasticsearchIndex {
    pub fn new(client: Client, config: &SearchConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
        }
    }

    fn doc_url(&self, id: &ProductId) -> String {
        format!("{}/{}/_doc/{}", self.base_url, self.index, id)
    }

    fn update_url(&self, id: &ProductId) -> String {
        format!("{}/{}/_update/{}", self.base_url, self.index, id)
    }
}

async fn check(response: Response) -> Result<Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn upsert(&self, id: &ProductId, document: &Value) -> Result<(), IndexError> {
        let response = self.client.put(self.doc_url(id)).json(document).send().await?;
        check(response).await?;
        debug!(id = %id, index = %self.index, "Indexed document");
        Ok(())
    }

    async fn patch(&self, id: &ProductId, fields: &Value) -> Result<(), IndexError> {
        let response = self
            .client
            .post(self.update_url(id))
            .json(&json!({ "doc": fields }))
            .send()
            .await?;
        check(response).await?;
        debug!(id = %id, index = %self.index, "Patched document");
        Ok(())
    }

    async fn remove(&self, id: &ProductId) -> Result<(), IndexError> {
        let response = self.client.delete(self.doc_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(id = %id, index = %self.index, "Document already absent");
            return Ok(());
        }
        check(response).await?;
        debug!(id = %id, index = %self.index, "Removed document");
        Ok(())
    }
}
