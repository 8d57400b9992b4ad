//! Common test utilities for foodfacts-ingest integration tests
//!
//! - [`MemoryStore`] / [`MemoryIndex`]: in-process port implementations with
//!   failure injection
//! - gzip fixture builders
//! - wiremock mounts for the manifest and dataset endpoints

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use foodfacts_ingest::config::{IngestConfig, SourceConfig};
use foodfacts_ingest::error::{IndexError, StoreError};
use foodfacts_ingest::index::SearchIndex;
use foodfacts_ingest::models::{
    NormalizedProduct, ProductId, ProductStatus, ProductUpdate, StoredProduct,
};
use foodfacts_ingest::pipeline::ImportCoordinator;
use foodfacts_ingest::store::{ProductStore, StoreResult};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Remote directory the mock server serves the dataset from
pub const DATA_PATH: &str = "/food/data/json";

pub const DATASET_FILE: &str = "products_02.json.gz";

// ============================================================================
// Tracing
// ============================================================================

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("foodfacts_ingest=debug")
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

/// Gzip the lines joined with `\n`
pub fn gzip_lines<S: AsRef<str>>(lines: &[S]) -> Vec<u8> {
    let body: String = lines.iter().map(|l| format!("{}\n", l.as_ref())).collect();
    gzip(body.as_bytes())
}

pub fn product_line(code: &str, name: &str) -> String {
    json!({"code": code, "name": name}).to_string()
}

/// `count` distinct product lines, codes `000`, `001`, ...
pub fn product_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| product_line(&format!("{:03}", i), &format!("Product {}", i)))
        .collect()
}

pub fn normalized(code: &str) -> NormalizedProduct {
    NormalizedProduct {
        code: code.to_string(),
        name: format!("Product {}", code),
        brands: None,
        categories: vec![],
        labels: vec![],
        quantity: None,
        ingredients_text: None,
        nutriments: Default::default(),
        countries: vec![],
        image_url: String::new(),
        imported_t: chrono::Utc::now(),
        status: ProductStatus::Draft,
    }
}

// ============================================================================
// Remote endpoints
// ============================================================================

pub async fn mount_manifest(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{}/index.txt", DATA_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_dataset(server: &MockServer, filename: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", DATA_PATH, filename)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(server)
        .await;
}

/// Manifest listing an older file and [`DATASET_FILE`], plus the dataset itself
pub async fn mount_source<S: AsRef<str>>(server: &MockServer, lines: &[S]) {
    mount_manifest(server, &format!("products_01.json.gz\n{}\n", DATASET_FILE)).await;
    mount_dataset(server, DATASET_FILE, gzip_lines(lines)).await;
}

// ============================================================================
// Wiring
// ============================================================================

pub fn source_config(server: &MockServer, tmp_dir: &Path) -> SourceConfig {
    SourceConfig {
        data_base_url: format!("{}{}", server.uri(), DATA_PATH),
        tmp_dir: tmp_dir.to_path_buf(),
        ..Default::default()
    }
}

pub fn ingest_config(server: &MockServer, tmp_dir: &Path, max_records: usize) -> IngestConfig {
    IngestConfig {
        source: source_config(server, tmp_dir),
        max_records_per_run: max_records,
        ..Default::default()
    }
}

pub fn coordinator(
    server: &MockServer,
    tmp_dir: &Path,
    max_records: usize,
    store: Arc<MemoryStore>,
    index: Arc<MemoryIndex>,
) -> ImportCoordinator {
    ImportCoordinator::from_config(&ingest_config(server, tmp_dir, max_records), store, index)
        .unwrap()
}

// ============================================================================
// In-memory primary store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    products: Mutex<Vec<StoredProduct>>,
    lookups: AtomicUsize,
    /// Lookups beyond this count fail as unreachable
    lookup_budget: Mutex<Option<usize>>,
    /// Lookups never see existing products, so only the unique key catches duplicates
    blind_lookups: AtomicBool,
    failing_inserts: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_lookups_after(&self, successful: usize) {
        *self.lookup_budget.lock().unwrap() = Some(successful);
    }

    pub fn blind_lookups(&self) {
        self.blind_lookups.store(true, Ordering::SeqCst);
    }

    pub fn fail_insert_for(&self, code: &str) {
        self.failing_inserts.lock().unwrap().insert(code.to_string());
    }

    pub fn seed(&self, code: &str) -> StoredProduct {
        let stored = StoredProduct {
            id: ProductId::new(),
            product: normalized(code),
        };
        self.products.lock().unwrap().push(stored.clone());
        stored
    }

    pub fn len(&self) -> usize {
        self.products.lock().unwrap().len()
    }

    pub fn codes(&self) -> Vec<String> {
        self.products
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.product.code.clone())
            .collect()
    }

    pub fn get(&self, code: &str) -> Option<StoredProduct> {
        self.products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.product.code == code)
            .cloned()
    }

    pub fn count_code(&self, code: &str) -> usize {
        self.products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.product.code == code)
            .count()
    }

    fn modify<F>(&self, code: &str, apply: F) -> Option<StoredProduct>
    where
        F: FnOnce(&mut NormalizedProduct),
    {
        let mut products = self.products.lock().unwrap();
        let stored = products.iter_mut().find(|p| p.product.code == code)?;
        apply(&mut stored.product);
        Some(stored.clone())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<StoredProduct>> {
        let done = self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(budget) = *self.lookup_budget.lock().unwrap() {
            if done >= budget {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
        }
        if self.blind_lookups.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.get(code))
    }

    async fn insert(&self, product: &NormalizedProduct) -> StoreResult<StoredProduct> {
        if self.failing_inserts.lock().unwrap().contains(&product.code) {
            return Err(StoreError::Query("value too long for column".to_string()));
        }
        let mut products = self.products.lock().unwrap();
        if products.iter().any(|p| p.product.code == product.code) {
            return Err(StoreError::DuplicateKey(product.code.clone()));
        }
        let stored = StoredProduct {
            id: ProductId::new(),
            product: product.clone(),
        };
        products.push(stored.clone());
        Ok(stored)
    }

    async fn update_by_code(
        &self,
        code: &str,
        update: &ProductUpdate,
    ) -> StoreResult<Option<StoredProduct>> {
        Ok(self.modify(code, |product| {
            if let Some(name) = &update.name {
                product.name = name.clone();
            }
            if let Some(status) = update.status {
                product.status = status;
            }
        }))
    }

    async fn mark_trash(&self, code: &str) -> StoreResult<Option<StoredProduct>> {
        Ok(self.modify(code, |product| product.status = ProductStatus::Trash))
    }
}

// ============================================================================
// In-memory search index
// ============================================================================

#[derive(Default)]
pub struct MemoryIndex {
    documents: Mutex<HashMap<ProductId, Value>>,
    /// Product codes whose upsert fails
    failing_codes: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
}

impl MemoryIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_upsert_for(&self, code: &str) {
        self.failing_codes.lock().unwrap().insert(code.to_string());
    }

    pub fn fail_everything(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn document(&self, id: &ProductId) -> Option<Value> {
        self.documents.lock().unwrap().get(id).cloned()
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.documents
            .lock()
            .unwrap()
            .values()
            .any(|doc| doc["code"] == code)
    }

    fn unavailable() -> IndexError {
        IndexError::Status {
            status: 503,
            body: "search index unavailable".to_string(),
        }
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn upsert(&self, id: &ProductId, document: &Value) -> Result<(), IndexError> {
        let code = document["code"].as_str().unwrap_or_default();
        if self.fail_all.load(Ordering::SeqCst) || self.failing_codes.lock().unwrap().contains(code)
        {
            return Err(Self::unavailable());
        }
        self.documents.lock().unwrap().insert(*id, document.clone());
        Ok(())
    }

    async fn patch(&self, id: &ProductId, fields: &Value) -> Result<(), IndexError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let mut documents = self.documents.lock().unwrap();
        let document = documents.entry(*id).or_insert_with(|| json!({}));
        if let (Some(target), Some(source)) = (document.as_object_mut(), fields.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn remove(&self, id: &ProductId) -> Result<(), IndexError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.documents.lock().unwrap().remove(id);
        Ok(())
    }
}
