//! PostgreSQL product store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ProductStore, StoreResult};
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::models::{
    NormalizedProduct, Nutriments, ProductId, ProductStatus, ProductUpdate, StoredProduct,
};

const PRODUCT_COLUMNS: &str = "id, code, name, brands, categories, labels, quantity, \
     ingredients_text, nutriments, countries, image_url, imported_t, status";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    code: String,
    name: String,
    brands: Option<String>,
    categories: Vec<String>,
    labels: Vec<String>,
    quantity: Option<String>,
    ingredients_text: Option<String>,
    nutriments: Json<Nutriments>,
    countries: Vec<String>,
    image_url: String,
    imported_t: DateTime<Utc>,
    status: String,
}

impl TryFrom<ProductRow> for StoredProduct {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ProductStatus>()
            .map_err(StoreError::Query)?;

        Ok(StoredProduct {
            id: ProductId(row.id),
            product: NormalizedProduct {
                code: row.code,
                name: row.name,
                brands: row.brands,
                categories: row.categories,
                labels: row.labels,
                quantity: row.quantity,
                ingredients_text: row.ingredients_text,
                nutriments: row.nutriments.0,
                countries: row.countries,
                image_url: row.image_url,
                imported_t: row.imported_t,
                status,
            },
        })
    }
}

fn stored(row: Option<ProductRow>) -> StoreResult<Option<StoredProduct>> {
    row.map(StoredProduct::try_from).transpose()
}

/// [`ProductStore`] backed by the `products` table
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool created"
        );

        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("migration failed: {}", e)))?;
        debug!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<StoredProduct>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE code = $1",
            PRODUCT_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        stored(row)
    }

    async fn insert(&self, product: &NormalizedProduct) -> StoreResult<StoredProduct> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (
                id, code, name, brands, categories, labels, quantity,
                ingredients_text, nutriments, countries, image_url, imported_t, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.brands)
        .bind(&product.categories)
        .bind(&product.labels)
        .bind(&product.quantity)
        .bind(&product.ingredients_text)
        .bind(Json(product.nutriments))
        .bind(&product.countries)
        .bind(&product.image_url)
        .bind(product.imported_t)
        .bind(product.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::DuplicateKey(product.code.clone())
            },
            other => StoreError::from(other),
        })?;

        let stored = StoredProduct::try_from(row)?;
        debug!(code = %stored.code(), id = %stored.id, "Inserted product");
        Ok(stored)
    }

    async fn update_by_code(
        &self,
        code: &str,
        update: &ProductUpdate,
    ) -> StoreResult<Option<StoredProduct>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                status = COALESCE($3, status)
            WHERE code = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(code)
        .bind(&update.name)
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        stored(row)
    }

    async fn mark_trash(&self, code: &str) -> StoreResult<Option<StoredProduct>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET status = $2 WHERE code = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(code)
        .bind(ProductStatus::Trash.as_str())
        .fetch_optional(&self.pool)
        .await?;

        stored(row)
    }
}
