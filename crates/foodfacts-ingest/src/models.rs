//! Product models shared by the pipeline, the stores and the catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use uuid::Uuid;

/// Name given to products whose source record carries no usable name.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown Product";

/// Editorial status of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Freshly imported, not reviewed yet
    #[default]
    Draft,
    Published,
    /// Soft-deleted
    Trash,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Published => "published",
            ProductStatus::Trash => "trash",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(ProductStatus::Draft),
            "published" => Ok(ProductStatus::Published),
            "trash" => Ok(ProductStatus::Trash),
            other => Err(format!(
                "unknown product status '{}' (expected draft, published or trash)",
                other
            )),
        }
    }
}

/// Nutrition facts per 100g. Every field is always present; unknown values are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutriments {
    pub energy_kj_100g: f64,
    pub energy_kcal_100g: f64,
    pub fat_100g: f64,
    pub sugars_100g: f64,
    pub proteins_100g: f64,
    pub salt_100g: f64,
    pub saturated_fat_100g: f64,
    pub carbohydrates_100g: f64,
    pub sodium_100g: f64,
    pub fiber_100g: f64,
}

impl Nutriments {
    /// Source keys of the ten tracked nutriments, in field order.
    pub const KEYS: [&'static str; 10] = [
        "energy_kj_100g",
        "energy_kcal_100g",
        "fat_100g",
        "sugars_100g",
        "proteins_100g",
        "salt_100g",
        "saturated_fat_100g",
        "carbohydrates_100g",
        "sodium_100g",
        "fiber_100g",
    ];

    /// Build from values listed in [`Nutriments::KEYS`] order.
    pub fn from_values(values: [f64; 10]) -> Self {
        let [energy_kj_100g, energy_kcal_100g, fat_100g, sugars_100g, proteins_100g, salt_100g, saturated_fat_100g, carbohydrates_100g, sodium_100g, fiber_100g] =
            values;
        Self {
            energy_kj_100g,
            energy_kcal_100g,
            fat_100g,
            sugars_100g,
            proteins_100g,
            salt_100g,
            saturated_fat_100g,
            carbohydrates_100g,
            sodium_100g,
            fiber_100g,
        }
    }

    /// Values in [`Nutriments::KEYS`] order.
    pub fn values(&self) -> [f64; 10] {
        [
            self.energy_kj_100g,
            self.energy_kcal_100g,
            self.fat_100g,
            self.sugars_100g,
            self.proteins_100g,
            self.salt_100g,
            self.saturated_fat_100g,
            self.carbohydrates_100g,
            self.sodium_100g,
            self.fiber_100g,
        ]
    }
}

/// A product in its canonical internal shape, before it has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProduct {
    /// Natural key (barcode). Never empty.
    pub code: String,
    pub name: String,
    pub brands: Option<String>,
    pub categories: Vec<String>,
    pub labels: Vec<String>,
    pub quantity: Option<String>,
    pub ingredients_text: Option<String>,
    pub nutriments: Nutriments,
    pub countries: Vec<String>,
    pub image_url: String,
    /// When this product was ingested; never taken from the source.
    pub imported_t: DateTime<Utc>,
    pub status: ProductStatus,
}

/// Identifier assigned by the primary store on first save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub Uuid);

impl ProductId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A product as persisted in the primary store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(flatten)]
    pub product: NormalizedProduct,
}

impl StoredProduct {
    pub fn code(&self) -> &str {
        &self.product.code
    }

    /// Denormalized projection mirrored into the search index.
    pub fn index_document(&self) -> Value {
        json!({
            "code": self.product.code,
            "name": self.product.name,
            "status": self.product.status,
            "imported_t": self.product.imported_t,
        })
    }

    /// Fields refreshed in the search index after an update.
    pub fn index_patch(&self) -> Value {
        json!({
            "name": self.product.name,
            "status": self.product.status,
        })
    }
}

/// Partial update applied to a stored product by natural key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub status: Option<ProductStatus>,
}

impl ProductUpdate {
    /// A provided but blank name falls back to [`UNKNOWN_PRODUCT_NAME`].
    pub fn sanitized(self) -> Self {
        let name = self.name.map(|name| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                UNKNOWN_PRODUCT_NAME.to_string()
            } else {
                trimmed.to_string()
            }
        });
        Self { name, ..self }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none()
    }
}
