//! Raw record parsing and normalization
//!
//! Two independent steps: [`parse_line`] decides whether a line is a JSON
//! object at all, then [`normalize`] maps that object into a
//! [`NormalizedProduct`]. Only a missing natural key is rejected; every other
//! gap is filled with a default.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{NormalizedProduct, Nutriments, ProductStatus, UNKNOWN_PRODUCT_NAME};

/// One untyped product object as found in the dataset
pub type RawRecord = Map<String, Value>;

/// Separator used by the dataset for multi-valued text fields
const LIST_DELIMITER: char = ',';

/// Result of parsing one dataset line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Record(RawRecord),
    /// Not valid JSON, or valid JSON that is not an object
    Malformed(String),
}

/// Rejection of a structurally valid record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("record has no product code")]
    MissingCode,
}

pub fn parse_line(line: &str) -> ParsedLine {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(record)) => ParsedLine::Record(record),
        Ok(other) => ParsedLine::Malformed(format!("expected a JSON object, got {}", kind(&other))),
        Err(e) => ParsedLine::Malformed(e.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Map a raw record into the canonical product shape.
///
/// `now` becomes `imported_t`; the status is always [`ProductStatus::Draft`].
pub fn normalize(
    raw: &RawRecord,
    now: DateTime<Utc>,
) -> Result<NormalizedProduct, ValidationError> {
    let code = code(raw.get("code")).ok_or(ValidationError::MissingCode)?;

    let name = text(raw.get("name"))
        .or_else(|| text(raw.get("product_name")))
        .unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string());

    Ok(NormalizedProduct {
        code,
        name,
        brands: text(raw.get("brands")),
        categories: list(raw.get("categories")),
        labels: list(raw.get("labels")),
        quantity: text(raw.get("quantity")),
        ingredients_text: text(raw.get("ingredients_text")),
        nutriments: nutriments(raw.get("nutriments")),
        countries: list(raw.get("countries")),
        image_url: text(raw.get("image_url")).unwrap_or_default(),
        imported_t: now,
        status: ProductStatus::Draft,
    })
}

fn code(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        },
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        _ => None,
    }
}

/// Non-blank string, trimmed
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        },
        _ => None,
    }
}

/// Delimited string or array of strings, in source order, blanks dropped
fn list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(LIST_DELIMITER)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items.iter().filter_map(|item| text(Some(item))).collect(),
        _ => Vec::new(),
    }
}

fn nutriments(value: Option<&Value>) -> Nutriments {
    let Some(Value::Object(source)) = value else {
        return Nutriments::default();
    };

    Nutriments::from_values(Nutriments::KEYS.map(|key| {
        source
            .get(key)
            .or_else(|| source.get(&upstream_key(key)))
            .and_then(number)
            .unwrap_or(0.0)
    }))
}

/// `saturated_fat_100g` is published upstream as `saturated-fat_100g`
fn upstream_key(key: &str) -> String {
    match key.strip_suffix("_100g") {
        Some(stem) => format!("{}_100g", stem.replace('_', "-")),
        None => key.to_string(),
    }
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
