//! Product domain types and their wire projections.

use chrono::{DateTime, Utc};
use serde::Serialize;

use zebrands_core::{Price, ProductId, Sku};

use super::validation::{Payload, TextField, ValidationErrors};

const SKU: TextField = TextField::new("sku", Sku::MAX_LENGTH);
const NAME: TextField = TextField::new("name", 256);
const BRAND: TextField = TextField::new("brand", 128);

/// A catalog product (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub price: Price,
    pub brand: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Per-product view counter, created lazily on the first anonymous read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductStats {
    pub product_id: ProductId,
    pub view_count: i64,
}

/// Validated fields for a new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub sku: Sku,
    pub name: String,
    pub price: Price,
    pub brand: String,
}

/// Validated fields to merge onto an existing product. `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub sku: Option<Sku>,
    pub name: Option<String>,
    pub price: Option<Price>,
    pub brand: Option<String>,
}

impl NewProduct {
    /// Validate a create (or full update) payload: every field is required.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages if any field is missing or malformed.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let sku = read_sku(payload, true, &mut errors);
        let name = payload.text(NAME, true, &mut errors);
        let price = payload.price("price", true, &mut errors);
        let brand = payload.text(BRAND, true, &mut errors);

        match (sku, name, price, brand) {
            (Some(sku), Some(name), Some(price), Some(brand)) if errors.is_empty() => Ok(Self {
                sku,
                name,
                price,
                brand,
            }),
            _ => Err(errors),
        }
    }
}

impl ProductChanges {
    /// Validate a partial update payload: absent fields are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages for any present field that is malformed.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let sku = read_sku(payload, false, &mut errors);
        let name = payload.text(NAME, false, &mut errors);
        let price = payload.price("price", false, &mut errors);
        let brand = payload.text(BRAND, false, &mut errors);

        errors.finish(|| Self {
            sku,
            name,
            price,
            brand,
        })
    }

    /// Merge onto `product`, returning the resulting field values.
    #[must_use]
    pub fn apply_to(&self, product: &Product) -> NewProduct {
        NewProduct {
            sku: self.sku.clone().unwrap_or_else(|| product.sku.clone()),
            name: self.name.clone().unwrap_or_else(|| product.name.clone()),
            price: self.price.unwrap_or(product.price),
            brand: self.brand.clone().unwrap_or_else(|| product.brand.clone()),
        }
    }
}

impl From<NewProduct> for ProductChanges {
    fn from(product: NewProduct) -> Self {
        Self {
            sku: Some(product.sku),
            name: Some(product.name),
            price: Some(product.price),
            brand: Some(product.brand),
        }
    }
}

fn read_sku(payload: &Payload, required: bool, errors: &mut ValidationErrors) -> Option<Sku> {
    let raw = payload.text(SKU, required, errors)?;
    Sku::parse(&raw)
        .map_err(|_| errors.add(SKU.name, "Enter a valid SKU without '/' or control characters."))
        .ok()
}

/// Full product representation returned by retrieve, create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetail {
    pub sku: Sku,
    pub name: String,
    pub price: Price,
    pub brand: String,
}

impl From<&Product> for ProductDetail {
    fn from(product: &Product) -> Self {
        Self {
            sku: product.sku.clone(),
            name: product.name.clone(),
            price: product.price,
            brand: product.brand.clone(),
        }
    }
}

/// Reduced representation used by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub sku: Sku,
    pub name: String,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            sku: product.sku.clone(),
            name: product.name.clone(),
        }
    }
}
