//! Product repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use zebrands_core::{Price, ProductId, Sku};

use super::{ProductStore, RepositoryError, conflict_on_unique};
use crate::models::{NewProduct, Product, ProductStats};

const DUPLICATE_SKU: &str = "product with this sku already exists.";

const PRODUCT_COLUMNS: &str = "id, sku, name, price, brand, created_at, modified_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    price: Decimal,
    brand: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let sku = Sku::parse(&row.sku).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid sku in database: {e}"))
        })?;
        let price = Price::from_decimal(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            sku,
            name: row.name,
            price,
            brand: row.brand,
            created_at: row.created_at,
            modified_at: row.modified_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    product_id: i64,
    view_count: i64,
}

impl From<StatsRow> for ProductStats {
    fn from(row: StatsRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            view_count: row.view_count,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` product storage.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_by_sku(&self, sku: &Sku) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product WHERE sku = $1"
        ))
        .bind(sku.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO catalog.product (sku, name, price, brand)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.sku.as_str())
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(&product.brand)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_SKU))?;

        row.try_into()
    }

    async fn update(
        &self,
        sku: &Sku,
        product: &NewProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE catalog.product
            SET sku = $2, name = $3, price = $4, brand = $5, modified_at = NOW()
            WHERE sku = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(sku.as_str())
        .bind(product.sku.as_str())
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(&product.brand)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_SKU))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete(&self, sku: &Sku) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.product WHERE sku = $1")
            .bind(sku.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_view_count(
        &self,
        sku: &Sku,
    ) -> Result<Option<ProductStats>, RepositoryError> {
        // Single statement: concurrent views never lose an increment.
        let row = sqlx::query_as::<_, StatsRow>(
            r"
            INSERT INTO catalog.product_stats (product_id, view_count)
            SELECT id, 1 FROM catalog.product WHERE sku = $1
            ON CONFLICT (product_id) DO UPDATE
            SET view_count = catalog.product_stats.view_count + 1,
                modified_at = NOW()
            RETURNING product_id, view_count
            ",
        )
        .bind(sku.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_stats(&self, sku: &Sku) -> Result<Option<ProductStats>, RepositoryError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r"
            SELECT s.product_id, s.view_count
            FROM catalog.product_stats s
            JOIN catalog.product p ON p.id = s.product_id
            WHERE p.sku = $1
            ",
        )
        .bind(sku.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
