//! View-count side effect for anonymous product reads.

use tracing::{debug, info, instrument};

use zebrands_core::Sku;

use crate::db::{ProductStore, RepositoryError};
use crate::models::ProductStats;

/// Count one view of `sku`.
///
/// Each call adds exactly one; repeated delivery of the same task counts
/// twice. Returns `None` if the product was deleted before the task ran.
///
/// # Errors
///
/// Returns `RepositoryError` if the store is unavailable.
#[instrument(skip(products), fields(sku = %sku))]
pub async fn record_view(
    products: &dyn ProductStore,
    sku: &Sku,
) -> Result<Option<ProductStats>, RepositoryError> {
    let stats = products.increment_view_count(sku).await?;
    match &stats {
        Some(stats) => debug!(view_count = stats.view_count, "View recorded"),
        None => info!("Product no longer exists, view not counted"),
    }
    Ok(stats)
}
