//! Product resource operations.
//!
//! Each operation checks the access policy before touching the store, so a
//! denied write never reaches persistence. Side effects are handed to the
//! task queue after the store operation succeeds; a scheduling failure is
//! logged and does not fail the request.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use zebrands_core::Sku;

use super::access::{Decision, ProductAction, authorize};
use super::tasks::{Task, TaskQueue};
use crate::db::{ProductStore, RepositoryError};
use crate::error::{AppError, Result};
use crate::models::{
    Caller, NewProduct, Payload, ProductChanges, ProductDetail, ProductSummary, ValidationErrors,
};

/// Product list, retrieve, create, update and delete.
#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductStore>,
    tasks: Arc<dyn TaskQueue>,
}

/// Whether an update replaces every field or merges the given ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Full,
    Partial,
}

impl CatalogService {
    #[must_use]
    pub fn new(products: Arc<dyn ProductStore>, tasks: Arc<dyn TaskQueue>) -> Self {
        Self { products, tasks }
    }

    /// All products, reduced to sku and name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list(&self, caller: &Caller) -> Result<Vec<ProductSummary>> {
        require(caller, ProductAction::List)?;
        let products = self.products.list().await?;
        Ok(products.iter().map(ProductSummary::from).collect())
    }

    /// One product. Anonymous reads schedule a view count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no product has this sku.
    #[instrument(skip(self, caller))]
    pub async fn retrieve(&self, caller: &Caller, sku: &str) -> Result<ProductDetail> {
        require(caller, ProductAction::Retrieve)?;
        let sku = parse_path_sku(sku)?;
        let product = self
            .products
            .get_by_sku(&sku)
            .await?
            .ok_or_else(AppError::not_found)?;

        if !caller.is_authenticated() {
            self.schedule(Task::ProductViewCount { sku });
        }
        Ok(ProductDetail::from(&product))
    }

    /// Create a product from a payload carrying every field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for callers without `ProductAdmin` and
    /// `AppError::Validation` for a malformed payload or a taken sku.
    #[instrument(skip(self, caller, payload))]
    pub async fn create(&self, caller: &Caller, payload: &Payload) -> Result<ProductDetail> {
        require(caller, ProductAction::Create)?;
        let new = NewProduct::from_payload(payload)?;
        let product = self.products.create(&new).await.map_err(sku_conflict)?;

        info!(sku = %product.sku, "Product created");
        Ok(ProductDetail::from(&product))
    }

    /// Update a product and notify product admins.
    ///
    /// The notification carries the sku the product has after the update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for callers without `ProductAdmin`,
    /// `AppError::NotFound` for an unknown sku and `AppError::Validation`
    /// for a malformed payload or a taken sku.
    #[instrument(skip(self, caller, payload))]
    pub async fn update(
        &self,
        caller: &Caller,
        sku: &str,
        payload: &Payload,
        mode: UpdateMode,
    ) -> Result<ProductDetail> {
        require(caller, ProductAction::Update)?;
        let sku = parse_path_sku(sku)?;
        let existing = self
            .products
            .get_by_sku(&sku)
            .await?
            .ok_or_else(AppError::not_found)?;

        let changes = match mode {
            UpdateMode::Full => ProductChanges::from(NewProduct::from_payload(payload)?),
            UpdateMode::Partial => ProductChanges::from_payload(payload)?,
        };
        let merged = changes.apply_to(&existing);
        let product = self
            .products
            .update(&existing.sku, &merged)
            .await
            .map_err(sku_conflict)?
            .ok_or_else(AppError::not_found)?;

        info!(sku = %product.sku, "Product updated");
        self.schedule(Task::ProductChangeNotification {
            sku: product.sku.clone(),
        });
        Ok(ProductDetail::from(&product))
    }

    /// Delete a product and its view counter.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for callers without `ProductAdmin` and
    /// `AppError::NotFound` for an unknown sku.
    #[instrument(skip(self, caller))]
    pub async fn delete(&self, caller: &Caller, sku: &str) -> Result<()> {
        require(caller, ProductAction::Delete)?;
        let sku = parse_path_sku(sku)?;
        if !self.products.delete(&sku).await? {
            return Err(AppError::not_found());
        }
        info!(%sku, "Product deleted");
        Ok(())
    }

    fn schedule(&self, task: Task) {
        let name = task.name();
        let sku = task.sku().clone();
        if let Err(e) = self.tasks.enqueue(task) {
            warn!(task = name, %sku, error = %e, "Failed to schedule background task");
        }
    }
}

/// Apply the product access policy to a caller.
///
/// # Errors
///
/// Returns `AppError::Forbidden` with the not-authenticated message for
/// anonymous callers and the permission-denied message otherwise.
pub fn require(caller: &Caller, action: ProductAction) -> Result<()> {
    match authorize(caller, action) {
        Decision::Allow => Ok(()),
        Decision::Forbidden if caller.is_authenticated() => Err(AppError::permission_denied()),
        Decision::Forbidden => Err(AppError::not_authenticated()),
    }
}

/// Match the path segment exactly. Stored skus are trimmed, so a padded or
/// otherwise unstorable segment cannot name a product.
fn parse_path_sku(raw: &str) -> Result<Sku> {
    match Sku::parse(raw) {
        Ok(sku) if sku.as_str() == raw => Ok(sku),
        _ => Err(AppError::not_found()),
    }
}

fn sku_conflict(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::Conflict(message) => ValidationErrors::single("sku", message).into(),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use zebrands_core::{Role, RoleSet, UserId};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::CurrentUser;
    use crate::services::tasks::RecordingQueue;

    struct Fixture {
        store: Arc<MemoryStore>,
        queue: Arc<RecordingQueue>,
        catalog: CatalogService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(RecordingQueue::new());
        let catalog = CatalogService::new(store.clone(), queue.clone());
        Fixture {
            store,
            queue,
            catalog,
        }
    }

    fn caller(roles: RoleSet) -> Caller {
        Caller::User(CurrentUser {
            id: UserId::new(1),
            username: "staff".to_owned(),
            roles,
        })
    }

    fn admin() -> Caller {
        caller(RoleSet::empty().with(Role::ProductAdmin))
    }

    fn payload(value: serde_json::Value) -> Payload {
        serde_json::from_value(value).unwrap()
    }

    fn widget() -> Payload {
        payload(json!({"sku": "A1", "name": "Widget", "price": "9.99", "brand": "Acme"}))
    }

    #[tokio::test]
    async fn test_anonymous_retrieve_schedules_one_view_count() {
        let f = fixture();
        f.catalog.create(&admin(), &widget()).await.unwrap();

        f.catalog.retrieve(&Caller::Anonymous, "A1").await.unwrap();
        assert_eq!(
            f.queue.tasks(),
            [Task::ProductViewCount {
                sku: Sku::parse("A1").unwrap()
            }]
        );

        f.catalog.retrieve(&admin(), "A1").await.unwrap();
        assert_eq!(f.queue.tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_padded_path_sku_is_not_found() {
        let f = fixture();
        f.catalog.create(&admin(), &widget()).await.unwrap();

        for raw in ["  A1 ", "A1 ", " A1"] {
            let err = f.catalog.retrieve(&Caller::Anonymous, raw).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)), "{raw:?}");
            let err = f.catalog.delete(&admin(), raw).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)), "{raw:?}");
        }
        assert!(f.queue.tasks().is_empty());
        assert_eq!(f.store.product_count(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_not_found_and_schedules_nothing() {
        let f = fixture();
        let err = f.catalog.retrieve(&Caller::Anonymous, "NOPE").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(f.queue.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_writes_without_product_admin_change_nothing() {
        let f = fixture();
        f.catalog.create(&admin(), &widget()).await.unwrap();
        let other = payload(json!({"sku": "B2", "name": "x", "price": "1", "brand": "y"}));

        for who in [Caller::Anonymous, caller(RoleSet::empty().with(Role::UserAdmin))] {
            let err = f.catalog.create(&who, &other).await.unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
            let err = f
                .catalog
                .update(&who, "A1", &payload(json!({"name": "hack"})), UpdateMode::Partial)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
            let err = f.catalog.delete(&who, "A1").await.unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }

        assert_eq!(f.store.product_count(), 1);
        let detail = f.catalog.retrieve(&admin(), "A1").await.unwrap();
        assert_eq!(detail.name, "Widget");
        assert!(f.queue.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_beats_not_found() {
        let f = fixture();
        let err = f.catalog.delete(&Caller::Anonymous, "MISSING").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_partial_update_merges_and_notifies_once() {
        let f = fixture();
        f.catalog.create(&admin(), &widget()).await.unwrap();

        let detail = f
            .catalog
            .update(
                &admin(),
                "A1",
                &payload(json!({"name": "test name"})),
                UpdateMode::Partial,
            )
            .await
            .unwrap();

        assert_eq!(detail.name, "test name");
        assert_eq!(detail.brand, "Acme");
        assert_eq!(detail.price.to_string(), "9.99");
        assert_eq!(
            f.queue.tasks(),
            [Task::ProductChangeNotification {
                sku: Sku::parse("A1").unwrap()
            }]
        );
    }

    #[tokio::test]
    async fn test_full_update_requires_every_field() {
        let f = fixture();
        f.catalog.create(&admin(), &widget()).await.unwrap();

        let err = f
            .catalog
            .update(&admin(), "A1", &payload(json!({"name": "x"})), UpdateMode::Full)
            .await
            .unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.field("sku").is_some());
        assert!(f.queue.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_sku_change_notifies_with_new_sku() {
        let f = fixture();
        f.catalog.create(&admin(), &widget()).await.unwrap();

        f.catalog
            .update(&admin(), "A1", &payload(json!({"sku": "A2"})), UpdateMode::Partial)
            .await
            .unwrap();

        assert_eq!(
            f.queue.tasks(),
            [Task::ProductChangeNotification {
                sku: Sku::parse("A2").unwrap()
            }]
        );
        assert!(f.catalog.retrieve(&admin(), "A1").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_a_field_error() {
        let f = fixture();
        f.catalog.create(&admin(), &widget()).await.unwrap();
        let err = f.catalog.create(&admin(), &widget()).await.unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            errors.field("sku").unwrap(),
            ["product with this sku already exists."]
        );
    }

    #[tokio::test]
    async fn test_closed_queue_does_not_fail_the_request() {
        let f = fixture();
        f.catalog.create(&admin(), &widget()).await.unwrap();
        f.queue.close();

        assert!(f.catalog.retrieve(&Caller::Anonymous, "A1").await.is_ok());
        assert!(
            f.catalog
                .update(&admin(), "A1", &payload(json!({})), UpdateMode::Partial)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_delete_then_retrieve_is_not_found() {
        let f = fixture();
        f.catalog.create(&admin(), &widget()).await.unwrap();
        f.catalog.delete(&admin(), "A1").await.unwrap();
        assert!(matches!(
            f.catalog.retrieve(&admin(), "A1").await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            f.catalog.delete(&admin(), "A1").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
