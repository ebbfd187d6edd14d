//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::{ProductStore, UserStore};
use crate::services::{AccountService, CatalogService, TaskQueue};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Storage and the task queue are trait
/// objects so the same router runs against `PostgreSQL` or in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    products: Arc<dyn ProductStore>,
    users: Arc<dyn UserStore>,
    catalog: CatalogService,
    accounts: AccountService,
}

impl AppState {
    /// Wire services over the given stores and task queue.
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductStore>,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskQueue>,
    ) -> Self {
        let catalog = CatalogService::new(Arc::clone(&products), tasks);
        let accounts = AccountService::new(Arc::clone(&users));

        Self {
            inner: Arc::new(AppStateInner {
                products,
                users,
                catalog,
                accounts,
            }),
        }
    }

    /// Product operations.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Account operations.
    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }

    #[must_use]
    pub fn products(&self) -> &dyn ProductStore {
        self.inner.products.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }
}
