//! Database operations for the catalog `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `catalog.product` - Products, addressed by their unique `sku`
//! - `catalog.product_stats` - One view counter per product
//! - `account.user` - Accounts with Argon2 password hashes
//! - `account.group` - The fixed authorization groups
//! - `account.user_group` - Group memberships
//! - `account.token` - One API token per account
//!
//! Controllers and side effects reach storage through the [`ProductStore`]
//! and [`UserStore`] traits; [`ProductRepository`] and [`UserRepository`]
//! are the `PostgreSQL` implementations.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p zebrands-cli -- migrate
//! ```

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use zebrands_core::{Role, RoleSet, Sku, UserId};

use crate::models::{NewProduct, NewUser, Product, ProductStats, User, UserChanges};

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate sku).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Product persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products in store order.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn get_by_sku(&self, sku: &Sku) -> Result<Option<Product>, RepositoryError>;

    /// Insert a product.
    ///
    /// Returns [`RepositoryError::Conflict`] if the sku is taken.
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Overwrite every field of the product currently stored under `sku`.
    ///
    /// Returns `None` if no such product exists and
    /// [`RepositoryError::Conflict`] if the new sku belongs to another product.
    async fn update(
        &self,
        sku: &Sku,
        product: &NewProduct,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product and its counter. Returns whether a row was removed.
    async fn delete(&self, sku: &Sku) -> Result<bool, RepositoryError>;

    /// Add one view, creating the counter at 1 if the product has none.
    ///
    /// Returns `None` if the product does not exist.
    async fn increment_view_count(
        &self,
        sku: &Sku,
    ) -> Result<Option<ProductStats>, RepositoryError>;

    async fn get_stats(&self, sku: &Sku) -> Result<Option<ProductStats>, RepositoryError>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Account, group and token persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Resolve an API token to its owner.
    async fn get_by_token(&self, key: &str) -> Result<Option<User>, RepositoryError>;

    /// The account and its stored password hash, for login.
    async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create an account and grant it `roles`, atomically.
    ///
    /// Returns [`RepositoryError::Conflict`] if the username is taken and
    /// [`RepositoryError::NotFound`] if a group backing one of the roles is
    /// missing; nothing is written in either case.
    async fn create(
        &self,
        user: &NewUser,
        password_hash: &str,
        roles: RoleSet,
    ) -> Result<User, RepositoryError>;

    /// Apply a partial update. `password_hash` replaces the stored hash when
    /// present; the plaintext in `changes` is ignored.
    async fn update(
        &self,
        username: &str,
        changes: &UserChanges,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, RepositoryError>;

    async fn delete(&self, username: &str) -> Result<bool, RepositoryError>;

    /// Whether the group backing `role` exists.
    async fn group_exists(&self, role: Role) -> Result<bool, RepositoryError>;

    /// Every member of the group backing `role`.
    async fn list_group_members(&self, role: Role) -> Result<Vec<User>, RepositoryError>;

    /// The user's token, storing `candidate` if they have none yet.
    async fn get_or_create_token(
        &self,
        user_id: UserId,
        candidate: &str,
    ) -> Result<String, RepositoryError>;

    /// Create any missing fixed group. Returns how many were created.
    async fn ensure_groups(&self) -> Result<u64, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
