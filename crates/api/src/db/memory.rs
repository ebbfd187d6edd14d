//! In-memory [`ProductStore`] and [`UserStore`] for tests.
//!
//! Mirrors the constraints of the `PostgreSQL` schema: unique skus and
//! usernames, one counter and one token per owner, cascading deletes, and
//! all-or-nothing account creation.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use zebrands_core::{ProductId, Role, RoleSet, Sku, UserId};

use super::{ProductStore, RepositoryError, UserStore};
use crate::models::{NewProduct, NewUser, Product, ProductStats, User, UserChanges};

#[derive(Debug)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct State {
    products: Vec<Product>,
    view_counts: HashMap<ProductId, i64>,
    next_product_id: i64,
    users: Vec<StoredUser>,
    next_user_id: i64,
    groups: BTreeSet<Role>,
    tokens: HashMap<String, UserId>,
    unavailable: bool,
}

/// Shared in-memory storage. Starts with both fixed groups present, as after
/// migrations.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let state = State {
            groups: Role::ALL.into_iter().collect(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the group backing `role`, along with its memberships.
    pub fn remove_group(&self, role: Role) {
        let mut state = self.lock();
        state.groups.remove(&role);
        for stored in &mut state.users {
            stored.user.roles = stored.user.roles.iter().filter(|r| *r != role).collect();
        }
    }

    /// Make [`ProductStore::ping`] fail, as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Number of stored products.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.lock().products.len()
    }
}

fn conflict(message: &str) -> RepositoryError {
    RepositoryError::Conflict(message.to_owned())
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.lock().products.clone())
    }

    async fn get_by_sku(&self, sku: &Sku) -> Result<Option<Product>, RepositoryError> {
        Ok(self.lock().products.iter().find(|p| &p.sku == sku).cloned())
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.lock();
        if state.products.iter().any(|p| p.sku == product.sku) {
            return Err(conflict("product with this sku already exists."));
        }
        state.next_product_id += 1;
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(state.next_product_id),
            sku: product.sku.clone(),
            name: product.name.clone(),
            price: product.price,
            brand: product.brand.clone(),
            created_at: now,
            modified_at: now,
        };
        state.products.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        sku: &Sku,
        product: &NewProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut state = self.lock();
        if product.sku != *sku && state.products.iter().any(|p| p.sku == product.sku) {
            return Err(conflict("product with this sku already exists."));
        }
        let Some(existing) = state.products.iter_mut().find(|p| &p.sku == sku) else {
            return Ok(None);
        };
        existing.sku = product.sku.clone();
        existing.name = product.name.clone();
        existing.price = product.price;
        existing.brand = product.brand.clone();
        existing.modified_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, sku: &Sku) -> Result<bool, RepositoryError> {
        let mut state = self.lock();
        let Some(index) = state.products.iter().position(|p| &p.sku == sku) else {
            return Ok(false);
        };
        let removed = state.products.remove(index);
        state.view_counts.remove(&removed.id);
        Ok(true)
    }

    async fn increment_view_count(
        &self,
        sku: &Sku,
    ) -> Result<Option<ProductStats>, RepositoryError> {
        let mut state = self.lock();
        let Some(product_id) = state.products.iter().find(|p| &p.sku == sku).map(|p| p.id)
        else {
            return Ok(None);
        };
        let count = state.view_counts.entry(product_id).or_insert(0);
        *count += 1;
        Ok(Some(ProductStats {
            product_id,
            view_count: *count,
        }))
    }

    async fn get_stats(&self, sku: &Sku) -> Result<Option<ProductStats>, RepositoryError> {
        let state = self.lock();
        Ok(state
            .products
            .iter()
            .find(|p| &p.sku == sku)
            .and_then(|p| {
                state.view_counts.get(&p.id).map(|count| ProductStats {
                    product_id: p.id,
                    view_count: *count,
                })
            }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        if self.lock().unavailable {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|s| s.user.username == username)
            .map(|s| s.user.clone()))
    }

    async fn get_by_token(&self, key: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.lock();
        Ok(state.tokens.get(key).and_then(|id| {
            state
                .users
                .iter()
                .find(|s| s.user.id == *id)
                .map(|s| s.user.clone())
        }))
    }

    async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|s| s.user.username == username)
            .map(|s| (s.user.clone(), s.password_hash.clone())))
    }

    async fn create(
        &self,
        user: &NewUser,
        password_hash: &str,
        roles: RoleSet,
    ) -> Result<User, RepositoryError> {
        let mut state = self.lock();
        if state.users.iter().any(|s| s.user.username == user.username) {
            return Err(conflict("A user with that username already exists."));
        }
        if roles.iter().any(|role| !state.groups.contains(&role)) {
            return Err(RepositoryError::NotFound);
        }
        state.next_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::new(state.next_user_id),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            roles,
            created_at: now,
            updated_at: now,
        };
        state.users.push(StoredUser {
            user: created.clone(),
            password_hash: password_hash.to_owned(),
        });
        Ok(created)
    }

    async fn update(
        &self,
        username: &str,
        changes: &UserChanges,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        let mut state = self.lock();
        let Some(stored) = state.users.iter_mut().find(|s| s.user.username == username) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            stored.user.email = email.clone();
        }
        if let Some(first_name) = &changes.first_name {
            stored.user.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &changes.last_name {
            stored.user.last_name.clone_from(last_name);
        }
        if let Some(hash) = password_hash {
            hash.clone_into(&mut stored.password_hash);
        }
        stored.user.updated_at = Utc::now();
        Ok(Some(stored.user.clone()))
    }

    async fn delete(&self, username: &str) -> Result<bool, RepositoryError> {
        let mut state = self.lock();
        let Some(index) = state.users.iter().position(|s| s.user.username == username) else {
            return Ok(false);
        };
        let removed = state.users.remove(index);
        state.tokens.retain(|_, id| *id != removed.user.id);
        Ok(true)
    }

    async fn group_exists(&self, role: Role) -> Result<bool, RepositoryError> {
        Ok(self.lock().groups.contains(&role))
    }

    async fn list_group_members(&self, role: Role) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|s| s.user.roles.contains(role))
            .map(|s| s.user.clone())
            .collect())
    }

    async fn get_or_create_token(
        &self,
        user_id: UserId,
        candidate: &str,
    ) -> Result<String, RepositoryError> {
        let mut state = self.lock();
        if let Some((key, _)) = state.tokens.iter().find(|(_, id)| **id == user_id) {
            return Ok(key.clone());
        }
        state.tokens.insert(candidate.to_owned(), user_id);
        Ok(candidate.to_owned())
    }

    async fn ensure_groups(&self) -> Result<u64, RepositoryError> {
        let mut state = self.lock();
        let mut created = 0;
        for role in Role::ALL {
            if state.groups.insert(role) {
                created += 1;
            }
        }
        Ok(created)
    }
}
