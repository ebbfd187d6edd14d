//! Account registration and management.

use std::sync::Arc;

use tracing::{info, instrument};

use zebrands_core::{Role, RoleSet};

use super::auth::hash_password;
use crate::db::{RepositoryError, UserStore};
use crate::error::{AppError, Result};
use crate::models::{Caller, NewUser, Payload, UserChanges, UserView, ValidationErrors};

pub const CANNOT_CREATE_USERS: &str = "Don't have permission to create users";

/// User registration, lookup, update and removal.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
}

impl AccountService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Register an account and grant it both admin roles.
    ///
    /// Checks run in order: authentication, payload validation, existence
    /// of the `UserAdmin` group, then the caller's `UserAdmin` membership.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for anonymous callers and callers
    /// outside `UserAdmin`, `AppError::Validation` for a bad payload or a
    /// taken username, and `AppError::NotFound` if the group is missing.
    #[instrument(skip(self, caller, payload))]
    pub async fn register(&self, caller: &Caller, payload: &Payload) -> Result<UserView> {
        if !caller.is_authenticated() {
            return Err(AppError::not_authenticated());
        }
        let new = NewUser::from_payload(payload)?;

        if !self.users.group_exists(Role::UserAdmin).await? {
            return Err(AppError::not_found());
        }
        if !caller.has_role(Role::UserAdmin) {
            return Err(AppError::Forbidden(CANNOT_CREATE_USERS.to_owned()));
        }

        let hash = hash_password(&new.password)?;
        let user = self
            .users
            .create(&new, &hash, RoleSet::registration_defaults())
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(message) => {
                    ValidationErrors::single("username", message).into()
                }
                RepositoryError::NotFound => AppError::not_found(),
                other => AppError::Database(other),
            })?;

        info!(username = %user.username, "User registered");
        Ok(UserView::from(&user))
    }

    /// Look up an account. Any authenticated caller may do so.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for anonymous callers and
    /// `AppError::NotFound` for an unknown username.
    pub async fn get(&self, caller: &Caller, username: &str) -> Result<UserView> {
        require_authenticated(caller)?;
        let user = self
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(AppError::not_found)?;
        Ok(UserView::from(&user))
    }

    /// Partially update an account. Any authenticated caller may do so.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for anonymous callers,
    /// `AppError::Validation` for a bad payload and `AppError::NotFound`
    /// for an unknown username.
    #[instrument(skip(self, caller, payload))]
    pub async fn update(
        &self,
        caller: &Caller,
        username: &str,
        payload: &Payload,
    ) -> Result<UserView> {
        require_authenticated(caller)?;
        let changes = UserChanges::from_payload(payload)?;
        let hash = changes.password.as_ref().map(hash_password).transpose()?;

        let user = self
            .users
            .update(username, &changes, hash.as_deref())
            .await?
            .ok_or_else(AppError::not_found)?;

        info!(username = %user.username, "User updated");
        Ok(UserView::from(&user))
    }

    /// Remove an account along with its token and memberships. Any
    /// authenticated caller may do so.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for anonymous callers and
    /// `AppError::NotFound` for an unknown username.
    #[instrument(skip(self, caller))]
    pub async fn delete(&self, caller: &Caller, username: &str) -> Result<()> {
        require_authenticated(caller)?;
        if !self.users.delete(username).await? {
            return Err(AppError::not_found());
        }
        info!("User deleted");
        Ok(())
    }
}

/// Reading, updating and removing accounts only needs a signed-in caller;
/// `UserAdmin` gates registration alone.
fn require_authenticated(caller: &Caller) -> Result<()> {
    if caller.is_authenticated() {
        Ok(())
    } else {
        Err(AppError::not_authenticated())
    }
}
