//! Password hashing and API token exchange.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::Credentials;

/// Random bytes in an API token; rendered as 40 hex characters.
const TOKEN_BYTES: usize = 20;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password or unknown username.
    #[error("Unable to log in with provided credentials.")]
    InvalidCredentials,

    /// Argon2 failed to hash a password.
    #[error("password hashing failed")]
    PasswordHash,
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &SecretString) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or a malformed hash.
pub fn verify_password(password: &SecretString, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Generate a fresh API token key.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Exchange a username and password for the account's API token.
///
/// An account keeps a single token; later exchanges return the same key.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` (as `AppError::Auth`) for an
/// unknown username or a wrong password.
#[instrument(skip(users, credentials), fields(username = %credentials.username))]
pub async fn obtain_token(
    users: &dyn UserStore,
    credentials: &Credentials,
) -> Result<String, AppError> {
    let Some((user, hash)) = users.get_credentials(&credentials.username).await? else {
        info!("Login failed: unknown username");
        return Err(AuthError::InvalidCredentials.into());
    };
    if let Err(e) = verify_password(&credentials.password, &hash) {
        info!("Login failed: wrong password");
        return Err(e.into());
    }

    let token = users.get_or_create_token(user.id, &generate_token()).await?;
    info!(user_id = %user.id, "API token issued");
    Ok(token)
}
