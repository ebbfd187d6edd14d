//! Account bootstrap.
//!
//! Registration over HTTP needs an existing `UserAdmin`, so the first one is
//! created here. Fields go through the same validation as the API.

use secrecy::SecretString;
use serde_json::json;
use zebrands_api::db::{RepositoryError, UserRepository, UserStore};
use zebrands_api::models::{NewUser, Payload};
use zebrands_api::services::auth::hash_password;
use zebrands_core::{Role, RoleSet};

use super::{CommandError, connect};

/// Account fields as given on the command line.
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Validate the fields the way `POST /users/` does.
fn validate(account: &NewAccount) -> Result<NewUser, CommandError> {
    let payload: Payload = serde_json::from_value(json!({
        "username": account.username,
        "email": account.email,
        "password": account.password,
        "first_name": account.first_name,
        "last_name": account.last_name,
    }))
    .map_err(|e| CommandError::InvalidAccount(e.to_string()))?;

    NewUser::from_payload(&payload)
        .map_err(|errors| CommandError::InvalidAccount(errors.to_string()))
}

/// Roles to grant; none given means both.
fn granted_roles(roles: &[Role]) -> RoleSet {
    if roles.is_empty() {
        RoleSet::registration_defaults()
    } else {
        roles.iter().copied().collect()
    }
}

/// Create an account with the given roles.
///
/// # Errors
///
/// Returns an error if a field is invalid, the username is taken, a group is
/// missing (run `zb-cli groups sync`) or the database is unreachable.
pub async fn create(account: &NewAccount, roles: &[Role]) -> Result<(), CommandError> {
    let new = validate(account)?;
    let roles = granted_roles(roles);
    let hash = hash_password(&SecretString::from(account.password.clone()))?;

    let pool = connect().await?;
    let users = UserRepository::new(pool);

    let user = users.create(&new, &hash, roles).await.map_err(|e| match e {
        RepositoryError::Conflict(message) => CommandError::InvalidAccount(message),
        RepositoryError::NotFound => CommandError::InvalidAccount(
            "authorization group missing, run `zb-cli groups sync`".to_owned(),
        ),
        other => CommandError::Repository(other),
    })?;

    let granted: Vec<String> = user.roles.iter().map(|role| role.to_string()).collect();
    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Roles: {}",
        user.id,
        user.username,
        granted.join(", ")
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_owned(),
            email: email.to_owned(),
            password: "pa55word".to_owned(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[test]
    fn test_validate_accepts_api_shaped_account() {
        let new = validate(&account("root", "root@example.com")).unwrap();
        assert_eq!(new.username, "root");
        assert_eq!(new.email.as_str(), "root@example.com");
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        assert!(matches!(
            validate(&account("bad name", "root@example.com")),
            Err(CommandError::InvalidAccount(_))
        ));
        assert!(matches!(
            validate(&account("root", "not-an-email")),
            Err(CommandError::InvalidAccount(_))
        ));
    }

    #[test]
    fn test_granted_roles_defaults_to_both() {
        assert_eq!(granted_roles(&[]), RoleSet::registration_defaults());

        let only = granted_roles(&[Role::ProductAdmin]);
        assert!(only.contains(Role::ProductAdmin));
        assert!(!only.contains(Role::UserAdmin));
    }
}
