//! Account domain types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use zebrands_core::{Email, RoleSet, UserId};

use super::validation::{Payload, TextField, ValidationErrors};

const USERNAME: TextField = TextField::new("username", 128);
const EMAIL: TextField = TextField::new("email", Email::MAX_LENGTH);
const PASSWORD: TextField = TextField::new("password", 128);
const FIRST_NAME: TextField = TextField::new("first_name", 128).blank_allowed();
const LAST_NAME: TextField = TextField::new("last_name", 128).blank_allowed();

const INVALID_USERNAME: &str = concat!(
    "Enter a valid username. ",
    "This value may contain only letters, numbers, and @/./+/-/_ characters."
);
const INVALID_EMAIL: &str = "Enter a valid email address.";

/// A registered account with its group memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub roles: RoleSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First and last name joined by a space, trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }

    /// Name used to greet the user: the full name, or the username if no
    /// name was given.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = self.full_name();
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    /// # Errors
    ///
    /// Returns the per-field messages if any field is missing or malformed.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = read_email(payload, true, &mut errors);
        let password = payload.text(PASSWORD, true, &mut errors);
        let username = read_username(payload, &mut errors);
        let first_name = payload.text(FIRST_NAME, false, &mut errors);
        let last_name = payload.text(LAST_NAME, false, &mut errors);

        match (email, password, username) {
            (Some(email), Some(password), Some(username)) if errors.is_empty() => Ok(Self {
                username,
                email,
                password: SecretString::from(password),
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
            }),
            _ => Err(errors),
        }
    }
}

/// Validated partial account update. The username is fixed.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<Email>,
    pub password: Option<SecretString>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserChanges {
    /// # Errors
    ///
    /// Returns the per-field messages for any present field that is malformed.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = read_email(payload, false, &mut errors);
        let password = payload.text(PASSWORD, false, &mut errors);
        let first_name = payload.text(FIRST_NAME, false, &mut errors);
        let last_name = payload.text(LAST_NAME, false, &mut errors);
        if payload.contains(USERNAME.name) {
            errors.add(USERNAME.name, "This field cannot be changed.");
        }

        errors.finish(|| Self {
            email,
            password: password.map(SecretString::from),
            first_name,
            last_name,
        })
    }
}

/// Login input for the token exchange.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    /// # Errors
    ///
    /// Returns field errors when either value is missing or blank.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let username = payload.text(USERNAME, true, &mut errors);
        let password = payload.text(PASSWORD, true, &mut errors);

        match (username, password) {
            (Some(username), Some(password)) => Ok(Self {
                username,
                password: SecretString::from(password),
            }),
            _ => Err(errors),
        }
    }
}

fn read_email(payload: &Payload, required: bool, errors: &mut ValidationErrors) -> Option<Email> {
    let raw = payload.text(EMAIL, required, errors)?;
    Email::parse(&raw)
        .map_err(|_| errors.add(EMAIL.name, INVALID_EMAIL))
        .ok()
}

fn read_username(payload: &Payload, errors: &mut ValidationErrors) -> Option<String> {
    let raw = payload.text(USERNAME, true, errors)?;
    if raw
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        Some(raw)
    } else {
        errors.add(USERNAME.name, INVALID_USERNAME);
        None
    }
}

/// Public account representation. The password is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub email: Email,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    fn payload(value: serde_json::Value) -> Payload {
        serde_json::from_value(value).unwrap()
    }

    fn user(first: &str, last: &str) -> User {
        User {
            id: UserId::new(1),
            username: "jdoe".to_owned(),
            email: Email::parse("jdoe@example.com").unwrap(),
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            roles: RoleSet::empty(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(user("Jane", "Doe").display_name(), "Jane Doe");
        assert_eq!(user("Jane", "").display_name(), "Jane");
        assert_eq!(user("", "").display_name(), "jdoe");
    }

    #[test]
    fn test_new_user_valid() {
        let new = NewUser::from_payload(&payload(json!({
            "email": "new@example.com",
            "password": "s3cret-pass",
            "username": "new.user"
        })))
        .unwrap();
        assert_eq!(new.username, "new.user");
        assert_eq!(new.password.expose_secret(), "s3cret-pass");
        assert_eq!(new.first_name, "");
    }

    #[test]
    fn test_new_user_field_errors() {
        let errors = NewUser::from_payload(&payload(json!({
            "email": "not-an-email",
            "username": "bad name!"
        })))
        .unwrap_err();
        assert_eq!(errors.field("email").unwrap(), [INVALID_EMAIL]);
        assert_eq!(errors.field("username").unwrap(), [INVALID_USERNAME]);
        assert_eq!(errors.field("password").unwrap(), ["This field is required."]);
    }

    #[test]
    fn test_user_changes_reject_username() {
        let errors = UserChanges::from_payload(&payload(json!({"username": "other"}))).unwrap_err();
        assert!(errors.field("username").is_some());

        let changes = UserChanges::from_payload(&payload(json!({"first_name": "Ana"}))).unwrap();
        assert_eq!(changes.first_name.as_deref(), Some("Ana"));
        assert!(changes.email.is_none());
    }

    #[test]
    fn test_view_omits_password() {
        let json = serde_json::to_value(UserView::from(&user("Jane", "Doe"))).unwrap();
        assert_eq!(
            json,
            json!({
                "email": "jdoe@example.com",
                "username": "jdoe",
                "first_name": "Jane",
                "last_name": "Doe"
            })
        );
    }
}
