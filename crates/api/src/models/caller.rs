//! The identity a request is made under.

use zebrands_core::{Role, RoleSet, UserId};

use super::user::User;

/// An authenticated account as seen by the access policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub roles: RoleSet,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            roles: user.roles,
        }
    }
}

/// Who is making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(CurrentUser),
}

impl Caller {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// Whether the caller is authenticated and holds `role`.
    #[must_use]
    pub const fn has_role(&self, role: Role) -> bool {
        match self {
            Self::Anonymous => false,
            Self::User(user) => user.roles.contains(role),
        }
    }
}
