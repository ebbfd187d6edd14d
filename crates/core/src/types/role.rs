//! Authorization roles.
//!
//! Each role corresponds to one persisted group; holding the group
//! membership is the only authorization signal the catalog consults.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A fixed authorization role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May create, update and delete products; receives change notifications.
    ProductAdmin,
    /// May register new accounts and manage existing ones.
    UserAdmin,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 2] = [Self::ProductAdmin, Self::UserAdmin];

    /// Name of the persisted group backing this role.
    #[must_use]
    pub const fn group_name(self) -> &'static str {
        match self {
            Self::ProductAdmin => "ProductAdmin",
            Self::UserAdmin => "UserAdmin",
        }
    }

    /// Look up a role by its group name.
    #[must_use]
    pub fn from_group_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.group_name() == name)
    }

    const fn bit(self) -> u8 {
        match self {
            Self::ProductAdmin => 1,
            Self::UserAdmin => 1 << 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProductAdmin => f.write_str("product_admin"),
            Self::UserAdmin => f.write_str("user_admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product_admin" | "ProductAdmin" => Ok(Self::ProductAdmin),
            "user_admin" | "UserAdmin" => Ok(Self::UserAdmin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// The set of roles held by an account.
///
/// ```
/// use zebrands_core::{Role, RoleSet};
///
/// let roles = RoleSet::from_iter([Role::ProductAdmin]);
/// assert!(roles.contains(Role::ProductAdmin));
/// assert!(!roles.contains(Role::UserAdmin));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(u8);

impl RoleSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The roles granted to every account created through registration.
    #[must_use]
    pub const fn registration_defaults() -> Self {
        Self(Role::ProductAdmin.bit() | Role::UserAdmin.bit())
    }

    #[must_use]
    pub const fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub const fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    #[must_use]
    pub const fn with(mut self, role: Role) -> Self {
        self.insert(role);
        self
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the held roles in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl Serialize for RoleSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<Role>::deserialize(deserializer)?.into_iter().collect())
    }
}
