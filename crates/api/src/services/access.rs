//! Product access policy.
//!
//! Reads are public; every write requires an authenticated caller holding
//! [`Role::ProductAdmin`]. Group membership is the only signal consulted.

use zebrands_core::Role;

use crate::models::Caller;

/// An operation on the product collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductAction {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl ProductAction {
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Forbidden,
}

/// Decide whether `caller` may perform `action`.
#[must_use]
pub const fn authorize(caller: &Caller, action: ProductAction) -> Decision {
    if !action.is_write() || caller.has_role(Role::ProductAdmin) {
        Decision::Allow
    } else {
        Decision::Forbidden
    }
}

#[cfg(test)]
mod tests {
    use zebrands_core::{RoleSet, UserId};

    use super::*;
    use crate::models::CurrentUser;

    const ALL_ACTIONS: [ProductAction; 5] = [
        ProductAction::List,
        ProductAction::Retrieve,
        ProductAction::Create,
        ProductAction::Update,
        ProductAction::Delete,
    ];

    fn user(roles: RoleSet) -> Caller {
        Caller::User(CurrentUser {
            id: UserId::new(1),
            username: "someone".to_owned(),
            roles,
        })
    }

    #[test]
    fn test_reads_are_open_to_everyone() {
        for caller in [Caller::Anonymous, user(RoleSet::empty())] {
            assert_eq!(authorize(&caller, ProductAction::List), Decision::Allow);
            assert_eq!(authorize(&caller, ProductAction::Retrieve), Decision::Allow);
        }
    }

    #[test]
    fn test_writes_need_product_admin() {
        let outsiders = [
            Caller::Anonymous,
            user(RoleSet::empty()),
            user(RoleSet::empty().with(Role::UserAdmin)),
        ];
        for caller in &outsiders {
            for action in ALL_ACTIONS.into_iter().filter(|a| a.is_write()) {
                assert_eq!(authorize(caller, action), Decision::Forbidden, "{action:?}");
            }
        }

        let admin = user(RoleSet::empty().with(Role::ProductAdmin));
        for action in ALL_ACTIONS {
            assert_eq!(authorize(&admin, action), Decision::Allow);
        }
    }
}
