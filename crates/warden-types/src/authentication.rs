//! The built identity aggregate.

use std::collections::BTreeMap;

use crate::{Permission, Role, User};

/// A user together with its roles and permissions.
///
/// Built by [`AuthenticationBuilder`](crate::AuthenticationBuilder) and
/// read-only afterwards; share it behind an `Arc` across threads and tasks.
///
/// # Invariants
///
/// - Role ids are unique.
/// - Permission ids are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    user: User,
    roles: BTreeMap<String, Role>,
    /// Permissions in input order.
    permissions: Vec<Permission>,
    /// Permission id -> position in `permissions`.
    permission_index: BTreeMap<String, usize>,
}

impl Authentication {
    /// Assembles an aggregate from already de-duplicated parts.
    pub(crate) fn from_parts(
        user: User,
        roles: BTreeMap<String, Role>,
        permissions: Vec<Permission>,
    ) -> Self {
        let permission_index: BTreeMap<String, usize> = permissions
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id().to_string(), i))
            .collect();

        debug_assert_eq!(
            permission_index.len(),
            permissions.len(),
            "permission ids must be unique"
        );

        Self {
            user,
            roles,
            permissions,
            permission_index,
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns the roles ordered by id.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    /// Returns the permissions in the order they were supplied.
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.contains_key(role_id)
    }

    pub fn get_role(&self, role_id: &str) -> Option<&Role> {
        self.roles.get(role_id)
    }

    pub fn has_permission(&self, permission_id: &str) -> bool {
        self.permission_index.contains_key(permission_id)
    }

    /// Returns true iff the permission exists and grants `action`.
    pub fn has_permission_action(&self, permission_id: &str, action: &str) -> bool {
        self.get_permission(permission_id)
            .is_some_and(|p| p.has_action(action))
    }

    /// Returns true iff the permission exists and grants every action.
    pub fn has_permission_actions<S: AsRef<str>>(&self, permission_id: &str, actions: &[S]) -> bool {
        self.get_permission(permission_id)
            .is_some_and(|p| p.has_actions(actions))
    }

    pub fn get_permission(&self, permission_id: &str) -> Option<&Permission> {
        self.permission_index
            .get(permission_id)
            .map(|&i| &self.permissions[i])
    }
}
