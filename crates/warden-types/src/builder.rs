//! Construction of [`Authentication`] values from loaded records.
//!
//! The builder is pure data transformation: no storage or network access
//! happens here. Callers load user, role and permission rows however they
//! like and hand the records over.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ModelError, Result};
use crate::{Authentication, Permission, Role, User};

/// Builds an [`Authentication`].
///
/// Every setter replaces what a previous call supplied. Duplicate role or
/// permission ids keep the last occurrence.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationBuilder {
    user: Option<User>,
    roles: Vec<Role>,
    permissions: Vec<Permission>,
}

impl AuthenticationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Consumes the builder and produces the aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when no user was supplied or the
    /// user id is empty.
    pub fn build(self) -> Result<Authentication> {
        let user = self
            .user
            .ok_or_else(|| ModelError::Validation("user is required".to_string()))?;

        if user.id.is_empty() {
            return Err(ModelError::Validation("user id must not be empty".to_string()));
        }

        let roles: BTreeMap<String, Role> = self
            .roles
            .into_iter()
            .map(|role| (role.id.clone(), role))
            .collect();

        let permissions = dedup_permissions(self.permissions);

        debug!(
            user_id = %user.id,
            roles = roles.len(),
            permissions = permissions.len(),
            "Authentication built"
        );

        Ok(Authentication::from_parts(user, roles, permissions))
    }
}

/// Removes duplicate ids. A later permission replaces the value of an
/// earlier one but keeps the earlier position.
fn dedup_permissions(permissions: Vec<Permission>) -> Vec<Permission> {
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    let mut unique: Vec<Permission> = Vec::with_capacity(permissions.len());

    for permission in permissions {
        match positions.get(permission.id()) {
            Some(&i) => unique[i] = permission,
            None => {
                positions.insert(permission.id().to_string(), unique.len());
                unique.push(permission);
            }
        }
    }

    unique
}
