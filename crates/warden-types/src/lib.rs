//! # warden-types: Core authorization model for `Warden`
//!
//! This crate contains the immutable identity aggregate every other Warden
//! crate reads from:
//! - Identity ([`User`], [`Role`])
//! - Capabilities ([`Permission`], [`DataAccessConfig`], [`DataAccessType`])
//! - The built aggregate ([`Authentication`]) and its builder
//!   ([`AuthenticationBuilder`])
//! - Validation errors ([`ModelError`])
//!
//! An [`Authentication`] is built once and never mutated. When the underlying
//! role or permission rows change, build a new one.
//!
//! # Example
//!
//! ```
//! use warden_types::{AuthenticationBuilder, Permission, Role, User, actions};
//!
//! let auth = AuthenticationBuilder::new()
//!     .with_user(User::new("admin", "admin", "Administrator", "default"))
//!     .with_roles(vec![Role::new("admin-role", "admin")])
//!     .with_permissions(vec![
//!         Permission::new("user-manager").with_actions([actions::QUERY, actions::GET]),
//!     ])
//!     .build()?;
//!
//! assert!(auth.has_role("admin-role"));
//! assert!(auth.has_permission_action("user-manager", "get"));
//! assert!(!auth.has_permission_action("user-manager", "delete"));
//! # Ok::<(), warden_types::ModelError>(())
//! ```

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

mod authentication;
mod builder;
mod error;
mod permission;

pub use authentication::Authentication;
pub use builder::AuthenticationBuilder;
pub use error::ModelError;
pub use permission::{DataAccessConfig, DataAccessType, Permission};

/// Standard action names carried in [`Permission::actions`].
pub mod actions {
    pub const QUERY: &str = "query";
    pub const GET: &str = "get";
    pub const ADD: &str = "add";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const SAVE: &str = "save";
    pub const IMPORT: &str = "import";
    pub const EXPORT: &str = "export";
}

// ============================================================================
// User
// ============================================================================

/// The identity an [`Authentication`] is built around.
///
/// `id` is the stable identity used by sessions and authentication sources.
/// The remaining fields are descriptive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    /// User category, e.g. `"default"` or `"service"`.
    #[serde(rename = "type")]
    pub user_type: String,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        name: impl Into<String>,
        user_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            name: name.into(),
            user_type: user_type.into(),
        }
    }
}

impl Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.id)
    }
}

// ============================================================================
// Role
// ============================================================================

/// A named role held by a user. Roles are unique by `id` within an
/// [`Authentication`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
}

impl Role {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role:{}", self.id)
    }
}
