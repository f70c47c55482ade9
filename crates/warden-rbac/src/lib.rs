//! # warden-rbac: Authorization decisions
//!
//! Answers two questions about an [`Authentication`](warden_types::Authentication):
//!
//! - **May this caller do it?** [`Predicate`]s over roles and permissions,
//!   written as text (`"permission:user-manager:get and role:admin-role"`)
//!   or composed with combinators.
//! - **What may the caller see while doing it?** [`DataAccessResolver`]
//!   merges the data-access rules of a permission into a [`FieldAccess`]:
//!   denied fields, an optional allow list, and row scopes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Authentication (user + roles + permissions) │
//! └───────────────┬─────────────────┬───────────┘
//!                 │                 │
//!                 ▼                 ▼
//! ┌──────────────────────┐ ┌─────────────────────────┐
//! │  Predicate           │ │  DataAccessResolver     │
//! │  ├─ parse text       │ │  ├─ deny fields (union) │
//! │  ├─ combinators      │ │  ├─ allow fields − deny │
//! │  └─ evaluate → bool  │ │  └─ row scopes          │
//! └──────────────────────┘ └─────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```
//! use warden_rbac::{DataAccessResolver, predicate::has};
//! use warden_types::{AuthenticationBuilder, DataAccessConfig, Permission, Role, User};
//!
//! let auth = AuthenticationBuilder::new()
//!     .with_user(User::new("admin", "admin", "Administrator", "default"))
//!     .with_roles(vec![Role::new("admin-role", "admin")])
//!     .with_permissions(vec![
//!         Permission::new("user-manager")
//!             .with_actions(["query", "get"])
//!             .with_data_access(DataAccessConfig::deny_fields("query", ["password"])),
//!     ])
//!     .build()?;
//!
//! assert!(has("permission:user-manager:query and role:admin-role").test(&auth));
//!
//! let access = DataAccessResolver::new()
//!     .for_authentication(&auth, "user-manager", "query")
//!     .expect("permission is held");
//! assert!(!access.allows_field("password"));
//! assert!(access.allows_field("username"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod data_access;
pub mod predicate;

pub use data_access::{
    DataAccessResolver, FieldAccess, ScopeFilter, find_allow_fields, find_deny_fields, find_scopes,
};
pub use predicate::{Predicate, PredicateError, has, permission, role};

#[cfg(test)]
mod tests;
