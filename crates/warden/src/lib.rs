//! # Warden
//!
//! Authorization model, permission predicates and session registry.
//!
//! Warden answers three questions for a request:
//!
//! - **Who is calling?** A session token signed in with the
//!   [`TokenRegistry`] is resolved to an [`Authentication`] by the
//!   [`ContextResolver`].
//! - **May they do it?** A [`Predicate`] over roles and permissions.
//! - **What may they see?** [`FieldAccess`] restrictions derived from the
//!   data access rules of a permission.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Warden                             │
//! │  ┌──────────────┐   ┌────────────────┐   ┌────────────────┐ │
//! │  │TokenRegistry │ → │ContextResolver │ → │ Predicate /    │ │
//! │  │(sign-in, cap)│   │(sources)       │   │ FieldAccess    │ │
//! │  └──────────────┘   └────────────────┘   └────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use warden::{
//!     AuthenticationBuilder, Permission, StaticAuthenticationSource, User, Warden,
//!     WardenConfig, has,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let admin = AuthenticationBuilder::new()
//!     .with_user(User::new("admin", "admin", "Administrator", "default"))
//!     .with_permissions(vec![Permission::new("user-manager").with_actions(["query", "get"])])
//!     .build()?;
//!
//! let warden = Warden::new(WardenConfig::default())?
//!     .with_source(Arc::new(StaticAuthenticationSource::new().with_authentication(admin)));
//!
//! warden.sign_in("web", "token-1", "admin")?;
//! let ctx = warden.context_for("token-1");
//!
//! assert!(warden.check(&ctx, &has("permission:user-manager:get")).await?);
//! assert!(!warden.check(&ctx, &has("permission:user-manager:delete")).await?);
//! # Ok(())
//! # }
//! ```

mod error;
mod warden;

pub use error::{Result, WardenError};
pub use warden::Warden;

// Re-export the model
pub use warden_types::{
    Authentication, AuthenticationBuilder, DataAccessConfig, DataAccessType, ModelError,
    Permission, Role, User, actions,
};

// Re-export decisions
pub use warden_rbac::{
    DataAccessResolver, FieldAccess, Predicate, PredicateError, ScopeFilter, find_allow_fields,
    find_deny_fields, find_scopes, has, permission, role,
};

// Re-export sessions
pub use warden_session::{
    AmbientContext, AuthenticationSource, ContextResolver, ExecutionContext, RemovalReason,
    ResolveError, SessionError, SessionLimit, SessionPolicy, SessionToken, SignInRequest,
    SourceError, StaticAuthenticationSource, TokenListener, TokenRegistry, TokenState,
    TokenTypePolicy,
};

// Re-export configuration
pub use warden_config::{
    AuditConfig, ConfigError, ConfigLoader, ResolverConfig, SessionConfig, TokenTypeConfig,
    WardenConfig,
};

#[cfg(test)]
mod tests;
