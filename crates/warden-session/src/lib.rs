//! # warden-session: Session tokens and the current user
//!
//! - [`TokenRegistry`] tracks which tokens are signed in for which user and
//!   enforces per-user session caps by evicting the oldest sessions.
//! - [`ContextResolver`] turns the session token carried by a request
//!   context into the caller's [`Authentication`](warden_types::Authentication)
//!   by asking a chain of [`AuthenticationSource`]s.
//!
//! ## Session caps
//!
//! | `max_sessions` | Behavior                                          |
//! |----------------|---------------------------------------------------|
//! | `-1` (or < 0)  | unlimited                                         |
//! | `0`            | sign-in refused with `SessionLimitExceeded`       |
//! | `n > 0`        | at most `n` active tokens per type; oldest evicted |
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use warden_session::{
//!     ContextResolver, ExecutionContext, StaticAuthenticationSource, TokenRegistry,
//! };
//! use warden_types::{AuthenticationBuilder, User};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(TokenRegistry::new());
//! let token = registry.sign_in("test", "token-test", "admin", -1)?;
//!
//! let source = StaticAuthenticationSource::new().with_authentication(
//!     AuthenticationBuilder::new()
//!         .with_user(User::new("admin", "admin", "Administrator", "default"))
//!         .build()?,
//! );
//! let resolver = ContextResolver::new()
//!     .with_source(Arc::new(source))
//!     .with_registry(registry.clone());
//!
//! let context = ExecutionContext::new().with_token(token);
//! let current = resolver.current(&context).await?.expect("signed in");
//! assert_eq!(current.user().id, "admin");
//!
//! registry.sign_out("token-test");
//! assert!(resolver.current(&context).await?.is_none());
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod listener;
mod registry;
mod resolver;
mod token;

pub use context::{AmbientContext, ExecutionContext};
pub use error::{ResolveError, SessionError, SessionResult, SourceError};
pub use listener::{RemovalReason, TokenListener};
pub use registry::{SessionPolicy, TokenRegistry, TokenTypePolicy};
pub use resolver::{AuthenticationSource, ContextResolver, StaticAuthenticationSource};
pub use token::{SessionLimit, SessionToken, SignInRequest, TokenState};
