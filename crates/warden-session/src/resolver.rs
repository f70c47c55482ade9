//! Resolution of the current authentication from an ambient context.
//!
//! ```text
//! AmbientContext ──token──▶ TokenRegistry (still active?)
//!                               │
//!                               ▼ user id
//!                 sources[0] → sources[1] → … (first Some wins)
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use warden_types::Authentication;

use crate::context::AmbientContext;
use crate::error::{ResolveError, SourceError};
use crate::registry::TokenRegistry;
use crate::token::SessionToken;

/// Looks up the authentication of a user.
#[async_trait]
pub trait AuthenticationSource: Send + Sync {
    /// Returns `Ok(None)` when this source does not know the user.
    async fn get_by_user_id(&self, user_id: &str)
    -> Result<Option<Arc<Authentication>>, SourceError>;
}

/// In-memory source keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticationSource {
    entries: HashMap<String, Arc<Authentication>>,
}

impl StaticAuthenticationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.insert(authentication);
        self
    }

    pub fn insert(&mut self, authentication: Authentication) {
        self.entries.insert(
            authentication.user().id.clone(),
            Arc::new(authentication),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl AuthenticationSource for StaticAuthenticationSource {
    async fn get_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Option<Arc<Authentication>>, SourceError> {
        Ok(self.entries.get(user_id).cloned())
    }
}

/// Finds "who is calling" for the current request.
#[derive(Clone, Default)]
pub struct ContextResolver {
    sources: Vec<Arc<dyn AuthenticationSource>>,
    registry: Option<Arc<TokenRegistry>>,
}

impl std::fmt::Debug for ContextResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextResolver")
            .field("sources", &self.sources.len())
            .field("registry", &self.registry.is_some())
            .finish()
    }
}

impl ContextResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a source. Sources are consulted in insertion order.
    pub fn with_source(mut self, source: Arc<dyn AuthenticationSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Checks tokens against `registry` instead of trusting the context's copy.
    pub fn with_registry(mut self, registry: Arc<TokenRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Resolves the authentication of the caller described by `context`.
    ///
    /// Returns `Ok(None)` when the context carries no token, the token is no
    /// longer active, no source knows the user, or the context deadline
    /// passes first. A failing source aborts resolution with its error.
    pub async fn current<C>(
        &self,
        context: &C,
    ) -> Result<Option<Arc<Authentication>>, ResolveError>
    where
        C: AmbientContext + ?Sized,
    {
        let Some(token) = context.session_token() else {
            debug!("no session token in context");
            return Ok(None);
        };

        match context.deadline() {
            Some(deadline) => {
                if let Ok(result) = tokio::time::timeout_at(deadline, self.resolve(token)).await {
                    result
                } else {
                    debug!(user_id = %token.user_id(), "resolution deadline elapsed");
                    Ok(None)
                }
            }
            None => self.resolve(token).await,
        }
    }

    /// Like [`current`](Self::current), but yields `Ok(None)` as soon as
    /// `cancel` completes.
    pub async fn current_or_cancel<C, F>(
        &self,
        context: &C,
        cancel: F,
    ) -> Result<Option<Arc<Authentication>>, ResolveError>
    where
        C: AmbientContext + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.current(context) => result,
            () = cancel => {
                debug!("resolution cancelled");
                Ok(None)
            }
        }
    }

    async fn resolve(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Arc<Authentication>>, ResolveError> {
        // The registry entry must still belong to the session the context holds;
        // a rebound token value resolves to nobody for its previous owner.
        let active = match &self.registry {
            Some(registry) => registry.get_token(token.token()).is_some_and(|current| {
                current.is_active()
                    && current.user_id() == token.user_id()
                    && current.token_type() == token.token_type()
            }),
            None => token.is_active(),
        };
        if !active {
            debug!(user_id = %token.user_id(), "session token is not active");
            return Ok(None);
        }

        for source in &self.sources {
            match source.get_by_user_id(token.user_id()).await {
                Ok(Some(authentication)) => return Ok(Some(authentication)),
                Ok(None) => {}
                Err(error) => {
                    warn!(user_id = %token.user_id(), %error, "authentication source failed");
                    return Err(error.into());
                }
            }
        }

        debug!(user_id = %token.user_id(), "no source knows user");
        Ok(None)
    }
}
