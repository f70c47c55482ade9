//! Main entry point for the Warden API.
//!
//! [`Warden`] wires configuration, the token registry, the context resolver
//! and the data access resolver together.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use warden_config::{SessionConfig, WardenConfig};
use warden_rbac::{DataAccessResolver, FieldAccess, Predicate};
use warden_session::{
    AmbientContext, AuthenticationSource, ContextResolver, ExecutionContext, SessionPolicy,
    SessionToken, SignInRequest, TokenRegistry, TokenTypePolicy,
};
use warden_types::Authentication;

use crate::error::{Result, WardenError};

/// Authorization service.
///
/// ```ignore
/// use warden::{Warden, WardenConfig, has};
///
/// let warden = Warden::new(WardenConfig::default())?.with_source(source);
/// warden.sign_in("web", "token-1", "admin")?;
///
/// let ctx = warden.context_for("token-1");
/// if warden.check(&ctx, &has("permission:user-manager:get")).await? {
///     // ...
/// }
/// ```
#[derive(Clone)]
pub struct Warden {
    config: WardenConfig,
    registry: Arc<TokenRegistry>,
    resolver: ContextResolver,
    data_access: DataAccessResolver,
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl Warden {
    /// Creates a service from an already loaded configuration.
    pub fn new(config: WardenConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(TokenRegistry::with_policy(session_policy(&config.session)));
        let resolver = ContextResolver::new().with_registry(Arc::clone(&registry));
        let data_access = DataAccessResolver::new().with_audit(config.audit.log_denied_fields);

        Ok(Self {
            config,
            registry,
            resolver,
            data_access,
        })
    }

    /// Loads configuration for `project_dir` and creates a service.
    pub fn from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        let config = WardenConfig::load_from_dir(project_dir).map_err(WardenError::ConfigLoad)?;
        Self::new(config)
    }

    /// Appends an authentication source. Sources are consulted in order.
    pub fn with_source(mut self, source: Arc<dyn AuthenticationSource>) -> Self {
        self.resolver = self.resolver.with_source(source);
        self
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TokenRegistry> {
        &self.registry
    }

    pub fn data_access(&self) -> &DataAccessResolver {
        &self.data_access
    }

    /// Signs in with the configured limits for `token_type`.
    pub fn sign_in(&self, token_type: &str, token: &str, user_id: &str) -> Result<SessionToken> {
        Ok(self.registry.sign_in_default(token_type, token, user_id)?)
    }

    /// Signs in with explicit limits.
    pub fn sign_in_with(&self, request: SignInRequest) -> Result<SessionToken> {
        Ok(self.registry.sign_in_with(request)?)
    }

    pub fn sign_out(&self, token: &str) -> bool {
        self.registry.sign_out(token)
    }

    /// Builds the context of a request made with `token`.
    ///
    /// Unknown tokens produce a context without a token, which resolves to
    /// no current user. Known tokens are touched.
    pub fn context_for(&self, token: &str) -> ExecutionContext {
        let mut context = ExecutionContext::new();
        if self.registry.touch(token) {
            if let Some(session) = self.registry.get_token(token) {
                context = context.with_token(session);
            }
        } else {
            debug!("request with unknown token");
        }
        if let Some(timeout) = self.config.resolver.timeout() {
            context = context.with_timeout(timeout);
        }
        context
    }

    /// Resolves the caller of `context`.
    pub async fn current<C>(&self, context: &C) -> Result<Option<Arc<Authentication>>>
    where
        C: AmbientContext + ?Sized,
    {
        Ok(self.resolver.current(context).await?)
    }

    /// Evaluates `predicate` for the caller. No caller means `false`.
    pub async fn check<C>(&self, context: &C, predicate: &Predicate) -> Result<bool>
    where
        C: AmbientContext + ?Sized,
    {
        match self.current(context).await? {
            Some(auth) => Ok(predicate.evaluate(&auth)?),
            None => Ok(false),
        }
    }

    /// Data access restrictions of the caller for `action` on `permission_id`.
    ///
    /// `None` when there is no caller or the caller lacks the permission.
    pub async fn field_access<C>(
        &self,
        context: &C,
        permission_id: &str,
        action: &str,
    ) -> Result<Option<FieldAccess>>
    where
        C: AmbientContext + ?Sized,
    {
        Ok(self
            .current(context)
            .await?
            .and_then(|auth| self.data_access.for_authentication(&auth, permission_id, action)))
    }
}

fn session_policy(config: &SessionConfig) -> SessionPolicy {
    config.token_types.iter().fold(
        SessionPolicy {
            default_max_sessions: config.default_max_sessions,
            default_max_inactive: config.max_inactive(),
            ..SessionPolicy::default()
        },
        |policy, (name, token_type)| {
            policy.with_token_type(
                name.clone(),
                TokenTypePolicy {
                    max_sessions: token_type.max_sessions,
                    max_inactive: token_type.max_inactive(),
                },
            )
        },
    )
}
