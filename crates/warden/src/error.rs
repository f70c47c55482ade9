//! Error types for the Warden facade.

use thiserror::Error;

/// Result type for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;

/// Errors that can occur in Warden operations.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Authentication model error.
    #[error("model error: {0}")]
    Model(#[from] warden_types::ModelError),

    /// Predicate could not be parsed.
    #[error("predicate error: {0}")]
    Predicate(#[from] warden_rbac::PredicateError),

    /// Sign-in refused.
    #[error("session error: {0}")]
    Session(#[from] warden_session::SessionError),

    /// Resolving the current user failed.
    #[error("resolve error: {0}")]
    Resolve(#[from] warden_session::ResolveError),

    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(#[from] warden_config::ConfigError),

    /// Configuration sources could not be loaded.
    #[error("failed to load configuration: {0:#}")]
    ConfigLoad(anyhow::Error),
}
