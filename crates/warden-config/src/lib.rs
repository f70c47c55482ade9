//! Configuration management for Warden
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (WARDEN_* prefix, `__` between sections)
//! 2. warden.local.toml (gitignored, local overrides)
//! 3. warden.toml (git-tracked, project config)
//! 4. ~/.config/warden/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! ```toml
//! [session]
//! default_max_sessions = 3
//! max_inactive_secs = 1800
//!
//! [session.token_types.api]
//! max_sessions = -1
//!
//! [resolver]
//! timeout_ms = 250
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Warden configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub session: SessionConfig,
    pub resolver: ResolverConfig,
    pub audit: AuditConfig,
}

/// Session caps and idle expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// `-1` is unlimited, `0` refuses sign-in.
    pub default_max_sessions: i64,
    pub max_inactive_secs: Option<u64>,
    pub token_types: HashMap<String, TokenTypeConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_max_sessions: -1,
            max_inactive_secs: None,
            token_types: HashMap::new(),
        }
    }
}

impl SessionConfig {
    pub fn max_inactive(&self) -> Option<Duration> {
        self.max_inactive_secs.map(Duration::from_secs)
    }
}

/// Overrides for one token type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenTypeConfig {
    pub max_sessions: Option<i64>,
    pub max_inactive_secs: Option<u64>,
}

impl TokenTypeConfig {
    pub fn max_inactive(&self) -> Option<Duration> {
        self.max_inactive_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Deadline for resolving the current user. Unset means no deadline.
    pub timeout_ms: Option<u64>,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Log a warning whenever field filtering drops a field.
    pub log_denied_fields: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_denied_fields: true,
        }
    }
}

impl WardenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file without merging other sources
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, e.g. to seed a `warden.toml`
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that cannot be applied
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.default_max_sessions < -1 {
            return Err(ConfigError::ValidationError(format!(
                "session.default_max_sessions must be -1 or greater, got {}",
                self.session.default_max_sessions
            )));
        }
        if self.session.max_inactive_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "session.max_inactive_secs must be greater than zero".to_string(),
            ));
        }

        for (name, token_type) in &self.session.token_types {
            if token_type.max_sessions.is_some_and(|n| n < -1) {
                return Err(ConfigError::ValidationError(format!(
                    "session.token_types.{name}.max_sessions must be -1 or greater"
                )));
            }
            if token_type.max_inactive_secs == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "session.token_types.{name}.max_inactive_secs must be greater than zero"
                )));
            }
        }

        if self.resolver.timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "resolver.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = WardenConfig::default();
        assert_eq!(config.session.default_max_sessions, -1);
        assert_eq!(config.session.max_inactive(), None);
        assert!(config.session.token_types.is_empty());
        assert_eq!(config.resolver.timeout(), None);
        assert!(config.audit.log_denied_fields);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_caps() {
        let mut config = WardenConfig::default();
        config.session.default_max_sessions = -2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = WardenConfig::default();
        config.session.token_types.insert(
            "web".to_string(),
            TokenTypeConfig {
                max_sessions: Some(-5),
                max_inactive_secs: None,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeouts() {
        let mut config = WardenConfig::default();
        config.resolver.timeout_ms = Some(0);
        assert!(config.validate().is_err());

        let mut config = WardenConfig::default();
        config.session.max_inactive_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cap_is_valid() {
        // A zero cap is a legitimate "no sign-in" setting.
        let mut config = WardenConfig::default();
        config.session.default_max_sessions = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = WardenConfig::default();
        config.session.default_max_sessions = 2;
        config.session.token_types.insert(
            "api".to_string(),
            TokenTypeConfig {
                max_sessions: Some(-1),
                max_inactive_secs: Some(60),
            },
        );
        config.resolver.timeout_ms = Some(250);

        let rendered = config.to_toml().unwrap();
        let parsed: WardenConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = tempdir().expect("Failed to create temp dir");

        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(
            WardenConfig::from_file(&missing),
            Err(ConfigError::ReadError { .. })
        ));

        let broken = temp_dir.path().join("broken.toml");
        std::fs::write(&broken, "[session\n").unwrap();
        assert!(matches!(
            WardenConfig::from_file(&broken),
            Err(ConfigError::ParseError { .. })
        ));

        let invalid = temp_dir.path().join("invalid.toml");
        std::fs::write(&invalid, "[resolver]\ntimeout_ms = 0\n").unwrap();
        assert!(matches!(
            WardenConfig::from_file(&invalid),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
