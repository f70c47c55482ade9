//! End-to-end tests for the Warden facade

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;

use crate::{
    Authentication, AuthenticationBuilder, AuthenticationSource, DataAccessConfig,
    ExecutionContext, Permission, Predicate, ResolveError, Role, SessionError, SourceError,
    StaticAuthenticationSource, User, Warden, WardenConfig, WardenError, actions, has, role,
};

fn admin() -> Authentication {
    AuthenticationBuilder::new()
        .with_user(User::new("admin", "admin", "Administrator", "default"))
        .with_roles(vec![Role::new("admin-role", "admin")])
        .with_permissions(vec![
            Permission::new("user-manager")
                .with_actions([actions::QUERY, actions::GET, actions::UPDATE])
                .with_data_access(
                    DataAccessConfig::deny_fields(actions::QUERY, ["1", "2", "3"])
                        .with_field("test")
                        .with_scope_type("CUSTOM_SCOPE"),
                ),
        ])
        .build()
        .unwrap()
}

fn warden(config: WardenConfig) -> Warden {
    Warden::new(config)
        .unwrap()
        .with_source(Arc::new(StaticAuthenticationSource::new().with_authentication(admin())))
}

#[tokio::test]
async fn signed_in_user_is_authorized() {
    let warden = warden(WardenConfig::default());
    warden.sign_in("test", "token-test", "admin").unwrap();

    let ctx = warden.context_for("token-test");
    let current = warden.current(&ctx).await.unwrap().unwrap();
    assert_eq!(current.user().id, "admin");

    assert!(
        warden
            .check(&ctx, &has("permission:user-manager:get").and(role("admin-role")))
            .await
            .unwrap()
    );
    assert!(
        !warden
            .check(&ctx, &has("permission:user-manager:test and role:admin-role"))
            .await
            .unwrap()
    );

    let access = warden
        .field_access(&ctx, "user-manager", actions::QUERY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(access.denied_fields().len(), 3);
    assert!(!access.allows_field("2"));
    assert!(access.allows_field("username"));
    // A deny config carries no row scope even when it names a scope type.
    assert!(access.scopes().is_empty());
}

#[tokio::test]
async fn anonymous_request_is_denied() {
    let warden = warden(WardenConfig::default());
    let ctx = warden.context_for("never-signed-in");

    assert!(ctx.token().is_none());
    assert!(warden.current(&ctx).await.unwrap().is_none());
    assert!(!warden.check(&ctx, &has("role:admin-role")).await.unwrap());
    assert!(
        warden
            .field_access(&ctx, "user-manager", actions::QUERY)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn signed_out_context_stops_resolving() {
    let warden = warden(WardenConfig::default());
    warden.sign_in("test", "token-test", "admin").unwrap();
    let ctx = warden.context_for("token-test");

    assert!(warden.sign_out("token-test"));
    assert!(warden.current(&ctx).await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_predicate_is_an_error() {
    let warden = warden(WardenConfig::default());
    warden.sign_in("test", "token-test", "admin").unwrap();
    let ctx = warden.context_for("token-test");

    let err = warden
        .check(&ctx, &has("group:admins"))
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::Predicate(_)));

    // Anonymous callers are denied before the predicate is looked at.
    let anonymous = ExecutionContext::new();
    assert!(!warden.check(&anonymous, &has("group:admins")).await.unwrap());
}

#[test]
fn configured_cap_evicts_oldest() {
    let mut config = WardenConfig::default();
    config.session.default_max_sessions = 2;
    let warden = warden(config);

    for token in ["t1", "t2", "t3"] {
        warden.sign_in("web", token, "admin").unwrap();
    }

    let tokens: Vec<String> = warden
        .registry()
        .get_by_user_id("admin")
        .iter()
        .map(|t| t.token().to_string())
        .collect();
    assert_eq!(tokens, vec!["t2", "t3"]);
}

#[test]
fn configured_zero_cap_refuses() {
    let mut config = WardenConfig::default();
    config.session.default_max_sessions = 0;
    let warden = warden(config);

    let err = warden.sign_in("web", "t1", "admin").unwrap_err();
    assert!(matches!(
        err,
        WardenError::Session(SessionError::SessionLimitExceeded { .. })
    ));
}

#[test]
fn context_for_touches_token() {
    let warden = warden(WardenConfig::default());
    warden.sign_in("web", "t1", "admin").unwrap();

    warden.context_for("t1");
    let ctx = warden.context_for("t1");

    assert_eq!(ctx.token().unwrap().request_count(), 2);
}

struct StalledSource;

#[async_trait]
impl AuthenticationSource for StalledSource {
    async fn get_by_user_id(
        &self,
        _user_id: &str,
    ) -> Result<Option<Arc<Authentication>>, SourceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_bounds_resolution() {
    let mut config = WardenConfig::default();
    config.resolver.timeout_ms = Some(100);
    let warden = Warden::new(config).unwrap().with_source(Arc::new(StalledSource));
    warden.sign_in("web", "t1", "admin").unwrap();

    let ctx = warden.context_for("t1");
    assert!(warden.current(&ctx).await.unwrap().is_none());
}

struct BrokenSource;

#[async_trait]
impl AuthenticationSource for BrokenSource {
    async fn get_by_user_id(
        &self,
        _user_id: &str,
    ) -> Result<Option<Arc<Authentication>>, SourceError> {
        Err(SourceError::Unavailable("directory offline".to_string()))
    }
}

#[tokio::test]
async fn source_failure_is_not_anonymous() {
    let warden = Warden::new(WardenConfig::default())
        .unwrap()
        .with_source(Arc::new(BrokenSource));
    warden.sign_in("web", "t1", "admin").unwrap();
    let ctx = warden.context_for("t1");

    let err = warden
        .check(&ctx, &Predicate::parse("role:admin-role").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WardenError::Resolve(ResolveError::Source(SourceError::Unavailable(_)))
    ));
}

#[test]
fn from_dir_reads_project_config() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join("warden.toml"),
        r"
[session]
default_max_sessions = 1

[session.token_types.api]
max_sessions = -1

[audit]
log_denied_fields = false
",
    )
    .expect("Failed to write config");

    let warden = Warden::from_dir(temp_dir.path()).unwrap();
    assert_eq!(warden.config().session.default_max_sessions, 1);
    assert_eq!(warden.registry().policy().max_sessions_for("web"), 1);
    assert_eq!(warden.registry().policy().max_sessions_for("api"), -1);
    assert!(!warden.config().audit.log_denied_fields);
}

#[test]
fn from_dir_rejects_invalid_config() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join("warden.toml"),
        "[session]\ndefault_max_sessions = -9\n",
    )
    .expect("Failed to write config");

    assert!(matches!(
        Warden::from_dir(temp_dir.path()),
        Err(WardenError::ConfigLoad(_))
    ));
}
