//! Cross-module tests for warden-rbac

use std::collections::BTreeSet;

use proptest::prelude::*;
use warden_types::{
    Authentication, AuthenticationBuilder, DataAccessConfig, Permission, Role, User, actions,
};

use crate::{DataAccessResolver, Predicate, find_deny_fields, has, role};

fn example_authentication() -> Authentication {
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

// ============================================================================
// Example Scenario
// ============================================================================

#[test]
fn example_scenario() {
    let auth = example_authentication();

    assert!(auth.has_permission_action("user-manager", "get"));
    assert!(!auth.has_permission_action("user-manager", "delete"));

    let fields = auth
        .get_permission("user-manager")
        .map(|p| find_deny_fields(p, actions::QUERY))
        .unwrap_or_default();
    assert_eq!(fields.len(), 3);
    assert_eq!(
        fields,
        BTreeSet::from(["1".to_string(), "2".to_string(), "3".to_string()])
    );

    assert!(
        has("permission:user-manager:get")
            .and(has("role:admin-role"))
            .evaluate(&auth)
            .unwrap()
    );
    assert!(
        !has("permission:user-manager:test")
            .and(has("role:admin-role"))
            .evaluate(&auth)
            .unwrap()
    );
    assert!(has("permission:user-manager").or(role("admin-role")).test(&auth));
}

#[test]
fn resolver_for_missing_permission_is_none() {
    let auth = example_authentication();
    let resolver = DataAccessResolver::new().without_audit();

    assert!(
        resolver
            .for_authentication(&auth, "order-manager", actions::QUERY)
            .is_none()
    );
    let access = resolver
        .for_authentication(&auth, "user-manager", actions::QUERY)
        .unwrap();
    assert_eq!(access.denied_fields().len(), 3);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

/// Clause texts exercised against the example authentication.
const CLAUSES: &[&str] = &[
    "permission:user-manager",
    "permission:user-manager:get",
    "permission:user-manager:delete",
    "permission:user-manager:query,update",
    "permission:missing",
    "role:admin-role",
    "role:guest",
    "role:guest,admin-role",
];

fn deny_config() -> impl Strategy<Value = DataAccessConfig> {
    (
        prop::sample::select(vec![actions::QUERY, actions::GET]),
        prop::collection::btree_set("[a-f]", 0..4),
    )
        .prop_map(|(action, fields)| DataAccessConfig::deny_fields(action, fields))
}

proptest! {
    /// Property: deny field resolution is independent of config order
    #[test]
    fn prop_deny_fields_order_independent(
        configs in prop::collection::vec(deny_config(), 0..6),
        seed in any::<u64>(),
    ) {
        let forward = configs
            .iter()
            .cloned()
            .fold(Permission::new("p"), Permission::with_data_access);

        let mut shuffled = configs.clone();
        shuffled.rotate_left(if configs.is_empty() { 0 } else { (seed as usize) % configs.len() });
        shuffled.reverse();
        let backward = shuffled
            .into_iter()
            .fold(Permission::new("p"), Permission::with_data_access);

        prop_assert_eq!(
            find_deny_fields(&forward, actions::QUERY),
            find_deny_fields(&backward, actions::QUERY)
        );
    }

    /// Property: combinators agree with the textual form
    #[test]
    fn prop_combinators_match_text(
        left in prop::sample::select(CLAUSES),
        right in prop::sample::select(CLAUSES),
    ) {
        let auth = example_authentication();
        let l = has(left).evaluate(&auth).unwrap();
        let r = has(right).evaluate(&auth).unwrap();

        let and = has(left).and(has(right)).evaluate(&auth).unwrap();
        let or = has(left).or(has(right)).evaluate(&auth).unwrap();

        prop_assert_eq!(and, l && r);
        prop_assert_eq!(or, l || r);

        let text_and = Predicate::parse(&format!("{left} and {right}")).unwrap();
        let text_or = Predicate::parse(&format!("{left} or {right}")).unwrap();
        prop_assert_eq!(text_and.evaluate(&auth).unwrap(), and);
        prop_assert_eq!(text_or.evaluate(&auth).unwrap(), or);
    }

    /// Property: rendering a parsed expression and parsing it again is stable
    #[test]
    fn prop_display_reparses(
        left in prop::sample::select(CLAUSES),
        right in prop::sample::select(CLAUSES),
        connective in prop::sample::select(vec!["and", "or"]),
    ) {
        let parsed = Predicate::parse(&format!("{left} {connective} {right}")).unwrap();
        let reparsed = Predicate::parse(&parsed.to_string()).unwrap();
        prop_assert_eq!(parsed, reparsed);
    }
}
