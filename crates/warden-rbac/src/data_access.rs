//! Field-level and row-level data-access resolution.
//!
//! Access rules hang off permissions only; roles are never consulted here.
//! For one permission and one action the resolver merges every matching
//! [`DataAccessConfig`] into a single [`FieldAccess`]:
//!
//! - deny configs are unioned into the denied field set
//! - allow configs are unioned into the allowed field set, minus denied fields
//! - scope configs become [`ScopeFilter`]s, all of which a row must satisfy
//!
//! Merging is set union, so config order never changes the result.

use std::collections::BTreeSet;

use tracing::warn;
use warden_types::{Authentication, DataAccessConfig, DataAccessType, Permission};

/// Fields named by `DENY_FIELDS` configs for `action`.
///
/// Returns an empty set when no deny config applies.
pub fn find_deny_fields(permission: &Permission, action: &str) -> BTreeSet<String> {
    collect_fields(permission, action, &DataAccessType::DenyFields).unwrap_or_default()
}

/// Fields named by `ALLOW_FIELDS` configs for `action`, with every denied
/// field removed.
///
/// Deny wins on conflict: a field both allowed and denied is not returned.
pub fn find_allow_fields(permission: &Permission, action: &str) -> BTreeSet<String> {
    let Some(allowed) = collect_fields(permission, action, &DataAccessType::AllowFields) else {
        return BTreeSet::new();
    };
    let denied = find_deny_fields(permission, action);
    allowed.difference(&denied).cloned().collect()
}

/// Row restrictions from `FIELD_SCOPE` configs for `action`, in input order.
///
/// A scope config without a target `field` cannot restrict anything and is
/// skipped.
pub fn find_scopes(permission: &Permission, action: &str) -> Vec<ScopeFilter> {
    permission
        .data_accesses_for(action)
        .filter(|c| c.access_type == DataAccessType::FieldScope)
        .filter_map(|c| {
            let filter = ScopeFilter::from_config(c);
            if filter.is_none() {
                warn!(
                    permission = %permission.id(),
                    action = %action,
                    "Scope config without a field ignored"
                );
            }
            filter
        })
        .collect()
}

/// Union of the target fields of every `kind` config for `action`, or
/// `None` when no such config exists.
fn collect_fields(
    permission: &Permission,
    action: &str,
    kind: &DataAccessType,
) -> Option<BTreeSet<String>> {
    let mut matched = false;
    let mut fields = BTreeSet::new();

    for config in permission
        .data_accesses_for(action)
        .filter(|c| &c.access_type == kind)
    {
        matched = true;
        fields.extend(config.target_fields().map(str::to_string));
    }

    matched.then_some(fields)
}

// ============================================================================
// ScopeFilter
// ============================================================================

/// Row-level restriction: rows are visible only when `field` holds one of
/// `values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    /// Scope family tag carried over from the config.
    pub scope_type: Option<String>,
    /// Column the restriction applies to.
    pub field: String,
    /// Permitted values. Empty means no row qualifies.
    pub values: BTreeSet<String>,
}

impl ScopeFilter {
    fn from_config(config: &DataAccessConfig) -> Option<Self> {
        let field = config.field.clone()?;
        Some(Self {
            scope_type: config.scope_type.clone(),
            field,
            values: config.fields.clone(),
        })
    }

    /// Returns whether a row whose `field` holds `value` passes this filter.
    pub fn admits(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.values.contains(v))
    }
}

// ============================================================================
// FieldAccess
// ============================================================================

/// Merged data-access restrictions for one permission and one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccess {
    permission_id: String,
    action: String,
    /// `None` when no allow config applies (every non-denied field readable).
    allowed: Option<BTreeSet<String>>,
    denied: BTreeSet<String>,
    scopes: Vec<ScopeFilter>,
}

impl FieldAccess {
    pub fn permission_id(&self) -> &str {
        &self.permission_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn denied_fields(&self) -> &BTreeSet<String> {
        &self.denied
    }

    /// The explicit allow list, if any allow config applied.
    pub fn allowed_fields(&self) -> Option<&BTreeSet<String>> {
        self.allowed.as_ref()
    }

    pub fn scopes(&self) -> &[ScopeFilter] {
        &self.scopes
    }

    /// Returns whether no rule restricts this action at all.
    pub fn is_unrestricted(&self) -> bool {
        self.allowed.is_none() && self.denied.is_empty() && self.scopes.is_empty()
    }

    /// Returns whether `field` may be read.
    ///
    /// Deny is checked first; an allow list, when present, must then name
    /// the field.
    pub fn allows_field(&self, field: &str) -> bool {
        if self.denied.contains(field) {
            return false;
        }
        self.allowed
            .as_ref()
            .is_none_or(|allowed| allowed.contains(field))
    }

    /// Keeps only the readable fields of `requested`, preserving order.
    pub fn filter_fields(&self, requested: &[String]) -> Vec<String> {
        requested
            .iter()
            .filter(|f| self.allows_field(f))
            .cloned()
            .collect()
    }

    /// Returns whether a row passes every scope filter.
    ///
    /// `lookup` returns the row's value for a column, or `None` when the
    /// column is absent.
    pub fn allows_row<'a, F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        self.scopes.iter().all(|s| s.admits(lookup(&s.field)))
    }
}

// ============================================================================
// DataAccessResolver
// ============================================================================

/// Resolves [`FieldAccess`] restrictions and logs dropped fields.
#[derive(Debug, Clone)]
pub struct DataAccessResolver {
    audit_enabled: bool,
}

impl Default for DataAccessResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DataAccessResolver {
    pub fn new() -> Self {
        Self {
            audit_enabled: true,
        }
    }

    /// Disables logging of filtered fields.
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    /// Sets whether filtered fields are logged.
    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self
    }

    /// Merges every rule of `permission` that applies to `action`.
    pub fn resolve(&self, permission: &Permission, action: &str) -> FieldAccess {
        let denied = find_deny_fields(permission, action);
        let allowed = collect_fields(permission, action, &DataAccessType::AllowFields)
            .map(|allowed| allowed.difference(&denied).cloned().collect());

        FieldAccess {
            permission_id: permission.id().to_string(),
            action: action.to_string(),
            allowed,
            denied,
            scopes: find_scopes(permission, action),
        }
    }

    /// Resolves restrictions for a permission held by `auth`.
    ///
    /// Returns `None` when `auth` does not hold the permission.
    pub fn for_authentication(
        &self,
        auth: &Authentication,
        permission_id: &str,
        action: &str,
    ) -> Option<FieldAccess> {
        auth.get_permission(permission_id)
            .map(|p| self.resolve(p, action))
    }

    /// Filters `requested` through `access`, logging what was dropped.
    pub fn filter_fields(&self, access: &FieldAccess, requested: &[String]) -> Vec<String> {
        let allowed = access.filter_fields(requested);

        if self.audit_enabled && allowed.len() != requested.len() {
            let denied: Vec<&String> = requested
                .iter()
                .filter(|f| !access.allows_field(f))
                .collect();
            warn!(
                permission = %access.permission_id,
                action = %access.action,
                denied_fields = ?denied,
                "Fields filtered by data access rules"
            );
        }

        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::actions;

    fn user_manager() -> Permission {
        Permission::new("user-manager")
            .with_actions([actions::QUERY, actions::GET, actions::UPDATE])
            .with_data_access(
                DataAccessConfig::deny_fields(actions::QUERY, ["1", "2", "3"])
                    .with_field("test")
                    .with_scope_type("CUSTOM_SCOPE"),
            )
    }

    #[test]
    fn test_find_deny_fields_example() {
        let fields = find_deny_fields(&user_manager(), actions::QUERY);
        assert_eq!(fields, BTreeSet::from(["1".to_string(), "2".to_string(), "3".to_string()]));
    }

    #[test]
    fn test_find_deny_fields_other_action_empty() {
        assert!(find_deny_fields(&user_manager(), actions::GET).is_empty());
    }

    #[test]
    fn test_deny_configs_are_merged() {
        let permission = Permission::new("p")
            .with_data_access(DataAccessConfig::deny_fields(actions::QUERY, ["a", "b"]))
            .with_data_access(DataAccessConfig::deny_fields(actions::QUERY, ["b", "c"]))
            .with_data_access(
                DataAccessConfig::new(actions::QUERY, DataAccessType::DenyFields).with_field("d"),
            );

        let fields = find_deny_fields(&permission, actions::QUERY);
        assert_eq!(
            fields,
            BTreeSet::from([
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string()
            ])
        );
    }

    #[test]
    fn test_deny_wins_over_allow() {
        let permission = Permission::new("p")
            .with_data_access(DataAccessConfig::allow_fields(actions::QUERY, ["name", "ssn"]))
            .with_data_access(DataAccessConfig::deny_fields(actions::QUERY, ["ssn"]));

        let allowed = find_allow_fields(&permission, actions::QUERY);
        assert_eq!(allowed, BTreeSet::from(["name".to_string()]));

        let access = DataAccessResolver::new().without_audit().resolve(&permission, actions::QUERY);
        assert!(access.allows_field("name"));
        assert!(!access.allows_field("ssn"));
        assert!(!access.allows_field("email")); // not on the allow list
    }

    #[test]
    fn test_allow_list_fully_denied_allows_nothing() {
        let permission = Permission::new("p")
            .with_data_access(DataAccessConfig::allow_fields(actions::GET, ["ssn"]))
            .with_data_access(DataAccessConfig::deny_fields(actions::GET, ["ssn"]));

        let access = DataAccessResolver::new().without_audit().resolve(&permission, actions::GET);
        assert_eq!(access.allowed_fields(), Some(&BTreeSet::new()));
        assert!(!access.allows_field("ssn"));
        assert!(!access.allows_field("name"));
    }

    #[test]
    fn test_no_rules_is_unrestricted() {
        let permission = Permission::new("p").with_actions([actions::GET]);
        let access = DataAccessResolver::new().resolve(&permission, actions::GET);

        assert!(access.is_unrestricted());
        assert!(access.allows_field("anything"));
        assert!(access.allows_row(|_| None));
    }

    #[test]
    fn test_filter_fields_preserves_order() {
        let access = DataAccessResolver::new()
            .without_audit()
            .resolve(&user_manager(), actions::QUERY);

        let requested = vec!["name".to_string(), "2".to_string(), "email".to_string()];
        let allowed = DataAccessResolver::new()
            .without_audit()
            .filter_fields(&access, &requested);

        assert_eq!(allowed, vec!["name".to_string(), "email".to_string()]);
    }

    #[test]
    fn test_scopes_restrict_rows() {
        let permission = Permission::new("orders").with_data_access(
            DataAccessConfig::field_scope(actions::QUERY, "org_id", ["org-1", "org-2"])
                .with_scope_type("ORG_SCOPE"),
        );

        let scopes = find_scopes(&permission, actions::QUERY);
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].scope_type.as_deref(), Some("ORG_SCOPE"));

        let access = DataAccessResolver::new().resolve(&permission, actions::QUERY);
        assert!(access.allows_row(|col| (col == "org_id").then_some("org-1")));
        assert!(!access.allows_row(|col| (col == "org_id").then_some("org-9")));
        assert!(!access.allows_row(|_| None));
    }

    #[test]
    fn test_scope_without_field_skipped() {
        let permission = Permission::new("p").with_data_access(
            DataAccessConfig::new(actions::QUERY, DataAccessType::FieldScope).with_fields(["x"]),
        );
        assert!(find_scopes(&permission, actions::QUERY).is_empty());
    }

    #[test]
    fn test_custom_configs_ignored_for_fields() {
        let permission = Permission::new("p").with_data_access(
            DataAccessConfig::new(actions::QUERY, "ONLY_SELF").with_fields(["creator_id"]),
        );

        let access = DataAccessResolver::new().resolve(&permission, actions::QUERY);
        assert!(access.is_unrestricted());
    }
}
