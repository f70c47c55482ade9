//! Permission and data-access rule types.
//!
//! A [`Permission`] is a named capability bundle: the actions it grants plus
//! the [`DataAccessConfig`] rules that narrow what those actions may touch.

use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// DataAccessType
// ============================================================================

/// Kind of a data-access rule.
///
/// Known tags parse case-insensitively. Any other tag is preserved as
/// [`DataAccessType::Custom`] so rules from newer producers survive a
/// round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataAccessType {
    /// Listed fields are hidden from the action.
    DenyFields,
    /// Only the listed fields are visible to the action.
    AllowFields,
    /// Rows are restricted to those whose `field` is one of `fields`.
    FieldScope,
    /// Any other rule kind, kept verbatim.
    Custom(String),
}

impl DataAccessType {
    pub fn as_str(&self) -> &str {
        match self {
            DataAccessType::DenyFields => "DENY_FIELDS",
            DataAccessType::AllowFields => "ALLOW_FIELDS",
            DataAccessType::FieldScope => "FIELD_SCOPE",
            DataAccessType::Custom(name) => name,
        }
    }
}

impl FromStr for DataAccessType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = if s.eq_ignore_ascii_case("DENY_FIELDS") {
            DataAccessType::DenyFields
        } else if s.eq_ignore_ascii_case("ALLOW_FIELDS") {
            DataAccessType::AllowFields
        } else if s.eq_ignore_ascii_case("FIELD_SCOPE") {
            DataAccessType::FieldScope
        } else {
            DataAccessType::Custom(s.to_string())
        };
        Ok(parsed)
    }
}

impl From<String> for DataAccessType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(parsed) => parsed,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for DataAccessType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<DataAccessType> for String {
    fn from(value: DataAccessType) -> Self {
        value.as_str().to_string()
    }
}

impl Display for DataAccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DataAccessConfig
// ============================================================================

/// A rule restricting which fields or rows an action may touch.
///
/// Several configs may target the same action; consumers merge them rather
/// than letting one overwrite another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAccessConfig {
    /// Action this rule applies to (e.g. `"query"`).
    pub action: String,

    /// Rule kind.
    #[serde(rename = "type")]
    pub access_type: DataAccessType,

    /// Scope family tag, e.g. `"CUSTOM_SCOPE"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_type: Option<String>,

    /// Single target field. Only consulted when `fields` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Target fields (or, for scopes, the allowed values).
    #[serde(default)]
    pub fields: BTreeSet<String>,
}

impl DataAccessConfig {
    /// Creates a rule with no target fields.
    pub fn new(action: impl Into<String>, access_type: impl Into<DataAccessType>) -> Self {
        Self {
            action: action.into(),
            access_type: access_type.into(),
            scope_type: None,
            field: None,
            fields: BTreeSet::new(),
        }
    }

    /// Shorthand for a `DENY_FIELDS` rule.
    pub fn deny_fields<I, S>(action: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(action, DataAccessType::DenyFields).with_fields(fields)
    }

    /// Shorthand for an `ALLOW_FIELDS` rule.
    pub fn allow_fields<I, S>(action: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(action, DataAccessType::AllowFields).with_fields(fields)
    }

    /// Shorthand for a `FIELD_SCOPE` rule: rows where `field` is one of `values`.
    pub fn field_scope<I, S>(action: impl Into<String>, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(action, DataAccessType::FieldScope)
            .with_field(field)
            .with_fields(values)
    }

    pub fn with_scope_type(mut self, scope_type: impl Into<String>) -> Self {
        self.scope_type = Some(scope_type.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Returns whether this rule applies to `action`.
    pub fn applies_to(&self, action: &str) -> bool {
        self.action == action
    }

    /// Returns the fields this rule names.
    ///
    /// `fields` wins when non-empty; otherwise the singular `field` is used.
    pub fn target_fields(&self) -> impl Iterator<Item = &str> {
        let singular = if self.fields.is_empty() {
            self.field.as_deref()
        } else {
            None
        };
        self.fields.iter().map(String::as_str).chain(singular)
    }
}

// ============================================================================
// Permission
// ============================================================================

/// A capability bundle: the actions it grants and the data-access rules
/// attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    actions: BTreeSet<String>,
    #[serde(default)]
    data_accesses: Vec<DataAccessConfig>,
}

impl Permission {
    /// Creates a permission with no actions and no rules.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            actions: BTreeSet::new(),
            data_accesses: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Grants the given actions (duplicates are no-ops).
    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    /// Appends a data-access rule. Rule order is preserved.
    pub fn with_data_access(mut self, config: DataAccessConfig) -> Self {
        self.data_accesses.push(config);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &BTreeSet<String> {
        &self.actions
    }

    pub fn data_accesses(&self) -> &[DataAccessConfig] {
        &self.data_accesses
    }

    /// Returns whether this permission grants `action`.
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    /// Returns whether this permission grants every action in `actions`.
    ///
    /// An empty slice is trivially granted.
    pub fn has_actions<S: AsRef<str>>(&self, actions: &[S]) -> bool {
        actions.iter().all(|a| self.has_action(a.as_ref()))
    }

    /// Returns the data-access rules attached to `action`, in input order.
    pub fn data_accesses_for<'a>(
        &'a self,
        action: &'a str,
    ) -> impl Iterator<Item = &'a DataAccessConfig> + 'a {
        self.data_accesses.iter().filter(move |c| c.applies_to(action))
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "permission:{}", self.id)
    }
}
