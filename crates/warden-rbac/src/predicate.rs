//! Authorization predicates.
//!
//! A [`Predicate`] is a small expression tree over roles and permissions,
//! evaluated against an [`Authentication`]. Trees come from two places:
//!
//! - the textual form, parsed by [`Predicate::parse`] or [`has`]
//! - the combinators [`role`], [`permission`], [`Predicate::and`],
//!   [`Predicate::or`] and [`Predicate::negate`]
//!
//! # Textual Grammar
//!
//! ```text
//! clause := "permission:" id [":" action ("," action)*]
//!         | "role:" id ("," id)*
//! expr   := clause
//!         | clause "and" clause
//!         | clause "or" clause
//! ```
//!
//! Tokens are whitespace separated and keywords are case-sensitive. The text
//! form holds at most two clauses; deeper composition goes through the
//! combinators.
//!
//! # Examples
//!
//! ```
//! use warden_rbac::predicate::{has, role};
//! use warden_types::{AuthenticationBuilder, Permission, Role, User};
//!
//! let auth = AuthenticationBuilder::new()
//!     .with_user(User::new("admin", "admin", "Administrator", "default"))
//!     .with_roles(vec![Role::new("admin-role", "admin")])
//!     .with_permissions(vec![Permission::new("user-manager").with_actions(["get"])])
//!     .build()?;
//!
//! assert!(has("permission:user-manager:get and role:admin-role").evaluate(&auth)?);
//! assert!(!has("permission:user-manager:test").and(role("admin-role")).evaluate(&auth)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt::{self, Display};

use thiserror::Error;
use tracing::warn;
use warden_types::Authentication;

const PERMISSION_PREFIX: &str = "permission:";
const ROLE_PREFIX: &str = "role:";

// ============================================================================
// Errors
// ============================================================================

/// Error type for predicate parsing and evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    /// The expression does not match the grammar.
    #[error("Malformed predicate '{expression}': {reason}")]
    Parse { expression: String, reason: String },
}

/// Result type for predicate operations.
pub type Result<T> = std::result::Result<T, PredicateError>;

// ============================================================================
// Predicate
// ============================================================================

/// A boolean expression over roles and permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Holds the permission and, when `actions` is non-empty, every action.
    Permission { id: String, actions: Vec<String> },
    /// Holds at least one of the roles.
    Role { ids: Vec<String> },
    /// Both sides hold.
    And(Box<Predicate>, Box<Predicate>),
    /// At least one side holds.
    Or(Box<Predicate>, Box<Predicate>),
    /// The inner predicate does not hold.
    Not(Box<Predicate>),
    /// Text that failed to parse. Reported when evaluated.
    Malformed { expression: String, reason: String },
}

/// Builds a predicate from expression text.
///
/// Never fails here: a malformed expression is kept and reported as
/// [`PredicateError::Parse`] by [`Predicate::evaluate`].
pub fn has(expression: &str) -> Predicate {
    Predicate::parse(expression).unwrap_or_else(|PredicateError::Parse { expression, reason }| {
        Predicate::Malformed { expression, reason }
    })
}

/// Holds the given role.
pub fn role(id: impl Into<String>) -> Predicate {
    Predicate::Role {
        ids: vec![id.into()],
    }
}

/// Holds the given permission with every listed action.
pub fn permission<I, S>(id: impl Into<String>, actions: I) -> Predicate
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Predicate::Permission {
        id: id.into(),
        actions: actions.into_iter().map(Into::into).collect(),
    }
}

impl Predicate {
    /// Parses expression text eagerly.
    pub fn parse(expression: &str) -> Result<Self> {
        let tokens: Vec<&str> = expression.split_whitespace().collect();
        let fail = |reason: &str| PredicateError::Parse {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        match tokens.as_slice() {
            [] => Err(fail("empty expression")),
            [clause] => parse_clause(clause).map_err(|r| fail(&r)),
            [left, connective, right] => {
                let left = parse_clause(left).map_err(|r| fail(&r))?;
                let right = parse_clause(right).map_err(|r| fail(&r))?;
                match *connective {
                    "and" => Ok(left.and(right)),
                    "or" => Ok(left.or(right)),
                    other => Err(fail(&format!("unknown connective '{other}'"))),
                }
            }
            [_, _] => Err(fail("dangling connective or missing clause")),
            _ => Err(fail("at most two clauses joined by one connective")),
        }
    }

    /// Both `self` and `other` hold.
    #[must_use]
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Either `self` or `other` holds.
    #[must_use]
    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// `self` does not hold.
    #[must_use]
    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Evaluates against `auth`.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::Parse`] if the tree holds a malformed
    /// expression anywhere. Both sides of `and`/`or` are checked, so the
    /// error does not depend on the model.
    pub fn evaluate(&self, auth: &Authentication) -> Result<bool> {
        match self {
            Predicate::Permission { id, actions } => {
                Ok(auth.has_permission_actions(id, actions.as_slice()))
            }
            Predicate::Role { ids } => Ok(ids.iter().any(|id| auth.has_role(id))),
            Predicate::And(left, right) => {
                let left = left.evaluate(auth)?;
                let right = right.evaluate(auth)?;
                Ok(left && right)
            }
            Predicate::Or(left, right) => {
                let left = left.evaluate(auth)?;
                let right = right.evaluate(auth)?;
                Ok(left || right)
            }
            Predicate::Not(inner) => inner.evaluate(auth).map(|v| !v),
            Predicate::Malformed { expression, reason } => Err(PredicateError::Parse {
                expression: expression.clone(),
                reason: reason.clone(),
            }),
        }
    }

    /// Evaluates against `auth`, treating a malformed predicate as `false`.
    pub fn test(&self, auth: &Authentication) -> bool {
        match self.evaluate(auth) {
            Ok(result) => result,
            Err(e) => {
                warn!(user_id = %auth.user().id, error = %e, "Predicate rejected");
                false
            }
        }
    }

    /// Returns whether the tree contains a malformed expression.
    pub fn is_malformed(&self) -> bool {
        match self {
            Predicate::Permission { .. } | Predicate::Role { .. } => false,
            Predicate::And(l, r) | Predicate::Or(l, r) => l.is_malformed() || r.is_malformed(),
            Predicate::Not(inner) => inner.is_malformed(),
            Predicate::Malformed { .. } => true,
        }
    }
}

/// Parses one clause. Returns the failure reason on error.
fn parse_clause(token: &str) -> std::result::Result<Predicate, String> {
    if let Some(rest) = token.strip_prefix(PERMISSION_PREFIX) {
        let (id, actions) = match rest.split_once(':') {
            Some((id, actions)) => (id, Some(actions)),
            None => (rest, None),
        };
        if id.is_empty() {
            return Err(format!("missing permission id in '{token}'"));
        }
        let actions = match actions {
            Some(list) if list.contains(':') => {
                return Err(format!("unexpected ':' in actions of '{token}'"));
            }
            Some(list) => split_list(list).ok_or_else(|| format!("empty action in '{token}'"))?,
            None => Vec::new(),
        };
        return Ok(Predicate::Permission {
            id: id.to_string(),
            actions,
        });
    }

    if let Some(rest) = token.strip_prefix(ROLE_PREFIX) {
        let ids = split_list(rest).ok_or_else(|| format!("missing role id in '{token}'"))?;
        return Ok(Predicate::Role { ids });
    }

    Err(format!("unknown clause '{token}'"))
}

/// Splits a comma list, rejecting empty items (including an empty list).
fn split_list(list: &str) -> Option<Vec<String>> {
    list.split(',')
        .map(|item| (!item.is_empty()).then(|| item.to_string()))
        .collect()
}

impl Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Permission { id, actions } if actions.is_empty() => {
                write!(f, "{PERMISSION_PREFIX}{id}")
            }
            Predicate::Permission { id, actions } => {
                write!(f, "{PERMISSION_PREFIX}{id}:{}", actions.join(","))
            }
            Predicate::Role { ids } => write!(f, "{ROLE_PREFIX}{}", ids.join(",")),
            Predicate::And(l, r) => write!(f, "{} and {}", Operand(l), Operand(r)),
            Predicate::Or(l, r) => write!(f, "{} or {}", Operand(l), Operand(r)),
            Predicate::Not(inner) => write!(f, "not {}", Operand(inner)),
            Predicate::Malformed { expression, .. } => f.write_str(expression),
        }
    }
}

/// Renders nested combinations in parentheses.
struct Operand<'a>(&'a Predicate);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Predicate::And(..) | Predicate::Or(..) | Predicate::Not(..) => write!(f, "({})", self.0),
            leaf => write!(f, "{leaf}"),
        }
    }
}
