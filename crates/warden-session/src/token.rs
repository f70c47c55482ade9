//! Session token values.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// TokenState
// ============================================================================

/// Lifecycle state of a [`SessionToken`].
///
/// ```text
/// (none) ──sign-in──▶ Active ──offline──▶ Offline
///                       │                   │
///                       └──sign-out/evict/expire──▶ Removed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Active,
    /// Logged out by the server; still registered but no longer resolves.
    Offline,
    /// Forgotten by the registry. Only seen on values handed back after removal.
    Removed,
}

impl TokenState {
    pub fn is_active(self) -> bool {
        self == TokenState::Active
    }
}

// ============================================================================
// SessionLimit
// ============================================================================

/// Concurrent session cap for one (user, type) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionLimit {
    /// Any number of concurrent sessions.
    Unlimited,
    /// Sign-in is refused.
    Refused,
    /// At most this many active sessions; older ones are evicted.
    AtMost(usize),
}

impl SessionLimit {
    /// Interprets a raw limit: `0` refuses, positive caps, negative is unlimited.
    pub fn from_raw(max_sessions: i64) -> Self {
        match max_sessions {
            0 => SessionLimit::Refused,
            n if n > 0 => SessionLimit::AtMost(usize::try_from(n).unwrap_or(usize::MAX)),
            _ => SessionLimit::Unlimited,
        }
    }
}

// ============================================================================
// SessionToken
// ============================================================================

/// One login session of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    token: String,
    #[serde(rename = "type")]
    token_type: String,
    user_id: String,
    max_sessions: i64,
    created_at: DateTime<Utc>,
    last_request_at: DateTime<Utc>,
    request_count: u64,
    max_inactive: Option<Duration>,
    state: TokenState,
}

impl SessionToken {
    pub(crate) fn new(request: &SignInRequest, now: DateTime<Utc>) -> Self {
        Self {
            token: request.token.clone(),
            token_type: request.token_type.clone(),
            user_id: request.user_id.clone(),
            max_sessions: request.max_sessions,
            created_at: now,
            last_request_at: now,
            request_count: 0,
            max_inactive: request.max_inactive,
            state: TokenState::Active,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn max_sessions(&self) -> i64 {
        self.max_sessions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_request_at(&self) -> DateTime<Utc> {
        self.last_request_at
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn max_inactive(&self) -> Option<Duration> {
        self.max_inactive
    }

    pub fn state(&self) -> TokenState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Returns whether the token sat idle longer than `max_inactive` at `now`.
    ///
    /// Tokens without `max_inactive` never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let Some(max_inactive) = self.max_inactive else {
            return false;
        };
        now.signed_duration_since(self.last_request_at)
            .to_std()
            .is_ok_and(|idle| idle > max_inactive)
    }

    /// Re-activates the token for a repeated sign-in.
    pub(crate) fn renew(&mut self, request: &SignInRequest, now: DateTime<Utc>) {
        self.max_sessions = request.max_sessions;
        self.max_inactive = request.max_inactive;
        self.last_request_at = now;
        self.state = TokenState::Active;
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.request_count = self.request_count.saturating_add(1);
        self.last_request_at = now;
    }

    pub(crate) fn set_state(&mut self, state: TokenState) {
        self.state = state;
    }
}

// ============================================================================
// SignInRequest
// ============================================================================

/// Parameters of a sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    pub token_type: String,
    pub token: String,
    pub user_id: String,
    /// Raw cap, see [`SessionLimit::from_raw`]. Defaults to `-1`.
    pub max_sessions: i64,
    /// Idle time after which [`purge_expired`](crate::TokenRegistry::purge_expired)
    /// removes the token.
    pub max_inactive: Option<Duration>,
}

impl SignInRequest {
    pub fn new(
        token_type: impl Into<String>,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            token_type: token_type.into(),
            token: token.into(),
            user_id: user_id.into(),
            max_sessions: -1,
            max_inactive: None,
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: i64) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn with_max_inactive(mut self, max_inactive: Duration) -> Self {
        self.max_inactive = Some(max_inactive);
        self
    }

    pub fn limit(&self) -> SessionLimit {
        SessionLimit::from_raw(self.max_sessions)
    }
}
