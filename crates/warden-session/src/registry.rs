//! In-memory token registry with per-user session caps.
//!
//! Every mutation runs under one write lock so concurrent sign-ins for the
//! same user never leave more active tokens than the cap allows. Tokens of
//! each (user, type) pair are kept oldest first; eviction pops from the front.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::listener::{RemovalReason, TokenEvent, TokenListener};
use crate::token::{SessionLimit, SessionToken, SignInRequest, TokenState};

// ============================================================================
// SessionPolicy
// ============================================================================

/// Limits applied by [`TokenRegistry::sign_in_default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Raw cap for types without an override. `-1` is unlimited.
    pub default_max_sessions: i64,
    pub default_max_inactive: Option<Duration>,
    pub token_types: HashMap<String, TokenTypePolicy>,
}

/// Per token type overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTypePolicy {
    pub max_sessions: Option<i64>,
    pub max_inactive: Option<Duration>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            default_max_sessions: -1,
            default_max_inactive: None,
            token_types: HashMap::new(),
        }
    }
}

impl SessionPolicy {
    pub fn with_token_type(mut self, token_type: impl Into<String>, policy: TokenTypePolicy) -> Self {
        self.token_types.insert(token_type.into(), policy);
        self
    }

    pub fn max_sessions_for(&self, token_type: &str) -> i64 {
        self.token_types
            .get(token_type)
            .and_then(|p| p.max_sessions)
            .unwrap_or(self.default_max_sessions)
    }

    pub fn max_inactive_for(&self, token_type: &str) -> Option<Duration> {
        self.token_types
            .get(token_type)
            .and_then(|p| p.max_inactive)
            .or(self.default_max_inactive)
    }
}

// ============================================================================
// Registry state
// ============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    tokens: HashMap<String, SessionToken>,
    /// user id → token type → token values, oldest first.
    by_user: HashMap<String, BTreeMap<String, VecDeque<String>>>,
}

impl RegistryState {
    fn insert(&mut self, token: SessionToken) {
        self.by_user
            .entry(token.user_id().to_string())
            .or_default()
            .entry(token.token_type().to_string())
            .or_default()
            .push_back(token.token().to_string());
        self.tokens.insert(token.token().to_string(), token);
    }

    /// Removes a token and its index entry. The returned value is marked removed.
    fn remove(&mut self, token: &str) -> Option<SessionToken> {
        let mut removed = self.tokens.remove(token)?;

        if let Some(types) = self.by_user.get_mut(removed.user_id()) {
            if let Some(queue) = types.get_mut(removed.token_type()) {
                queue.retain(|t| t != token);
                if queue.is_empty() {
                    types.remove(removed.token_type());
                }
            }
            if types.is_empty() {
                self.by_user.remove(removed.user_id());
            }
        }

        removed.set_state(TokenState::Removed);
        Some(removed)
    }

    /// Tokens of one (user, type) pair in eviction order: offline tokens
    /// oldest first, then active tokens oldest first.
    fn eviction_order(&self, user_id: &str, token_type: &str) -> Vec<String> {
        let Some(queue) = self.by_user.get(user_id).and_then(|types| types.get(token_type)) else {
            return Vec::new();
        };
        let (active, offline): (Vec<String>, Vec<String>) = queue
            .iter()
            .cloned()
            .partition(|t| self.tokens.get(t).is_some_and(SessionToken::is_active));
        offline.into_iter().chain(active).collect()
    }

    fn tokens_of(&self, user_id: &str) -> Vec<String> {
        self.by_user
            .get(user_id)
            .map(|types| types.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    fn remove_all(&mut self, tokens: Vec<String>, reason: RemovalReason) -> Vec<TokenEvent> {
        tokens
            .iter()
            .filter_map(|t| self.remove(t))
            .map(|removed| TokenEvent::Removed(removed, reason))
            .collect()
    }
}

// ============================================================================
// TokenRegistry
// ============================================================================

/// Thread-safe registry of signed-in session tokens.
///
/// A token value identifies at most one registration. Each (user, type) pair
/// may hold any number of tokens, subject to the cap given at sign-in.
#[derive(Default)]
pub struct TokenRegistry {
    state: RwLock<RegistryState>,
    listeners: RwLock<Vec<Arc<dyn TokenListener>>>,
    policy: SessionPolicy,
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("TokenRegistry")
            .field("tokens", &state.tokens.len())
            .field("users", &state.by_user.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry whose [`sign_in_default`](Self::sign_in_default)
    /// applies `policy`.
    pub fn with_policy(policy: SessionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Registers a lifecycle listener.
    pub fn add_listener(&self, listener: Arc<dyn TokenListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, events: &[TokenEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for event in events {
            for listener in &listeners {
                event.deliver(listener.as_ref());
            }
        }
    }

    // ------------------------------------------------------------------------
    // Sign-in
    // ------------------------------------------------------------------------

    /// Signs in `token` for `user_id` with a raw session cap.
    ///
    /// `max_sessions` of `0` refuses and a negative value (conventionally
    /// `-1`) is unlimited. A positive value bounds the registered tokens of
    /// the same type: offline tokens are evicted first, then the oldest
    /// active ones.
    pub fn sign_in(
        &self,
        token_type: &str,
        token: &str,
        user_id: &str,
        max_sessions: i64,
    ) -> SessionResult<SessionToken> {
        self.sign_in_with(SignInRequest::new(token_type, token, user_id).with_max_sessions(max_sessions))
    }

    /// Signs in using the registry's [`SessionPolicy`] for `token_type`.
    pub fn sign_in_default(
        &self,
        token_type: &str,
        token: &str,
        user_id: &str,
    ) -> SessionResult<SessionToken> {
        let mut request = SignInRequest::new(token_type, token, user_id)
            .with_max_sessions(self.policy.max_sessions_for(token_type));
        request.max_inactive = self.policy.max_inactive_for(token_type);
        self.sign_in_with(request)
    }

    /// Signs in with full control over the request.
    ///
    /// Signing in a token value already held by the same user and type
    /// refreshes it and makes it the newest. A value held by someone else is
    /// unbound from its previous owner first.
    pub fn sign_in_with(&self, request: SignInRequest) -> SessionResult<SessionToken> {
        let limit = request.limit();
        if limit == SessionLimit::Refused {
            warn!(
                user_id = %request.user_id,
                token_type = %request.token_type,
                "sign-in refused: session limit is zero"
            );
            return Err(SessionError::SessionLimitExceeded {
                user_id: request.user_id,
                token_type: request.token_type,
            });
        }

        let now = Utc::now();
        let mut events = Vec::new();

        let token = {
            let mut state = self.write();

            let previous = match state.remove(&request.token) {
                Some(prev)
                    if prev.user_id() == request.user_id
                        && prev.token_type() == request.token_type =>
                {
                    Some(prev)
                }
                Some(prev) => {
                    debug!(
                        token_type = %prev.token_type(),
                        previous_user = %prev.user_id(),
                        user_id = %request.user_id,
                        "token rebound to another user"
                    );
                    events.push(TokenEvent::Removed(prev, RemovalReason::Replaced));
                    None
                }
                None => None,
            };

            // Offline tokens go first, so active ones are evicted only while
            // the active count alone would exceed the cap.
            if let SessionLimit::AtMost(cap) = limit {
                let candidates = state.eviction_order(&request.user_id, &request.token_type);
                let excess = (candidates.len() + 1).saturating_sub(cap);
                for evicted in candidates.into_iter().take(excess) {
                    if let Some(removed) = state.remove(&evicted) {
                        info!(
                            user_id = %removed.user_id(),
                            token_type = %removed.token_type(),
                            max_sessions = cap,
                            "evicted oldest session"
                        );
                        events.push(TokenEvent::Removed(removed, RemovalReason::Evicted));
                    }
                }
            }

            let token = match previous {
                Some(mut existing) => {
                    existing.renew(&request, now);
                    events.push(TokenEvent::Refreshed(existing.clone()));
                    existing
                }
                None => {
                    let created = SessionToken::new(&request, now);
                    events.push(TokenEvent::Created(created.clone()));
                    created
                }
            };
            state.insert(token.clone());
            token
        };

        info!(
            user_id = %token.user_id(),
            token_type = %token.token_type(),
            max_sessions = token.max_sessions(),
            "signed in"
        );
        self.notify(&events);
        Ok(token)
    }

    // ------------------------------------------------------------------------
    // Sign-out and state changes
    // ------------------------------------------------------------------------

    /// Removes `token`. Returns whether it was registered.
    pub fn sign_out(&self, token: &str) -> bool {
        let removed = self.write().remove(token);
        match removed {
            Some(removed) => {
                info!(user_id = %removed.user_id(), token_type = %removed.token_type(), "signed out");
                self.notify(&[TokenEvent::Removed(removed, RemovalReason::SignOut)]);
                true
            }
            None => {
                debug!("sign-out of unknown token");
                false
            }
        }
    }

    /// Removes every token of `user_id`.
    pub fn sign_out_by_user_id(&self, user_id: &str) -> Vec<SessionToken> {
        let events = {
            let mut state = self.write();
            let tokens = state.tokens_of(user_id);
            state.remove_all(tokens, RemovalReason::SignOut)
        };
        if !events.is_empty() {
            info!(user_id, count = events.len(), "signed out user");
        }
        self.notify(&events);
        removed_tokens(events)
    }

    /// Removes the tokens of `user_id` that were signed in with `token_type`.
    pub fn sign_out_by_type(&self, user_id: &str, token_type: &str) -> Vec<SessionToken> {
        let events = {
            let mut state = self.write();
            let tokens = state
                .by_user
                .get(user_id)
                .and_then(|types| types.get(token_type))
                .map(|queue| queue.iter().cloned().collect())
                .unwrap_or_default();
            state.remove_all(tokens, RemovalReason::SignOut)
        };
        if !events.is_empty() {
            info!(user_id, token_type, count = events.len(), "signed out token type");
        }
        self.notify(&events);
        removed_tokens(events)
    }

    /// Marks `token` offline. It stays registered but no longer resolves.
    ///
    /// Returns whether the token is registered.
    pub fn offline(&self, token: &str) -> bool {
        let event = {
            let mut state = self.write();
            let Some(entry) = state.tokens.get_mut(token) else {
                return false;
            };
            let previous = entry.state();
            if previous == TokenState::Offline {
                None
            } else {
                entry.set_state(TokenState::Offline);
                Some(TokenEvent::StateChanged(entry.clone(), previous))
            }
        };
        if let Some(event) = event {
            debug!("token taken offline");
            self.notify(&[event]);
        }
        true
    }

    /// Marks every active token of `user_id` offline. Returns how many changed.
    pub fn offline_by_user_id(&self, user_id: &str) -> usize {
        let events: Vec<TokenEvent> = {
            let mut state = self.write();
            let tokens = state.tokens_of(user_id);
            tokens
                .iter()
                .filter_map(|t| {
                    let entry = state.tokens.get_mut(t)?;
                    entry.is_active().then(|| {
                        entry.set_state(TokenState::Offline);
                        TokenEvent::StateChanged(entry.clone(), TokenState::Active)
                    })
                })
                .collect()
        };
        if !events.is_empty() {
            info!(user_id, count = events.len(), "user taken offline");
        }
        self.notify(&events);
        events.len()
    }

    /// Records a request made with `token`. Returns whether it is registered.
    pub fn touch(&self, token: &str) -> bool {
        let now = Utc::now();
        let mut state = self.write();
        match state.tokens.get_mut(token) {
            Some(entry) => {
                entry.touch(now);
                true
            }
            None => false,
        }
    }

    /// Removes tokens idle longer than their `max_inactive` at `now`.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Vec<SessionToken> {
        let events = {
            let mut state = self.write();
            let expired: Vec<String> = state
                .tokens
                .values()
                .filter(|t| t.is_expired(now))
                .map(|t| t.token().to_string())
                .collect();
            state.remove_all(expired, RemovalReason::Expired)
        };
        if !events.is_empty() {
            info!(count = events.len(), "purged expired sessions");
        }
        self.notify(&events);
        removed_tokens(events)
    }

    /// Removes every token. Returns how many were registered.
    pub fn clear(&self) -> usize {
        let events = {
            let mut state = self.write();
            let tokens: Vec<String> = state.tokens.keys().cloned().collect();
            state.remove_all(tokens, RemovalReason::Cleared)
        };
        self.notify(&events);
        events.len()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// All tokens of `user_id`, grouped by type and oldest first within a type.
    pub fn get_by_user_id(&self, user_id: &str) -> Vec<SessionToken> {
        let state = self.read();
        state
            .tokens_of(user_id)
            .iter()
            .filter_map(|t| state.tokens.get(t).cloned())
            .collect()
    }

    pub fn get_token(&self, token: &str) -> Option<SessionToken> {
        self.read().tokens.get(token).cloned()
    }

    /// Returns whether `token` is registered and not removed.
    pub fn check_token(&self, token: &str) -> bool {
        self.read()
            .tokens
            .get(token)
            .is_some_and(|t| t.state() != TokenState::Removed)
    }

    /// Returns whether `token` is registered and active.
    pub fn is_active(&self, token: &str) -> bool {
        self.read().tokens.get(token).is_some_and(SessionToken::is_active)
    }

    /// Returns whether `user_id` holds at least one active token.
    pub fn user_is_logged_in(&self, user_id: &str) -> bool {
        let state = self.read();
        state
            .tokens_of(user_id)
            .iter()
            .any(|t| state.tokens.get(t).is_some_and(SessionToken::is_active))
    }

    pub fn total_tokens(&self) -> usize {
        self.read().tokens.len()
    }

    pub fn total_users(&self) -> usize {
        self.read().by_user.len()
    }

    pub fn all_tokens(&self) -> Vec<SessionToken> {
        self.read().tokens.values().cloned().collect()
    }
}

fn removed_tokens(events: Vec<TokenEvent>) -> Vec<SessionToken> {
    events
        .into_iter()
        .filter_map(|event| match event {
            TokenEvent::Removed(token, _) => Some(token),
            _ => None,
        })
        .collect()
}
