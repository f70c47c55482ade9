//! Token lifecycle notifications.

use crate::token::{SessionToken, TokenState};

/// Why a token left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    /// Explicit sign-out.
    SignOut,
    /// Pushed out by a newer sign-in over the session cap.
    Evicted,
    /// Idle longer than its `max_inactive`.
    Expired,
    /// The same token value was signed in for a different user or type.
    Replaced,
    /// Registry cleared.
    Cleared,
}

/// Observer of token lifecycle changes.
///
/// Callbacks run after the registry lock is released, so a listener may
/// call back into the registry.
pub trait TokenListener: Send + Sync {
    fn on_created(&self, _token: &SessionToken) {}

    /// Called when an existing token is signed in again.
    fn on_refreshed(&self, _token: &SessionToken) {}

    fn on_state_changed(&self, _token: &SessionToken, _previous: TokenState) {}

    fn on_removed(&self, _token: &SessionToken, _reason: RemovalReason) {}
}

/// A change recorded under the lock, delivered after it is released.
#[derive(Debug, Clone)]
pub(crate) enum TokenEvent {
    Created(SessionToken),
    Refreshed(SessionToken),
    StateChanged(SessionToken, TokenState),
    Removed(SessionToken, RemovalReason),
}

impl TokenEvent {
    pub(crate) fn deliver(&self, listener: &dyn TokenListener) {
        match self {
            TokenEvent::Created(token) => listener.on_created(token),
            TokenEvent::Refreshed(token) => listener.on_refreshed(token),
            TokenEvent::StateChanged(token, previous) => listener.on_state_changed(token, *previous),
            TokenEvent::Removed(token, reason) => listener.on_removed(token, *reason),
        }
    }
}
