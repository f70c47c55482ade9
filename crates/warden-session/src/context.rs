//! Ambient request context.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::token::SessionToken;

/// Whatever the host framework carries per request.
///
/// The resolver only needs the caller's session token and, optionally, a
/// deadline after which resolution gives up.
pub trait AmbientContext: Send + Sync {
    fn session_token(&self) -> Option<&SessionToken>;

    fn deadline(&self) -> Option<Instant> {
        None
    }
}

/// Default [`AmbientContext`]: a token, a deadline and string attributes.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    token: Option<SessionToken>,
    deadline: Option<Instant>,
    attributes: HashMap<String, String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: SessionToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl AmbientContext for ExecutionContext {
    fn session_token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
