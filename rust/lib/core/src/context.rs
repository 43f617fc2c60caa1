//! Explicit request context.
//!
//! Handlers never read ambient "current user" state. The API layer
//! resolves the caller once per request and passes this value down
//! through every service call.

/// The caller of a request.
///
/// `identity` is the resolved account id, or `None` for an anonymous
/// connection (no token, or a token that resolved to nothing).
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub identity: Option<String>,
}

impl RequestContext {
    /// Context for an authenticated caller.
    pub fn authenticated(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
        }
    }

    /// Context for an anonymous connection.
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    /// The identity, or `None` when anonymous.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}
