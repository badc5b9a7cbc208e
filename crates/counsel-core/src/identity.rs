//! Credential and actor identity.

/// Supplies the opaque bearer credential and the acting user.
pub trait IdentityProvider: Send + Sync {
    /// Bearer token for the `Authorization` header.
    fn bearer_token(&self) -> Option<String>;

    /// Id of the authenticated user, required to create sessions.
    fn user_id(&self) -> Option<String>;
}

/// Identity fixed at construction time.
#[derive(Clone, Default)]
pub struct StaticIdentity {
    token: Option<String>,
    user_id: Option<String>,
}

impl StaticIdentity {
    pub fn new(token: Option<String>, user_id: Option<String>) -> Self {
        Self { token, user_id }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentity {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

impl std::fmt::Debug for StaticIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token itself.
        f.debug_struct("StaticIdentity")
            .field("has_token", &self.token.is_some())
            .field("user_id", &self.user_id)
            .finish()
    }
}
