
/// Source of the bearer token attached to polling requests.
///
/// Read on every request so a token refreshed elsewhere in the application
/// is picked up on the next tick.
pub trait TokenProvider: Send + Sync {
    /// Current token, or `None` when the user is not signed in
    fn token(&self) -> Option<String>;
}

/// Fixed token, or none at all
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Token read from an environment variable at request time
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// `Authorization` header value for a provider's current token.
///
/// Blank tokens are treated as absent.
pub fn bearer_header(provider: &dyn TokenProvider) -> Option<String> {
    let token = provider.token()?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(format!("Bearer {}", token))
}
