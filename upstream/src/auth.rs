use async_trait::async_trait;

/// Upstream bearer-token source. The config's `upstream.auth` may be a
/// plain string or an async-resolvable refresher (spec §6); both are
/// expressed as implementations of this trait.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn token(&self) -> String;
}

pub struct StaticToken(pub String);

#[async_trait]
impl AuthProvider for StaticToken {
    async fn token(&self) -> String {
        self.0.clone()
    }
}
