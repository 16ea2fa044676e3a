//! Collaborator interface for OpenID discovery.
//!
//! This is the only I/O-bound step inside a build. It is factored behind a
//! trait precisely so tests can inject a fixture instead of reaching out
//! over the network.

use async_trait::async_trait;

/// Resolves an auth provider's JWKS URI via the provider's OpenID Connect
/// discovery document (`{issuer}/.well-known/openid-configuration`).
///
/// Implementations of the actual HTTP fetch live outside this workspace;
/// this crate only defines the contract and a couple of in-memory
/// fixtures for tests.
#[async_trait]
pub trait OidcResolver: Send + Sync {
    /// Resolve `issuer`'s `jwks_uri`. Subject to a caller-configured timeout;
    /// on failure the build aborts with `BuildError::OidcDiscoveryFailed`.
    async fn resolve_jwks_uri(&self, issuer: &str) -> Result<String, String>;
}

/// A fixture resolver that answers from a fixed table, for tests and for
/// embedding binaries that pre-fetch discovery documents out of band.
#[derive(Debug, Clone, Default)]
pub struct FixtureOidcResolver {
    answers: std::collections::HashMap<String, String>,
}

impl FixtureOidcResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, issuer: impl Into<String>, jwks_uri: impl Into<String>) -> Self {
        self.answers.insert(issuer.into(), jwks_uri.into());
        self
    }
}

#[async_trait]
impl OidcResolver for FixtureOidcResolver {
    async fn resolve_jwks_uri(&self, issuer: &str) -> Result<String, String> {
        self.answers
            .get(issuer)
            .cloned()
            .ok_or_else(|| format!("no discovery fixture for issuer '{issuer}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_resolves_known_issuer() {
        let resolver = FixtureOidcResolver::new().with_answer("https://issuer.example", "https://issuer.example/jwks.json");
        let uri = resolver.resolve_jwks_uri("https://issuer.example").await.unwrap();
        assert_eq!(uri, "https://issuer.example/jwks.json");
    }

    #[tokio::test]
    async fn fixture_rejects_unknown_issuer() {
        let resolver = FixtureOidcResolver::new();
        assert!(resolver.resolve_jwks_uri("https://unknown.example").await.is_err());
    }
}
