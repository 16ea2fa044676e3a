//! Error taxonomy for the configuration translation core.
//!
//! [`BuildError`] covers every failure mode the builder pipeline (see
//! `gwxlate-core::builder`) can detect while turning a `ServiceDescription`
//! into a [`ServiceModel`](crate::model::ServiceModel). All variants are
//! terminal for the build that raised them — no partial model is ever
//! published.
//!
//! Variants are grouped into three kinds via [`BuildError::kind`]:
//! `ConfigInvalid` (semantic violations detectable without any I/O),
//! `TemplateInvalid` (URI-template parse/size errors), and
//! `DependencyFailure` (the OpenID discovery collaborator failed). Only
//! `DependencyFailure` is plausibly transient / worth retrying.

use thiserror::Error;

/// Coarse-grained error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigInvalid,
    TemplateInvalid,
    DependencyFailure,
}

/// Terminal error produced by the service-model builder or the route-table
/// generator. Every variant carries enough context (selector, provider id,
/// template string) to log and report without the caller needing to
/// reconstruct it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    // ── Selector closure ─────────────────────────────────────────────────────
    #[error("selector '{0}' is not a valid apiName.methodName pair")]
    MalformedSelector(String),

    #[error("auth rule references unknown selector '{0}'")]
    UnknownAuthSelector(String),

    // ── Snake/JSON field rename ──────────────────────────────────────────────
    #[error(
        "request type '{request_type}' maps snake field '{snake_name}' to both \
         '{first_json}' and '{second_json}'"
    )]
    SnakeJsonConflict {
        request_type: String,
        snake_name: String,
        first_json: String,
        second_json: String,
    },

    // ── CORS ──────────────────────────────────────────────────────────────────
    #[error(
        "CORS fields are set but Options.CorsPreset is empty; an explicit \
         cors_preset is required"
    )]
    MissingCorsPreset,

    #[error("unknown cors_preset '{0}'; expected \"\", \"basic\", or \"cors_with_regex\"")]
    InvalidCorsPreset(String),

    #[error("Options.CorsAllowOriginRegex '{0}' is invalid: {1}")]
    InvalidCorsAllowOriginRegex(String, String),

    // ── Auth providers / JWT locations ───────────────────────────────────────
    #[error("auth provider '{0}' has an empty JwksUri and OIDC discovery is disabled")]
    EmptyJwksUriDiscoveryDisabled(String),

    #[error("auth provider '{0}' declares a JWT query location with a non-empty valuePrefix")]
    JwtQueryLocationHasValuePrefix(String),

    // ── Backend addressing ───────────────────────────────────────────────────
    #[error("Options.BackendAddress '{0}' is not a valid backend URI: {1}")]
    InvalidBackendAddress(String, String),

    #[error("backend rule for selector '{0}' has an invalid address '{1}': {2}")]
    InvalidRemoteBackendAddress(String, String, String),

    // ── URI template engine ──────────────────────────────────────────────────
    #[error("selector '{selector}' has a malformed URI template '{template}': {reason}")]
    MalformedTemplate {
        selector: String,
        template: String,
        reason: String,
    },

    #[error(
        "selector '{selector}' template '{template}' compiles to a regex program that \
         exceeds the data-plane size bound"
    )]
    RegexTooLarge { selector: String, template: String },

    // ── OpenID discovery collaborator ────────────────────────────────────────
    #[error("OpenID discovery failed for auth provider '{provider_id}': {reason}")]
    OidcDiscoveryFailed { provider_id: String, reason: String },
}

impl BuildError {
    /// The coarse-grained kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::OidcDiscoveryFailed { .. } => ErrorKind::DependencyFailure,
            BuildError::MalformedTemplate { .. } | BuildError::RegexTooLarge { .. } => {
                ErrorKind::TemplateInvalid
            }
            _ => ErrorKind::ConfigInvalid,
        }
    }
}

/// Convenience alias used throughout the builder and generator.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_failure_is_the_only_transient_kind() {
        let e = BuildError::OidcDiscoveryFailed {
            provider_id: "auth0_jwk".into(),
            reason: "timeout".into(),
        };
        assert_eq!(e.kind(), ErrorKind::DependencyFailure);
    }

    #[test]
    fn template_errors_are_template_invalid() {
        let e = BuildError::MalformedTemplate {
            selector: "svc.Get".into(),
            template: "/{a}{a}".into(),
            reason: "duplicate variable name".into(),
        };
        assert_eq!(e.kind(), ErrorKind::TemplateInvalid);
    }

    #[test]
    fn everything_else_is_config_invalid() {
        let e = BuildError::MissingCorsPreset;
        assert_eq!(e.kind(), ErrorKind::ConfigInvalid);
    }
}
