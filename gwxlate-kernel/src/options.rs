//! Builder options. Consumed by `gwxlate_core::builder::build`; never read
//! from the environment by the core itself — `Options::from_env` is an
//! ambient convenience for an embedding binary.

use serde::Deserialize;

use crate::error::{BuildError, BuildResult};

/// `Options.CorsPreset`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorsPreset {
    #[default]
    None,
    Basic,
    CorsWithRegex,
}

impl CorsPreset {
    pub fn parse(s: &str) -> BuildResult<Self> {
        match s {
            "" => Ok(CorsPreset::None),
            "basic" => Ok(CorsPreset::Basic),
            "cors_with_regex" => Ok(CorsPreset::CorsWithRegex),
            other => Err(BuildError::InvalidCorsPreset(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    pub backend_address: String,

    pub cors_preset: String,
    pub cors_allow_origin: String,
    pub cors_allow_origin_regex: String,
    pub cors_allow_methods: String,
    pub cors_allow_headers: String,
    pub cors_expose_headers: String,
    pub cors_allow_credentials: bool,

    pub healthz: String,

    pub backend_retry_ons: String,
    pub backend_retry_num: u32,
    /// Default per-route deadline, milliseconds, used when a backend rule
    /// leaves its deadline unset.
    pub default_deadline_ms: u64,

    pub http_request_timeout_ms: u64,

    pub service_account_key: String,
    pub token_agent_port: u16,
    pub metadata_url: String,

    pub disable_oidc_discovery: bool,
    pub non_gcp: bool,
    pub enable_hsts: bool,

    pub transcoding_ignore_query_parameters: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            backend_address: String::new(),
            cors_preset: String::new(),
            cors_allow_origin: String::new(),
            cors_allow_origin_regex: String::new(),
            cors_allow_methods: "GET,POST,PUT,PATCH,DELETE,OPTIONS".to_string(),
            cors_allow_headers: String::new(),
            cors_expose_headers: String::new(),
            cors_allow_credentials: false,
            healthz: String::new(),
            backend_retry_ons: "reset,connect-failure,refused-stream".to_string(),
            backend_retry_num: 1,
            default_deadline_ms: 15_000,
            http_request_timeout_ms: 5_000,
            service_account_key: String::new(),
            token_agent_port: 8791,
            metadata_url: "http://169.254.169.254".to_string(),
            disable_oidc_discovery: false,
            non_gcp: false,
            enable_hsts: false,
            transcoding_ignore_query_parameters: String::new(),
        }
    }
}

impl Options {
    pub fn new(backend_address: impl Into<String>) -> Self {
        Self {
            backend_address: backend_address.into(),
            ..Self::default()
        }
    }

    pub fn with_cors(
        mut self,
        preset: impl Into<String>,
        allow_origin: impl Into<String>,
    ) -> Self {
        self.cors_preset = preset.into();
        self.cors_allow_origin = allow_origin.into();
        self
    }

    pub fn with_healthz(mut self, path: impl Into<String>) -> Self {
        self.healthz = path.into();
        self
    }

    pub fn with_hsts(mut self, enable: bool) -> Self {
        self.enable_hsts = enable;
        self
    }

    pub fn with_non_gcp(mut self, non_gcp: bool) -> Self {
        self.non_gcp = non_gcp;
        self
    }

    /// Cheap structural checks that don't require the `ServiceDescription`,
    /// so a caller can reject bad options before it even has one. Deeper,
    /// data-dependent checks are builder-phase errors since they need the
    /// service description to evaluate.
    pub fn validate(&self) -> BuildResult<()> {
        if self.backend_address.trim().is_empty() {
            return Err(BuildError::InvalidBackendAddress(
                self.backend_address.clone(),
                "must not be empty".to_string(),
            ));
        }
        let preset = CorsPreset::parse(&self.cors_preset)?;
        let any_cors_field_set = !self.cors_allow_origin.is_empty()
            || !self.cors_allow_origin_regex.is_empty()
            || !self.cors_allow_methods.is_empty()
            || !self.cors_allow_headers.is_empty()
            || !self.cors_expose_headers.is_empty()
            || self.cors_allow_credentials;
        if preset == CorsPreset::None && any_cors_field_set {
            return Err(BuildError::MissingCorsPreset);
        }
        Ok(())
    }

    /// Load options from environment variables, applying the same defaults
    /// as [`Options::default`] when a variable is unset. Never called by the
    /// core itself.
    pub fn from_env() -> Self {
        fn env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        }
        fn env_bool(key: &str) -> Option<bool> {
            env(key).and_then(|v| v.parse().ok())
        }
        fn env_num<T: std::str::FromStr>(key: &str) -> Option<T> {
            env(key).and_then(|v| v.parse().ok())
        }

        let defaults = Self::default();
        Self {
            backend_address: env("BACKEND_ADDRESS").unwrap_or(defaults.backend_address),
            cors_preset: env("CORS_PRESET").unwrap_or(defaults.cors_preset),
            cors_allow_origin: env("CORS_ALLOW_ORIGIN").unwrap_or(defaults.cors_allow_origin),
            cors_allow_origin_regex: env("CORS_ALLOW_ORIGIN_REGEX")
                .unwrap_or(defaults.cors_allow_origin_regex),
            cors_allow_methods: env("CORS_ALLOW_METHODS").unwrap_or(defaults.cors_allow_methods),
            cors_allow_headers: env("CORS_ALLOW_HEADERS").unwrap_or(defaults.cors_allow_headers),
            cors_expose_headers: env("CORS_EXPOSE_HEADERS")
                .unwrap_or(defaults.cors_expose_headers),
            cors_allow_credentials: env_bool("CORS_ALLOW_CREDENTIALS")
                .unwrap_or(defaults.cors_allow_credentials),
            healthz: env("HEALTHZ").unwrap_or(defaults.healthz),
            backend_retry_ons: env("BACKEND_RETRY_ONS").unwrap_or(defaults.backend_retry_ons),
            backend_retry_num: env_num("BACKEND_RETRY_NUM").unwrap_or(defaults.backend_retry_num),
            default_deadline_ms: env_num("DEFAULT_DEADLINE_MS")
                .unwrap_or(defaults.default_deadline_ms),
            http_request_timeout_ms: env_num("HTTP_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.http_request_timeout_ms),
            service_account_key: env("SERVICE_ACCOUNT_KEY").unwrap_or(defaults.service_account_key),
            token_agent_port: env_num("TOKEN_AGENT_PORT").unwrap_or(defaults.token_agent_port),
            metadata_url: env("METADATA_URL").unwrap_or(defaults.metadata_url),
            disable_oidc_discovery: env_bool("DISABLE_OIDC_DISCOVERY")
                .unwrap_or(defaults.disable_oidc_discovery),
            non_gcp: env_bool("NON_GCP").unwrap_or(defaults.non_gcp),
            enable_hsts: env_bool("ENABLE_HSTS").unwrap_or(defaults.enable_hsts),
            transcoding_ignore_query_parameters: env("TRANSCODING_IGNORE_QUERY_PARAMETERS")
                .unwrap_or(defaults.transcoding_ignore_query_parameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_address_is_empty_and_invalid() {
        assert!(Options::default().validate().is_err());
    }

    #[test]
    fn cors_fields_without_preset_is_invalid() {
        let opts = Options::new("http://127.0.0.1:8080").with_cors("", "example.com");
        assert!(matches!(opts.validate(), Err(BuildError::MissingCorsPreset)));
    }

    #[test]
    fn basic_preset_with_origin_is_valid() {
        let opts = Options::new("http://127.0.0.1:8080").with_cors("basic", "example.com");
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let opts = Options::new("http://127.0.0.1:8080").with_cors("bogus", "example.com");
        assert!(matches!(opts.validate(), Err(BuildError::InvalidCorsPreset(_))));
    }
}
