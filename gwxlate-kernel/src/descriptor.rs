//! Input schema: the declarative `ServiceDescription` consumed by the
//! builder. Deserializable with `serde` so an embedding process can load
//! it from whatever wire format the management-service collaborator hands
//! back (JSON here; YAML/protobuf-JSON conversion is the caller's
//! concern).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceDescription {
    /// The service's fully qualified name, e.g.
    /// `bookstore.endpoints.my-project.cloud.goog` — distinct from an
    /// individual API's `Api.name`.
    pub name: String,
    pub apis: Vec<Api>,
    pub types: Vec<TypeDescriptor>,
    pub http: Http,
    pub backend: Backend,
    pub usage: Usage,
    pub quota: Quota,
    pub authentication: Authentication,
    pub system_parameters: SystemParameters,
    pub endpoints: Vec<Endpoint>,
}

// ── apis ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Api {
    pub name: String,
    pub version: String,
    pub methods: Vec<ApiMethod>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApiMethod {
    pub name: String,
    /// e.g. `type.googleapis.com/my.pkg.CreateShelfRequest`.
    pub request_type_url: String,
    pub request_streaming: bool,
    pub response_streaming: bool,
}

impl ApiMethod {
    pub fn is_streaming(&self) -> bool {
        self.request_streaming || self.response_streaming
    }
}

// ── types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TypeDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FieldDescriptor {
    pub name: String,
    pub json_name: String,
}

// ── http ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Http {
    pub rules: Vec<HttpRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpRule {
    pub selector: String,
    #[serde(flatten)]
    pub pattern: HttpPattern,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub additional_bindings: Vec<HttpRule>,
}

/// The `oneof { get, put, post, delete, patch, custom }` pattern field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpPattern {
    Get(String),
    Put(String),
    Post(String),
    Delete(String),
    Patch(String),
    Custom { kind: String, path: String },
}

// ── backend ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Backend {
    pub rules: Vec<BackendRule>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BackendRule {
    pub selector: String,
    /// Empty means "targets the local cluster".
    pub address: String,
    /// Seconds, possibly fractional; `None` means unset.
    pub deadline: Option<f64>,
    pub path_translation: Option<PathTranslationKind>,
    pub jwt_audience: Option<String>,
    pub disable_auth: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum PathTranslationKind {
    #[serde(rename = "APPEND_PATH_TO_ADDRESS")]
    AppendPathToAddress,
    #[serde(rename = "CONSTANT_ADDRESS")]
    ConstantAddress,
}

// ── usage ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Usage {
    pub rules: Vec<UsageRule>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UsageRule {
    pub selector: String,
    pub allow_unregistered_calls: bool,
    pub skip_service_control: bool,
}

// ── quota ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Quota {
    pub metric_rules: Vec<MetricRule>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MetricRule {
    pub selector: String,
    pub metric_costs: Vec<MetricCostEntry>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MetricCostEntry {
    pub name: String,
    pub cost: i64,
}

// ── authentication ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Authentication {
    pub providers: Vec<AuthProviderDescriptor>,
    pub rules: Vec<AuthRule>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthProviderDescriptor {
    pub id: String,
    pub issuer: String,
    pub audiences: Vec<String>,
    /// Empty triggers OpenID discovery.
    pub jwks_uri: String,
    pub jwt_locations: Vec<JwtLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JwtLocation {
    Header {
        name: String,
        #[serde(default)]
        value_prefix: String,
    },
    Query {
        name: String,
        #[serde(default)]
        value_prefix: String,
    },
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthRule {
    pub selector: String,
    pub requirements: Vec<AuthRequirement>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthRequirement {
    pub provider_id: String,
    pub audiences: Vec<String>,
}

// ── system_parameters ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SystemParameters {
    pub rules: Vec<SystemParameterRule>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SystemParameterRule {
    pub selector: String,
    pub parameters: Vec<SystemParameter>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SystemParameter {
    pub name: String,
    pub http_header: Option<String>,
    pub url_query_parameter: Option<String>,
}

// ── endpoints ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Endpoint {
    pub name: String,
    pub allow_cors: bool,
}
