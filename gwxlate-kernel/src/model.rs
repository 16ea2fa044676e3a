//! The normalized service model and its constituent types.
//!
//! These are pure data types with no parsing or build logic — the
//! `UriTemplate` parser, the service-model builder, and the route-table
//! generator all live in `gwxlate-core` and produce/consume the types
//! defined here. This mirrors `mofa-kernel::gateway::types` holding
//! `GatewayRequest`/`RouteMatch` while `mofa-gateway` supplies the router
//! implementation that builds them.

use std::collections::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP verbs
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method carried by a [`Pattern`].
///
/// `Custom("*")` is the wildcard verb: it matches every method and is used
/// for rules declared with `custom { kind: "*" }` in the source HTTP rule,
/// as well as for routes that never had a verb-specific binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Options,
    Custom(String),
}

impl HttpVerb {
    /// True for the wildcard verb (`CUSTOM` binding with kind `"*"`).
    pub fn is_wildcard(&self) -> bool {
        matches!(self, HttpVerb::Custom(kind) if kind == "*")
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Put => "PUT",
            HttpVerb::Post => "POST",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Custom(k) => k.as_str(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// URI template
// ─────────────────────────────────────────────────────────────────────────────

/// One segment of a parsed [`UriTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal path component, e.g. `shelves`.
    Literal(String),
    /// `*` — matches exactly one non-slash segment.
    SingleWildcard,
    /// `**` — matches the remainder of the path, including slashes.
    DoubleWildcard,
    /// `{name}` or `{name=subpattern}`. `sub` is the parsed subpattern
    /// segments; a bare `{name}` parses to `sub == [SingleWildcard]`.
    Capture { name: String, sub: Vec<Segment> },
}

/// A parsed URI path template.
///
/// Built exclusively by `gwxlate_core::uri_template::parse`; this type only
/// holds the parsed result and exposes the derived forms the rest of the
/// pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    /// The original template string, preserved verbatim for diagnostics.
    origin: String,
    segments: Vec<Segment>,
    /// Cached regex (see `gwxlate_core::uri_template` for how it's built and
    /// size-bound-checked). Always `^...$` and anchors the whole path.
    regex: String,
    /// Ordered, positional variable names — position N here corresponds to
    /// capture group N in `regex`. Renaming a field only changes this
    /// list, never `regex` or `origin`.
    variables: Vec<String>,
}

impl UriTemplate {
    /// Construct a template from its already-parsed parts. Used only by the
    /// URI-template engine in `gwxlate-core`.
    pub fn from_parts(
        origin: String,
        segments: Vec<Segment>,
        regex: String,
        variables: Vec<String>,
    ) -> Self {
        Self {
            origin,
            segments,
            regex,
            variables,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn regex(&self) -> &str {
        &self.regex
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// True iff the template has no wildcards and every capture's subpattern
    /// is itself wildcard-free: the whole path is then a fixed literal
    /// string once capture subpatterns are substituted in.
    pub fn is_exact_match(&self) -> bool {
        fn segs_exact(segs: &[Segment]) -> bool {
            segs.iter().all(|s| match s {
                Segment::Literal(_) => true,
                Segment::SingleWildcard | Segment::DoubleWildcard => false,
                Segment::Capture { sub, .. } => segs_exact(sub),
            })
        }
        segs_exact(&self.segments)
    }

    /// The fixed path string, with or without a trailing slash, when
    /// [`is_exact_match`](Self::is_exact_match) holds. `None` otherwise.
    pub fn exact_match_string(&self, trailing_slash: bool) -> Option<String> {
        if !self.is_exact_match() {
            return None;
        }
        fn render(segs: &[Segment], out: &mut String) {
            for seg in segs {
                out.push('/');
                match seg {
                    Segment::Literal(l) => out.push_str(l),
                    Segment::Capture { sub, .. } => render(sub, out),
                    Segment::SingleWildcard | Segment::DoubleWildcard => unreachable!(),
                }
            }
        }
        let mut out = String::new();
        render(&self.segments, &mut out);
        if out.is_empty() {
            out.push('/');
        }
        if trailing_slash && !out.ends_with('/') {
            out.push('/');
        }
        Some(out)
    }

    /// Rename captured variables in place: each entry in `renames` maps an
    /// existing capture name to its replacement. Names not present in the
    /// template are ignored. Does not touch `regex` or `origin` — capture
    /// names are carried positionally alongside the regex, not embedded in
    /// it.
    pub fn replace_variable_field(&mut self, renames: &HashMap<String, String>) {
        fn rename_segs(segs: &mut [Segment], renames: &HashMap<String, String>) {
            for seg in segs {
                if let Segment::Capture { name, sub } = seg {
                    if let Some(new_name) = renames.get(name.as_str()) {
                        *name = new_name.clone();
                    }
                    rename_segs(sub, renames);
                }
            }
        }
        rename_segs(&mut self.segments, renames);
        for v in &mut self.variables {
            if let Some(new_name) = renames.get(v.as_str()) {
                *v = new_name.clone();
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern
// ─────────────────────────────────────────────────────────────────────────────

/// An (HTTP method, URI template) pair — one HTTP binding of a [`Method`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub http_method: HttpVerb,
    pub template: UriTemplate,
    /// True for the synthetic POST pattern added for gRPC transcoding: a
    /// gRPC method path has no meaningful trailing-slash variant, so the
    /// route-table generator always routes it through a regex matcher
    /// rather than the exact-match pair it would otherwise emit for a
    /// wildcard-free template.
    pub force_regex: bool,
}

impl Pattern {
    pub fn new(http_method: HttpVerb, template: UriTemplate) -> Self {
        Self {
            http_method,
            template,
            force_regex: false,
        }
    }

    pub fn grpc_synthetic(http_method: HttpVerb, template: UriTemplate) -> Self {
        Self {
            http_method,
            template,
            force_regex: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend binding
// ─────────────────────────────────────────────────────────────────────────────

/// Path-translation strategy for a backend rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTranslation {
    AppendPathToAddress,
    ConstantAddress,
}

/// The resolved backend this [`Method`] forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendBinding {
    pub cluster_name: String,
    pub path: String,
    /// Host to use for a host-rewrite-literal action; empty means "do not rewrite".
    pub hostname: String,
    pub path_translation: PathTranslation,
    /// Deadline, already rounded to milliseconds.
    pub deadline_ms: u64,
    pub retry_on: Vec<String>,
    pub retry_num: u32,
    /// Backend-auth JWT audience, empty when none applies.
    pub jwt_audience: String,
}

impl BackendBinding {
    pub fn to_local(cluster_name: impl Into<String>, deadline_ms: u64) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            path: String::new(),
            hostname: String::new(),
            path_translation: PathTranslation::AppendPathToAddress,
            deadline_ms,
            retry_on: Vec::new(),
            retry_num: 0,
            jwt_audience: String::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric cost / API key locations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCost {
    pub name: String,
    pub cost: i64,
}

/// One place an API key may be supplied, in search order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Query(String),
    Header(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Method
// ─────────────────────────────────────────────────────────────────────────────

/// One API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub selector: String,
    pub api_name: String,
    pub short_name: String,
    pub api_version: String,

    pub http_rule: Vec<Pattern>,
    pub backend_binding: Option<BackendBinding>,

    pub is_streaming: bool,
    pub require_auth: bool,
    pub allow_unregistered_calls: bool,
    pub skip_service_control: bool,

    pub api_key_locations: Vec<ApiKeyLocation>,
    pub metric_costs: Vec<MetricCost>,

    pub is_generated: bool,
    /// Selector of the synthetic CORS OPTIONS companion, if one was created
    /// for this method. Modeled as an index into `Operations`/`Methods`,
    /// not a direct reference, to keep the owning map single.
    pub generated_cors_method: Option<String>,

    pub request_type_name: String,
    /// snake_case field name -> json field name, for this method's request type.
    pub snake_to_json: HashMap<String, String>,
}

impl Method {
    pub fn new(selector: impl Into<String>, api_name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            api_name: api_name.into(),
            short_name: short_name.into(),
            api_version: String::new(),
            http_rule: Vec::new(),
            backend_binding: None,
            is_streaming: false,
            require_auth: false,
            allow_unregistered_calls: false,
            skip_service_control: false,
            api_key_locations: Vec::new(),
            metric_costs: Vec::new(),
            is_generated: false,
            generated_cors_method: None,
            request_type_name: String::new(),
            snake_to_json: HashMap::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend clusters
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendProtocol {
    Http1,
    Http2,
    Grpc,
}

impl BackendProtocol {
    pub fn is_grpc(&self) -> bool {
        matches!(self, BackendProtocol::Grpc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCluster {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub tls: bool,
    pub protocol: BackendProtocol,
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth providers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthProvider {
    pub id: String,
    pub issuer: String,
    pub audiences: Vec<String>,
    pub jwks_uri: String,
    /// Header names to check for the JWT, in order.
    pub header_locations: Vec<String>,
    /// Query parameter names to check for the JWT, in order.
    pub query_locations: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Service model
// ─────────────────────────────────────────────────────────────────────────────

/// The normalized result of a build. Immutable after construction.
#[derive(Debug, Clone)]
pub struct ServiceModel {
    pub service_name: String,
    pub config_id: String,

    /// Canonical iteration order for every order-sensitive emission — the
    /// only canonical iteration order over methods.
    pub operations: Vec<String>,
    pub methods: HashMap<String, Method>,

    pub local_backend_cluster: BackendCluster,
    pub remote_backend_clusters: Vec<BackendCluster>,
    pub grpc_support_required: bool,

    pub transcoding_ignored_query_params: Vec<String>,
    pub cors_enabled: bool,

    pub auth_providers: Vec<AuthProvider>,
}

impl ServiceModel {
    /// Every selector in `operations` must resolve to a `Method`.
    pub fn method(&self, selector: &str) -> Option<&Method> {
        self.methods.get(selector)
    }
}
