//! The 15-phase pipeline that turns a [`ServiceDescription`] plus
//! [`Options`] into a [`ServiceModel`]. Phase N reads only state produced
//! by phases before it; any phase error aborts the build with the first
//! [`BuildError`] encountered, so no partial model is ever published.

use std::collections::{BTreeSet, HashMap, HashSet};

use gwxlate_kernel::descriptor::{
    HttpPattern, HttpRule, JwtLocation, PathTranslationKind, ServiceDescription,
};
use gwxlate_kernel::error::{BuildError, BuildResult};
use gwxlate_kernel::model::{
    ApiKeyLocation, AuthProvider, BackendBinding, BackendCluster, HttpVerb, MetricCost, Method,
    Pattern, PathTranslation, ServiceModel,
};
use gwxlate_kernel::openid::OidcResolver;
use gwxlate_kernel::options::Options;
use tracing::{debug, warn};

use crate::addr;
use crate::uri_template;

/// Run every phase in order and return the finished, immutable model.
pub async fn build(
    desc: &ServiceDescription,
    config_id: &str,
    options: &Options,
    oidc: &dyn OidcResolver,
) -> BuildResult<ServiceModel> {
    options.validate()?;

    let local_backend_cluster = phase1_local_backend_init(desc, options)?;
    let grpc_from_local = local_backend_cluster.protocol.is_grpc();

    let mut model = ServiceModel {
        service_name: desc.name.clone(),
        config_id: config_id.to_string(),
        operations: Vec::new(),
        methods: HashMap::new(),
        local_backend_cluster,
        remote_backend_clusters: Vec::new(),
        grpc_support_required: grpc_from_local,
        transcoding_ignored_query_params: Vec::new(),
        cors_enabled: false,
        auth_providers: Vec::new(),
    };

    phase2_endpoints(desc, &mut model);
    phase3_apis(desc, &mut model);
    phase4_quota(desc, &mut model);
    phase5_backend_rule(desc, options, &mut model)?;
    phase6_http_rule(desc, options, &mut model)?;
    phase7_usage_rule(desc, &mut model)?;
    phase8_access_token(options);
    phase9_types(desc, &mut model)?;
    phase10_add_grpc_http_rules(desc, &mut model)?;
    phase11_transcoding_ignored_query_params(desc, options, &mut model)?;
    phase12_api_key_locations(desc, &mut model)?;
    phase13_empty_jwks_uri_by_openid(desc, options, oidc, &mut model).await?;
    phase14_local_backend_operations(options, &mut model);
    phase15_auth_requirement(desc, &mut model)?;

    debug!(
        service = %model.service_name,
        operations = model.operations.len(),
        "service model build complete"
    );
    Ok(model)
}

/// Get the method for `selector`, creating a minimal one if it's missing
/// and its format is valid. Appends to `Operations` on creation, since
/// such a selector was first seen in rule processing.
fn get_or_create_method<'a>(
    model: &'a mut ServiceModel,
    selector: &str,
) -> BuildResult<&'a mut Method> {
    if !model.methods.contains_key(selector) {
        let (api_name, short_name) = selector
            .rsplit_once('.')
            .ok_or_else(|| BuildError::MalformedSelector(selector.to_string()))?;
        if api_name.is_empty() || short_name.is_empty() {
            return Err(BuildError::MalformedSelector(selector.to_string()));
        }
        debug!(selector, "auto-creating method first seen in rule processing");
        model.methods.insert(
            selector.to_string(),
            Method::new(selector, api_name, short_name),
        );
        model.operations.push(selector.to_string());
    }
    Ok(model.methods.get_mut(selector).unwrap())
}

fn parse_retry_ons(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Unset -> default; negative -> warn + default; positive -> round to the
/// nearest millisecond.
fn resolve_deadline_ms(deadline: Option<f64>, default_ms: u64, selector: &str) -> u64 {
    match deadline {
        None => default_ms,
        Some(d) if d < 0.0 => {
            warn!(selector, deadline = d, "negative deadline; using default");
            default_ms
        }
        Some(d) => (d * 1000.0).round() as u64,
    }
}

fn map_path_translation(kind: PathTranslationKind) -> PathTranslation {
    match kind {
        PathTranslationKind::AppendPathToAddress => PathTranslation::AppendPathToAddress,
        PathTranslationKind::ConstantAddress => PathTranslation::ConstantAddress,
    }
}

// ── Phase 1: LocalBackendInit ────────────────────────────────────────────────

fn phase1_local_backend_init(
    desc: &ServiceDescription,
    options: &Options,
) -> BuildResult<BackendCluster> {
    let parsed = addr::parse(&options.backend_address)
        .map_err(|reason| BuildError::InvalidBackendAddress(options.backend_address.clone(), reason))?;
    let (protocol, tls) = addr::protocol_for_scheme(&parsed.scheme);
    Ok(BackendCluster {
        name: format!("backend-cluster-{}_local", desc.name),
        hostname: parsed.host,
        port: parsed.port,
        tls,
        protocol,
    })
}

// ── Phase 2: Endpoints ───────────────────────────────────────────────────────

fn phase2_endpoints(desc: &ServiceDescription, model: &mut ServiceModel) {
    model.cors_enabled = desc
        .endpoints
        .iter()
        .any(|e| e.name == model.service_name && e.allow_cors);
}

// ── Phase 3: Apis ────────────────────────────────────────────────────────────

fn strip_type_url_prefix(url: &str) -> String {
    match url.rsplit_once('/') {
        Some((_, name)) => name.to_string(),
        None => {
            if !url.is_empty() {
                warn!(request_type_url = url, "malformed request type URL; missing '/' prefix");
            }
            url.to_string()
        }
    }
}

fn phase3_apis(desc: &ServiceDescription, model: &mut ServiceModel) {
    for api in &desc.apis {
        for m in &api.methods {
            let selector = format!("{}.{}", api.name, m.name);
            let mut method = Method::new(selector.clone(), api.name.clone(), m.name.clone());
            method.api_version = api.version.clone();
            method.is_streaming = m.is_streaming();
            method.request_type_name = strip_type_url_prefix(&m.request_type_url);
            model.methods.insert(selector.clone(), method);
            model.operations.push(selector);
        }
    }
}

// ── Phase 4: Quota ───────────────────────────────────────────────────────────

fn phase4_quota(desc: &ServiceDescription, model: &mut ServiceModel) {
    for rule in &desc.quota.metric_rules {
        if let Some(method) = model.methods.get_mut(&rule.selector) {
            method.metric_costs = rule
                .metric_costs
                .iter()
                .map(|c| MetricCost {
                    name: c.name.clone(),
                    cost: c.cost,
                })
                .collect();
        } else {
            warn!(selector = %rule.selector, "quota rule references unknown selector; ignored");
        }
    }
}

// ── Phase 5: BackendRule ─────────────────────────────────────────────────────

fn phase5_backend_rule(
    desc: &ServiceDescription,
    options: &Options,
    model: &mut ServiceModel,
) -> BuildResult<()> {
    for rule in &desc.backend.rules {
        get_or_create_method(model, &rule.selector)?;

        let binding = if rule.address.trim().is_empty() {
            let deadline_ms = resolve_deadline_ms(rule.deadline, options.default_deadline_ms, &rule.selector);
            let mut b = BackendBinding::to_local(model.local_backend_cluster.name.clone(), deadline_ms);
            b.retry_on = parse_retry_ons(&options.backend_retry_ons);
            b.retry_num = options.backend_retry_num;
            b
        } else {
            let parsed = addr::parse(&rule.address).map_err(|reason| {
                BuildError::InvalidRemoteBackendAddress(rule.selector.clone(), rule.address.clone(), reason)
            })?;
            let (protocol, tls) = addr::protocol_for_scheme(&parsed.scheme);
            let cluster_name = format!("backend-cluster-{}:{}", parsed.host, parsed.port);
            if !model.remote_backend_clusters.iter().any(|c| c.name == cluster_name) {
                model.remote_backend_clusters.push(BackendCluster {
                    name: cluster_name.clone(),
                    hostname: parsed.host.clone(),
                    port: parsed.port,
                    tls,
                    protocol,
                });
                if protocol.is_grpc() {
                    model.grpc_support_required = true;
                }
            }

            if rule.jwt_audience.as_ref().is_some_and(|a| !a.is_empty()) && rule.disable_auth {
                warn!(
                    selector = %rule.selector,
                    "backend rule sets both jwt_audience and disable_auth; jwt_audience wins"
                );
            }
            let mut jwt_audience = match (&rule.jwt_audience, rule.disable_auth) {
                (Some(aud), _) => aud.clone(),
                (None, true) => String::new(),
                (None, false) => {
                    let derived_scheme = match parsed.scheme.as_str() {
                        "grpc" => "http",
                        "grpcs" => "https",
                        other => other,
                    };
                    format!("{derived_scheme}://{}", parsed.host)
                }
            };
            if options.non_gcp && !jwt_audience.is_empty() {
                warn!(selector = %rule.selector, "backend-auth audience auto-disabled for non-GCP deployment");
                jwt_audience.clear();
            }

            let path_translation = rule.path_translation.unwrap_or(PathTranslationKind::AppendPathToAddress);
            let mut path = parsed.path.clone();
            if matches!(path_translation, PathTranslationKind::ConstantAddress) && path.is_empty() {
                path = "/".to_string();
            }

            let deadline_ms = resolve_deadline_ms(rule.deadline, options.default_deadline_ms, &rule.selector);
            BackendBinding {
                cluster_name,
                path,
                hostname: parsed.host,
                path_translation: map_path_translation(path_translation),
                deadline_ms,
                retry_on: parse_retry_ons(&options.backend_retry_ons),
                retry_num: options.backend_retry_num,
                jwt_audience,
            }
        };

        model.methods.get_mut(&rule.selector).unwrap().backend_binding = Some(binding);
    }
    Ok(())
}

// ── Phase 6: HttpRule ────────────────────────────────────────────────────────

fn http_pattern_to_verb_and_path(pattern: &HttpPattern) -> (HttpVerb, String) {
    match pattern {
        HttpPattern::Get(p) => (HttpVerb::Get, p.clone()),
        HttpPattern::Put(p) => (HttpVerb::Put, p.clone()),
        HttpPattern::Post(p) => (HttpVerb::Post, p.clone()),
        HttpPattern::Delete(p) => (HttpVerb::Delete, p.clone()),
        HttpPattern::Patch(p) => (HttpVerb::Patch, p.clone()),
        HttpPattern::Custom { kind, path } => (HttpVerb::Custom(kind.clone()), path.clone()),
    }
}

fn flatten_http_rules(rules: &[HttpRule]) -> Vec<&HttpRule> {
    fn collect<'a>(rule: &'a HttpRule, out: &mut Vec<&'a HttpRule>) {
        out.push(rule);
        for ab in &rule.additional_bindings {
            collect(ab, out);
        }
    }
    let mut flat = Vec::new();
    for rule in rules {
        collect(rule, &mut flat);
    }
    flat
}

fn phase6_http_rule(
    desc: &ServiceDescription,
    options: &Options,
    model: &mut ServiceModel,
) -> BuildResult<()> {
    let mut route_regex_has_options: HashSet<String> = HashSet::new();

    for rule in flatten_http_rules(&desc.http.rules) {
        let (verb, path) = http_pattern_to_verb_and_path(&rule.pattern);
        let template = uri_template::parse(&rule.selector, &path)?;
        let regex_key = template.regex().to_string();
        let is_options = matches!(verb, HttpVerb::Options);
        let method = get_or_create_method(model, &rule.selector)?;
        method.http_rule.push(Pattern::new(verb, template));
        if is_options {
            route_regex_has_options.insert(regex_key);
        }
    }

    if model.cors_enabled {
        let mut synthesized: Vec<(String, String, Method)> = Vec::new();
        for selector in model.operations.clone() {
            let method = model.methods.get(&selector).unwrap();
            if method.is_generated {
                continue;
            }
            for pattern in &method.http_rule {
                let regex_key = pattern.template.regex().to_string();
                if !route_regex_has_options.insert(regex_key) {
                    continue;
                }
                let cors_short_name = format!("ESPv2_Autogenerated_CORS_{}", method.short_name);
                let cors_selector = format!("{}.{}", method.api_name, cors_short_name);
                let mut cors_method = Method::new(cors_selector.clone(), method.api_name.clone(), cors_short_name);
                cors_method.api_version = method.api_version.clone();
                cors_method.backend_binding = method.backend_binding.clone();
                cors_method.is_generated = true;
                cors_method
                    .http_rule
                    .push(Pattern::new(HttpVerb::Options, pattern.template.clone()));
                synthesized.push((selector.clone(), cors_selector, cors_method));
            }
        }
        for (origin_selector, cors_selector, cors_method) in synthesized {
            model.operations.push(cors_selector.clone());
            model.methods.insert(cors_selector.clone(), cors_method);
            model.methods.get_mut(&origin_selector).unwrap().generated_cors_method = Some(cors_selector);
        }
    }

    if !options.healthz.is_empty() {
        let path = if options.healthz.starts_with('/') {
            options.healthz.clone()
        } else {
            format!("/{}", options.healthz)
        };
        let selector = "espv2_deployment.ESPv2_Autogenerated_HealthCheck".to_string();
        let template = uri_template::parse(&selector, &path)?;
        let mut method = Method::new(selector.clone(), "espv2_deployment", "ESPv2_Autogenerated_HealthCheck");
        method.is_generated = true;
        method.skip_service_control = true;
        method.http_rule.push(Pattern::new(HttpVerb::Get, template));
        model.operations.push(selector.clone());
        model.methods.insert(selector, method);
    }

    Ok(())
}

// ── Phase 7: UsageRule ───────────────────────────────────────────────────────

fn phase7_usage_rule(desc: &ServiceDescription, model: &mut ServiceModel) -> BuildResult<()> {
    for rule in &desc.usage.rules {
        let method = get_or_create_method(model, &rule.selector)?;
        method.allow_unregistered_calls = rule.allow_unregistered_calls;
        method.skip_service_control = rule.skip_service_control;
    }
    Ok(())
}

// ── Phase 8: AccessToken ─────────────────────────────────────────────────────

/// Credential sourcing (service-account key via the token agent, vs. the
/// metadata server) has no representation in `ServiceModel` — actual
/// credential acquisition is an external collaborator. This phase exists
/// only to log which source the running deployment would use.
fn phase8_access_token(options: &Options) {
    if options.service_account_key.is_empty() {
        debug!("access token source: metadata server");
    } else {
        debug!(path = %options.service_account_key, "access token source: service account key via token agent");
    }
}

// ── Phase 9: Types ───────────────────────────────────────────────────────────

fn phase9_types(desc: &ServiceDescription, model: &mut ServiceModel) -> BuildResult<()> {
    let mut type_maps: HashMap<String, HashMap<String, String>> = HashMap::new();
    for t in &desc.types {
        let mut map: HashMap<String, String> = HashMap::new();
        for f in &t.fields {
            let json_name = if f.json_name.is_empty() { f.name.clone() } else { f.json_name.clone() };
            if let Some(existing) = map.get(&f.name) {
                if existing != &json_name {
                    return Err(BuildError::SnakeJsonConflict {
                        request_type: t.name.clone(),
                        snake_name: f.name.clone(),
                        first_json: existing.clone(),
                        second_json: json_name,
                    });
                }
            } else {
                map.insert(f.name.clone(), json_name);
            }
        }
        type_maps.insert(t.name.clone(), map);
    }

    for selector in model.operations.clone() {
        let (request_type_name, cors_companion) = {
            let method = match model.methods.get(&selector) {
                Some(m) => m,
                None => continue,
            };
            (method.request_type_name.clone(), method.generated_cors_method.clone())
        };
        let Some(renames) = type_maps.get(&request_type_name) else {
            continue;
        };
        if renames.is_empty() {
            continue;
        }
        if let Some(method) = model.methods.get_mut(&selector) {
            method.snake_to_json = renames.clone();
            for pattern in &mut method.http_rule {
                pattern.template.replace_variable_field(renames);
            }
        }
        if let Some(cors_selector) = cors_companion {
            if let Some(cors_method) = model.methods.get_mut(&cors_selector) {
                for pattern in &mut cors_method.http_rule {
                    pattern.template.replace_variable_field(renames);
                }
            }
        }
    }
    Ok(())
}

// ── Phase 10: AddGrpcHttpRules ───────────────────────────────────────────────

fn phase10_add_grpc_http_rules(desc: &ServiceDescription, model: &mut ServiceModel) -> BuildResult<()> {
    if !model.grpc_support_required {
        return Ok(());
    }
    for api in &desc.apis {
        for m in &api.methods {
            let selector = format!("{}.{}", api.name, m.name);
            let path = format!("/{}/{}", api.name, m.name);
            let template = uri_template::parse(&selector, &path)?;
            if let Some(method) = model.methods.get_mut(&selector) {
                method.http_rule.push(Pattern::grpc_synthetic(HttpVerb::Post, template));
            }
        }
    }
    Ok(())
}

// ── Phase 11: TranscodingIgnoredQueryParams ──────────────────────────────────

fn phase11_transcoding_ignored_query_params(
    desc: &ServiceDescription,
    options: &Options,
    model: &mut ServiceModel,
) -> BuildResult<()> {
    let mut set: BTreeSet<String> = BTreeSet::new();

    let mut any_custom_jwt_query = false;
    for provider in &desc.authentication.providers {
        for loc in &provider.jwt_locations {
            if let JwtLocation::Query { name, value_prefix } = loc {
                if !value_prefix.is_empty() {
                    return Err(BuildError::JwtQueryLocationHasValuePrefix(provider.id.clone()));
                }
                set.insert(name.clone());
                any_custom_jwt_query = true;
            }
        }
    }
    if !any_custom_jwt_query {
        set.insert("access_token".to_string());
    }

    let mut methods_with_query_param: HashSet<String> = HashSet::new();
    for rule in &desc.system_parameters.rules {
        for p in &rule.parameters {
            if let Some(q) = &p.url_query_parameter {
                if !q.is_empty() {
                    set.insert(q.clone());
                    methods_with_query_param.insert(rule.selector.clone());
                }
            }
        }
    }
    for selector in &model.operations {
        if !methods_with_query_param.contains(selector) {
            set.insert("key".to_string());
            set.insert("api_key".to_string());
        }
    }

    for name in options.transcoding_ignore_query_parameters.split(',') {
        let name = name.trim();
        if !name.is_empty() {
            set.insert(name.to_string());
        }
    }

    model.transcoding_ignored_query_params = set.into_iter().collect();
    Ok(())
}

// ── Phase 12: ApiKeyLocations ────────────────────────────────────────────────

fn phase12_api_key_locations(desc: &ServiceDescription, model: &mut ServiceModel) -> BuildResult<()> {
    for rule in &desc.system_parameters.rules {
        let method = get_or_create_method(model, &rule.selector)?;
        for p in &rule.parameters {
            if let Some(q) = &p.url_query_parameter {
                if !q.is_empty() {
                    method.api_key_locations.push(ApiKeyLocation::Query(q.clone()));
                }
            }
        }
        for p in &rule.parameters {
            if let Some(h) = &p.http_header {
                if !h.is_empty() {
                    method.api_key_locations.push(ApiKeyLocation::Header(h.clone()));
                }
            }
        }
    }
    Ok(())
}

// ── Phase 13: EmptyJwksUriByOpenID ───────────────────────────────────────────

async fn phase13_empty_jwks_uri_by_openid(
    desc: &ServiceDescription,
    options: &Options,
    oidc: &dyn OidcResolver,
    model: &mut ServiceModel,
) -> BuildResult<()> {
    let mut providers = Vec::with_capacity(desc.authentication.providers.len());
    for p in &desc.authentication.providers {
        let mut jwks_uri = p.jwks_uri.clone();
        if jwks_uri.is_empty() {
            if options.disable_oidc_discovery {
                return Err(BuildError::EmptyJwksUriDiscoveryDisabled(p.id.clone()));
            }
            jwks_uri = oidc
                .resolve_jwks_uri(&p.issuer)
                .await
                .map_err(|reason| BuildError::OidcDiscoveryFailed {
                    provider_id: p.id.clone(),
                    reason,
                })?;
        }
        let mut header_locations = Vec::new();
        let mut query_locations = Vec::new();
        for loc in &p.jwt_locations {
            match loc {
                JwtLocation::Header { name, .. } => header_locations.push(name.clone()),
                JwtLocation::Query { name, .. } => query_locations.push(name.clone()),
            }
        }
        providers.push(AuthProvider {
            id: p.id.clone(),
            issuer: p.issuer.clone(),
            audiences: p.audiences.clone(),
            jwks_uri,
            header_locations,
            query_locations,
        });
    }
    model.auth_providers = providers;
    Ok(())
}

// ── Phase 14: LocalBackendOperations ─────────────────────────────────────────

fn phase14_local_backend_operations(options: &Options, model: &mut ServiceModel) {
    let local_cluster_name = model.local_backend_cluster.name.clone();
    let default_deadline = options.default_deadline_ms;
    for method in model.methods.values_mut() {
        if method.backend_binding.is_none() {
            method.backend_binding = Some(BackendBinding::to_local(local_cluster_name.clone(), default_deadline));
        }
    }
}

// ── Phase 15: AuthRequirement ────────────────────────────────────────────────

fn phase15_auth_requirement(desc: &ServiceDescription, model: &mut ServiceModel) -> BuildResult<()> {
    for rule in &desc.authentication.rules {
        if rule.requirements.is_empty() {
            continue;
        }
        let method = model
            .methods
            .get_mut(&rule.selector)
            .ok_or_else(|| BuildError::UnknownAuthSelector(rule.selector.clone()))?;
        method.require_auth = true;
    }
    Ok(())
}
