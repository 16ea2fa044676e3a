//! Route-table generation: walks the method-ordering output and emits one
//! virtual host's worth of routes, invoking the per-route filter binder for
//! each.

use gwxlate_kernel::error::{BuildError, BuildResult};
use gwxlate_kernel::model::ServiceModel;
use gwxlate_kernel::options::{CorsPreset, Options};
use tracing::debug;

use crate::filters;
use crate::ordering::ordered_route_keys;
use crate::xds::{
    CorsOriginMatch, CorsPolicy, Route, RouteAction, RouteConfiguration, RouteMatch,
    RouteMatchKind, RetryPolicy, VirtualHost,
};

const HSTS_HEADER_VALUE: &str = "max-age=31536000; includeSubDomains";

pub fn generate_routes(model: &ServiceModel, options: &Options) -> BuildResult<RouteConfiguration> {
    let mut routes = Vec::new();

    for key in ordered_route_keys(model) {
        let method = model.method(&key.selector).expect("ordered key resolves to a method");
        let pattern = &method.http_rule[key.pattern_index];
        let binding = method
            .backend_binding
            .as_ref()
            .expect("every method has a backend binding after phase 14");

        let filter_config = filters::bind(method, pattern, &key.selector);

        let exact = !pattern.force_regex && pattern.template.is_exact_match();
        let match_strings: Vec<RouteMatchKind> = if exact {
            let no_slash = pattern.template.exact_match_string(false).unwrap();
            let with_slash = pattern.template.exact_match_string(true).unwrap();
            if no_slash == with_slash {
                vec![RouteMatchKind::Path(no_slash)]
            } else {
                vec![RouteMatchKind::Path(no_slash), RouteMatchKind::Path(with_slash)]
            }
        } else {
            vec![RouteMatchKind::SafeRegex(pattern.template.regex().to_string())]
        };

        let method_header = if pattern.http_method.is_wildcard() {
            None
        } else {
            Some(pattern.http_method.as_str().to_string())
        };

        let mut response_headers_to_add = Vec::new();
        if options.enable_hsts {
            response_headers_to_add.push(("strict-transport-security".to_string(), HSTS_HEADER_VALUE.to_string()));
        }

        let timeout_ms = if method.is_streaming { 0 } else { binding.deadline_ms };
        let host_rewrite_literal = if binding.hostname.is_empty() {
            None
        } else {
            Some(binding.hostname.clone())
        };

        for kind in match_strings {
            debug!(
                selector = %key.selector,
                http_method = pattern.http_method.as_str(),
                path_form = ?kind,
                "adding route"
            );
            routes.push(Route {
                match_: RouteMatch { kind, method: method_header.clone() },
                action: RouteAction {
                    cluster: binding.cluster_name.clone(),
                    timeout_ms,
                    retry_policy: Some(RetryPolicy {
                        retry_on: binding.retry_on.clone(),
                        num_retries: binding.retry_num,
                    }),
                    host_rewrite_literal: host_rewrite_literal.clone(),
                },
                decorator: Some(format!("ingress {}", method.short_name)),
                response_headers_to_add: response_headers_to_add.clone(),
                per_filter_config: filter_config.clone(),
            });
        }
    }

    let cors = if model.cors_enabled {
        build_cors_policy(options)?
    } else {
        None
    };

    if cors.is_some() {
        routes.push(Route {
            match_: RouteMatch { kind: RouteMatchKind::Prefix("/".to_string()), method: Some("OPTIONS".to_string()) },
            action: RouteAction {
                cluster: model.local_backend_cluster.name.clone(),
                timeout_ms: options.default_deadline_ms,
                retry_policy: None,
                host_rewrite_literal: None,
            },
            decorator: None,
            response_headers_to_add: Vec::new(),
            per_filter_config: Default::default(),
        });
    }

    Ok(RouteConfiguration {
        name: "local_route".to_string(),
        virtual_hosts: vec![VirtualHost {
            name: "backend".to_string(),
            domains: vec!["*".to_string()],
            routes,
            cors,
        }],
    })
}

fn build_cors_policy(options: &Options) -> BuildResult<Option<CorsPolicy>> {
    let preset = CorsPreset::parse(&options.cors_preset)?;
    let allow_origin = match preset {
        CorsPreset::None => return Ok(None),
        CorsPreset::Basic => CorsOriginMatch::Exact(options.cors_allow_origin.clone()),
        CorsPreset::CorsWithRegex => {
            crate::uri_template::check_regex_bound(&options.cors_allow_origin_regex).map_err(|reason| {
                BuildError::InvalidCorsAllowOriginRegex(options.cors_allow_origin_regex.clone(), reason)
            })?;
            CorsOriginMatch::Regex(options.cors_allow_origin_regex.clone())
        }
    };
    Ok(Some(CorsPolicy {
        allow_origin,
        allow_methods: options.cors_allow_methods.clone(),
        allow_headers: options.cors_allow_headers.clone(),
        expose_headers: options.cors_expose_headers.clone(),
        allow_credentials: options.cors_allow_credentials,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_with_regex_rejects_oversize_regex() {
        let mut options = Options::new("http://127.0.0.1:8080");
        options.cors_preset = "cors_with_regex".to_string();
        options.cors_allow_origin_regex = "a".repeat(3000);
        let err = build_cors_policy(&options).unwrap_err();
        assert!(matches!(err, BuildError::InvalidCorsAllowOriginRegex(_, _)));
    }

    #[test]
    fn cors_with_regex_rejects_invalid_regex() {
        let mut options = Options::new("http://127.0.0.1:8080");
        options.cors_preset = "cors_with_regex".to_string();
        options.cors_allow_origin_regex = "(unclosed".to_string();
        let err = build_cors_policy(&options).unwrap_err();
        assert!(matches!(err, BuildError::InvalidCorsAllowOriginRegex(_, _)));
    }

    #[test]
    fn cors_with_regex_accepts_valid_regex() {
        let mut options = Options::new("http://127.0.0.1:8080");
        options.cors_preset = "cors_with_regex".to_string();
        options.cors_allow_origin_regex = "^https://.*\\.example\\.com$".to_string();
        let policy = build_cors_policy(&options).unwrap().unwrap();
        assert!(matches!(&policy.allow_origin, CorsOriginMatch::Regex(r) if r == "^https://.*\\.example\\.com$"));
    }
}
