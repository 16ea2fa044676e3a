//! Per-route filter binding: per-operation opaque filter configuration,
//! keyed by filter name, attached to every route the generator emits for
//! that operation.

use std::collections::BTreeMap;

use gwxlate_kernel::model::{Method, Pattern, PathTranslation};
use serde_json::{json, Value};

/// Build the `filter name -> config` map for one (method, pattern) pair.
/// `operation` is the method's selector, reused verbatim for the
/// service-control and jwt-authn config. Keyed by a `BTreeMap` so the
/// emitted filter config has a deterministic key order.
pub fn bind(method: &Method, pattern: &Pattern, operation: &str) -> BTreeMap<String, Value> {
    let mut cfg = BTreeMap::new();

    cfg.insert("service-control".to_string(), json!({ "operation_name": operation }));

    if let Some(binding) = &method.backend_binding {
        if !binding.jwt_audience.is_empty() {
            cfg.insert("backend-auth".to_string(), json!({ "jwt_audience": binding.jwt_audience }));
        }

        match binding.path_translation {
            PathTranslation::AppendPathToAddress if !binding.path.is_empty() => {
                cfg.insert("path-rewrite".to_string(), json!({ "path_prefix": binding.path }));
            }
            PathTranslation::ConstantAddress => {
                let mut value = json!({ "constant_path": binding.path });
                if !pattern.template.variables().is_empty() {
                    if let Some(url_template) = pattern.template.exact_match_string(false) {
                        value["url_template"] = Value::String(url_template);
                    }
                }
                cfg.insert("path-rewrite".to_string(), value);
            }
            PathTranslation::AppendPathToAddress => {}
        }
    }

    if method.require_auth {
        cfg.insert("jwt-authn".to_string(), json!({ "requirement_name": operation }));
    }

    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwxlate_kernel::model::{BackendBinding, HttpVerb};

    fn method_with_binding(binding: BackendBinding, require_auth: bool) -> Method {
        let mut m = Method::new("svc.Get", "svc", "Get");
        m.backend_binding = Some(binding);
        m.require_auth = require_auth;
        m
    }

    #[test]
    fn service_control_is_always_present() {
        let binding = BackendBinding::to_local("backend-cluster-svc_local", 15_000);
        let m = method_with_binding(binding, false);
        let pattern = Pattern::new(HttpVerb::Get, crate::uri_template::parse("svc.Get", "/a").unwrap());
        let cfg = bind(&m, &pattern, "svc.Get");
        assert!(cfg.contains_key("service-control"));
        assert!(!cfg.contains_key("backend-auth"));
        assert!(!cfg.contains_key("jwt-authn"));
    }

    #[test]
    fn backend_auth_present_iff_audience_set() {
        let mut binding = BackendBinding::to_local("backend-cluster-remote", 15_000);
        binding.jwt_audience = "https://api.example.com".to_string();
        let m = method_with_binding(binding, false);
        let pattern = Pattern::new(HttpVerb::Get, crate::uri_template::parse("svc.Get", "/a").unwrap());
        let cfg = bind(&m, &pattern, "svc.Get");
        assert_eq!(
            cfg.get("backend-auth").unwrap()["jwt_audience"],
            "https://api.example.com"
        );
    }

    #[test]
    fn jwt_authn_present_iff_require_auth() {
        let binding = BackendBinding::to_local("backend-cluster-svc_local", 15_000);
        let m = method_with_binding(binding, true);
        let pattern = Pattern::new(HttpVerb::Get, crate::uri_template::parse("svc.Get", "/a").unwrap());
        let cfg = bind(&m, &pattern, "svc.Get");
        assert_eq!(cfg.get("jwt-authn").unwrap()["requirement_name"], "svc.Get");
    }
}
