//! Output wire types: the route table and cluster list handed to the xDS
//! transport collaborator. Kept deliberately close to a standard L7 proxy's
//! route/cluster discovery schema so a thin transport layer can serialize
//! these directly without another translation step.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct RouteConfiguration {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHost>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors: Option<CorsPolicy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    #[serde(rename = "match")]
    pub match_: RouteMatch,
    pub action: RouteAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decorator: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub response_headers_to_add: Vec<(String, String)>,
    /// Keyed by filter name in a `BTreeMap` so the serialized object's key
    /// order is deterministic across runs, not dependent on hash iteration.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub per_filter_config: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteMatch {
    #[serde(flatten)]
    pub kind: RouteMatchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMatchKind {
    Path(String),
    Prefix(String),
    SafeRegex(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteAction {
    pub cluster: String,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_rewrite_literal: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryPolicy {
    pub retry_on: Vec<String>,
    pub num_retries: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorsPolicy {
    pub allow_origin: CorsOriginMatch,
    pub allow_methods: String,
    pub allow_headers: String,
    pub expose_headers: String,
    pub allow_credentials: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorsOriginMatch {
    Exact(String),
    Regex(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub name: String,
    pub discovery_type: ClusterDiscoveryType,
    pub hostname: String,
    pub port: u16,
    pub http2: bool,
    pub tls: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterDiscoveryType {
    StrictDns,
    LogicalDns,
}
