//! Cluster assembly: the local cluster, one cluster per deduplicated
//! remote backend, and nothing else — auxiliary clusters (metadata server,
//! token agent, service-control, per-JWKS-URI) are a sibling component's
//! responsibility and are not constructed here.

use gwxlate_kernel::model::ServiceModel;

use crate::xds::{Cluster, ClusterDiscoveryType};

pub fn assemble_clusters(model: &ServiceModel) -> Vec<Cluster> {
    let mut out = Vec::with_capacity(1 + model.remote_backend_clusters.len());

    let local = &model.local_backend_cluster;
    out.push(Cluster {
        name: local.name.clone(),
        discovery_type: ClusterDiscoveryType::StrictDns,
        hostname: local.hostname.clone(),
        port: local.port,
        http2: local.protocol.is_grpc(),
        tls: local.tls,
    });

    for remote in &model.remote_backend_clusters {
        out.push(Cluster {
            name: remote.name.clone(),
            discovery_type: ClusterDiscoveryType::LogicalDns,
            hostname: remote.hostname.clone(),
            port: remote.port,
            http2: remote.protocol.is_grpc(),
            tls: remote.tls,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwxlate_kernel::model::{BackendCluster, BackendProtocol};

    fn model_with(local: BackendCluster, remotes: Vec<BackendCluster>) -> ServiceModel {
        ServiceModel {
            service_name: "svc".to_string(),
            config_id: "1".to_string(),
            operations: Vec::new(),
            methods: Default::default(),
            local_backend_cluster: local,
            remote_backend_clusters: remotes,
            grpc_support_required: false,
            transcoding_ignored_query_params: Vec::new(),
            cors_enabled: false,
            auth_providers: Vec::new(),
        }
    }

    #[test]
    fn local_cluster_is_strict_dns() {
        let local = BackendCluster {
            name: "backend-cluster-svc_local".to_string(),
            hostname: "127.0.0.1".to_string(),
            port: 8080,
            tls: false,
            protocol: BackendProtocol::Http1,
        };
        let model = model_with(local, Vec::new());
        let clusters = assemble_clusters(&model);
        assert_eq!(clusters.len(), 1);
        assert!(matches!(clusters[0].discovery_type, ClusterDiscoveryType::StrictDns));
        assert!(!clusters[0].http2);
    }

    #[test]
    fn grpc_local_cluster_enables_http2() {
        let local = BackendCluster {
            name: "backend-cluster-svc_local".to_string(),
            hostname: "127.0.0.1".to_string(),
            port: 8080,
            tls: false,
            protocol: BackendProtocol::Grpc,
        };
        let model = model_with(local, Vec::new());
        let clusters = assemble_clusters(&model);
        assert!(clusters[0].http2);
    }

    #[test]
    fn remote_clusters_are_logical_dns() {
        let local = BackendCluster {
            name: "backend-cluster-svc_local".to_string(),
            hostname: "127.0.0.1".to_string(),
            port: 8080,
            tls: false,
            protocol: BackendProtocol::Http1,
        };
        let remote = BackendCluster {
            name: "backend-cluster-api.example.com:443".to_string(),
            hostname: "api.example.com".to_string(),
            port: 443,
            tls: true,
            protocol: BackendProtocol::Http1,
        };
        let model = model_with(local, vec![remote]);
        let clusters = assemble_clusters(&model);
        assert_eq!(clusters.len(), 2);
        assert!(matches!(clusters[1].discovery_type, ClusterDiscoveryType::LogicalDns));
        assert!(clusters[1].tls);
    }
}
