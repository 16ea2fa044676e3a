//! Minimal backend-address parsing (`scheme://host[:port][/path]`).
//!
//! No general URI crate is pulled in for this — the grammar is small
//! enough that a hand-rolled splitter is the simpler choice.

use gwxlate_kernel::model::BackendProtocol;

#[derive(Debug, Clone)]
pub struct BackendAddress {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Parse `address` into its constituent parts. `path` is empty when the
/// address has no path component (callers decide the empty-path default).
pub fn parse(address: &str) -> Result<BackendAddress, String> {
    let (scheme, rest) = address
        .split_once("://")
        .ok_or_else(|| "missing '://' scheme separator".to_string())?;
    let scheme = scheme.to_ascii_lowercase();
    let default_port = match scheme.as_str() {
        "http" | "grpc" => 80,
        "https" | "grpcs" => 443,
        other => return Err(format!("unsupported scheme '{other}'")),
    };

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    if authority.is_empty() {
        return Err("missing host".to_string());
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) if !h.is_empty() && !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => {
            let port = p.parse::<u16>().map_err(|_| format!("invalid port '{p}'"))?;
            (h, port)
        }
        _ => (authority, default_port),
    };

    Ok(BackendAddress {
        scheme,
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}

/// Map a backend scheme to the (protocol, TLS) pair the local and remote
/// backend-rule phases derive from it.
pub fn protocol_for_scheme(scheme: &str) -> (BackendProtocol, bool) {
    match scheme {
        "http" => (BackendProtocol::Http1, false),
        "https" => (BackendProtocol::Http1, true),
        "grpc" => (BackendProtocol::Grpc, false),
        "grpcs" => (BackendProtocol::Grpc, true),
        _ => (BackendProtocol::Http1, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_host_default_port() {
        let a = parse("https://api.example.com/v1").unwrap();
        assert_eq!(a.scheme, "https");
        assert_eq!(a.host, "api.example.com");
        assert_eq!(a.port, 443);
        assert_eq!(a.path, "/v1");
    }

    #[test]
    fn parses_explicit_port_and_empty_path() {
        let a = parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(a.host, "127.0.0.1");
        assert_eq!(a.port, 8080);
        assert_eq!(a.path, "");
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(parse("127.0.0.1:8080").is_err());
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(parse("ftp://example.com").is_err());
    }

    #[test]
    fn grpc_scheme_maps_to_grpc_protocol() {
        let (protocol, tls) = protocol_for_scheme("grpcs");
        assert!(protocol.is_grpc());
        assert!(tls);
    }
}
