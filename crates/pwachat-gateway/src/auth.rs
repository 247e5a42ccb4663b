//! Connection and request admission. Four paths, first match wins:
//! trusted-proxy header, loopback peer, no token configured, token match.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

use pwachat_core::RelayConfig;

/// Header set by a trusting reverse proxy that already authenticated the peer.
pub const TRUSTED_PROXY_HEADER: &str = "tailscale-user-login";

pub fn is_authorized(
    config: &RelayConfig,
    headers: &HeaderMap,
    remote: SocketAddr,
    query_token: Option<&str>,
) -> bool {
    if headers.contains_key(TRUSTED_PROXY_HEADER) {
        return true;
    }
    if is_loopback(remote.ip()) {
        return true;
    }
    let Some(expected) = config.gateway.auth.token.as_deref() else {
        return true;
    };
    match presented_secret(headers, query_token) {
        Some(secret) => secret == expected,
        None => false,
    }
}

/// Loopback in v4, v6, or v4-mapped-in-v6 form.
fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6
                    .to_ipv4_mapped()
                    .map(|v4| v4.is_loopback())
                    .unwrap_or(false)
        }
    }
}

/// The first present of: `Authorization` (optionally `Bearer `-prefixed),
/// `X-Auth-Token`, the `token` query parameter.
fn presented_secret<'a>(headers: &'a HeaderMap, query_token: Option<&'a str>) -> Option<&'a str> {
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        return Some(value.strip_prefix("Bearer ").unwrap_or(value));
    }
    if let Some(value) = headers.get("x-auth-token").and_then(|v| v.to_str().ok()) {
        return Some(value);
    }
    query_token
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: Option<&str>) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.gateway.auth.token = token.map(String::from);
        config
    }

    fn remote(addr: &str) -> SocketAddr {
        addr.parse().expect("valid socket addr")
    }

    #[test]
    fn trusted_proxy_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(TRUSTED_PROXY_HEADER, "user@example.com".parse().unwrap());
        let config = config_with_token(Some("secret"));
        assert!(is_authorized(
            &config,
            &headers,
            remote("203.0.113.9:4000"),
            None
        ));
    }

    #[test]
    fn loopback_peers_are_accepted_without_token() {
        let config = config_with_token(Some("secret"));
        let headers = HeaderMap::new();
        assert!(is_authorized(&config, &headers, remote("127.0.0.1:4000"), None));
        assert!(is_authorized(&config, &headers, remote("[::1]:4000"), None));
        assert!(is_authorized(
            &config,
            &headers,
            remote("[::ffff:127.0.0.1]:4000"),
            None
        ));
    }

    #[test]
    fn no_configured_token_accepts_everyone() {
        let config = config_with_token(None);
        assert!(is_authorized(
            &config,
            &HeaderMap::new(),
            remote("203.0.113.9:4000"),
            None
        ));
    }

    #[test]
    fn bearer_header_matches_token() {
        let config = config_with_token(Some("secret"));
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        assert!(is_authorized(
            &config,
            &headers,
            remote("203.0.113.9:4000"),
            None
        ));
    }

    #[test]
    fn bare_authorization_header_matches_token() {
        let config = config_with_token(Some("secret"));
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "secret".parse().unwrap());
        assert!(is_authorized(
            &config,
            &headers,
            remote("203.0.113.9:4000"),
            None
        ));
    }

    #[test]
    fn x_auth_token_and_query_fallbacks() {
        let config = config_with_token(Some("secret"));

        let mut headers = HeaderMap::new();
        headers.insert("x-auth-token", "secret".parse().unwrap());
        assert!(is_authorized(
            &config,
            &headers,
            remote("203.0.113.9:4000"),
            None
        ));

        assert!(is_authorized(
            &config,
            &HeaderMap::new(),
            remote("203.0.113.9:4000"),
            Some("secret")
        ));
    }

    #[test]
    fn authorization_header_shadows_query_token() {
        // header is checked first, even when wrong and the query is right
        let config = config_with_token(Some("secret"));
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer wrong".parse().unwrap());
        assert!(!is_authorized(
            &config,
            &headers,
            remote("203.0.113.9:4000"),
            Some("secret")
        ));
    }

    #[test]
    fn wrong_or_missing_secret_is_rejected() {
        let config = config_with_token(Some("secret"));
        assert!(!is_authorized(
            &config,
            &HeaderMap::new(),
            remote("203.0.113.9:4000"),
            None
        ));
        assert!(!is_authorized(
            &config,
            &HeaderMap::new(),
            remote("203.0.113.9:4000"),
            Some("nope")
        ));
    }
}
