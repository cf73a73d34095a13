//! Visitor information for logs.
//!
//! Lookup order: `Client-IP` header, first `X-Forwarded-For` entry, then
//! the socket peer address. Header values that do not parse as an IP
//! address are skipped, so nothing client-controlled reaches the logs
//! verbatim.

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use std::net::{IpAddr, SocketAddr};

/// Placeholder when no source yields an address.
pub const UNKNOWN: &str = "Unknown";

/// Best-effort client IP of `request`.
pub fn client_ip<B>(request: &Request<B>) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    resolve(request.headers(), peer)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn resolve(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    header_ip(headers, "client-ip", |v| v)
        .or_else(|| header_ip(headers, "x-forwarded-for", |v| v.split(',').next().unwrap_or("")))
        .or(peer)
}

fn header_ip(headers: &HeaderMap, name: &str, pick: impl Fn(&str) -> &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| pick(v).trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/ollama/models");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_client_ip_header_wins() {
        let req = request(&[("Client-IP", "10.0.0.7"), ("X-Forwarded-For", "203.0.113.9")]);
        assert_eq!(client_ip(&req), "10.0.0.7");
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let req = request(&[("X-Forwarded-For", "203.0.113.9, 10.0.0.1")]);
        assert_eq!(client_ip(&req), "203.0.113.9");
    }

    #[test]
    fn test_falls_back_to_peer() {
        let mut req = request(&[("Client-IP", "<script>")]);
        req.extensions_mut()
            .insert(ConnectInfo("192.168.1.20:51000".parse::<SocketAddr>().unwrap()));
        assert_eq!(client_ip(&req), "192.168.1.20");
    }

    #[test]
    fn test_unknown_without_sources() {
        assert_eq!(client_ip(&request(&[])), UNKNOWN);
    }
}
