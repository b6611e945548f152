//! services/api/src/web/client.rs
//!
//! Client identification: the throttle key (IP address with
//! forwarded-for precedence) and the unlimited-access cookie check.

use axum::http::{header, HeaderMap};
use std::net::SocketAddr;

/// Cookie-name prefix that marks a paid unlimited-access grant.
pub const ACCESS_COOKIE_PREFIX: &str = "sintgpt-";

/// Resolves the client identifier used as the rate-limit/debounce key.
/// The first address in `x-forwarded-for` wins; otherwise the peer
/// socket address is used.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

/// Returns whether any request cookie's name starts with the access
/// prefix. The cookie's value is irrelevant; its presence is the grant.
pub fn has_unlimited_access(headers: &HeaderMap) -> bool {
    let Some(cookie_header) = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    cookie_header.split(';').any(|cookie| {
        cookie
            .trim()
            .split_once('=')
            .is_some_and(|(name, _)| name.trim().starts_with(ACCESS_COOKIE_PREFIX))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "10.0.0.1:54321".parse().unwrap()
    }

    #[test]
    fn forwarded_for_takes_precedence_over_the_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 198.51.100.2"),
        );
        assert_eq!(client_ip(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_the_peer_address() {
        assert_eq!(client_ip(&HeaderMap::new(), peer()), "10.0.0.1");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(client_ip(&headers, peer()), "10.0.0.1");
    }

    #[test]
    fn detects_an_access_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sintgpt-a1b2c3=true; lang=nl"),
        );
        assert!(has_unlimited_access(&headers));
    }

    #[test]
    fn rejects_cookies_without_the_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc"),
        );
        assert!(!has_unlimited_access(&headers));
        assert!(!has_unlimited_access(&HeaderMap::new()));
    }

    #[test]
    fn prefix_must_be_on_the_name_not_the_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("referrer=sintgpt-landing"),
        );
        assert!(!has_unlimited_access(&headers));
    }
}
