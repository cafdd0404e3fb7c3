use std::net::SocketAddr;

use axum::http::{header::AUTHORIZATION, header::USER_AGENT, HeaderMap};
use pharmacy_auth::ClientInfo;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::ApiError;

pub const DEFAULT_PER_PAGE: u32 = 25;
pub const MAX_PER_PAGE: u32 = 100;

pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }

    Ok(token.to_string())
}

/// Client address and user agent.
///
/// With `trust_proxy_headers` the address comes from `X-Forwarded-For`, then
/// `X-Real-IP`, then the socket. Otherwise only the socket address is used.
pub fn client_info(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> ClientInfo {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let forwarded = || {
        header_str("x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| header_str("x-real-ip").map(str::to_string))
    };

    let ip = trust_proxy_headers
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()));

    ClientInfo {
        ip,
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Clamped to 1..=100.
    pub per_page: Option<u32>,
}

impl Pagination {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn require_bearer_extracts_token_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer TOKEN123"));

        let token = require_bearer(&headers).expect("token should be extracted");
        assert_eq!(token, "TOKEN123");
    }

    #[test]
    fn require_bearer_rejects_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));

        let error = require_bearer(&headers).expect_err("should reject missing token");
        assert_eq!(error.status, axum::http::StatusCode::UNAUTHORIZED);
        assert!(error.message.contains("missing bearer token"));
    }

    #[test]
    fn client_info_prefers_forwarded_address_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        let info = client_info(&headers, Some(peer), true);
        assert_eq!(info.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8"));

        let mut real_ip = HeaderMap::new();
        real_ip.insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));
        let info = client_info(&real_ip, Some(peer), true);
        assert_eq!(info.ip.as_deref(), Some("203.0.113.9"));

        let info = client_info(&HeaderMap::new(), Some(peer), true);
        assert_eq!(info.ip.as_deref(), Some("127.0.0.1"));
        assert!(client_info(&HeaderMap::new(), None, true).ip.is_none());
    }

    #[test]
    fn client_info_ignores_proxy_headers_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));
        let peer: SocketAddr = "192.0.2.10:44321".parse().unwrap();

        let info = client_info(&headers, Some(peer), false);
        assert_eq!(info.ip.as_deref(), Some("192.0.2.10"));
        assert!(client_info(&headers, None, false).ip.is_none());
    }

    #[test]
    fn pagination_clamps_and_offsets() {
        let page = Pagination { page: Some(3), per_page: Some(500) };
        assert_eq!(page.per_page(), MAX_PER_PAGE);
        assert_eq!(page.offset(), 200);

        let page = Pagination { page: Some(0), per_page: Some(0) };
        assert_eq!(page.page(), 1);
        assert_eq!(page.per_page(), 1);
        assert_eq!(page.offset(), 0);

        assert_eq!(Pagination::default().per_page(), DEFAULT_PER_PAGE);
    }
}
