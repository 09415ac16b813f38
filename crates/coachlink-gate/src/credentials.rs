//! Pulling credentials out of request headers.

use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use coachlink_core::Credentials;

/// Read the access token from a request.
///
/// An `Authorization: Bearer` header wins over the session cookie. Malformed
/// headers are ignored rather than rejected; the gate treats them as absent.
pub fn extract_credentials(headers: &HeaderMap, cookie_name: &str) -> Credentials {
    if let Some(token) = bearer_token(headers) {
        return Credentials::bearer(token);
    }
    match cookie_value(headers, cookie_name) {
        Some(token) => Credentials::bearer(token),
        None => Credentials::none(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.trim_matches('"').to_string())
}
