//! Locating the inbound token on a request.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use super::AuthError;

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Pick the token from the request body, falling back to the
/// `Authorization: Bearer` header.
pub fn request_token<'a>(
    body_token: Option<&'a str>,
    headers: &'a HeaderMap,
) -> Result<&'a str, AuthError> {
    if let Some(token) = body_token.filter(|t| !t.is_empty()) {
        return Ok(token);
    }

    match headers.get(AUTHORIZATION) {
        Some(value) => {
            let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
            bearer_token_from_header(value)
        }
        None => Err(AuthError::MissingToken),
    }
}
