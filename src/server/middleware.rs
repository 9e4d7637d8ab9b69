//! HTTP middleware for signon-gate
//!
//! The trust-and-access layer is composed of three middlewares that each
//! either terminate the request or call the next service in the chain:
//!
//! - `cors_middleware`: Origin whitelist enforcement and preflight replies
//! - `rate_limit_middleware`: per-client-IP token buckets
//! - `auth_middleware`: bearer-token API key verification
//!
//! Public mutation routes compose CORS -> rate limit -> handler, so a
//! disallowed browser origin is rejected before it consumes a rate-limit
//! token. Admin routes are not browser-originated and use auth alone.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::Instant;

use crate::cors;
use crate::database::{KeyStore, OriginStore};

use super::router::AppState;

/// Authorization scheme expected on admin routes
const BEARER_PREFIX: &str = "Bearer";

/// API key authentication middleware
///
/// Extracts `Authorization: Bearer {id}.{secret}` and verifies it against
/// the key store. Any other header shape is treated as "no credential".
/// Verification failure maps to 401; storage failure maps to a generic 500.
pub async fn auth_middleware<D>(
    State(state): State<AppState<D>>,
    request: Request,
    next: Next,
) -> Result<Response, PolicyResponse>
where
    D: KeyStore + OriginStore + 'static,
{
    let Some(token) = extract_bearer_token(&request) else {
        return Err(PolicyResponse::missing_token());
    };

    let verified = state
        .keys
        .verify(token)
        .await
        .map_err(|e| PolicyResponse::storage_failure("Failed to verify token", &e))?;

    if !verified {
        return Err(PolicyResponse::invalid_token());
    }

    Ok(next.run(request).await)
}

/// CORS whitelist middleware
///
/// An empty Origin header (non-browser caller) always passes. A non-empty
/// origin must exact-match the whitelist or the request ends with 403.
/// Allowed origins get the CORS response headers echoed back, and OPTIONS
/// preflights are answered 204 without reaching the inner handler.
pub async fn cors_middleware<D>(
    State(state): State<AppState<D>>,
    request: Request,
    next: Next,
) -> Result<Response, PolicyResponse>
where
    D: KeyStore + OriginStore + 'static,
{
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let allowed = state
        .cors
        .is_allowed(&origin)
        .await
        .map_err(|e| PolicyResponse::storage_failure("Failed to verify origin", &e))?;

    if !allowed {
        return Err(PolicyResponse::origin_not_allowed());
    }

    if request.method() == axum::http::Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        set_cors_headers(&mut response, &origin);
        return Ok(response);
    }

    let mut response = next.run(request).await;
    set_cors_headers(&mut response, &origin);
    Ok(response)
}

/// Per-client rate limiting middleware
///
/// The client IP is the first entry of `X-Forwarded-For` when an upstream
/// proxy supplies it, otherwise the socket peer address. A drained bucket
/// ends the request with 429.
pub async fn rate_limit_middleware<D>(
    State(state): State<AppState<D>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, PolicyResponse>
where
    D: KeyStore + OriginStore + 'static,
{
    let ip = client_ip(&request, addr);

    if !state.limiter.allow(&ip) {
        return Err(PolicyResponse::rate_limited());
    }

    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
///
/// Returns `None` for a missing header or any non-Bearer scheme.
fn extract_bearer_token(request: &Request) -> Option<&str> {
    let auth = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;

    let (scheme, token) = auth.split_once(' ')?;
    if scheme != BEARER_PREFIX || token.is_empty() {
        return None;
    }

    Some(token)
}

/// Resolve the client IP for rate limiting
fn client_ip(request: &Request, peer: SocketAddr) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    peer.ip().to_string()
}

/// Set CORS response headers
///
/// Headers are only emitted for a non-empty origin, and the allow-origin
/// value is always the literal requesting origin, never a wildcard.
fn set_cors_headers(response: &mut Response, origin: &str) {
    if origin.is_empty() {
        return;
    }

    let Ok(origin_value) = HeaderValue::from_str(origin) else {
        return;
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin_value);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(cors::ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(cors::ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(cors::MAX_AGE_SECS),
    );
}

/// Terminal middleware response
///
/// Policy rejections and storage failures both end the request here; the
/// body is a small JSON object that never leaks internal error detail.
pub struct PolicyResponse {
    status: StatusCode,
    message: String,
}

impl PolicyResponse {
    fn missing_token() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Missing authorization token".to_string(),
        }
    }

    fn invalid_token() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid authorization token".to_string(),
        }
    }

    fn origin_not_allowed() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: "Origin not allowed".to_string(),
        }
    }

    fn rate_limited() -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "Rate limit exceeded".to_string(),
        }
    }

    fn storage_failure(message: &str, err: &dyn std::error::Error) -> Self {
        tracing::error!(error = %err, "{}", message);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for PolicyResponse {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

/// Access-log middleware
///
/// Logs method, path, status, and duration for every request.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}
