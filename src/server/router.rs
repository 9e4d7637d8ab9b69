//! Route table and admin API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::KeyService;
use crate::cors::CorsService;
use crate::database::{KeyStore, OriginStore};
use crate::error::{AuthError, CorsError};
use crate::models::AllowedOrigins;
use crate::ratelimit::RateLimiterRegistry;

use super::middleware::{auth_middleware, cors_middleware, rate_limit_middleware};

/// Shared application state
///
/// The store type backs both the key and origin services so a single
/// database handle serves the whole trust layer.
pub struct AppState<D: KeyStore + OriginStore> {
    pub keys: Arc<KeyService<D>>,
    pub cors: Arc<CorsService<D>>,
    pub limiter: Arc<RateLimiterRegistry>,
}

// Manual impl: Arc fields clone regardless of whether D does
impl<D: KeyStore + OriginStore> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
            cors: Arc::clone(&self.cors),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<D> AppState<D>
where
    D: KeyStore + OriginStore + 'static,
{
    pub fn new(store: Arc<D>, limiter: Arc<RateLimiterRegistry>) -> Self {
        Self {
            keys: Arc::new(KeyService::new(Arc::clone(&store))),
            cors: Arc::new(CorsService::new(store)),
            limiter,
        }
    }
}

/// Build the full route table
///
/// `/health` is open. Key and origin management lives under `/admin` and
/// requires a valid API key; admin callers are not browsers, so those
/// routes skip the CORS and rate-limit guards.
pub fn build_router<D>(state: AppState<D>) -> Router
where
    D: KeyStore + OriginStore + 'static,
{
    let admin = Router::new()
        .route("/admin/keys", post(create_key).get(list_keys))
        .route("/admin/keys/:id", delete(delete_key))
        .route("/admin/cors", get(list_origins).post(add_origin))
        // Wildcard capture: origins contain slashes ("https://...")
        .route("/admin/cors/*origin", delete(delete_origin))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<D>,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(admin)
        .with_state(state)
}

/// Wrap a router in the public-route guard chain
///
/// Order matters: CORS runs outermost so a disallowed origin is rejected
/// before it consumes a rate-limit token, and preflights never count
/// against the caller's bucket.
pub fn apply_public_guards<D>(router: Router<AppState<D>>, state: AppState<D>) -> Router
where
    D: KeyStore + OriginStore + 'static,
{
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware::<D>,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cors_middleware::<D>,
        ))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /admin/keys
///
/// Issues a fresh key. The plaintext token appears in this response and
/// nowhere else.
async fn create_key<D>(State(state): State<AppState<D>>) -> Response
where
    D: KeyStore + OriginStore + 'static,
{
    match state.keys.issue().await {
        Ok(issued) => (StatusCode::CREATED, Json(issued)).into_response(),
        Err(e) => auth_error_response(e, "Failed to create key"),
    }
}

/// GET /admin/keys
async fn list_keys<D>(State(state): State<AppState<D>>) -> Response
where
    D: KeyStore + OriginStore + 'static,
{
    match state.keys.list().await {
        Ok(keys) => Json(keys).into_response(),
        Err(e) => auth_error_response(e, "Failed to list keys"),
    }
}

/// DELETE /admin/keys/{id}
async fn delete_key<D>(State(state): State<AppState<D>>, Path(id): Path<String>) -> Response
where
    D: KeyStore + OriginStore + 'static,
{
    match state.keys.revoke(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => auth_error_response(e, "Failed to delete key"),
    }
}

/// GET /admin/cors
async fn list_origins<D>(State(state): State<AppState<D>>) -> Response
where
    D: KeyStore + OriginStore + 'static,
{
    match state.cors.origins().await {
        Ok(origins) => Json(AllowedOrigins { origins }).into_response(),
        Err(e) => cors_error_response(e, "Failed to list origins"),
    }
}

#[derive(Debug, Deserialize)]
struct AddOriginRequest {
    origin: String,
}

/// POST /admin/cors
async fn add_origin<D>(
    State(state): State<AppState<D>>,
    Json(body): Json<AddOriginRequest>,
) -> Response
where
    D: KeyStore + OriginStore + 'static,
{
    match state.cors.add(&body.origin).await {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => cors_error_response(e, "Failed to add origin"),
    }
}

/// DELETE /admin/cors/{origin}
async fn delete_origin<D>(State(state): State<AppState<D>>, Path(origin): Path<String>) -> Response
where
    D: KeyStore + OriginStore + 'static,
{
    match state.cors.remove(&origin).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => cors_error_response(e, "Failed to remove origin"),
    }
}

fn auth_error_response(err: AuthError, context: &str) -> Response {
    let (status, message) = match &err {
        AuthError::KeyNotFound => (StatusCode::NOT_FOUND, "Key not found"),
        AuthError::InvalidKeyFormat => (StatusCode::BAD_REQUEST, "Invalid key format"),
        AuthError::Storage(_) => {
            tracing::error!(error = %err, "{}", context);
            (StatusCode::INTERNAL_SERVER_ERROR, context)
        }
    };
    error_body(status, message)
}

fn cors_error_response(err: CorsError, context: &str) -> Response {
    let (status, message) = match &err {
        CorsError::OriginNotFound => (StatusCode::NOT_FOUND, "Origin not found"),
        CorsError::EmptyOrigin => (StatusCode::BAD_REQUEST, "Origin must not be empty"),
        CorsError::Storage(_) => {
            tracing::error!(error = %err, "{}", context);
            (StatusCode::INTERNAL_SERVER_ERROR, context)
        }
    };
    error_body(status, message)
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
