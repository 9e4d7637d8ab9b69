//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use signon_gate::database::SqliteDatabase;
use signon_gate::ratelimit::{RateLimitConfig, RateLimiterRegistry};
use signon_gate::server::{apply_public_guards, build_router, AppState};

/// Create an in-memory database for testing
pub async fn create_test_database() -> Arc<SqliteDatabase> {
    Arc::new(
        SqliteDatabase::in_memory()
            .await
            .expect("Failed to create test database"),
    )
}

/// Create a test application state with default rate limits
pub async fn create_test_state() -> AppState<SqliteDatabase> {
    create_test_state_with_limits(RateLimitConfig::default()).await
}

/// Create a test application state with a custom rate-limit config
pub async fn create_test_state_with_limits(limits: RateLimitConfig) -> AppState<SqliteDatabase> {
    let database = create_test_database().await;
    let limiter = Arc::new(RateLimiterRegistry::new(limits));
    AppState::new(database, limiter)
}

/// Issue an API key and return its bearer token
pub async fn issue_test_key(state: &AppState<SqliteDatabase>) -> String {
    state
        .keys
        .issue()
        .await
        .expect("Failed to issue test key")
        .token
}

/// Run the admin/health router in the background and return the address
///
/// The server shuts down when the returned sender is dropped or sent.
pub async fn run_test_server(
    state: AppState<SqliteDatabase>,
) -> (SocketAddr, oneshot::Sender<()>) {
    let app = build_router(state);
    spawn_server(app).await
}

/// Run a public route behind the CORS and rate-limit guards
///
/// The inner handler counts every request that actually reaches it, so
/// tests can assert which requests the guard chain short-circuited.
pub async fn run_public_test_server(
    state: AppState<SqliteDatabase>,
) -> (SocketAddr, oneshot::Sender<()>, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let inner = Router::new().route(
        "/submit",
        any(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "accepted"
            }
        }),
    );

    let app = apply_public_guards(inner, state);
    let (addr, shutdown_tx) = spawn_server(app).await;
    (addr, shutdown_tx, hits)
}

async fn spawn_server(app: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await
        .expect("Server error");
    });

    // Give the server a moment to start (100ms is sufficient for slow CI systems)
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    (addr, shutdown_tx)
}
