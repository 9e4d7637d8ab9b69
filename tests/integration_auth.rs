//! Integration tests for API key issuance, verification, and revocation

mod common;

use common::{create_test_state, issue_test_key, run_test_server};
use reqwest::StatusCode;

// Test 1: health endpoint requires no credentials
#[tokio::test]
async fn test_health_endpoint_is_open() {
    let state = create_test_state().await;
    let (addr, _shutdown) = run_test_server(state).await;

    let response = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

// Test 2: admin routes reject a missing Authorization header
#[tokio::test]
async fn test_admin_requires_token() {
    let state = create_test_state().await;
    let (addr, _shutdown) = run_test_server(state).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/admin/keys", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing authorization token");
}

// Test 3: non-Bearer schemes are treated as missing credentials
#[tokio::test]
async fn test_admin_rejects_other_schemes() {
    let state = create_test_state().await;
    let (addr, _shutdown) = run_test_server(state).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/admin/keys", addr))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// Test 4: malformed and unknown tokens both come back 401
#[tokio::test]
async fn test_admin_rejects_invalid_tokens() {
    let state = create_test_state().await;
    let (addr, _shutdown) = run_test_server(state).await;

    let client = reqwest::Client::new();
    for token in ["no-dot-here", "unknown.deadbeef", ".secret", "id."] {
        let response = client
            .get(format!("http://{}/admin/keys", addr))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "token {:?} should be rejected",
            token
        );
    }
}

// Test 5: a valid key authorizes admin calls
#[tokio::test]
async fn test_valid_key_authorizes() {
    let state = create_test_state().await;
    let token = issue_test_key(&state).await;
    let (addr, _shutdown) = run_test_server(state).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/admin/keys", addr))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let keys: serde_json::Value = response.json().await.unwrap();
    assert_eq!(keys.as_array().unwrap().len(), 1);
}

// Test 6: issuing a key over HTTP returns the plaintext token once,
// and the listing only exposes metadata
#[tokio::test]
async fn test_issue_key_over_http() {
    let state = create_test_state().await;
    let admin_token = issue_test_key(&state).await;
    let (addr, _shutdown) = run_test_server(state).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/admin/keys", addr))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let issued: serde_json::Value = response.json().await.unwrap();
    let token = issued["token"].as_str().unwrap();
    let (id, secret) = token.split_once('.').unwrap();
    assert_eq!(issued["id"], id);
    assert_eq!(id.len(), 16);
    assert_eq!(secret.len(), 64);

    // The new key works immediately
    let response = client
        .get(format!("http://{}/admin/keys", addr))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Listing never includes token or secret material
    let keys: serde_json::Value = response.json().await.unwrap();
    for key in keys.as_array().unwrap() {
        assert!(key.get("token").is_none());
        assert!(key.get("secret").is_none());
        assert!(key.get("hash").is_none());
    }
}

// Test 7: a revoked key stops authorizing
#[tokio::test]
async fn test_revoked_key_is_rejected() {
    let state = create_test_state().await;
    let admin_token = issue_test_key(&state).await;
    let victim = state.keys.issue().await.unwrap();
    let (addr, _shutdown) = run_test_server(state).await;

    let client = reqwest::Client::new();

    // The victim key works before revocation
    let response = client
        .get(format!("http://{}/admin/keys", addr))
        .bearer_auth(&victim.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .delete(format!("http://{}/admin/keys/{}", addr, victim.id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("http://{}/admin/keys", addr))
        .bearer_auth(&victim.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// Test 8: deleting an unknown key id is a 404
#[tokio::test]
async fn test_delete_unknown_key() {
    let state = create_test_state().await;
    let admin_token = issue_test_key(&state).await;
    let (addr, _shutdown) = run_test_server(state).await;

    let client = reqwest::Client::new();
    let response = client
        .delete(format!("http://{}/admin/keys/{}", addr, "ffffffffffffffff"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// Test 9: a bootstrap-seeded key authorizes like any issued key
#[tokio::test]
async fn test_bootstrap_key_authorizes() {
    let state = create_test_state().await;
    let token = format!("default.{}", "a".repeat(64));
    state.keys.bootstrap(&token).await.unwrap();

    // A second bootstrap against a non-empty store is a no-op
    state
        .keys
        .bootstrap(&format!("other.{}", "b".repeat(64)))
        .await
        .unwrap();

    let (addr, _shutdown) = run_test_server(state).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/admin/keys", addr))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let keys: serde_json::Value = response.json().await.unwrap();
    let keys = keys.as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["id"], "default");
}
