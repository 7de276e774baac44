//! User profile endpoints, account settings and session login.

use fastprint_integration_tests::{PASSWORD, TestContext};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn list(ctx: &TestContext, query: &[(&str, &str)]) -> Vec<Value> {
    let resp = TestContext::client()
        .get(ctx.url("/api/userprofiles/"))
        .query(query)
        .send()
        .await
        .expect("Failed to list profiles");
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.expect("Invalid profile list")
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let ctx = TestContext::start().await;

    let resp = TestContext::client()
        .post(ctx.url("/api/userprofiles/"))
        .json(&json!({ "email": "abc" }))
        .send()
        .await
        .expect("Failed to post profile");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid error body");
    assert!(body["email"].is_array());
}

#[tokio::test]
async fn test_username_defaults_to_local_part() {
    let ctx = TestContext::start().await;

    let profile = ctx.create_profile(json!({ "email": "a@b.com" })).await;

    assert_eq!(profile["username"], "a");
    assert_eq!(profile["email"], "a@b.com");
    assert!(profile.get("password").is_none());
    assert!(profile.get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_email_is_a_field_error() {
    let ctx = TestContext::start().await;
    ctx.create_profile(json!({ "email": "dup@example.com" })).await;

    let resp = TestContext::client()
        .post(ctx.url("/api/userprofiles/"))
        .json(&json!({ "email": "dup@example.com" }))
        .send()
        .await
        .expect("Failed to post profile");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid error body");
    assert!(body["email"].is_array());
}

#[tokio::test]
async fn test_password_becomes_usable_after_update() {
    let ctx = TestContext::start().await;
    let profile = ctx
        .create_profile(json!({ "email": "late@example.com" }))
        .await;
    assert_eq!(profile["has_usable_password"], false);

    let client = TestContext::client();
    let resp = ctx.login(&client, "late@example.com", "").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let staff = ctx.staff("desk@example.com").await;
    let id = profile["id"].as_i64().expect("profile id");
    let resp = staff
        .patch(ctx.url(&format!("/api/userprofiles/{id}/")))
        .json(&json!({ "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to patch profile");
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.expect("Invalid profile");
    assert_eq!(updated["has_usable_password"], true);

    let resp = ctx.login(&client, "late@example.com", PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Password changes
// ============================================================================

#[tokio::test]
async fn test_anonymous_password_change_is_refused() {
    let ctx = TestContext::start().await;
    let profile = ctx
        .create_profile(json!({ "email": "owner@example.com", "password": PASSWORD }))
        .await;
    let id = profile["id"].as_i64().expect("profile id");
    let anonymous = TestContext::client();

    let resp = anonymous
        .patch(ctx.url(&format!("/api/userprofiles/{id}/")))
        .json(&json!({ "password": "not-yours-1" }))
        .send()
        .await
        .expect("Failed to patch profile");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = anonymous
        .put(ctx.url(&format!("/api/userprofiles/{id}/")))
        .json(&json!({ "email": "owner@example.com", "password": "not-yours-2" }))
        .send()
        .await
        .expect("Failed to put profile");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = anonymous
        .post(ctx.url("/api/userprofiles/save-settings/"))
        .json(&json!({ "email": "owner@example.com", "password": "not-yours-3" }))
        .send()
        .await
        .expect("Failed to save settings");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Invalid settings body");
    assert_eq!(body["success"], false);

    for attempt in ["not-yours-1", "not-yours-2", "not-yours-3"] {
        let resp = ctx.login(&TestContext::client(), "owner@example.com", attempt).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let resp = ctx
        .login(&TestContext::client(), "owner@example.com", PASSWORD)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_other_customer_cannot_change_password() {
    let ctx = TestContext::start().await;
    let profile = ctx
        .create_profile(json!({ "email": "owner@example.com", "password": PASSWORD }))
        .await;
    let id = profile["id"].as_i64().expect("profile id");
    let intruder = ctx.signed_in("intruder@example.com").await;

    let resp = intruder
        .patch(ctx.url(&format!("/api/userprofiles/{id}/")))
        .json(&json!({ "password": "not-yours-1" }))
        .send()
        .await
        .expect("Failed to patch profile");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = intruder
        .post(ctx.url("/api/userprofiles/save-settings/"))
        .json(&json!({ "email": "owner@example.com", "password": "not-yours-2" }))
        .send()
        .await
        .expect("Failed to save settings");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ctx
        .login(&TestContext::client(), "owner@example.com", PASSWORD)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_owner_can_change_own_password() {
    let ctx = TestContext::start().await;
    let profile = ctx
        .create_profile(json!({ "email": "owner@example.com", "password": PASSWORD }))
        .await;
    let client = TestContext::client();
    let resp = ctx.login(&client, "owner@example.com", PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let id = profile["id"].as_i64().expect("profile id");
    let resp = client
        .patch(ctx.url(&format!("/api/userprofiles/{id}/")))
        .json(&json!({ "password": "a-new-secret" }))
        .send()
        .await
        .expect("Failed to patch profile");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .login(&TestContext::client(), "owner@example.com", "a-new-secret")
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_save_settings_can_create_with_password() {
    let ctx = TestContext::start().await;

    let resp = TestContext::client()
        .post(ctx.url("/api/userprofiles/save-settings/"))
        .json(&json!({ "email": "fresh@example.com", "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to save settings");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .login(&TestContext::client(), "fresh@example.com", PASSWORD)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Read, update, delete
// ============================================================================

#[tokio::test]
async fn test_search_with_exact_email_returns_one_profile() {
    let ctx = TestContext::start().await;
    ctx.create_profile(json!({ "email": "ann@example.com" })).await;
    ctx.create_profile(json!({ "email": "joann@example.com" })).await;

    let broad = list(&ctx, &[("search", "ann")]).await;
    assert_eq!(broad.len(), 2);

    let exact = list(&ctx, &[("search", "ann@example.com")]).await;
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0]["email"], "ann@example.com");
}

#[tokio::test]
async fn test_put_requires_email() {
    let ctx = TestContext::start().await;
    let profile = ctx.create_profile(json!({ "email": "put@example.com" })).await;
    let id = profile["id"].as_i64().expect("profile id");

    let resp = TestContext::client()
        .put(ctx.url(&format!("/api/userprofiles/{id}/")))
        .json(&json!({ "first_name": "Grace" }))
        .send()
        .await
        .expect("Failed to put profile");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid error body");
    assert!(body["email"].is_array());
}

#[tokio::test]
async fn test_delete_unknown_profile_is_404() {
    let ctx = TestContext::start().await;
    let client = TestContext::client();

    let resp = client
        .delete(ctx.url("/api/userprofiles/9999/"))
        .send()
        .await
        .expect("Failed to delete profile");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.expect("Invalid error body");
    assert!(body["detail"].is_string());

    let resp = client
        .delete(ctx.url("/api/userprofiles/9999/delete-account/"))
        .send()
        .await
        .expect("Failed to delete account");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.expect("Invalid settings body");
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Profile not found");
}

#[tokio::test]
async fn test_delete_account_removes_profile() {
    let ctx = TestContext::start().await;
    let profile = ctx.create_profile(json!({ "email": "bye@example.com" })).await;
    let id = profile["id"].as_i64().expect("profile id");

    let resp = TestContext::client()
        .delete(ctx.url(&format!("/api/userprofiles/{id}/delete-account/")))
        .send()
        .await
        .expect("Failed to delete account");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid settings body");
    assert_eq!(body["success"], true);

    assert!(list(&ctx, &[("email", "bye@example.com")]).await.is_empty());
}

// ============================================================================
// Account settings
// ============================================================================

#[tokio::test]
async fn test_save_settings_upserts_by_email() {
    let ctx = TestContext::start().await;
    let client = TestContext::client();

    for first_name in ["Ada", "Augusta"] {
        let resp = client
            .post(ctx.url("/api/userprofiles/save-settings/"))
            .json(&json!({ "email": "  ada@example.com ", "first_name": first_name }))
            .send()
            .await
            .expect("Failed to save settings");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("Invalid settings body");
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["first_name"], first_name);
    }

    let profiles = list(&ctx, &[("email", "ada@example.com")]).await;
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["first_name"], "Augusta");
}

#[tokio::test]
async fn test_save_settings_requires_email() {
    let ctx = TestContext::start().await;

    let resp = TestContext::client()
        .post(ctx.url("/api/userprofiles/save-settings/"))
        .json(&json!({ "email": "   ", "first_name": "Nobody" }))
        .send()
        .await
        .expect("Failed to save settings");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid settings body");
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Email is required.");
}

// ============================================================================
// Session
// ============================================================================

#[tokio::test]
async fn test_me_requires_login() {
    let ctx = TestContext::start().await;

    let resp = TestContext::client()
        .get(ctx.url("/api/userprofiles/me/"))
        .send()
        .await
        .expect("Failed to get me");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_logged_in_profile() {
    let ctx = TestContext::start().await;
    let client = ctx.signed_in("me@example.com").await;

    let resp = client
        .get(ctx.url("/api/userprofiles/me/"))
        .send()
        .await
        .expect("Failed to get me");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid profile");
    assert_eq!(body["email"], "me@example.com");
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let ctx = TestContext::start().await;
    ctx.create_profile(json!({ "email": "pw@example.com", "password": PASSWORD }))
        .await;

    let resp = ctx
        .login(&TestContext::client(), "pw@example.com", "not it")
        .await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let ctx = TestContext::start().await;
    let client = ctx.signed_in("out@example.com").await;

    let resp = client
        .post(ctx.url("/api/auth/logout"))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(ctx.url("/api/userprofiles/me/"))
        .send()
        .await
        .expect("Failed to get me");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleted_profile_ends_its_session() {
    let ctx = TestContext::start().await;
    let profile = ctx
        .create_profile(json!({ "email": "gone@example.com", "password": PASSWORD }))
        .await;
    let client = TestContext::client();
    let resp = ctx.login(&client, "gone@example.com", PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let id = profile["id"].as_i64().expect("profile id");
    let resp = TestContext::client()
        .delete(ctx.url(&format!("/api/userprofiles/{id}/")))
        .send()
        .await
        .expect("Failed to delete profile");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .post(ctx.url("/api/cart/items/"))
        .json(&fastprint_integration_tests::cart_item())
        .send()
        .await
        .expect("Failed to post cart item");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(ctx.url("/api/userprofiles/me/"))
        .send()
        .await
        .expect("Failed to get me");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_sees_profile_changes() {
    let ctx = TestContext::start().await;
    let client = ctx.signed_in("renamed@example.com").await;
    let profile = list(&ctx, &[("email", "renamed@example.com")]).await;
    let id = profile[0]["id"].as_i64().expect("profile id");

    let resp = client
        .patch(ctx.url(&format!("/api/userprofiles/{id}/")))
        .json(&json!({ "email": "moved@example.com" }))
        .send()
        .await
        .expect("Failed to patch profile");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(ctx.url("/api/userprofiles/me/"))
        .send()
        .await
        .expect("Failed to get me");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid profile");
    assert_eq!(body["email"], "moved@example.com");
}
