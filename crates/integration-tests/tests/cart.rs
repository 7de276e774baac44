//! Cart endpoints: ownership scoping, partial updates and the envelope.

use fastprint_integration_tests::{TestContext, cart_item};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_cart_requires_login() {
    let ctx = TestContext::start().await;

    let resp = TestContext::client()
        .get(ctx.url("/api/cart/items/"))
        .send()
        .await
        .expect("Failed to list cart");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Invalid error body");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_spoofed_user_is_ignored() {
    let ctx = TestContext::start().await;
    let victim = ctx
        .create_profile(json!({ "email": "victim@example.com" }))
        .await;
    let client = ctx.signed_in("buyer@example.com").await;

    let mut body = cart_item();
    body["user"] = victim["id"].clone();
    let resp = client
        .post(ctx.url("/api/cart/items/"))
        .json(&body)
        .send()
        .await
        .expect("Failed to add cart item");

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Cart item added successfully");
    assert_eq!(body["data"]["user_email"], "buyer@example.com");
}

#[tokio::test]
async fn test_other_users_item_is_not_found() {
    let ctx = TestContext::start().await;
    let owner = ctx.signed_in("owner@example.com").await;
    let stranger = ctx.signed_in("stranger@example.com").await;
    let item = ctx.add_to_cart(&owner).await;
    let path = format!("/api/cart/items/{}/", item["id"]);

    let resp = stranger
        .get(ctx.url(&path))
        .send()
        .await
        .expect("Failed to get cart item");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["status"], "error");
    assert!(body.get("data").is_none());

    let resp = stranger
        .delete(ctx.url(&path))
        .send()
        .await
        .expect("Failed to delete cart item");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = owner
        .get(ctx.url(&path))
        .send()
        .await
        .expect("Failed to get cart item");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_patch_subtotal_leaves_other_fields() {
    let ctx = TestContext::start().await;
    let client = ctx.signed_in("patch@example.com").await;
    let before = ctx.add_to_cart(&client).await;

    let resp = client
        .patch(ctx.url(&format!("/api/cart/items/{}/", before["id"])))
        .json(&json!({ "subtotal": "50.00" }))
        .send()
        .await
        .expect("Failed to patch cart item");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["message"], "Cart item updated successfully");

    let mut after = body["data"].clone();
    assert_eq!(after["subtotal"], "50.00");

    for changed in ["subtotal", "updated_at"] {
        after[changed] = Value::Null;
    }
    let mut expected = before;
    for changed in ["subtotal", "updated_at"] {
        expected[changed] = Value::Null;
    }
    assert_eq!(after, expected);
}

#[tokio::test]
async fn test_put_requires_every_field() {
    let ctx = TestContext::start().await;
    let client = ctx.signed_in("put@example.com").await;
    let item = ctx.add_to_cart(&client).await;

    let resp = client
        .put(ctx.url(&format!("/api/cart/items/{}/", item["id"])))
        .json(&json!({ "subtotal": "50.00" }))
        .send()
        .await
        .expect("Failed to put cart item");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["status"], "error");
    assert!(body["errors"]["first_name"].is_array());
}

#[tokio::test]
async fn test_missing_required_field_on_create() {
    let ctx = TestContext::start().await;
    let client = ctx.signed_in("partial@example.com").await;

    let mut body = cart_item();
    body.as_object_mut()
        .expect("cart item is an object")
        .remove("city");
    let resp = client
        .post(ctx.url("/api/cart/items/"))
        .json(&body)
        .send()
        .await
        .expect("Failed to add cart item");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert!(body["errors"]["city"].is_array());
}

#[tokio::test]
async fn test_list_and_clear_only_touch_own_items() {
    let ctx = TestContext::start().await;
    let mine = ctx.signed_in("mine@example.com").await;
    let theirs = ctx.signed_in("theirs@example.com").await;
    ctx.add_to_cart(&mine).await;
    ctx.add_to_cart(&mine).await;
    ctx.add_to_cart(&theirs).await;

    let resp = mine
        .get(ctx.url("/api/cart/items/"))
        .send()
        .await
        .expect("Failed to list cart");
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["results"], 2);

    let resp = mine
        .delete(ctx.url("/api/cart/items/"))
        .send()
        .await
        .expect("Failed to clear cart");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["data"]["removed"], 2);

    let resp = theirs
        .get(ctx.url("/api/cart/items/"))
        .send()
        .await
        .expect("Failed to list cart");
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["results"], 1);
}

#[tokio::test]
async fn test_wrong_type_is_a_field_error_in_the_envelope() {
    let ctx = TestContext::start().await;
    let client = ctx.signed_in("typo@example.com").await;

    let mut body = cart_item();
    body["product_quantity"] = json!("x");
    let resp = client
        .post(ctx.url("/api/cart/items/"))
        .json(&body)
        .send()
        .await
        .expect("Failed to add cart item");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["status"], "error");
    assert!(body["errors"]["product_quantity"].is_array());
}

#[tokio::test]
async fn test_malformed_requests_use_the_envelope() {
    let ctx = TestContext::start().await;
    let client = ctx.signed_in("broken@example.com").await;

    let resp = client
        .post(ctx.url("/api/cart/items/"))
        .header("content-type", "application/json")
        .body("{\"first_name\": ")
        .send()
        .await
        .expect("Failed to add cart item");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["status"], "error");
    assert!(body["message"].is_string());

    let resp = client
        .get(ctx.url("/api/cart/items/abc/"))
        .send()
        .await
        .expect("Failed to get cart item");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid envelope");
    assert_eq!(body["status"], "error");
    assert!(body["message"].is_string());
}
