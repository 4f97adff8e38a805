//! List, item, and group endpoints, driven through the real router.

use axum::http::{Method, StatusCode};
use serde_json::json;

use pantry_integration_tests::{TestContext, principal};

#[tokio::test]
async fn test_api_requires_a_bearer_token() {
    let ctx = TestContext::new();
    let (status, _) = ctx.send(Method::GET, "/api/lists", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_probes() {
    let ctx = TestContext::new();
    let (status, _) = ctx.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_crud_round_trip() {
    let ctx = TestContext::new();
    let owner = principal("Ada");

    let (status, created) = ctx
        .send(
            Method::POST,
            "/api/lists",
            Some(&owner),
            Some(json!({"name": "Groceries", "description": "weekly run"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Groceries");
    let list_id = created["id"].as_str().expect("list id").to_owned();

    let (status, index) = ctx.send(Method::GET, "/api/lists", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(index.as_array().map(Vec::len), Some(1));

    let (status, detail) = ctx
        .send(Method::GET, &format!("/api/lists/{list_id}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["list"]["id"], created["id"]);
    assert_eq!(detail["items"], json!([]));
    assert_eq!(detail["groups"], json!([]));

    let (status, updated) = ctx
        .send(
            Method::PUT,
            &format!("/api/lists/{list_id}"),
            Some(&owner),
            Some(json!({"name": "Weekend shop"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Weekend shop");

    let (status, _) = ctx
        .send(Method::DELETE, &format!("/api/lists/{list_id}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx
        .send(Method::GET, &format!("/api/lists/{list_id}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lists_are_hidden_from_non_members() {
    let ctx = TestContext::new();
    let owner = principal("Ada");
    let stranger = principal("Mallory");

    let (_, created) = ctx
        .send(
            Method::POST,
            "/api/lists",
            Some(&owner),
            Some(json!({"name": "Groceries"})),
        )
        .await;
    let list_id = created["id"].as_str().expect("list id");

    let (status, _) = ctx
        .send(Method::GET, &format!("/api/lists/{list_id}"), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An id that never existed reads as plain not-found.
    let ghost = pantry_core::ListId::generate();
    let (status, _) = ctx
        .send(Method::GET, &format!("/api/lists/{ghost}"), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_item_lifecycle_and_group_assignment() {
    let ctx = TestContext::new();
    let owner = principal("Ada");

    let (_, list) = ctx
        .send(
            Method::POST,
            "/api/lists",
            Some(&owner),
            Some(json!({"name": "Groceries"})),
        )
        .await;
    let list_id = list["id"].as_str().expect("list id").to_owned();

    let (status, group) = ctx
        .send(
            Method::POST,
            &format!("/api/lists/{list_id}/groups"),
            Some(&owner),
            Some(json!({"name": "Dairy", "sort_order": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = group["id"].as_str().expect("group id").to_owned();

    let (status, item) = ctx
        .send(
            Method::POST,
            &format!("/api/lists/{list_id}/items"),
            Some(&owner),
            Some(json!({"name": "Milk", "quantity": 2, "group_id": group_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["is_bought"], false);
    assert_eq!(item["group_id"], group["id"]);
    let item_id = item["id"].as_str().expect("item id").to_owned();

    let (status, bought) = ctx
        .send(
            Method::PUT,
            &format!("/api/lists/{list_id}/items/{item_id}/bought"),
            Some(&owner),
            Some(json!({"is_bought": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bought["is_bought"], true);
    assert!(bought["bought_at"].is_string());

    // Deleting the group detaches the item instead of deleting it.
    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/lists/{list_id}/groups/{group_id}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, detail) = ctx
        .send(Method::GET, &format!("/api/lists/{list_id}"), Some(&owner), None)
        .await;
    assert_eq!(detail["items"][0]["group_id"], json!(null));

    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/lists/{list_id}/items/{item_id}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_input_validation() {
    let ctx = TestContext::new();
    let owner = principal("Ada");

    let (status, _) = ctx
        .send(Method::POST, "/api/lists", Some(&owner), Some(json!({"name": "  "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = ctx
        .send(
            Method::POST,
            "/api/lists",
            Some(&owner),
            Some(json!({"name": "Groceries"})),
        )
        .await;
    let list_id = list["id"].as_str().expect("list id");

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/lists/{list_id}/items"),
            Some(&owner),
            Some(json!({"name": "Milk", "quantity": 0})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A group from a different list is rejected.
    let (_, other) = ctx
        .send(
            Method::POST,
            "/api/lists",
            Some(&owner),
            Some(json!({"name": "Other"})),
        )
        .await;
    let other_id = other["id"].as_str().expect("list id");
    let (_, foreign_group) = ctx
        .send(
            Method::POST,
            &format!("/api/lists/{other_id}/groups"),
            Some(&owner),
            Some(json!({"name": "Elsewhere"})),
        )
        .await;
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/lists/{list_id}/items"),
            Some(&owner),
            Some(json!({"name": "Milk", "group_id": foreign_group["id"]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_provisions_and_returns_the_caller() {
    let ctx = TestContext::new();
    let user = principal("Ada");

    let (status, me) = ctx.send(Method::GET, "/api/me", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], json!(user.id));
    assert_eq!(me["email"], "ada@example.com");
}
