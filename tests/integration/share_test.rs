//! Integration tests for sharing and permission inheritance.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_share_grants_access_to_subtree() {
    let app = helpers::TestApp::new().await;
    let (alice, _) = app.login("alice@example.com").await;
    let (bob, _) = app.login("bob@example.com").await;
    let docs = app.create_folder(&alice, "Docs", None).await;
    let inner = app.create_folder(&alice, "Inner", Some(&docs)).await;

    let response = app
        .request(
            "POST",
            &format!("/api/folders/{docs}/share"),
            Some(json!({ "email": "bob@example.com", "role": "viewer" })),
            Some(&alice),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["data"]["role"], "viewer");

    let response = app
        .request("GET", &format!("/api/folders/{inner}"), None, Some(&bob))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["folder"]["can_edit"], false);

    // Viewer cannot create below the shared folder.
    let response = app
        .request(
            "POST",
            "/api/folders",
            Some(json!({ "name": "Mine", "parent_id": docs })),
            Some(&bob),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.request("GET", "/api/share/with-me", None, Some(&bob)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_share_rejects_self_and_unknown_users() {
    let app = helpers::TestApp::new().await;
    let (alice, _) = app.login("alice@example.com").await;
    let docs = app.create_folder(&alice, "Docs", None).await;

    let response = app
        .request(
            "POST",
            "/api/share",
            Some(json!({
                "resource_id": docs,
                "resource_type": "folder",
                "email": "alice@example.com",
                "role": "editor"
            })),
            Some(&alice),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "POST",
            "/api/share",
            Some(json!({
                "resource_id": docs,
                "resource_type": "folder",
                "email": "nobody@example.com",
                "role": "editor"
            })),
            Some(&alice),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_share_conflicts() {
    let app = helpers::TestApp::new().await;
    let (alice, _) = app.login("alice@example.com").await;
    app.login("bob@example.com").await;
    let docs = app.create_folder(&alice, "Docs", None).await;
    let body = json!({
        "resource_id": docs,
        "resource_type": "folder",
        "email": "bob@example.com",
        "role": "viewer"
    });

    let first = app.request("POST", "/api/share", Some(body.clone()), Some(&alice)).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let second = app.request("POST", "/api/share", Some(body), Some(&alice)).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_and_revoke_share() {
    let app = helpers::TestApp::new().await;
    let (alice, _) = app.login("alice@example.com").await;
    let (bob, _) = app.login("bob@example.com").await;
    let docs = app.create_folder(&alice, "Docs", None).await;

    let response = app
        .request(
            "POST",
            &format!("/api/folders/{docs}/share"),
            Some(json!({ "email": "bob@example.com", "role": "viewer" })),
            Some(&alice),
        )
        .await;
    let share_id = response.body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            "PUT",
            &format!("/api/share/{share_id}/update"),
            Some(json!({ "role": "editor" })),
            Some(&alice),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["role"], "editor");

    let response = app
        .request(
            "POST",
            "/api/folders",
            Some(json!({ "name": "FromBob", "parent_id": docs })),
            Some(&bob),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = app
        .request("DELETE", &format!("/api/share/{share_id}/revoke"), None, Some(&alice))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", &format!("/api/folders/{docs}"), None, Some(&bob))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bulk_share_partial_success() {
    let app = helpers::TestApp::new().await;
    let (alice, _) = app.login("alice@example.com").await;
    app.login("bob@example.com").await;
    let docs = app.create_folder(&alice, "Docs", None).await;

    let response = app
        .request(
            "POST",
            "/api/share/bulk",
            Some(json!({
                "resources": [
                    { "resource_id": docs, "resource_type": "folder" },
                    { "resource_id": "00000000-0000-0000-0000-000000000001", "resource_type": "file" }
                ],
                "email": "bob@example.com",
                "role": "viewer"
            })),
            Some(&alice),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["summary"]["successful"], 1);
    assert_eq!(response.body["data"]["summary"]["failed"], 1);
}

#[tokio::test]
async fn test_share_records_notification() {
    let app = helpers::TestApp::new().await;
    let (alice, _) = app.login("alice@example.com").await;
    let (bob, _) = app.login("bob@example.com").await;
    let docs = app.create_folder(&alice, "Docs", None).await;

    app.request(
        "POST",
        &format!("/api/folders/{docs}/share"),
        Some(json!({ "email": "bob@example.com", "role": "viewer" })),
        Some(&alice),
    )
    .await;

    // Notifications are written off the request path.
    let mut logs = Vec::new();
    for _ in 0..50 {
        let response = app.request("GET", "/api/notifications", None, Some(&bob)).await;
        logs = response.body["data"].as_array().cloned().unwrap_or_default();
        if !logs.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(logs.len(), 1);
}
