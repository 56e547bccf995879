//! Integration tests for the folder tree endpoints.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["database"], "memory");
    assert_eq!(response.body["data"]["storage"], "memory");
}

#[tokio::test]
async fn test_folders_require_bearer_token() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/folders", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");

    let response = app
        .request("GET", "/api/folders", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_nested_folder_and_list_contents() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;

    let docs = app.create_folder(&token, "Docs", None).await;
    let reports = app.create_folder(&token, "Reports", Some(&docs)).await;

    let response = app
        .request("GET", &format!("/api/folders/{reports}"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["folder"]["path"], "/Docs/Reports");

    let response = app
        .request("GET", &format!("/api/folders/{docs}"), None, Some(&token))
        .await;
    assert_eq!(response.body["data"]["counts"]["subfolders"], 1);
    assert_eq!(response.body["data"]["subfolders"][0]["name"], "Reports");

    let response = app.request("GET", "/api/folders", None, Some(&token)).await;
    let roots = response.body["data"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["subfolder_count"], 1);
}

#[tokio::test]
async fn test_duplicate_sibling_name_conflicts() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    app.create_folder(&token, "Docs", None).await;

    let response = app
        .request("POST", "/api/folders", Some(json!({ "name": "Docs" })), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_folder_name_is_rejected() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;

    let response = app
        .request("POST", "/api/folders", Some(json!({ "name": "a/b" })), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_rename_cascades_paths() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    let docs = app.create_folder(&token, "Docs", None).await;
    let child = app.create_folder(&token, "Child", Some(&docs)).await;

    let response = app
        .request(
            "PATCH",
            &format!("/api/folders/{docs}/rename"),
            Some(json!({ "name": "Papers" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["path"], "/Papers");

    let response = app
        .request("GET", &format!("/api/folders/{child}"), None, Some(&token))
        .await;
    assert_eq!(response.body["data"]["folder"]["path"], "/Papers/Child");
}

#[tokio::test]
async fn test_other_user_cannot_read_folder() {
    let app = helpers::TestApp::new().await;
    let (alice, _) = app.login("alice@example.com").await;
    let (bob, _) = app.login("bob@example.com").await;
    let docs = app.create_folder(&alice, "Docs", None).await;

    let response = app
        .request("GET", &format!("/api/folders/{docs}"), None, Some(&bob))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request("GET", "/api/folders/not-a-uuid", None, Some(&alice))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_folder_streams_zip() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    let docs = app.create_folder(&token, "Docs", None).await;
    let response = app
        .upload(&token, Some(&docs), &[("a.txt", b"alpha")])
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let req = axum::http::Request::builder()
        .uri(format!("/api/folders/{docs}/download"))
        .header("Authorization", format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/zip");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..2], b"PK");
}
