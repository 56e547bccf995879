//! Integration tests for upload, metadata and signed links.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

fn local_path(url: &str) -> &str {
    url.strip_prefix("http://localhost:8080").unwrap_or(url)
}

#[tokio::test]
async fn test_list_files_unauthenticated() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/files", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_file_not_found() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;

    let response = app
        .request(
            "GET",
            "/api/files/00000000-0000-0000-0000-999999999999",
            None,
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_into_folder_and_list() {
    let app = helpers::TestApp::new().await;
    let (token, user_id) = app.login("alice@example.com").await;
    let docs = app.create_folder(&token, "Docs", None).await;

    let response = app
        .upload(&token, Some(&docs), &[("a.txt", b"alpha"), ("b.pdf", b"%PDF-1.4")])
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 2);
    assert_eq!(response.body["data"][1]["mime_type"], "application/pdf");

    let response = app
        .request("GET", &format!("/api/files?folder_id={docs}"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 2);

    let user = app.stores.users.find_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.used_storage, 5 + 8);
}

#[tokio::test]
async fn test_reupload_same_name_creates_version() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;

    let first = app.upload(&token, None, &[("notes.txt", b"v1")]).await;
    let second = app.upload(&token, None, &[("notes.txt", b"version two")]).await;
    let id = first.body["data"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(second.body["data"][0]["id"], id.as_str());

    let response = app
        .request("GET", &format!("/api/files/{id}/versions"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let versions = response.body["data"].as_array().unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0]["size_bytes"], 2);
}

#[tokio::test]
async fn test_download_link_serves_blob() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    let uploaded = app.upload(&token, None, &[("hello.txt", b"hello world")]).await;
    let id = uploaded.body["data"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .request("GET", &format!("/api/files/{id}/download"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["disposition"], "attachment");
    let url = response.body["data"]["url"].as_str().unwrap().to_string();

    let (status, headers, body) = app.get_raw(local_path(&url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"hello world");
    assert_eq!(headers["content-type"], "text/plain");
    assert!(
        headers["content-disposition"]
            .to_str()
            .unwrap()
            .starts_with("attachment")
    );
}

#[tokio::test]
async fn test_tampered_blob_token_is_rejected() {
    let app = helpers::TestApp::new().await;

    let (status, _, _) = app.get_raw("/api/blobs/not.a.token").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_preview_requires_previewable_type() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    let uploaded = app
        .upload(&token, None, &[("img.png", b"\x89PNG"), ("data.bin", b"\x00\x01")])
        .await;
    let png = uploaded.body["data"][0]["id"].as_str().unwrap().to_string();
    let bin = uploaded.body["data"][1]["id"].as_str().unwrap().to_string();

    let response = app
        .request("GET", &format!("/api/files/{png}/preview"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["disposition"], "inline");

    let response = app
        .request("GET", &format!("/api/files/{bin}/preview"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rename_file_conflict() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    let uploaded = app
        .upload(&token, None, &[("a.txt", b"a"), ("b.txt", b"b")])
        .await;
    let a = uploaded.body["data"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            "PATCH",
            &format!("/api/files/{a}/rename"),
            Some(json!({ "name": "b.txt" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app
        .request(
            "PATCH",
            &format!("/api/files/{a}/rename"),
            Some(json!({ "name": "c.txt" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "c.txt");
}
