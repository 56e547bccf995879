//! Integration tests for trash listing, restore and purge.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_deleted_folder_appears_in_trash_and_restores() {
    let app = helpers::TestApp::new().await;
    let (token, user_id) = app.login("alice@example.com").await;
    let docs = app.create_folder(&token, "Docs", None).await;
    app.upload(&token, Some(&docs), &[("a.txt", b"12345")]).await;

    let response = app
        .request("DELETE", &format!("/api/folders/{docs}"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Folder moved to trash");
    let user = app.stores.users.find_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.used_storage, 0);

    let response = app
        .request("GET", &format!("/api/folders/{docs}"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request("GET", "/api/trash", None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["total"], 2);

    let response = app
        .request("GET", "/api/trash?type=folder", None, Some(&token))
        .await;
    assert_eq!(response.body["data"]["total"], 1);
    assert_eq!(response.body["data"]["items"][0]["name"], "Docs");

    let response = app
        .request(
            "PATCH",
            &format!("/api/trash/{docs}/restore?type=folder"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

    let response = app
        .request("GET", &format!("/api/folders/{docs}"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["counts"]["files"], 1);
    let user = app.stores.users.find_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.used_storage, 5);
}

#[tokio::test]
async fn test_restore_file_with_trashed_parent_conflicts() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    let docs = app.create_folder(&token, "Docs", None).await;
    let uploaded = app.upload(&token, Some(&docs), &[("a.txt", b"a")]).await;
    let file_id = uploaded.body["data"][0]["id"].as_str().unwrap().to_string();

    app.request("DELETE", &format!("/api/folders/{docs}"), None, Some(&token))
        .await;

    let response = app
        .request(
            "PATCH",
            &format!("/api/trash/{file_id}/restore?type=file"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_restore_requires_type() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    let docs = app.create_folder(&token, "Docs", None).await;

    let response = app
        .request("PATCH", &format!("/api/trash/{docs}/restore"), None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_purge_removes_item_for_good() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    let uploaded = app.upload(&token, None, &[("a.txt", b"a")]).await;
    let file_id = uploaded.body["data"][0]["id"].as_str().unwrap().to_string();

    // Live items cannot be purged directly.
    let response = app
        .request(
            "DELETE",
            &format!("/api/trash/{file_id}/purge?type=file"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    app.request("DELETE", &format!("/api/files/{file_id}"), None, Some(&token))
        .await;
    let response = app
        .request(
            "DELETE",
            &format!("/api/trash/{file_id}/purge?type=file"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.request("GET", "/api/trash", None, Some(&token)).await;
    assert_eq!(response.body["data"]["total"], 0);
}

#[tokio::test]
async fn test_restore_multiple_and_purge_all() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.login("alice@example.com").await;
    let uploaded = app
        .upload(&token, None, &[("a.txt", b"a"), ("b.txt", b"b"), ("c.txt", b"c")])
        .await;
    let ids: Vec<String> = uploaded.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap().to_string())
        .collect();
    for id in &ids {
        app.request("DELETE", &format!("/api/files/{id}"), None, Some(&token))
            .await;
    }

    let response = app
        .request(
            "POST",
            "/api/trash/restore-multiple",
            Some(json!({ "items": [
                { "id": ids[0], "type": "file" },
                { "id": ids[1], "type": "bogus" }
            ]})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["restored"], 1);
    assert_eq!(response.body["data"]["failed"], 1);

    let response = app
        .request(
            "POST",
            "/api/trash/restore-multiple",
            Some(json!({ "items": [] })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request("DELETE", "/api/trash/purge-all", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["deleted_count"], 2);

    let response = app.request("GET", "/api/files", None, Some(&token)).await;
    assert_eq!(response.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_trash_is_private_to_owner() {
    let app = helpers::TestApp::new().await;
    let (alice, _) = app.login("alice@example.com").await;
    let (bob, _) = app.login("bob@example.com").await;
    let docs = app.create_folder(&alice, "Docs", None).await;
    app.request("DELETE", &format!("/api/folders/{docs}"), None, Some(&alice))
        .await;

    let response = app.request("GET", "/api/trash", None, Some(&bob)).await;
    assert_eq!(response.body["data"]["total"], 0);

    let response = app
        .request(
            "PATCH",
            &format!("/api/trash/{docs}/restore?type=folder"),
            None,
            Some(&bob),
        )
        .await;
    assert!(response.status == StatusCode::NOT_FOUND || response.status == StatusCode::FORBIDDEN);
}
