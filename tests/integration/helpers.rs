//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use phynix_api::{AppState, build_app};
use phynix_auth::{JwtEncoder, OAuthStateStore};
use phynix_core::config::{AppConfig, DatabaseProvider, StorageProviderKind};
use phynix_database::{MemoryStore, Stores};
use phynix_entity::user::CreateUser;
use phynix_storage::{MemoryStorageProvider, SignedUrlIssuer, StorageManager};

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Direct access to the metadata store
    pub stores: Stores,
    /// Application config
    pub config: AppConfig,
    encoder: JwtEncoder,
}

impl TestApp {
    /// Create a new test application over in-memory stores and blobs.
    pub async fn new() -> Self {
        let mut config = AppConfig::default();
        config.database.provider = DatabaseProvider::Memory;
        config.storage.provider = StorageProviderKind::Memory;
        config.auth.jwt_secret = "integration-test-secret".to_string();

        let stores = Stores::memory(Arc::new(MemoryStore::new()));
        let signer = Arc::new(SignedUrlIssuer::new(
            &config.storage.url_signing_secret,
            &config.server.public_base_url,
        ));
        let provider = Arc::new(MemoryStorageProvider::new(Arc::clone(&signer)));
        let storage = Arc::new(StorageManager::new(provider, signer, Duration::from_secs(300)));
        let oauth_states = Arc::new(OAuthStateStore::from_config(&config.auth));

        let encoder = JwtEncoder::new(&config.auth);
        let state = AppState::new(config.clone(), &stores, storage, oauth_states);

        Self {
            router: build_app(state),
            stores,
            config,
            encoder,
        }
    }

    /// Create an account and return a bearer token for it.
    pub async fn login(&self, email: &str) -> (String, Uuid) {
        let user = self
            .stores
            .users
            .create_user(&CreateUser {
                email: email.to_string(),
                name: email.split('@').next().unwrap_or_default().to_string(),
                max_storage: 1024 * 1024 * 1024,
            })
            .await
            .expect("Failed to create test user");
        let (token, _) = self
            .encoder
            .issue(user.id, &user.email, &user.name)
            .expect("Failed to issue token");
        (token, user.id)
    }

    /// Make a JSON request to the app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// Upload files as multipart parts named `files`.
    pub async fn upload(
        &self,
        token: &str,
        folder_id: Option<&str>,
        files: &[(&str, &[u8])],
    ) -> TestResponse {
        const BOUNDARY: &str = "phynix-test-boundary";
        let mut body: Vec<u8> = Vec::new();
        if let Some(folder_id) = folder_id {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"folder_id\"\r\n\r\n{folder_id}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/api/files/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// Fetch a raw body, e.g. a signed blob link.
    pub async fn get_raw(&self, path: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let req = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body");
        (status, headers, bytes.to_vec())
    }

    /// Create a folder and return its id.
    pub async fn create_folder(&self, token: &str, name: &str, parent_id: Option<&str>) -> String {
        let response = self
            .request(
                "POST",
                "/api/folders",
                Some(serde_json::json!({ "name": name, "parent_id": parent_id })),
                Some(token),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["data"]["id"]
            .as_str()
            .expect("folder id")
            .to_string()
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
