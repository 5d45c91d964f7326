#![allow(dead_code)]

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use commons_api::post_cache::PostCache;
use commons_api::{AppState, AppStateInner};
use commons_db::Database;
use commons_wiki::EntryStore;

pub struct TestApp {
    pub state: AppState,
    router: Router,
    _wiki_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let wiki_dir = tempfile::tempdir().unwrap();
        let wiki = EntryStore::new(wiki_dir.path().join("entries")).await.unwrap();

        // Cheap hashing keeps the suite fast.
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::new(8, 1, 1, None).unwrap());

        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            wiki,
            jwt_secret: "test-secret".to_string(),
            token_ttl: chrono::Duration::days(1),
            hasher,
            post_cache: PostCache::default(),
        });

        Self {
            router: commons_api::router(state.clone()),
            state,
            _wiki_dir: wiki_dir,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Body>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder.header(header::CONTENT_TYPE, "application/json").body(body),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(Body::from(body.to_string()))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, token, Some(Body::from(body.to_string()))).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(Body::from(body.to_string()))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    pub async fn raw(&self, method: Method, uri: &str, token: Option<&str>, body: &'static str) -> (StatusCode, Value) {
        self.send(method, uri, token, Some(Body::from(body))).await
    }

    /// Registers a user and returns their bearer token.
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "testpass123",
                    "confirmation": "testpass123",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a post as the token's owner and returns its id.
    pub async fn create_post(&self, token: &str, content: &str) -> i64 {
        let (status, body) = self.post("/api/posts", Some(token), json!({ "content": content })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["post"]["id"].as_i64().unwrap()
    }
}
