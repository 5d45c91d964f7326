mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn register_returns_user_and_token() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/register",
            None,
            json!({
                "username": "testuser1",
                "email": "test1@example.com",
                "password": "testpass123",
                "confirmation": "testpass123",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["user"]["username"], "testuser1");
    assert_eq!(body["user"]["following_count"], 0);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn register_validates_input() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/register", None, json!({ "username": "a", "email": "", "password": "x", "confirmation": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required.");

    let (status, body) = app
        .post(
            "/register",
            None,
            json!({ "username": "a", "email": "a@example.com", "password": "x", "confirmation": "y" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Passwords must match.");

    let (status, body) = app.raw(Method::POST, "/register", None, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON data.");
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = TestApp::new().await;
    app.register("testuser1").await;

    let (status, body) = app
        .post(
            "/register",
            None,
            json!({
                "username": "testuser1",
                "email": "other@example.com",
                "password": "pw",
                "confirmation": "pw",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already taken.");
}

#[tokio::test]
async fn login_checks_credentials() {
    let app = TestApp::new().await;
    app.register("testuser1").await;

    let (status, body) = app
        .post("/login", None, json!({ "username": "testuser1", "password": "testpass123" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert!(body["token"].is_string());

    let (status, body) = app
        .post("/login", None, json!({ "username": "testuser1", "password": "wrong" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username and/or password.");

    let (status, _) = app
        .post("/login", None, json!({ "username": "nobody", "password": "testpass123" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.post("/login", None, json!({ "username": "testuser1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username and password are required.");
}

#[tokio::test]
async fn check_auth_reflects_the_token() {
    let app = TestApp::new().await;
    let token = app.register("testuser1").await;

    let (status, body) = app.get("/check_auth", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User is authenticated");
    assert_eq!(body["user"]["username"], "testuser1");

    let (status, body) = app.get("/check_auth", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User not authenticated");

    let (status, _) = app.get("/check_auth", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_only_the_presented_token() {
    let app = TestApp::new().await;
    let first = app.register("testuser1").await;
    let (_, body) = app
        .post("/login", None, json!({ "username": "testuser1", "password": "testpass123" }))
        .await;
    let second = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.post("/logout", Some(&first), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully.");

    let (status, _) = app.get("/check_auth", Some(&first)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/check_auth", Some(&second)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/logout", Some(&first), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No user is currently logged in.");
}

#[tokio::test]
async fn auth_routes_reject_other_methods() {
    let app = TestApp::new().await;

    for uri in ["/register", "/login", "/logout"] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{uri}");
        assert_eq!(body["error"], "POST request required.");
    }

    let (status, body) = app.post("/check_auth", None, json!({})).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "GET request required.");
}
