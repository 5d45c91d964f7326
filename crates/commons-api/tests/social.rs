mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn like_and_unlike_a_post() {
    let app = TestApp::new().await;
    let author = app.register("testuser1").await;
    let fan = app.register("testuser2").await;
    let id = app.create_post(&author, "Test post content").await;
    let uri = format!("/api/posts/{id}/like");

    let (status, body) = app.post(&uri, None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "You must be logged in to like posts.");

    let (status, body) = app.post(&uri, Some(&fan), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Post liked successfully.");
    assert_eq!(body["likes_count"], 1);

    let (status, body) = app.post(&uri, Some(&fan), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already liked this post.");

    let (status, body) = app.delete(&uri, Some(&fan)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Post unliked successfully.");
    assert_eq!(body["likes_count"], 0);

    let (status, body) = app.delete(&uri, Some(&fan)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have not liked this post.");

    let (status, body) = app.post("/api/posts/999/like", Some(&fan), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found.");
}

#[tokio::test]
async fn deleted_posts_cannot_be_liked_or_commented() {
    let app = TestApp::new().await;
    let token = app.register("testuser1").await;
    let id = app.create_post(&token, "Soon gone").await;
    app.delete(&format!("/api/posts/{id}"), Some(&token)).await;

    let (status, _) = app.post(&format!("/api/posts/{id}/like"), Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = app
        .post(&format!("/api/posts/{id}/comments"), Some(&token), json!({ "content": "hello" }))
        .await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn comment_lifecycle() {
    let app = TestApp::new().await;
    let author = app.register("testuser1").await;
    let other = app.register("testuser2").await;
    let post_id = app.create_post(&author, "Test post content").await;
    let comments_uri = format!("/api/posts/{post_id}/comments");

    let (status, body) = app.post(&comments_uri, None, json!({ "content": "hi" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "You must be logged in to create, edit or delete your comment.");

    let (status, body) = app.post(&comments_uri, Some(&author), json!({ "content": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Comment content can not be empty.");

    let (status, body) = app.raw(Method::POST, &comments_uri, Some(&author), "nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON data.");

    let (status, body) = app
        .post(&comments_uri, Some(&author), json!({ "content": "Test comment" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Comment created successfully.");
    assert_eq!(body["comment"]["post_id"], post_id);
    let comment_id = body["comment"]["id"].as_i64().unwrap();
    let comment_uri = format!("/api/comment/{comment_id}");

    let (_, body) = app.get(&format!("/api/posts/{post_id}"), None).await;
    assert_eq!(body["post"]["comments_count"], 1);
    assert_eq!(body["post"]["comments"][0]["content"], "Test comment");

    let (status, body) = app.patch(&comment_uri, None, json!({ "content": "x" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "You must be logged in to create, edit or delete your comment.");

    let (status, body) = app.delete(&comment_uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "You must be logged in to create, edit or delete your comment.");

    let (status, body) = app.patch(&comment_uri, Some(&other), json!({ "content": "x" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only edit your own comments.");

    let (status, body) = app.patch(&comment_uri, Some(&author), json!({ "content": " " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Comment content can not be blank.");

    let (status, body) = app.patch(&comment_uri, Some(&author), json!({ "content": "Edited" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment updated successfully.");
    assert_eq!(body["comment"]["content"], "Edited");

    let (status, body) = app.delete(&comment_uri, Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only delete your own comments.");

    let (status, body) = app.delete(&comment_uri, Some(&author)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment deleted successfully.");

    let (status, body) = app.delete(&comment_uri, Some(&author)).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "This comment has been deleted.");

    let (_, body) = app.get(&format!("/api/posts/{post_id}"), None).await;
    assert_eq!(body["post"]["comments_count"], 0);
    assert!(body["post"]["comments"].as_array().unwrap().is_empty());

    let (status, body) = app.get(&comments_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["comments"].as_array().unwrap().is_empty());

    let (status, body) = app.delete("/api/comment/999", Some(&author)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Comment not found.");
}

#[tokio::test]
async fn user_detail_and_follow_counts() {
    let app = TestApp::new().await;
    let alice = app.register("testuser1").await;
    let bob = app.register("testuser2").await;

    let (status, body) = app.get("/api/users/testuser2", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Get user detail successfully.");
    assert_eq!(body["user"]["is_following"], false);
    assert!(body["posts"].is_null());

    let (status, body) = app.post("/api/users/testuser2/follow", Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Follow user successfully.");
    assert_eq!(body["data"]["following_count"], 1);
    assert_eq!(body["data"]["target_user_followers"], 1);

    let (status, body) = app.post("/api/users/testuser2/follow", Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You are already following this user.");

    app.create_post(&bob, "Bob's post").await;
    let (_, body) = app.get("/api/users/testuser2", Some(&alice)).await;
    assert_eq!(body["user"]["is_following"], true);
    assert_eq!(body["user"]["follower_count"], 1);
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);

    let (status, body) = app.delete("/api/users/testuser2/follow", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Unfollow user successfully.");
    assert_eq!(body["data"]["target_user_followers"], 0);

    let (status, body) = app.delete("/api/users/testuser2/follow", Some(&alice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You are not following this user.");
}

#[tokio::test]
async fn follow_edge_cases() {
    let app = TestApp::new().await;
    let alice = app.register("testuser1").await;

    let (status, body) = app.post("/api/users/testuser1/follow", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "You must be logged in to view following posts, follow/unfollow users.");

    let (status, body) = app.post("/api/users/testuser1/follow", Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can not follow/unfollow yourself.");

    let (status, body) = app.post("/api/users/ghost/follow", Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found.");

    let (status, body) = app.get("/api/users/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found.");

    let (status, body) = app.get("/api/users/testuser1/follow", Some(&alice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only accept POST and DELETE method.");

    let (status, body) = app.delete("/api/users/testuser1", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Only accept GET methods.");
}
