//! The social network: posts, likes, comments and follows.

pub mod comments;
pub mod likes;
pub mod posts;
pub mod users;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::error::{method_not_allowed, wrong_method};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/posts",
            get(posts::list_posts)
                .post(posts::create_post)
                .fallback(wrong_method("Only accept GET and POST method.")),
        )
        .route(
            "/api/posts/following",
            get(posts::following_posts).fallback(wrong_method("Only accept GET method.")),
        )
        .route(
            "/api/posts/{post_id}",
            get(posts::get_post)
                .patch(posts::edit_post)
                .delete(posts::delete_post)
                .fallback(wrong_method("Only accept GET, PATCH and DELETE methods.")),
        )
        .route(
            "/api/posts/{post_id}/like",
            post(likes::like_post)
                .delete(likes::unlike_post)
                .fallback(method_not_allowed("Only accept POST and DELETE methods.")),
        )
        .route(
            "/api/posts/{post_id}/comments",
            get(comments::list_comments)
                .post(comments::create_comment)
                .fallback(wrong_method("Only accept GET and POST methods.")),
        )
        .route(
            "/api/comment/{comment_id}",
            patch(comments::edit_comment)
                .delete(comments::delete_comment)
                .fallback(wrong_method("Only accept PATCH and DELETE methods.")),
        )
        .route(
            "/api/users/{username}",
            get(users::user_detail).fallback(method_not_allowed("Only accept GET methods.")),
        )
        .route(
            "/api/users/{username}/follow",
            post(users::follow)
                .delete(users::unfollow)
                .fallback(wrong_method("Only accept POST and DELETE method.")),
        )
}
