use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::debug;

use crate::error::ApiError;
use crate::extract::Id;
use crate::middleware::Viewer;
use crate::network::posts::live_post;
use crate::state::{AppState, blocking};

const LIKE_AUTH: &str = "You must be logged in to like posts.";

pub async fn like_post(
    State(state): State<AppState>,
    Id(post_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(LIKE_AUTH)?.sub;

    let likes_count = blocking(&state, move |s| {
        let post = live_post(s, post_id)?;
        if s.db.has_liked(user_id, post.id)? {
            return Err(ApiError::bad_request("You have already liked this post."));
        }
        // A concurrent duplicate hits the UNIQUE index and surfaces as 400.
        s.db.like_post(user_id, post.id)?;
        s.post_cache.invalidate(post.id);
        Ok(s.db.likes_count(post.id)?)
    })
    .await?;
    debug!("User {} liked post {}", user_id, post_id);

    Ok(Json(json!({
        "message": "Post liked successfully.",
        "likes_count": likes_count,
        "is_liked": true,
    })))
}

pub async fn unlike_post(
    State(state): State<AppState>,
    Id(post_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(LIKE_AUTH)?.sub;

    let likes_count = blocking(&state, move |s| {
        let post = live_post(s, post_id)?;
        if !s.db.unlike_post(user_id, post.id)? {
            return Err(ApiError::bad_request("You have not liked this post."));
        }
        s.post_cache.invalidate(post.id);
        Ok(s.db.likes_count(post.id)?)
    })
    .await?;
    debug!("User {} unliked post {}", user_id, post_id);

    Ok(Json(json!({
        "message": "Post unliked successfully.",
        "likes_count": likes_count,
        "is_liked": false,
    })))
}
