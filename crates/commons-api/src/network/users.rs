use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use commons_db::models::UserRow;
use commons_types::api::{FollowCounts, ProfileView};

use crate::error::ApiError;
use crate::middleware::Viewer;
use crate::network::posts::{FOLLOW_AUTH, post_views};
use crate::state::{AppState, AppStateInner, blocking};

const USER_NOT_FOUND: &str = "User not found.";

pub async fn user_detail(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(username) = username?;
    let viewer_id = viewer.user_id();

    let (user, posts) = blocking(&state, move |s| {
        let row = find_user(s, &username)?;
        let (following_count, follower_count) = s.db.follow_counts(row.id)?;
        let is_following = match viewer_id {
            Some(id) if id != row.id => s.db.is_following(id, row.id)?,
            _ => false,
        };

        let generation = s.post_cache.generation();
        let rows = s.db.list_posts_by_author(row.id)?;
        let posts = post_views(s, generation, rows, viewer_id)?;

        let user = ProfileView {
            username: row.username,
            email: row.email,
            following_count,
            follower_count,
            is_following,
        };
        Ok((user, posts))
    })
    .await?;

    // An author without live posts is reported with `posts: null`.
    let posts = (!posts.is_empty()).then_some(posts);

    Ok(Json(json!({
        "message": "Get user detail successfully.",
        "user": user,
        "posts": posts,
    })))
}

pub async fn follow(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(username) = username?;
    let follower_id = viewer.require(FOLLOW_AUTH)?.sub;

    let data = blocking(&state, move |s| {
        let target = follow_target(s, &username, follower_id)?;
        if s.db.is_following(follower_id, target.id)? {
            return Err(ApiError::bad_request("You are already following this user."));
        }
        s.db.follow(follower_id, target.id)?;
        info!("User {} now follows {}", follower_id, target.username);
        follow_counts(s, follower_id, target.id)
    })
    .await?;

    Ok(Json(json!({ "message": "Follow user successfully.", "data": data })))
}

pub async fn unfollow(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(username) = username?;
    let follower_id = viewer.require(FOLLOW_AUTH)?.sub;

    let data = blocking(&state, move |s| {
        let target = follow_target(s, &username, follower_id)?;
        if !s.db.unfollow(follower_id, target.id)? {
            return Err(ApiError::bad_request("You are not following this user."));
        }
        info!("User {} unfollowed {}", follower_id, target.username);
        follow_counts(s, follower_id, target.id)
    })
    .await?;

    Ok(Json(json!({ "message": "Unfollow user successfully.", "data": data })))
}

fn find_user(s: &AppStateInner, username: &str) -> Result<UserRow, ApiError> {
    s.db
        .get_user_by_username(username)?
        .ok_or(ApiError::NotFound(USER_NOT_FOUND))
}

fn follow_target(s: &AppStateInner, username: &str, follower_id: i64) -> Result<UserRow, ApiError> {
    let target = find_user(s, username)?;
    if target.id == follower_id {
        return Err(ApiError::Forbidden("You can not follow/unfollow yourself."));
    }
    Ok(target)
}

fn follow_counts(s: &AppStateInner, follower_id: i64, target_id: i64) -> Result<FollowCounts, ApiError> {
    let (following_count, _) = s.db.follow_counts(follower_id)?;
    let (_, target_user_followers) = s.db.follow_counts(target_id)?;
    Ok(FollowCounts {
        following_count,
        target_user_followers,
    })
}
