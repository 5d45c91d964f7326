use std::collections::HashMap;

use axum::{Extension, Json, body::Bytes, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::info;

use commons_db::models::{CommentRow, PostRow};
use commons_types::api::{CommentView, ContentRequest, PostView};

use crate::error::ApiError;
use crate::extract::{Id, non_blank, parse_json};
use crate::middleware::Viewer;
use crate::state::{AppState, AppStateInner, blocking};

pub(crate) const POST_NOT_FOUND: &str = "Post not found.";
pub(crate) const POST_GONE: &str = "This post has been deleted by the author.";
pub(crate) const FOLLOW_AUTH: &str =
    "You must be logged in to view following posts, follow/unfollow users.";

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = viewer.user_id();
    let posts = blocking(&state, move |s| {
        let generation = s.post_cache.generation();
        let rows = s.db.list_posts()?;
        post_views(s, generation, rows, viewer_id)
    })
    .await?;

    Ok(Json(json!({ "message": "Get posts successfully.", "posts": posts })))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let claims = viewer.require("You must be logged in to post.")?;
    let req: ContentRequest = parse_json(&body)?;
    let content =
        non_blank(req.content).ok_or_else(|| ApiError::bad_request("Post content cannot be empty."))?;

    let author_id = claims.sub;
    let post = blocking(&state, move |s| {
        let id = s.db.create_post(author_id, &content)?;
        load_post_view(s, id, Some(author_id))?.ok_or(ApiError::Database)
    })
    .await?;
    info!("Post {} created by {}", post.id, claims.username);

    Ok(Json(json!({ "message": "Post created successfully.", "post": post })))
}

pub async fn following_posts(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(FOLLOW_AUTH)?.sub;
    let posts = blocking(&state, move |s| {
        let generation = s.post_cache.generation();
        let rows = s.db.list_following_posts(user_id)?;
        post_views(s, generation, rows, Some(user_id))
    })
    .await?;

    Ok(Json(json!({ "message": "Get following posts successfully.", "posts": posts })))
}

pub async fn get_post(
    State(state): State<AppState>,
    Id(post_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = viewer.user_id();
    let post = blocking(&state, move |s| load_post_view(s, post_id, viewer_id))
        .await?
        .ok_or(ApiError::NotFound(POST_NOT_FOUND))?;

    if post.is_deleted {
        return Err(ApiError::Gone(POST_GONE));
    }

    Ok(Json(json!({ "message": "Get post successfully.", "post": post })))
}

pub async fn edit_post(
    State(state): State<AppState>,
    Id(post_id): Id,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require("You must be logged in to edit posts.")?.sub;
    let req: ContentRequest = parse_json(&body)?;

    let post = blocking(&state, move |s| {
        let row = owned_live_post(s, post_id, user_id, "You can only edit your own posts.")?;
        let content =
            non_blank(req.content).ok_or_else(|| ApiError::bad_request("Post content cannot be blank."))?;

        s.db.update_post_content(row.id, &content)?;
        s.post_cache.invalidate(row.id);
        load_post_view(s, row.id, Some(user_id))?.ok_or(ApiError::Database)
    })
    .await?;

    Ok(Json(json!({ "message": "Post updated successfully.", "post": post })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Id(post_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = viewer.require("You must be logged in to delete posts.")?;
    let user_id = claims.sub;

    let post = blocking(&state, move |s| {
        let row = owned_live_post(s, post_id, user_id, "You can only delete your own posts.")?;
        s.db.soft_delete_post(row.id)?;
        s.post_cache.invalidate(row.id);
        load_post_view(s, row.id, Some(user_id))?.ok_or(ApiError::Database)
    })
    .await?;
    info!("Post {} soft-deleted by {}", post.id, claims.username);

    Ok(Json(json!({ "message": "Post deleted successfully.", "post": post })))
}

/// Fetches a post that exists, is not soft-deleted and belongs to `user_id`.
fn owned_live_post(
    s: &AppStateInner,
    post_id: i64,
    user_id: i64,
    not_owner: &'static str,
) -> Result<PostRow, ApiError> {
    let row = live_post(s, post_id)?;
    if row.created_by != user_id {
        return Err(ApiError::Forbidden(not_owner));
    }
    Ok(row)
}

/// Fetches a post, answering 404 when missing and 410 when soft-deleted.
pub(crate) fn live_post(s: &AppStateInner, post_id: i64) -> Result<PostRow, ApiError> {
    let row = s.db.get_post(post_id)?.ok_or(ApiError::NotFound(POST_NOT_FOUND))?;
    if row.is_deleted {
        return Err(ApiError::Gone(POST_GONE));
    }
    Ok(row)
}

/// Serializes one post, from the cache when possible. Deleted posts are
/// returned too; callers decide how to treat them.
pub(crate) fn load_post_view(
    s: &AppStateInner,
    post_id: i64,
    viewer_id: Option<i64>,
) -> Result<Option<PostView>, ApiError> {
    if let Some(mut view) = s.post_cache.get(post_id) {
        if let Some(user_id) = viewer_id {
            view.is_liked = s.db.has_liked(user_id, post_id)?;
        }
        return Ok(Some(view));
    }

    let generation = s.post_cache.generation();
    match s.db.get_post(post_id)? {
        Some(row) => Ok(post_views(s, generation, vec![row], viewer_id)?.pop()),
        None => Ok(None),
    }
}

/// Serializes rows in order. Cached views are reused as they are; the rest
/// are built with a single comment query and cached unless a post was
/// invalidated after `generation`, which must be taken before reading `rows`.
pub(crate) fn post_views(
    s: &AppStateInner,
    generation: u64,
    rows: Vec<PostRow>,
    viewer_id: Option<i64>,
) -> Result<Vec<PostView>, ApiError> {
    let cached: Vec<Option<PostView>> = rows.iter().map(|r| s.post_cache.get(r.id)).collect();

    let missing: Vec<i64> = rows
        .iter()
        .zip(&cached)
        .filter(|(_, hit)| hit.is_none())
        .map(|(r, _)| r.id)
        .collect();

    let mut comments: HashMap<i64, Vec<CommentView>> = HashMap::new();
    for row in s.db.comments_for_posts(&missing)? {
        comments.entry(row.post_id).or_default().push(comment_view(row));
    }

    let mut views: Vec<PostView> = rows
        .into_iter()
        .zip(cached)
        .map(|(row, hit)| {
            hit.unwrap_or_else(|| {
                let post_comments = comments.remove(&row.id).unwrap_or_default();
                let view = post_view(row, post_comments);
                s.post_cache.insert_if_current(view.clone(), generation);
                view
            })
        })
        .collect();

    if let Some(user_id) = viewer_id {
        let ids: Vec<i64> = views.iter().map(|v| v.id).collect();
        let liked = s.db.liked_post_ids(user_id, &ids)?;
        for view in &mut views {
            view.is_liked = liked.contains(&view.id);
        }
    }

    Ok(views)
}

fn post_view(row: PostRow, comments: Vec<CommentView>) -> PostView {
    PostView {
        id: row.id,
        content: row.content,
        created_by: row.author,
        created_at: row.created_at,
        updated_at: row.updated_at,
        is_deleted: row.is_deleted,
        likes_count: row.likes_count,
        comments_count: row.comments_count,
        is_liked: false,
        comments,
    }
}

pub(crate) fn comment_view(row: CommentRow) -> CommentView {
    CommentView {
        id: row.id,
        post_id: row.post_id,
        content: row.content,
        created_by: row.author,
        created_at: row.created_at,
        updated_at: row.updated_at,
        is_deleted: row.is_deleted,
    }
}
