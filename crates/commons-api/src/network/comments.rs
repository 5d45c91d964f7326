use axum::{Extension, Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::info;

use commons_db::models::CommentRow;
use commons_types::api::ContentRequest;

use crate::error::ApiError;
use crate::extract::{Id, non_blank, parse_json};
use crate::middleware::Viewer;
use crate::network::posts::{comment_view, live_post};
use crate::state::{AppState, AppStateInner, blocking};

const COMMENT_AUTH: &str = "You must be logged in to create, edit or delete your comment.";

pub async fn list_comments(
    State(state): State<AppState>,
    Id(post_id): Id,
) -> Result<impl IntoResponse, ApiError> {
    let comments = blocking(&state, move |s| {
        let post = live_post(s, post_id)?;
        let rows = s.db.list_post_comments(post.id)?;
        Ok(rows.into_iter().map(comment_view).collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(json!({ "message": "Get comments successfully.", "comments": comments })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Id(post_id): Id,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(COMMENT_AUTH)?.sub;

    let comment = blocking(&state, move |s| {
        let post = live_post(s, post_id)?;
        let req: ContentRequest = parse_json(&body)?;
        let content = non_blank(req.content)
            .ok_or_else(|| ApiError::bad_request("Comment content can not be empty."))?;

        let id = s.db.create_post_comment(post.id, user_id, &content)?;
        s.post_cache.invalidate(post.id);
        s.db.get_post_comment(id)?.map(comment_view).ok_or(ApiError::Database)
    })
    .await?;
    info!("Comment {} added to post {}", comment.id, post_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment created successfully.", "comment": comment })),
    ))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Id(comment_id): Id,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(COMMENT_AUTH)?.sub;
    let req: ContentRequest = parse_json(&body)?;

    let comment = blocking(&state, move |s| {
        let row = owned_live_comment(s, comment_id, user_id, "You can only edit your own comments.")?;
        let content = non_blank(req.content)
            .ok_or_else(|| ApiError::bad_request("Comment content can not be blank."))?;

        s.db.update_post_comment(row.id, &content)?;
        s.post_cache.invalidate(row.post_id);
        s.db.get_post_comment(row.id)?.map(comment_view).ok_or(ApiError::Database)
    })
    .await?;

    Ok(Json(json!({ "message": "Comment updated successfully.", "comment": comment })))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Id(comment_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(COMMENT_AUTH)?.sub;

    let comment = blocking(&state, move |s| {
        let row = owned_live_comment(s, comment_id, user_id, "You can only delete your own comments.")?;
        s.db.soft_delete_post_comment(row.id)?;
        s.post_cache.invalidate(row.post_id);
        s.db.get_post_comment(row.id)?.map(comment_view).ok_or(ApiError::Database)
    })
    .await?;
    info!("Comment {} soft-deleted", comment.id);

    Ok(Json(json!({ "message": "Comment deleted successfully.", "comment": comment })))
}

fn owned_live_comment(
    s: &AppStateInner,
    comment_id: i64,
    user_id: i64,
    not_owner: &'static str,
) -> Result<CommentRow, ApiError> {
    let row = s
        .db
        .get_post_comment(comment_id)?
        .ok_or(ApiError::NotFound("Comment not found."))?;
    if row.is_deleted {
        return Err(ApiError::Gone("This comment has been deleted."));
    }
    if row.created_by != user_id {
        return Err(ApiError::Forbidden(not_owner));
    }
    Ok(row)
}
