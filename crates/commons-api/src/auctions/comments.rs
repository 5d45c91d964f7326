use axum::{Extension, Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::info;

use commons_db::models::ListingCommentRow;
use commons_types::api::{ContentRequest, ListingCommentView};

use crate::auctions::listings::{LISTING_AUTH, find_listing};
use crate::error::ApiError;
use crate::extract::{Id, non_blank, parse_json};
use crate::middleware::Viewer;
use crate::state::{AppState, blocking};

pub async fn list_comments(
    State(state): State<AppState>,
    Id(listing_id): Id,
) -> Result<impl IntoResponse, ApiError> {
    let comments = blocking(&state, move |s| {
        let listing = find_listing(s, listing_id)?;
        let rows = s.db.list_listing_comments(listing.id)?;
        Ok(rows.into_iter().map(listing_comment_view).collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(json!({ "message": "Get comments successfully.", "comments": comments })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Id(listing_id): Id,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(LISTING_AUTH)?.sub;
    let req: ContentRequest = parse_json(&body)?;

    let comment = blocking(&state, move |s| {
        let listing = find_listing(s, listing_id)?;
        let content = non_blank(req.content)
            .ok_or_else(|| ApiError::bad_request("Comment content can not be empty."))?;

        let id = s.db.create_listing_comment(listing.id, user_id, &content)?;
        s.db.get_listing_comment(id)?
            .map(listing_comment_view)
            .ok_or(ApiError::Database)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment created successfully.", "comment": comment })),
    ))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Id(comment_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(LISTING_AUTH)?.sub;

    blocking(&state, move |s| {
        let row = s
            .db
            .get_listing_comment(comment_id)?
            .ok_or(ApiError::NotFound("Comment not found."))?;
        if row.is_deleted {
            return Err(ApiError::Gone("This comment has been deleted."));
        }
        if row.created_by != user_id {
            return Err(ApiError::Forbidden("You can only delete your own comments."));
        }
        Ok(s.db.soft_delete_listing_comment(row.id)?)
    })
    .await?;
    info!("Listing comment {} soft-deleted", comment_id);

    Ok(Json(json!({ "message": "Comment deleted successfully." })))
}

pub(crate) fn listing_comment_view(row: ListingCommentRow) -> ListingCommentView {
    ListingCommentView {
        id: row.id,
        listing_id: row.listing_id,
        content: row.content,
        created_by: row.author,
        created_at: row.created_at,
        is_deleted: row.is_deleted,
    }
}
