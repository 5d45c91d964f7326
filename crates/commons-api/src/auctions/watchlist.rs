use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::auctions::listings::{LISTING_AUTH, find_listing, listing_view};
use crate::error::ApiError;
use crate::extract::Id;
use crate::middleware::Viewer;
use crate::state::{AppState, blocking};

pub async fn list(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(LISTING_AUTH)?.sub;
    let listings = blocking(&state, move |s| {
        let rows = s.db.list_watchlist(user_id)?;
        Ok(rows.into_iter().map(listing_view).collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(json!({ "message": "Get watchlist successfully.", "listings": listings })))
}

pub async fn add(
    State(state): State<AppState>,
    Id(listing_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(LISTING_AUTH)?.sub;

    blocking(&state, move |s| {
        let listing = find_listing(s, listing_id)?;
        if s.db.is_watching(user_id, listing.id)? {
            return Err(ApiError::bad_request("Listing is already in your watchlist."));
        }
        Ok(s.db.add_to_watchlist(user_id, listing.id)?)
    })
    .await?;

    Ok(Json(json!({ "message": "Added to watchlist.", "is_in_watchlist": true })))
}

pub async fn remove(
    State(state): State<AppState>,
    Id(listing_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(LISTING_AUTH)?.sub;

    blocking(&state, move |s| {
        let listing = find_listing(s, listing_id)?;
        if !s.db.remove_from_watchlist(user_id, listing.id)? {
            return Err(ApiError::bad_request("Listing is not in your watchlist."));
        }
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "message": "Removed from watchlist.", "is_in_watchlist": false })))
}
