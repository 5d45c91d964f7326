use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use commons_db::auctions::{ListingChanges, NewListing};
use commons_db::models::{CategoryRow, ListingRow};
use commons_types::api::{
    CategoryView, CreateListingRequest, ListingDetail, ListingQuery, ListingView, UpdateListingRequest,
};
use commons_types::money::Cents;

use crate::auctions::comments::listing_comment_view;
use crate::error::ApiError;
use crate::extract::{Id, non_blank, parse_json};
use crate::middleware::Viewer;
use crate::state::{AppState, AppStateInner, blocking};

pub(crate) const LISTING_AUTH: &str = "You must be logged in to use the auction site.";
pub(crate) const LISTING_NOT_FOUND: &str = "Listing not found.";

const MAX_PAGE: u32 = 100;
const MAX_TITLE_LEN: usize = 64;
const BAD_STARTING_BID: &str = "Starting bid must be a positive amount with at most two decimal places";

pub async fn list_listings(
    State(state): State<AppState>,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.map(|l| l.min(MAX_PAGE));
    let listings = blocking(&state, move |s| {
        let rows = s.db.list_active_listings(limit)?;
        Ok(rows.into_iter().map(listing_view).collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(json!({ "message": "Get listings successfully.", "listings": listings })))
}

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let claims = viewer.require(LISTING_AUTH)?;
    let req: CreateListingRequest = parse_json(&body)?;
    let created_by = claims.sub;

    let listing = blocking(&state, move |s| {
        let mut details = Vec::new();
        let title = check_title(req.title, &mut details);
        let description = check_description(req.description, &mut details);
        let starting_bid = match req.starting_bid.map(|a| a.to_cents()) {
            Some(Ok(cents)) => Some(cents),
            _ => {
                details.push(BAD_STARTING_BID.to_string());
                None
            }
        };
        let url = check_url(req.url, &mut details);
        check_categories(s, &req.category_ids, &mut details)?;

        let (Some(title), Some(description), Some(starting_bid), true) =
            (title, description, starting_bid, details.is_empty())
        else {
            return Err(invalid_listing(details));
        };

        let id = s.db.create_listing(&NewListing {
            title: &title,
            description: &description,
            starting_bid_cents: starting_bid.0,
            url: url.as_deref(),
            category_ids: &req.category_ids,
            created_by,
        })?;
        s.db.get_listing(id)?.map(listing_view).ok_or(ApiError::Database)
    })
    .await?;
    info!("Listing {} created by {}", listing.id, claims.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Listing created successfully.", "listing": listing })),
    ))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Id(listing_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = viewer.user_id();

    let detail = blocking(&state, move |s| {
        let row = find_listing(s, listing_id)?;
        let is_in_watchlist = match viewer_id {
            Some(user_id) => s.db.is_watching(user_id, row.id)?,
            None => false,
        };
        let categories = s.db.listing_categories(row.id)?.into_iter().map(category_view).collect();
        let comments = s
            .db
            .list_listing_comments(row.id)?
            .into_iter()
            .map(listing_comment_view)
            .collect();

        let listing = listing_view(row);
        Ok(ListingDetail {
            message: "Get listing successfully.",
            winning_bidder: listing.winner.clone(),
            listing,
            categories,
            is_in_watchlist,
            comments,
        })
    })
    .await?;

    Ok(Json(detail))
}

pub async fn edit_listing(
    State(state): State<AppState>,
    Id(listing_id): Id,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(LISTING_AUTH)?.sub;
    let req: UpdateListingRequest = parse_json(&body)?;

    let listing = blocking(&state, move |s| {
        let row = find_listing(s, listing_id)?;
        if row.created_by != user_id {
            return Err(ApiError::Forbidden("You can only edit your own listings."));
        }

        // Omitted fields keep their current value.
        let mut details = Vec::new();
        let title = match req.title {
            Some(t) => check_title(Some(t), &mut details),
            None => Some(row.title.clone()),
        };
        let description = match req.description {
            Some(d) => check_description(Some(d), &mut details),
            None => Some(row.description.clone()),
        };
        let url = match req.url {
            Some(u) => check_url(Some(u), &mut details),
            None => row.url.clone(),
        };
        if let Some(ids) = &req.category_ids {
            check_categories(s, ids, &mut details)?;
        }

        let (Some(title), Some(description), true) = (title, description, details.is_empty()) else {
            return Err(invalid_listing(details));
        };

        s.db.update_listing(
            row.id,
            &ListingChanges {
                title: &title,
                description: &description,
                url: url.as_deref(),
                category_ids: req.category_ids.as_deref(),
            },
        )?;
        s.db.get_listing(row.id)?.map(listing_view).ok_or(ApiError::Database)
    })
    .await?;

    Ok(Json(json!({ "message": "Listing updated successfully.", "listing": listing })))
}

pub async fn close_listing(
    State(state): State<AppState>,
    Id(listing_id): Id,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = viewer.require(LISTING_AUTH)?.sub;

    let listing = blocking(&state, move |s| {
        let row = find_listing(s, listing_id)?;
        if row.created_by != user_id {
            return Err(ApiError::Forbidden("Only the listing owner can close the auction."));
        }
        if !s.db.close_listing(row.id)? {
            return Err(ApiError::bad_request("This auction is already closed."));
        }
        s.db.get_listing(row.id)?.map(listing_view).ok_or(ApiError::Database)
    })
    .await?;
    info!(
        "Listing {} closed, winner: {}",
        listing.id,
        listing.winner.as_deref().unwrap_or("none")
    );

    Ok(Json(json!({ "message": "Auction closed successfully.", "listing": listing })))
}

pub(crate) fn find_listing(s: &AppStateInner, listing_id: i64) -> Result<ListingRow, ApiError> {
    s.db
        .get_listing(listing_id)?
        .ok_or(ApiError::NotFound(LISTING_NOT_FOUND))
}

fn invalid_listing(details: Vec<String>) -> ApiError {
    ApiError::Validation {
        message: "Invalid listing data.".to_string(),
        details,
    }
}

fn check_title(title: Option<String>, details: &mut Vec<String>) -> Option<String> {
    match non_blank(title) {
        None => {
            details.push("Title is required".to_string());
            None
        }
        Some(t) if t.chars().count() > MAX_TITLE_LEN => {
            details.push(format!("Title must be at most {MAX_TITLE_LEN} characters"));
            None
        }
        Some(t) => Some(t),
    }
}

fn check_description(description: Option<String>, details: &mut Vec<String>) -> Option<String> {
    let description = non_blank(description);
    if description.is_none() {
        details.push("Description is required".to_string());
    }
    description
}

/// A blank URL clears the field.
fn check_url(url: Option<String>, details: &mut Vec<String>) -> Option<String> {
    let url = non_blank(url)?;
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url)
    } else {
        details.push("URL must start with http:// or https://".to_string());
        None
    }
}

fn check_categories(s: &AppStateInner, ids: &[i64], details: &mut Vec<String>) -> Result<(), ApiError> {
    for id in s.db.missing_categories(ids)? {
        details.push(format!("Unknown category id {id}"));
    }
    Ok(())
}

pub(crate) fn listing_view(row: ListingRow) -> ListingView {
    ListingView {
        id: row.id,
        title: row.title,
        description: row.description,
        starting_bid: Cents(row.starting_bid_cents),
        current_price: Cents(row.current_price_cents),
        url: row.url,
        created_by: row.author,
        created_at: row.created_at,
        state: row.state.as_str().to_string(),
        winner: row.winner,
        bids_count: row.bids_count,
    }
}

pub(crate) fn category_view(row: CategoryRow) -> CategoryView {
    CategoryView {
        id: row.id,
        name: row.name,
        active_count: None,
    }
}
