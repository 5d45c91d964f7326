use axum::{Extension, Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::info;

use commons_db::auctions::BidOutcome;
use commons_db::models::{BidRow, ListingState};
use commons_types::api::{BidRequest, BidView};
use commons_types::money::Cents;

use crate::auctions::listings::{LISTING_AUTH, LISTING_NOT_FOUND, find_listing, listing_view};
use crate::error::ApiError;
use crate::extract::{Id, parse_json};
use crate::middleware::Viewer;
use crate::state::{AppState, blocking};

const AUCTION_CLOSED: &str = "This auction is closed.";

pub async fn list_bids(
    State(state): State<AppState>,
    Id(listing_id): Id,
) -> Result<impl IntoResponse, ApiError> {
    let bids = blocking(&state, move |s| {
        let listing = find_listing(s, listing_id)?;
        let rows = s.db.list_bids(listing.id)?;
        Ok(rows.into_iter().map(bid_view).collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(json!({ "message": "Get bids successfully.", "bids": bids })))
}

pub async fn place_bid(
    State(state): State<AppState>,
    Id(listing_id): Id,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let claims = viewer.require(LISTING_AUTH)?;
    let bidder_id = claims.sub;
    let req: BidRequest = parse_json(&body)?;

    let listing = blocking(&state, move |s| {
        let listing = find_listing(s, listing_id)?;
        if listing.state == ListingState::Closed {
            return Err(ApiError::bad_request(AUCTION_CLOSED));
        }
        if listing.created_by == bidder_id {
            return Err(ApiError::Forbidden("You cannot bid on your own listing."));
        }

        let price = req
            .price
            .and_then(|p| p.to_cents().ok())
            .ok_or_else(|| ApiError::bad_request("Bid must be a positive amount with at most two decimal places."))?;

        // The price is checked again inside the insert transaction.
        match s.db.place_bid(listing.id, bidder_id, price.0)? {
            BidOutcome::Placed(_) => {}
            BidOutcome::ListingMissing => return Err(ApiError::NotFound(LISTING_NOT_FOUND)),
            BidOutcome::Closed => return Err(ApiError::bad_request(AUCTION_CLOSED)),
            BidOutcome::BelowStartingBid => {
                return Err(ApiError::bad_request("Bid must be at least the starting bid."));
            }
            BidOutcome::NotAboveCurrent => {
                return Err(ApiError::bad_request("Bid must be higher than the current price."));
            }
        }
        s.db.get_listing(listing.id)?.map(listing_view).ok_or(ApiError::Database)
    })
    .await?;
    info!("{} bid {} on listing {}", claims.username, listing.current_price, listing.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Bid placed successfully.", "listing": listing })),
    ))
}

fn bid_view(row: BidRow) -> BidView {
    BidView {
        id: row.id,
        bidder: row.bidder,
        price: Cents(row.price_cents),
        bid_at: row.bid_at,
    }
}
