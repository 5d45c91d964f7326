//! The auction site: listings, bids, watchlists, categories and comments.

pub mod bids;
pub mod categories;
pub mod comments;
pub mod listings;
pub mod watchlist;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::error::method_not_allowed;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .route(
            "/listings",
            get(listings::list_listings)
                .post(listings::create_listing)
                .fallback(method_not_allowed("Only accept GET and POST methods.")),
        )
        .route(
            "/listings/{listing_id}",
            get(listings::get_listing)
                .patch(listings::edit_listing)
                .fallback(method_not_allowed("Only accept GET and PATCH methods.")),
        )
        .route(
            "/listings/{listing_id}/close",
            post(listings::close_listing).fallback(method_not_allowed("POST request required.")),
        )
        .route(
            "/listings/{listing_id}/bids",
            get(bids::list_bids)
                .post(bids::place_bid)
                .fallback(method_not_allowed("Only accept GET and POST methods.")),
        )
        .route(
            "/listings/{listing_id}/watchlist",
            post(watchlist::add)
                .delete(watchlist::remove)
                .fallback(method_not_allowed("Only accept POST and DELETE methods.")),
        )
        .route(
            "/listings/{listing_id}/comments",
            get(comments::list_comments)
                .post(comments::create_comment)
                .fallback(method_not_allowed("Only accept GET and POST methods.")),
        )
        .route(
            "/comments/{comment_id}",
            delete(comments::delete_comment).fallback(method_not_allowed("DELETE request required.")),
        )
        .route(
            "/watchlist",
            get(watchlist::list).fallback(method_not_allowed("GET request required.")),
        )
        .route(
            "/categories",
            get(categories::list_categories).fallback(method_not_allowed("GET request required.")),
        )
        .route(
            "/categories/{category_id}",
            get(categories::get_category).fallback(method_not_allowed("GET request required.")),
        );

    Router::new().nest("/api/auctions", api)
}
