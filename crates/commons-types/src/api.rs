use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::{Amount, Cents};

// -- JWT Claims --

/// Bearer token claims. `jti` identifies the token so logout can revoke it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub jti: Uuid,
    pub exp: usize,
}

// -- Auth --

/// Fields are optional so missing values surface as validation errors
/// rather than JSON decode failures.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirmation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub following_count: i64,
    pub follower_count: i64,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserView,
    pub token: String,
}

// -- Network --

/// Body of every "write some text" endpoint: posts and comments.
#[derive(Debug, Default, Deserialize)]
pub struct ContentRequest {
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: i64,
    pub content: String,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_deleted: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    /// Relative to the requesting user; always false inside the cache.
    pub is_liked: bool,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub email: String,
    pub following_count: i64,
    pub follower_count: i64,
    pub is_following: bool,
}

#[derive(Debug, Serialize)]
pub struct FollowCounts {
    pub following_count: i64,
    pub target_user_followers: i64,
}

// -- Auctions --

#[derive(Debug, Default, Deserialize)]
pub struct CreateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starting_bid: Option<Amount>,
    pub url: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub category_ids: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BidRequest {
    pub price: Option<Amount>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub starting_bid: Cents,
    pub current_price: Cents,
    pub url: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub state: String,
    pub winner: Option<String>,
    pub bids_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BidView {
    pub id: i64,
    pub bidder: String,
    pub price: Cents,
    pub bid_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingCommentView {
    pub id: i64,
    pub listing_id: i64,
    pub content: String,
    pub created_by: String,
    pub created_at: String,
    pub is_deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct ListingDetail {
    pub message: &'static str,
    pub listing: ListingView,
    pub categories: Vec<CategoryView>,
    pub is_in_watchlist: bool,
    pub comments: Vec<ListingCommentView>,
    pub winning_bidder: Option<String>,
}

// -- Wiki --

#[derive(Debug, Default, Deserialize)]
pub struct CreateEntryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Set when the query names an entry exactly (ignoring case).
    pub exact: Option<String>,
    pub results: Vec<String>,
}
