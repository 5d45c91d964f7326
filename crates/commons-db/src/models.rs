//! Database row types. These map directly to SQLite rows and stay
//! independent of the API view types in commons-types.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

/// A post joined with its author and live counts.
#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub content: String,
    pub created_by: i64,
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_deleted: bool,
    pub likes_count: i64,
    /// Soft-deleted comments are not counted.
    pub comments_count: i64,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub created_by: i64,
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
    Active,
    Closed,
}

impl ListingState {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingState::Active => "ACTIVE",
            ListingState::Closed => "CLOSED",
        }
    }
}

impl ToSql for ListingState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ListingState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "ACTIVE" => Ok(ListingState::Active),
            "CLOSED" => Ok(ListingState::Closed),
            other => Err(FromSqlError::Other(format!("unknown listing state {other}").into())),
        }
    }
}

/// A listing joined with its owner, winner and bid summary.
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub starting_bid_cents: i64,
    /// Highest bid, or the starting bid when nobody has bid yet.
    pub current_price_cents: i64,
    pub url: Option<String>,
    pub created_by: i64,
    pub author: String,
    pub created_at: String,
    pub state: ListingState,
    pub winner: Option<String>,
    pub bids_count: i64,
}

#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub active_count: i64,
}

#[derive(Debug, Clone)]
pub struct BidRow {
    pub id: i64,
    pub listing_id: i64,
    pub bidder_id: i64,
    pub bidder: String,
    pub price_cents: i64,
    pub bid_at: String,
}

#[derive(Debug, Clone)]
pub struct ListingCommentRow {
    pub id: i64,
    pub listing_id: i64,
    pub content: String,
    pub created_by: i64,
    pub author: String,
    pub created_at: String,
    pub is_deleted: bool,
}
