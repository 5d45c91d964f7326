use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::models::{BidRow, CategoryRow, ListingCommentRow, ListingRow, ListingState};
use crate::network::placeholders;
use crate::{Database, Result};

const LISTING_SELECT: &str = "
    SELECT l.id, l.title, l.description, l.starting_bid_cents,
           COALESCE((SELECT MAX(b.price_cents) FROM bids b WHERE b.listing_id = l.id), l.starting_bid_cents),
           l.url, l.created_by, u.username, l.created_at, l.state, w.username,
           (SELECT COUNT(*) FROM bids b WHERE b.listing_id = l.id)
    FROM listings l
    JOIN users u ON u.id = l.created_by
    LEFT JOIN users w ON w.id = l.winner_id";

const LISTING_ORDER: &str = "ORDER BY l.created_at DESC, l.id DESC";

const CATEGORY_SELECT: &str = "
    SELECT c.id, c.name,
           (SELECT COUNT(*) FROM listing_categories lc
            JOIN listings l ON l.id = lc.listing_id
            WHERE lc.category_id = c.id AND l.state = 'ACTIVE')
    FROM categories c";

pub struct NewListing<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub starting_bid_cents: i64,
    pub url: Option<&'a str>,
    pub category_ids: &'a [i64],
    pub created_by: i64,
}

/// Full replacement values for the editable columns of a listing.
/// Categories are only replaced when `category_ids` is set.
pub struct ListingChanges<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub url: Option<&'a str>,
    pub category_ids: Option<&'a [i64]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidOutcome {
    Placed(i64),
    ListingMissing,
    Closed,
    /// First bid lower than the starting bid.
    BelowStartingBid,
    /// Later bid not strictly higher than the current price.
    NotAboveCurrent,
}

impl Database {
    // -- Listings --

    pub fn create_listing(&self, listing: &NewListing<'_>) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO listings (title, description, starting_bid_cents, url, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    listing.title,
                    listing.description,
                    listing.starting_bid_cents,
                    listing.url,
                    listing.created_by
                ],
            )?;
            let id = tx.last_insert_rowid();
            set_categories(&tx, id, listing.category_ids)?;
            tx.commit()?;
            Ok(id)
        })
    }

    pub fn get_listing(&self, id: i64) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{LISTING_SELECT} WHERE l.id = ?1");
            Ok(conn.query_row(&sql, [id], map_listing).optional()?)
        })
    }

    /// Active listings, newest first.
    pub fn list_active_listings(&self, limit: Option<u32>) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            // SQLite treats a negative LIMIT as "no limit".
            let limit = limit.map(i64::from).unwrap_or(-1);
            query_listings(conn, "l.state = 'ACTIVE' {ORDER} LIMIT ?1", [limit])
        })
    }

    pub fn list_category_listings(&self, category_id: i64) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            query_listings(
                conn,
                "l.state = 'ACTIVE'
                 AND l.id IN (SELECT listing_id FROM listing_categories WHERE category_id = ?1)
                 {ORDER}",
                [category_id],
            )
        })
    }

    pub fn update_listing(&self, id: i64, changes: &ListingChanges<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE listings SET title = ?1, description = ?2, url = ?3 WHERE id = ?4",
                params![changes.title, changes.description, changes.url, id],
            )?;
            if let Some(category_ids) = changes.category_ids {
                tx.execute("DELETE FROM listing_categories WHERE listing_id = ?1", [id])?;
                set_categories(&tx, id, category_ids)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Closes an active listing and records the highest bidder as winner.
    /// Returns false when the listing was not active.
    pub fn close_listing(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE listings
                 SET state = 'CLOSED',
                     winner_id = (SELECT bidder_id FROM bids WHERE listing_id = ?1
                                  ORDER BY price_cents DESC, id ASC LIMIT 1)
                 WHERE id = ?1 AND state = 'ACTIVE'",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Bids --

    /// Validates the price against the listing and inserts the bid in one
    /// transaction, so two racing bidders cannot both beat the same price.
    pub fn place_bid(&self, listing_id: i64, bidder_id: i64, price_cents: i64) -> Result<BidOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let listing: Option<(ListingState, i64, Option<i64>)> = tx
                .query_row(
                    "SELECT l.state, l.starting_bid_cents,
                            (SELECT MAX(price_cents) FROM bids WHERE listing_id = l.id)
                     FROM listings l WHERE l.id = ?1",
                    [listing_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let Some((state, starting_bid, highest)) = listing else {
                return Ok(BidOutcome::ListingMissing);
            };
            if state == ListingState::Closed {
                return Ok(BidOutcome::Closed);
            }
            match highest {
                None if price_cents < starting_bid => return Ok(BidOutcome::BelowStartingBid),
                Some(current) if price_cents <= current => return Ok(BidOutcome::NotAboveCurrent),
                _ => {}
            }

            tx.execute(
                "INSERT INTO bids (listing_id, bidder_id, price_cents) VALUES (?1, ?2, ?3)",
                (listing_id, bidder_id, price_cents),
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(BidOutcome::Placed(id))
        })
    }

    /// Bids on a listing, highest first.
    pub fn list_bids(&self, listing_id: i64) -> Result<Vec<BidRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT b.id, b.listing_id, b.bidder_id, u.username, b.price_cents, b.bid_at
                 FROM bids b
                 JOIN users u ON u.id = b.bidder_id
                 WHERE b.listing_id = ?1
                 ORDER BY b.price_cents DESC, b.id ASC",
            )?;
            let rows = stmt
                .query_map([listing_id], |row| {
                    Ok(BidRow {
                        id: row.get(0)?,
                        listing_id: row.get(1)?,
                        bidder_id: row.get(2)?,
                        bidder: row.get(3)?,
                        price_cents: row.get(4)?,
                        bid_at: row.get(5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    // -- Watchlist --

    pub fn is_watching(&self, user_id: i64, listing_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM watchlist WHERE user_id = ?1 AND listing_id = ?2",
                    (user_id, listing_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn add_to_watchlist(&self, user_id: i64, listing_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO watchlist (user_id, listing_id) VALUES (?1, ?2)",
                (user_id, listing_id),
            )?;
            Ok(())
        })
    }

    pub fn remove_from_watchlist(&self, user_id: i64, listing_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM watchlist WHERE user_id = ?1 AND listing_id = ?2",
                (user_id, listing_id),
            )?;
            Ok(removed > 0)
        })
    }

    /// Every watched listing, active or closed.
    pub fn list_watchlist(&self, user_id: i64) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            query_listings(
                conn,
                "l.id IN (SELECT listing_id FROM watchlist WHERE user_id = ?1) {ORDER}",
                [user_id],
            )
        })
    }

    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| query_categories(conn, "1 = 1", params![]))
    }

    pub fn get_category(&self, id: i64) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| Ok(query_categories(conn, "c.id = ?1", [id])?.into_iter().next()))
    }

    pub fn listing_categories(&self, listing_id: i64) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            query_categories(
                conn,
                "c.id IN (SELECT category_id FROM listing_categories WHERE listing_id = ?1)",
                [listing_id],
            )
        })
    }

    /// The ids in `ids` that do not name a category.
    pub fn missing_categories(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id FROM categories WHERE id IN ({})",
                placeholders(1, ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let found = stmt
                .query_map(params_from_iter(ids.iter()), |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
        })
    }

    // -- Comments --

    pub fn create_listing_comment(&self, listing_id: i64, author_id: i64, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listing_comments (listing_id, created_by, content) VALUES (?1, ?2, ?3)",
                (listing_id, author_id, content),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_listing_comment(&self, id: i64) -> Result<Option<ListingCommentRow>> {
        self.with_conn(|conn| {
            Ok(query_listing_comments(conn, "c.id = ?1", [id])?.into_iter().next())
        })
    }

    /// Live comments on a listing, oldest first.
    pub fn list_listing_comments(&self, listing_id: i64) -> Result<Vec<ListingCommentRow>> {
        self.with_conn(|conn| {
            query_listing_comments(conn, "c.listing_id = ?1 AND c.is_deleted = 0", [listing_id])
        })
    }

    pub fn soft_delete_listing_comment(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE listing_comments SET is_deleted = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

fn set_categories(conn: &Connection, listing_id: i64, category_ids: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO listing_categories (listing_id, category_id) VALUES (?1, ?2)",
    )?;
    for category_id in category_ids {
        stmt.execute((listing_id, category_id))?;
    }
    Ok(())
}

/// `filter` may contain `{ORDER}`, replaced by the default listing order.
fn query_listings<P: rusqlite::Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<ListingRow>> {
    let filter = filter.replace("{ORDER}", LISTING_ORDER);
    let sql = format!("{LISTING_SELECT} WHERE {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, map_listing)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn map_listing(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        starting_bid_cents: row.get(3)?,
        current_price_cents: row.get(4)?,
        url: row.get(5)?,
        created_by: row.get(6)?,
        author: row.get(7)?,
        created_at: row.get(8)?,
        state: row.get(9)?,
        winner: row.get(10)?,
        bids_count: row.get(11)?,
    })
}

fn query_categories<P: rusqlite::Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<CategoryRow>> {
    let sql = format!("{CATEGORY_SELECT} WHERE {filter} ORDER BY c.name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(CategoryRow {
                id: row.get(0)?,
                name: row.get(1)?,
                active_count: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn query_listing_comments<P: rusqlite::Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<ListingCommentRow>> {
    let sql = format!(
        "SELECT c.id, c.listing_id, c.content, c.created_by, u.username, c.created_at, c.is_deleted
         FROM listing_comments c
         JOIN users u ON u.id = c.created_by
         WHERE {filter}
         ORDER BY c.created_at ASC, c.id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(ListingCommentRow {
                id: row.get(0)?,
                listing_id: row.get(1)?,
                content: row.get(2)?,
                created_by: row.get(3)?,
                author: row.get(4)?,
                created_at: row.get(5)?,
                is_deleted: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
