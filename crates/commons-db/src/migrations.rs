use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS revoked_tokens (
            jti         TEXT PRIMARY KEY,
            revoked_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Network

        CREATE TABLE IF NOT EXISTS posts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            content     TEXT NOT NULL,
            created_by  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
            is_deleted  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_posts_author
            ON posts(created_by, created_at);

        CREATE TABLE IF NOT EXISTS likes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, post_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_post
            ON likes(post_id);

        CREATE TABLE IF NOT EXISTS follows (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            follower_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            following_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(follower_id, following_id),
            CHECK(follower_id <> following_id)
        );

        CREATE TABLE IF NOT EXISTS post_comments (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            content     TEXT NOT NULL,
            created_by  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
            is_deleted  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_post_comments_post
            ON post_comments(post_id, created_at);

        -- Auctions

        CREATE TABLE IF NOT EXISTS categories (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS listings (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            title               TEXT NOT NULL CHECK(length(title) <= 64),
            description         TEXT NOT NULL,
            starting_bid_cents  INTEGER NOT NULL CHECK(starting_bid_cents > 0),
            url                 TEXT,
            created_by          INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            state               TEXT NOT NULL DEFAULT 'ACTIVE' CHECK(state IN ('ACTIVE', 'CLOSED')),
            winner_id           INTEGER REFERENCES users(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS listing_categories (
            listing_id   INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            category_id  INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            PRIMARY KEY (listing_id, category_id)
        );

        CREATE TABLE IF NOT EXISTS bids (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            listing_id   INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            bidder_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            price_cents  INTEGER NOT NULL CHECK(price_cents > 0),
            bid_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_bids_listing
            ON bids(listing_id, price_cents);

        CREATE TABLE IF NOT EXISTS watchlist (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            listing_id  INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, listing_id)
        );

        CREATE TABLE IF NOT EXISTS listing_comments (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            listing_id  INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            content     TEXT NOT NULL,
            created_by  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            is_deleted  INTEGER NOT NULL DEFAULT 0
        );

        -- Seed the default categories
        INSERT OR IGNORE INTO categories (name) VALUES
            ('Books'), ('Electronics'), ('Fashion'), ('Home'), ('Toys'), ('Collectibles');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
