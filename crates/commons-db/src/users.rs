use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::UserRow;
use crate::{Database, Result};

const USER_COLUMNS: &str = "id, username, email, password, created_at";

impl Database {
    // -- Users --

    /// Inserts a user and returns its id. A taken username surfaces as
    /// `DbError::Integrity`.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// Returns `(following_count, follower_count)` for a user.
    pub fn follow_counts(&self, user_id: i64) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE following_id = ?1)",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(counts)
        })
    }

    // -- Tokens --

    pub fn revoke_token(&self, jti: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("INSERT OR IGNORE INTO revoked_tokens (jti) VALUES (?1)", [jti])?;
            Ok(())
        })
    }

    pub fn is_token_revoked(&self, jti: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM revoked_tokens WHERE jti = ?1", [jti], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, filter: &str, param: P) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");
    let row = conn.query_row(&sql, [param], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
    })
}
