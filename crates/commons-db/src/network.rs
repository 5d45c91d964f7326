use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::models::{CommentRow, PostRow};
use crate::{Database, Result};

/// Posts joined with their author, like count and live comment count.
const POST_SELECT: &str = "
    SELECT p.id, p.content, p.created_by, u.username, p.created_at, p.updated_at, p.is_deleted,
           (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id),
           (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id AND c.is_deleted = 0)
    FROM posts p
    JOIN users u ON u.id = p.created_by";

const POST_ORDER: &str = "ORDER BY p.created_at DESC, p.id DESC";

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.content, c.created_by, u.username, c.created_at, c.updated_at, c.is_deleted
    FROM post_comments c
    JOIN users u ON u.id = c.created_by";

impl Database {
    // -- Posts --

    pub fn create_post(&self, author_id: i64, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (content, created_by) VALUES (?1, ?2)",
                (content, author_id),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Fetches a post whether or not it has been soft-deleted.
    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.id = ?1");
            Ok(conn.query_row(&sql, [id], map_post).optional()?)
        })
    }

    /// Live posts, newest first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts(conn, "p.is_deleted = 0", params![]))
    }

    pub fn list_posts_by_author(&self, author_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts(conn, "p.is_deleted = 0 AND p.created_by = ?1", [author_id]))
    }

    /// Live posts written by anyone `user_id` follows.
    pub fn list_following_posts(&self, user_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                "p.is_deleted = 0
                 AND p.created_by IN (SELECT following_id FROM follows WHERE follower_id = ?1)",
                [user_id],
            )
        })
    }

    pub fn update_post_content(&self, id: i64, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE posts SET content = ?1, updated_at = datetime('now') WHERE id = ?2",
                (content, id),
            )?;
            Ok(())
        })
    }

    pub fn soft_delete_post(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE posts SET is_deleted = 1, updated_at = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    // -- Likes --

    pub fn has_liked(&self, user_id: i64, post_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM likes WHERE user_id = ?1 AND post_id = ?2",
                    (user_id, post_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// A second like from the same user fails with `DbError::Integrity`.
    pub fn like_post(&self, user_id: i64, post_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO likes (user_id, post_id) VALUES (?1, ?2)",
                (user_id, post_id),
            )?;
            Ok(())
        })
    }

    /// Returns false when there was no like to remove.
    pub fn unlike_post(&self, user_id: i64, post_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                (user_id, post_id),
            )?;
            Ok(removed > 0)
        })
    }

    pub fn likes_count(&self, post_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM likes WHERE post_id = ?1", [post_id], |row| {
                row.get(0)
            })?)
        })
    }

    /// The subset of `post_ids` that `user_id` has liked.
    pub fn liked_post_ids(&self, user_id: i64, post_ids: &[i64]) -> Result<HashSet<i64>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT post_id FROM likes WHERE user_id = ?1 AND post_id IN ({})",
                placeholders(2, post_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map(
                    params_from_iter(std::iter::once(&user_id).chain(post_ids.iter())),
                    |row| row.get(0),
                )?
                .collect::<rusqlite::Result<HashSet<i64>>>()?;
            Ok(ids)
        })
    }

    // -- Follows --

    pub fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                    (follower_id, following_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Duplicate follows and self-follows fail with `DbError::Integrity`.
    pub fn follow(&self, follower_id: i64, following_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO follows (follower_id, following_id) VALUES (?1, ?2)",
                (follower_id, following_id),
            )?;
            Ok(())
        })
    }

    pub fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                (follower_id, following_id),
            )?;
            Ok(removed > 0)
        })
    }

    // -- Comments --

    pub fn create_post_comment(&self, post_id: i64, author_id: i64, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO post_comments (post_id, created_by, content) VALUES (?1, ?2, ?3)",
                (post_id, author_id, content),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post_comment(&self, id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
            Ok(conn.query_row(&sql, [id], map_comment).optional()?)
        })
    }

    /// Live comments on one post, oldest first.
    pub fn list_post_comments(&self, post_id: i64) -> Result<Vec<CommentRow>> {
        self.comments_for_posts(&[post_id])
    }

    /// Live comments on any of `post_ids`, oldest first.
    pub fn comments_for_posts(&self, post_ids: &[i64]) -> Result<Vec<CommentRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "{COMMENT_SELECT}
                 WHERE c.is_deleted = 0 AND c.post_id IN ({})
                 ORDER BY c.created_at ASC, c.id ASC",
                placeholders(1, post_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(post_ids.iter()), map_comment)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn update_post_comment(&self, id: i64, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE post_comments SET content = ?1, updated_at = datetime('now') WHERE id = ?2",
                (content, id),
            )?;
            Ok(())
        })
    }

    pub fn soft_delete_post_comment(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE post_comments SET is_deleted = 1, updated_at = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }
}

/// `?start, ?start+1, ...` for `count` positional parameters.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn query_posts<P: rusqlite::Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<PostRow>> {
    let sql = format!("{POST_SELECT} WHERE {filter} {POST_ORDER}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, map_post)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        content: row.get(1)?,
        created_by: row.get(2)?,
        author: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        is_deleted: row.get(6)?,
        likes_count: row.get(7)?,
        comments_count: row.get(8)?,
    })
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        content: row.get(2)?,
        created_by: row.get(3)?,
        author: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        is_deleted: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbError};

    fn setup() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice", "alice@example.com", "hash").unwrap();
        let bob = db.create_user("bob", "bob@example.com", "hash").unwrap();
        let post = db.create_post(alice, "Test post content").unwrap();
        (db, alice, bob, post)
    }

    #[test]
    fn new_post_has_no_likes_or_comments() {
        let (db, alice, _, post) = setup();
        let row = db.get_post(post).unwrap().unwrap();
        assert_eq!(row.content, "Test post content");
        assert_eq!(row.created_by, alice);
        assert_eq!(row.author, "alice");
        assert!(!row.is_deleted);
        assert_eq!(row.likes_count, 0);
        assert_eq!(row.comments_count, 0);
    }

    #[test]
    fn duplicate_like_hits_the_unique_constraint() {
        let (db, _, bob, post) = setup();
        db.like_post(bob, post).unwrap();
        assert_eq!(db.likes_count(post).unwrap(), 1);

        let err = db.like_post(bob, post).unwrap_err();
        assert!(matches!(err, DbError::Integrity(_)));

        assert!(db.unlike_post(bob, post).unwrap());
        assert!(!db.unlike_post(bob, post).unwrap());
        assert_eq!(db.likes_count(post).unwrap(), 0);
    }

    #[test]
    fn follow_is_unique_and_never_reflexive() {
        let (db, alice, bob, _) = setup();
        db.follow(alice, bob).unwrap();
        assert!(db.is_following(alice, bob).unwrap());
        assert!(!db.is_following(bob, alice).unwrap());
        assert_eq!(db.follow_counts(alice).unwrap(), (1, 0));
        assert_eq!(db.follow_counts(bob).unwrap(), (0, 1));

        assert!(matches!(db.follow(alice, bob).unwrap_err(), DbError::Integrity(_)));
        assert!(matches!(db.follow(alice, alice).unwrap_err(), DbError::Integrity(_)));
    }

    #[test]
    fn soft_deleted_comments_are_not_counted_or_listed() {
        let (db, _, bob, post) = setup();
        let first = db.create_post_comment(post, bob, "Test comment 1").unwrap();
        db.create_post_comment(post, bob, "Test comment 2").unwrap();
        assert_eq!(db.get_post(post).unwrap().unwrap().comments_count, 2);

        db.soft_delete_post_comment(first).unwrap();
        assert_eq!(db.get_post(post).unwrap().unwrap().comments_count, 1);
        assert!(db.get_post_comment(first).unwrap().unwrap().is_deleted);

        let live = db.list_post_comments(post).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].content, "Test comment 2");
    }

    #[test]
    fn comments_come_back_oldest_first() {
        let (db, _, bob, post) = setup();
        let first = db.create_post_comment(post, bob, "First comment").unwrap();
        let second = db.create_post_comment(post, bob, "Second comment").unwrap();

        let ids: Vec<i64> = db.list_post_comments(post).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn posts_come_back_newest_first_without_deleted_ones() {
        let (db, alice, _, post) = setup();
        let newer = db.create_post(alice, "Test post 2").unwrap();

        let ids: Vec<i64> = db.list_posts().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![newer, post]);

        db.soft_delete_post(newer).unwrap();
        let ids: Vec<i64> = db.list_posts().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![post]);
        assert!(db.get_post(newer).unwrap().unwrap().is_deleted);
    }

    #[test]
    fn following_feed_only_shows_followed_authors() {
        let (db, alice, bob, post) = setup();
        let carol = db.create_user("carol", "carol@example.com", "hash").unwrap();
        db.create_post(carol, "from carol").unwrap();
        db.follow(bob, alice).unwrap();

        let feed = db.list_following_posts(bob).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, post);
        assert!(db.list_following_posts(carol).unwrap().is_empty());
    }

    #[test]
    fn liked_post_ids_filters_to_the_user() {
        let (db, alice, bob, post) = setup();
        let other = db.create_post(alice, "another").unwrap();
        db.like_post(bob, post).unwrap();

        let liked = db.liked_post_ids(bob, &[post, other]).unwrap();
        assert!(liked.contains(&post));
        assert!(!liked.contains(&other));
        assert!(db.liked_post_ids(alice, &[post, other]).unwrap().is_empty());
    }
}
