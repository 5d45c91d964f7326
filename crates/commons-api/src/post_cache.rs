//! In-memory cache of serialized posts.
//!
//! Entries hold the viewer-independent part of a post's JSON and stay valid
//! for a fixed window (24 hours by default). Any write that changes what a
//! post serializes to (edit, soft delete, like, comment) must call
//! [`PostCache::invalidate`].
//!
//! Readers that build a view from the database take a [`PostCache::generation`]
//! before reading and store the result with [`PostCache::insert_if_current`].
//! A view read before a concurrent invalidation of the same post is then
//! dropped instead of cached.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use commons_types::api::PostView;

pub const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

struct CachedPost {
    view: PostView,
    cached_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<i64, CachedPost>,
    /// Bumped on every invalidation.
    generation: u64,
    /// Generation at which each post was last invalidated.
    invalidated: HashMap<i64, u64>,
    /// Readers that started before this generation may not insert.
    floor: u64,
}

pub struct PostCache {
    ttl: Duration,
    max_entries: usize,
    inner: Mutex<Inner>,
}

impl Default for PostCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS), DEFAULT_MAX_ENTRIES)
    }
}

impl PostCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // The maps hold no invariants a panicking writer could break.
    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, post_id: i64) -> Option<PostView> {
        self.get_at(post_id, Utc::now())
    }

    /// Returns the cached view if it is still within the window at `now`.
    /// Expired entries are dropped.
    pub fn get_at(&self, post_id: i64, now: DateTime<Utc>) -> Option<PostView> {
        let mut inner = self.inner();
        match inner.entries.get(&post_id) {
            Some(entry) if now - entry.cached_at < self.ttl => Some(entry.view.clone()),
            Some(_) => {
                inner.entries.remove(&post_id);
                None
            }
            None => None,
        }
    }

    /// Snapshot to take before reading the rows a view is built from.
    pub fn generation(&self) -> u64 {
        self.inner().generation
    }

    /// Caches `view` unless its post was invalidated after `generation` was
    /// taken. Returns whether the view was stored.
    pub fn insert_if_current(&self, view: PostView, generation: u64) -> bool {
        let mut inner = self.inner();
        let stale = generation < inner.floor
            || inner.invalidated.get(&view.id).is_some_and(|&g| g > generation);
        if stale {
            return false;
        }
        self.store(&mut inner, view, Utc::now());
        true
    }

    pub fn insert(&self, view: PostView) {
        self.insert_at(view, Utc::now());
    }

    pub fn insert_at(&self, view: PostView, cached_at: DateTime<Utc>) {
        let mut inner = self.inner();
        self.store(&mut inner, view, cached_at);
    }

    /// Sweeps expired entries, then evicts the oldest while at capacity.
    fn store(&self, inner: &mut Inner, mut view: PostView, cached_at: DateTime<Utc>) {
        view.is_liked = false;
        let ttl = self.ttl;
        inner.entries.retain(|_, e| cached_at - e.cached_at < ttl);

        if !inner.entries.contains_key(&view.id) && inner.entries.len() >= self.max_entries {
            let victim = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.cached_at)
                .map(|(id, _)| *id);
            if let Some(victim) = victim {
                inner.entries.remove(&victim);
            }
        }

        inner.entries.insert(view.id, CachedPost { view, cached_at });
    }

    pub fn cached_at(&self, post_id: i64) -> Option<DateTime<Utc>> {
        self.inner().entries.get(&post_id).map(|e| e.cached_at)
    }

    pub fn is_valid(&self, post_id: i64) -> bool {
        self.is_valid_at(post_id, Utc::now())
    }

    pub fn is_valid_at(&self, post_id: i64, now: DateTime<Utc>) -> bool {
        self.inner()
            .entries
            .get(&post_id)
            .is_some_and(|e| now - e.cached_at < self.ttl)
    }

    pub fn invalidate(&self, post_id: i64) {
        let mut inner = self.inner();
        inner.entries.remove(&post_id);
        inner.generation += 1;
        let generation = inner.generation;
        inner.invalidated.insert(post_id, generation);

        // Forget per-post marks once there are too many; readers older than
        // now are refused wholesale instead.
        if inner.invalidated.len() > self.max_entries {
            inner.invalidated.clear();
            inner.floor = generation;
        }
    }

    pub fn clear(&self) {
        self.inner().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: i64, content: &str) -> PostView {
        PostView {
            id,
            content: content.to_string(),
            created_by: "testuser1".to_string(),
            created_at: "2024-01-01 00:00:00".to_string(),
            updated_at: "2024-01-01 00:00:00".to_string(),
            is_deleted: false,
            likes_count: 0,
            comments_count: 0,
            is_liked: false,
            comments: vec![],
        }
    }

    #[test]
    fn empty_cache_is_never_valid() {
        let cache = PostCache::default();
        assert!(!cache.is_valid(1));
        assert!(cache.get(1).is_none());
        assert!(cache.cached_at(1).is_none());
        assert_eq!(cache.ttl(), Duration::hours(24));
        assert_eq!(cache.max_entries(), DEFAULT_MAX_ENTRIES);
    }

    #[test]
    fn serves_the_same_view_until_invalidated() {
        let cache = PostCache::default();
        cache.insert(view(1, "Test post content"));
        assert!(cache.is_valid(1));
        assert_eq!(cache.get(1).unwrap().content, "Test post content");

        cache.invalidate(1);
        assert!(!cache.is_valid(1));
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn expires_after_the_window() {
        let cache = PostCache::default();
        let now = Utc::now();

        cache.insert_at(view(1, "a"), now - Duration::seconds(DEFAULT_TTL_SECS - 1));
        assert!(cache.is_valid_at(1, now));
        assert!(cache.get_at(1, now).is_some());

        cache.insert_at(view(1, "a"), now - Duration::seconds(DEFAULT_TTL_SECS + 1));
        assert!(!cache.is_valid_at(1, now));
        assert!(cache.get_at(1, now).is_none());
        // Expired entries are dropped on read.
        assert!(cache.is_empty());
    }

    #[test]
    fn reinserting_refreshes_the_timestamp() {
        let cache = PostCache::default();
        let earlier = Utc::now() - Duration::hours(1);
        cache.insert_at(view(1, "old"), earlier);

        cache.insert(view(1, "new"));
        assert!(cache.cached_at(1).unwrap() > earlier);
        assert_eq!(cache.get(1).unwrap().content, "new");
    }

    #[test]
    fn never_stores_viewer_specific_flags() {
        let cache = PostCache::default();
        let mut liked = view(7, "liked");
        liked.is_liked = true;
        cache.insert(liked);
        assert!(!cache.get(7).unwrap().is_liked);
    }

    #[test]
    fn clear_drops_everything() {
        let cache = PostCache::new(Duration::seconds(60), 10);
        cache.insert(view(1, "a"));
        cache.insert(view(2, "b"));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_the_oldest_entry_at_capacity() {
        let cache = PostCache::new(Duration::hours(1), 2);
        let now = Utc::now();
        cache.insert_at(view(1, "oldest"), now - Duration::minutes(3));
        cache.insert_at(view(2, "middle"), now - Duration::minutes(2));

        // Refreshing an existing entry does not evict anything.
        cache.insert_at(view(2, "middle again"), now - Duration::minutes(1));
        assert_eq!(cache.len(), 2);

        cache.insert_at(view(3, "newest"), now);
        assert_eq!(cache.len(), 2);
        assert!(cache.cached_at(1).is_none());
        assert!(cache.cached_at(2).is_some());
        assert!(cache.cached_at(3).is_some());
    }

    #[test]
    fn inserting_sweeps_expired_entries() {
        let cache = PostCache::new(Duration::minutes(10), 100);
        let now = Utc::now();
        cache.insert_at(view(1, "stale"), now - Duration::minutes(11));
        cache.insert_at(view(2, "stale"), now - Duration::minutes(20));

        cache.insert_at(view(3, "fresh"), now);
        assert_eq!(cache.len(), 1);
        assert!(cache.cached_at(3).is_some());
    }

    #[test]
    fn views_read_before_an_invalidation_are_not_cached() {
        let cache = PostCache::default();
        let generation = cache.generation();

        // A write lands between the reader's query and its insert.
        cache.invalidate(1);
        assert!(!cache.insert_if_current(view(1, "stale"), generation));
        assert!(!cache.is_valid(1));

        // Other posts are unaffected.
        assert!(cache.insert_if_current(view(2, "other"), generation));

        // A reader that started after the write may cache its view.
        assert!(cache.insert_if_current(view(1, "fresh"), cache.generation()));
        assert_eq!(cache.get(1).unwrap().content, "fresh");
    }

    #[test]
    fn forgetting_marks_refuses_older_readers() {
        let cache = PostCache::new(Duration::hours(1), 2);
        let generation = cache.generation();
        for id in 10..13 {
            cache.invalidate(id);
        }

        // Post 1 was never invalidated, but its reader predates the reset.
        assert!(!cache.insert_if_current(view(1, "a"), generation));
        assert!(cache.insert_if_current(view(1, "a"), cache.generation()));
    }
}
