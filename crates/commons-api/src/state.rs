use std::sync::Arc;

use argon2::Argon2;
use tracing::error;

use commons_db::Database;
use commons_wiki::EntryStore;

use crate::error::ApiError;
use crate::post_cache::PostCache;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub wiki: EntryStore,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub hasher: Argon2<'static>,
    pub post_cache: PostCache,
}

impl AppStateInner {
    /// State with the default Argon2id hasher.
    pub fn new(
        db: Database,
        wiki: EntryStore,
        jwt_secret: String,
        token_ttl: chrono::Duration,
        post_cache: PostCache,
    ) -> Self {
        Self {
            db,
            wiki,
            jwt_secret,
            token_ttl,
            hasher: Argon2::default(),
            post_cache,
        }
    }
}

/// Runs blocking database work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
}
