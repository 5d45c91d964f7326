pub mod auctions;
pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod network;
pub mod post_cache;
pub mod state;
pub mod wiki;

use axum::{Router, middleware::from_fn_with_state};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All three apps behind one router. Every request passes through
/// [`middleware::resolve_viewer`] before reaching a handler.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(auth::routes())
        .merge(network::routes())
        .merge(auctions::routes())
        .merge(wiki::routes())
        .layer(from_fn_with_state(state.clone(), middleware::resolve_viewer))
        .with_state(state)
}
