//! The wiki: markdown entries stored on disk, looked up by title.

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tracing::info;

use commons_types::api::{ContentRequest, CreateEntryRequest, EntryView, SearchQuery, SearchResponse};
use commons_wiki::SearchResult;

use crate::error::{ApiError, method_not_allowed};
use crate::extract::{non_blank, parse_json};
use crate::middleware::Viewer;
use crate::state::AppState;

const WIKI_AUTH: &str = "You must be logged in to edit the wiki.";
const EMPTY_CONTENT: &str = "Entry content can not be empty.";

pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .route(
            "/entries",
            get(list_entries)
                .post(create_entry)
                .fallback(method_not_allowed("Only accept GET and POST methods.")),
        )
        .route(
            "/entries/{title}",
            get(get_entry)
                .put(update_entry)
                .fallback(method_not_allowed("Only accept GET and PUT methods.")),
        )
        .route("/search", get(search).fallback(method_not_allowed("GET request required.")))
        .route("/random", get(random).fallback(method_not_allowed("GET request required.")));

    Router::new().nest("/api/wiki", api)
}

pub async fn list_entries(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let entries = state.wiki.list().await?;
    Ok(Json(json!({ "entries": entries })))
}

pub async fn get_entry(
    State(state): State<AppState>,
    title: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(title) = title?;
    let (title, content) = state.wiki.get(&title).await?;
    Ok(Json(EntryView { title, content }))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let claims = viewer.require(WIKI_AUTH)?;
    let req: CreateEntryRequest = parse_json(&body)?;

    let title = non_blank(req.title).ok_or_else(|| ApiError::bad_request("Entry title is required."))?;
    let content = non_blank(req.content).ok_or_else(|| ApiError::bad_request(EMPTY_CONTENT))?;

    state.wiki.create(&title, &content).await?;
    info!("Wiki entry {} created by {}", title, claims.username);

    Ok((StatusCode::CREATED, Json(EntryView { title, content })))
}

pub async fn update_entry(
    State(state): State<AppState>,
    title: Result<Path<String>, PathRejection>,
    Extension(viewer): Extension<Viewer>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let Path(title) = title?;
    let claims = viewer.require(WIKI_AUTH)?;
    let req: ContentRequest = parse_json(&body)?;

    // Resolve first so a missing page is a 404 even with an empty body.
    let (title, _) = state.wiki.get(&title).await?;
    let content = non_blank(req.content).ok_or_else(|| ApiError::bad_request(EMPTY_CONTENT))?;

    let title = state.wiki.update(&title, &content).await?;
    info!("Wiki entry {} edited by {}", title, claims.username);

    Ok(Json(EntryView { title, content }))
}

pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let response = match state.wiki.search(&query.q).await? {
        SearchResult::Exact(title) => SearchResponse {
            query: query.q,
            exact: Some(title),
            results: vec![],
        },
        SearchResult::Partial(results) => SearchResponse {
            query: query.q,
            exact: None,
            results,
        },
    };
    Ok(Json(response))
}

pub async fn random(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let title = state
        .wiki
        .random()
        .await?
        .ok_or(ApiError::NotFound("Page not found"))?;
    let (title, content) = state.wiki.get(&title).await?;
    Ok(Json(EntryView { title, content }))
}
