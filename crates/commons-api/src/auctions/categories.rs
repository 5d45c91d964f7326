use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use commons_db::models::CategoryRow;
use commons_types::api::CategoryView;

use crate::auctions::listings::listing_view;
use crate::error::ApiError;
use crate::extract::Id;
use crate::state::{AppState, blocking};

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = blocking(&state, |s| {
        let rows = s.db.list_categories()?;
        Ok(rows.into_iter().map(counted_view).collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(json!({ "message": "Get categories successfully.", "categories": categories })))
}

pub async fn get_category(
    State(state): State<AppState>,
    Id(category_id): Id,
) -> Result<impl IntoResponse, ApiError> {
    let (category, listings) = blocking(&state, move |s| {
        let row = s
            .db
            .get_category(category_id)?
            .ok_or(ApiError::NotFound("Category not found."))?;
        let listings: Vec<_> = s
            .db
            .list_category_listings(row.id)?
            .into_iter()
            .map(listing_view)
            .collect();
        Ok((counted_view(row), listings))
    })
    .await?;

    Ok(Json(json!({
        "message": "Get category successfully.",
        "category": category,
        "listings": listings,
    })))
}

fn counted_view(row: CategoryRow) -> CategoryView {
    CategoryView {
        id: row.id,
        name: row.name,
        active_count: Some(row.active_count),
    }
}
