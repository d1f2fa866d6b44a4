use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};

use crate::server::AppState;
use crate::server::dto::SearchParams;
use crate::server::response::{ApiError, ApiResponse, DbResultExt};
use crate::server::validation::validate_pagination;

pub fn search_router() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(search))
}

/// Substring search over breweries and beers with a literal `type`
/// discriminator, ordered by name.
async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ApiError::bad_request("Search query is required"));
    }
    let (limit, offset) = validate_pagination(params.limit, params.offset)?;

    let results = state
        .db
        .search_catalog(params.q.trim(), limit, offset)
        .api_err("Failed to search")?;

    Ok(Json(ApiResponse::success(results)))
}
