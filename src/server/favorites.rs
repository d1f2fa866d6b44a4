use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::db::{FavoriteScope, FavoriteTable};
use crate::server::AppState;
use crate::server::activity::record_activity;
use crate::server::dto::{AddFavoriteRequest, FavoriteExistsResponse, PaginationParams};
use crate::server::response::{ApiError, ApiResponse, DbOptionExt, DbResultExt, OffsetPaginated};
use crate::server::validation::validate_pagination;
use crate::types::Favorite;

pub fn favorite_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(add_favorite))
        .route("/{table}", get(list_favorites))
        .route("/{table}/{id}", get(favorite_exists))
        .route("/{table}/{id}", delete(remove_favorite))
}

async fn add_favorite(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddFavoriteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let table = FavoriteTable::parse(&req.table)
        .ok_or_else(|| ApiError::bad_request("Invalid table name"))?;

    // The target must exist before a row may reference it.
    match table {
        FavoriteTable::Beers => {
            state
                .db
                .get_beer(&req.target_id)
                .api_err("Failed to look up beer")?
                .or_not_found("Beer not found")?;
        }
        FavoriteTable::Breweries => {
            state
                .db
                .get_brewery(&req.target_id)
                .api_err("Failed to look up brewery")?
                .or_not_found("Brewery not found")?;
        }
    }

    let favorite = Favorite {
        id: Uuid::new_v4().to_string(),
        user_id: caller.user_id.clone(),
        target_id: req.target_id,
        date_created: Utc::now(),
    };

    let inserted = state
        .db
        .add_favorite(table, &favorite)
        .api_err("Failed to add favorite")?;

    // Favoriting twice is a success, not an error.
    let Some(favorite) = inserted else {
        return Ok((
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "message": "Already favorited" }))),
        ));
    };

    record_activity(
        &state,
        &caller.user_id,
        "favorite.add",
        table.as_str(),
        &favorite.target_id,
        None,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(serde_json::to_value(favorite).unwrap_or_default())),
    ))
}

async fn list_favorites(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = FavoriteScope::parse(&table)
        .ok_or_else(|| ApiError::bad_request("Invalid table selection"))?;
    let (limit, offset) = validate_pagination(params.limit, params.offset)?;

    let favorites = state
        .db
        .list_favorites(scope, &caller.user_id, limit, offset)
        .api_err("Failed to list favorites")?;
    let total = state
        .db
        .count_favorites(scope, &caller.user_id)
        .api_err("Failed to count favorites")?;

    Ok(Json(OffsetPaginated::new(favorites, total, limit, offset)))
}

async fn favorite_exists(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let table = FavoriteTable::parse(&table)
        .ok_or_else(|| ApiError::bad_request("Invalid table name"))?;

    let favorited = state
        .db
        .favorite_exists(table, &caller.user_id, &id)
        .api_err("Failed to check favorite")?;

    Ok(Json(ApiResponse::success(FavoriteExistsResponse {
        favorited,
    })))
}

async fn remove_favorite(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let table = FavoriteTable::parse(&table)
        .ok_or_else(|| ApiError::bad_request("Invalid table name"))?;

    let favorite = state
        .db
        .get_favorite(table, &id)
        .api_err("Failed to get favorite")?
        .or_not_found("Favorite not found")?;

    if favorite.user_id != caller.user_id {
        return Err(ApiError::forbidden("Not authorized to remove this favorite"));
    }

    state
        .db
        .delete_favorite(table, &id)
        .api_err("Failed to remove favorite")?;

    record_activity(
        &state,
        &caller.user_id,
        "favorite.remove",
        table.as_str(),
        &favorite.target_id,
        None,
    );

    Ok(Json(ApiResponse::success(json!({ "deleted": favorite }))))
}
