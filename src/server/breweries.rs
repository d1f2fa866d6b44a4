use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{RequireAdmin, RequireUser};
use crate::media::MediaStorage;
use crate::server::AppState;
use crate::server::activity::record_activity;
use crate::server::dto::{CreateBreweryRequest, UpdateBreweryRequest};
use crate::server::response::{ApiError, ApiResponse, DbOptionExt, DbResultExt};
use crate::server::upload::read_single_image;
use crate::server::validation::validate_required;
use crate::types::Brewery;

pub fn brewery_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_breweries))
        .route("/", post(create_brewery))
        .route("/{id}", get(get_brewery))
        .route("/{id}", put(update_brewery))
        .route("/{id}", delete(delete_brewery))
        .route("/{id}/cover", put(upload_cover))
        .route("/verified/{id}", put(mark_verified))
        .route("/unverified/{id}", put(mark_unverified))
}

async fn list_breweries(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let breweries = state
        .db
        .list_breweries()
        .api_err("Failed to list breweries")?;
    Ok(Json(ApiResponse::success(breweries)))
}

async fn get_brewery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let brewery = state
        .db
        .get_brewery(&id)
        .api_err("Failed to get brewery")?
        .or_not_found("Brewery not found")?;

    Ok(Json(ApiResponse::success(brewery)))
}

async fn create_brewery(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBreweryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_required(&req.name, "Brewery name")?;
    validate_required(&req.location, "Location")?;

    let now = Utc::now();
    let brewery = Brewery {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        location: req.location,
        date_of_founding: req.date_of_founding,
        cover_image: None,
        verified: false,
        author_id: Some(caller.user_id.clone()),
        date_created: now,
        date_updated: now,
    };

    state
        .db
        .create_brewery(&brewery)
        .api_err("Failed to create brewery")?;

    record_activity(
        &state,
        &caller.user_id,
        "brewery.create",
        "brewery",
        &brewery.id,
        None,
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(brewery))))
}

async fn update_brewery(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBreweryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut brewery = state
        .db
        .get_brewery(&id)
        .api_err("Failed to get brewery")?
        .or_not_found("Brewery not found")?;

    if !caller.can_moderate(brewery.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to edit this brewery"));
    }

    if let Some(name) = req.name {
        validate_required(&name, "Brewery name")?;
        brewery.name = name.trim().to_string();
    }
    if let Some(location) = req.location {
        brewery.location = location;
    }
    if let Some(date_of_founding) = req.date_of_founding {
        brewery.date_of_founding = date_of_founding;
    }

    state
        .db
        .update_brewery(&brewery)
        .api_err("Failed to update brewery")?;

    Ok(Json(ApiResponse::success(brewery)))
}

async fn delete_brewery(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let brewery = state
        .db
        .get_brewery(&id)
        .api_err("Failed to get brewery")?
        .or_not_found("Brewery not found")?;

    if !caller.can_moderate(brewery.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to delete this brewery"));
    }

    state
        .db
        .delete_brewery(&id)
        .api_err("Failed to delete brewery")?;

    if let Some(cover) = brewery.cover_image {
        if let Err(e) = state.media.delete(&cover).await {
            tracing::warn!("Failed to delete brewery cover {cover}: {e}");
        }
    }

    record_activity(
        &state,
        &caller.user_id,
        "brewery.delete",
        "brewery",
        &id,
        None,
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn upload_cover(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let brewery = state
        .db
        .get_brewery(&id)
        .api_err("Failed to get brewery")?
        .or_not_found("Brewery not found")?;

    if !caller.can_moderate(brewery.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to edit this brewery"));
    }

    let upload = read_single_image(multipart, "cover_image").await?;

    // Brewery covers use the flat naming convention.
    let rel_path = MediaStorage::flat_path(Utc::now().timestamp_millis(), upload.extension());

    let staged = state
        .media
        .stage(&upload.data)
        .await
        .map_err(|_| ApiError::internal("Failed to store cover image"))?;

    if state.db.set_brewery_cover(&id, Some(rel_path.as_str())).is_err() {
        state.media.discard(staged).await;
        return Err(ApiError::internal("Failed to update cover image"));
    }

    if let Err(e) = state.media.promote(staged, &rel_path).await {
        tracing::error!("Failed to promote brewery cover {rel_path}: {e}");
    }

    if let Some(old) = brewery.cover_image {
        if let Err(e) = state.media.delete(&old).await {
            tracing::warn!("Failed to delete old brewery cover {old}: {e}");
        }
    }

    Ok(Json(ApiResponse::success(json!({ "cover_image": rel_path }))))
}

async fn mark_verified(
    auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    set_verified(auth, state, id, true).await
}

async fn mark_unverified(
    auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    set_verified(auth, state, id, false).await
}

async fn set_verified(
    RequireAdmin(caller): RequireAdmin,
    state: Arc<AppState>,
    id: String,
    verified: bool,
) -> Result<impl IntoResponse, ApiError> {
    match state.db.set_brewery_verified(&id, verified) {
        Ok(()) => {}
        Err(crate::error::Error::NotFound) => {
            return Err(ApiError::not_found("Brewery not found"));
        }
        Err(_) => return Err(ApiError::internal("Failed to update brewery")),
    }

    record_activity(
        &state,
        &caller.user_id,
        if verified {
            "brewery.verify"
        } else {
            "brewery.unverify"
        },
        "brewery",
        &id,
        None,
    );

    Ok(Json(ApiResponse::success(json!({ "verified": verified }))))
}
