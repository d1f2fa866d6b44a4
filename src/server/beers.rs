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

use crate::auth::RequireUser;
use crate::media::MediaStorage;
use crate::server::AppState;
use crate::server::activity::record_activity;
use crate::server::dto::{CreateBeerRequest, UpdateBeerRequest};
use crate::server::response::{ApiError, ApiResponse, DbOptionExt, DbResultExt};
use crate::server::upload::read_single_image;
use crate::server::validation::validate_required;
use crate::types::{Beer, ReviewWithPhotos};

pub fn beer_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_beers))
        .route("/", post(create_beer))
        .route("/{id}", get(get_beer))
        .route("/{id}", put(update_beer))
        .route("/{id}", delete(delete_beer))
        .route("/{id}/cover", put(upload_cover))
        .route("/{id}/reviews", get(list_beer_reviews))
}

async fn list_beers(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let beers = state.db.list_beers().api_err("Failed to list beers")?;
    Ok(Json(ApiResponse::success(beers)))
}

async fn get_beer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let beer = state
        .db
        .get_beer(&id)
        .api_err("Failed to get beer")?
        .or_not_found("Beer not found")?;

    Ok(Json(ApiResponse::success(beer)))
}

async fn create_beer(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBeerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_required(&req.name, "Beer name")?;
    validate_required(&req.style, "Style")?;
    validate_required(&req.description, "Description")?;
    validate_required(&req.color, "Color")?;
    if req.abv < 0.0 {
        return Err(ApiError::bad_request("ABV must be a positive number"));
    }
    if req.ibu < 0 {
        return Err(ApiError::bad_request("IBU must be a positive number"));
    }

    state
        .db
        .get_brewery(&req.brewery_id)
        .api_err("Failed to look up brewery")?
        .or_not_found("Brewery not found")?;

    let now = Utc::now();
    let beer = Beer {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        brewery_id: req.brewery_id,
        description: req.description,
        style: req.style,
        ibu: req.ibu,
        abv: req.abv,
        color: req.color,
        cover_image: None,
        author_id: Some(caller.user_id.clone()),
        date_created: now,
        date_updated: now,
    };

    state.db.create_beer(&beer).api_err("Failed to create beer")?;

    record_activity(
        &state,
        &caller.user_id,
        "beer.create",
        "beer",
        &beer.id,
        None,
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(beer))))
}

async fn update_beer(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBeerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut beer = state
        .db
        .get_beer(&id)
        .api_err("Failed to get beer")?
        .or_not_found("Beer not found")?;

    if !caller.can_moderate(beer.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to edit this beer"));
    }

    if let Some(name) = req.name {
        validate_required(&name, "Beer name")?;
        beer.name = name.trim().to_string();
    }
    if let Some(description) = req.description {
        beer.description = description;
    }
    if let Some(style) = req.style {
        beer.style = style;
    }
    if let Some(ibu) = req.ibu {
        if ibu < 0 {
            return Err(ApiError::bad_request("IBU must be a positive number"));
        }
        beer.ibu = ibu;
    }
    if let Some(abv) = req.abv {
        if abv < 0.0 {
            return Err(ApiError::bad_request("ABV must be a positive number"));
        }
        beer.abv = abv;
    }
    if let Some(color) = req.color {
        beer.color = color;
    }

    state.db.update_beer(&beer).api_err("Failed to update beer")?;

    Ok(Json(ApiResponse::success(beer)))
}

async fn delete_beer(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let beer = state
        .db
        .get_beer(&id)
        .api_err("Failed to get beer")?
        .or_not_found("Beer not found")?;

    if !caller.can_moderate(beer.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to delete this beer"));
    }

    // Review and photo rows cascade; collect the owned files first.
    let mut photo_paths = Vec::new();
    let reviews = state
        .db
        .list_beer_reviews(&id)
        .api_err("Failed to list reviews")?;
    for review in &reviews {
        let photos = state
            .db
            .list_review_photos(&review.id)
            .api_err("Failed to list review photos")?;
        photo_paths.extend(photos.into_iter().map(|p| p.photo_url));
    }

    state.db.delete_beer(&id).api_err("Failed to delete beer")?;

    if let Some(cover) = beer.cover_image {
        if let Err(e) = state.media.delete(&cover).await {
            tracing::warn!("Failed to delete beer cover {cover}: {e}");
        }
    }
    for path in photo_paths {
        if let Err(e) = state.media.delete(&path).await {
            tracing::warn!("Failed to delete review photo {path}: {e}");
        }
    }

    record_activity(
        &state,
        &caller.user_id,
        "beer.delete",
        "beer",
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
    let beer = state
        .db
        .get_beer(&id)
        .api_err("Failed to get beer")?
        .or_not_found("Beer not found")?;

    if !caller.can_moderate(beer.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to edit this beer"));
    }

    let brewery = state
        .db
        .get_brewery(&beer.brewery_id)
        .api_err("Failed to look up brewery")?
        .or_not_found("Brewery not found")?;

    let upload = read_single_image(multipart, "cover_image").await?;

    let rel_path = MediaStorage::beer_cover_path(
        &brewery.name,
        &beer.name,
        Utc::now().timestamp_millis(),
        upload.extension(),
    )
    .map_err(|_| ApiError::bad_request("Invalid brewery or beer name for storage path"))?;

    let staged = state
        .media
        .stage(&upload.data)
        .await
        .map_err(|_| ApiError::internal("Failed to store cover image"))?;

    if state.db.set_beer_cover(&id, Some(rel_path.as_str())).is_err() {
        state.media.discard(staged).await;
        return Err(ApiError::internal("Failed to update cover image"));
    }

    if let Err(e) = state.media.promote(staged, &rel_path).await {
        tracing::error!("Failed to promote beer cover {rel_path}: {e}");
    }

    if let Some(old) = beer.cover_image {
        if let Err(e) = state.media.delete(&old).await {
            tracing::warn!("Failed to delete old beer cover {old}: {e}");
        }
    }

    Ok(Json(ApiResponse::success(json!({ "cover_image": rel_path }))))
}

async fn list_beer_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .get_beer(&id)
        .api_err("Failed to get beer")?
        .or_not_found("Beer not found")?;

    let reviews = state
        .db
        .list_beer_reviews(&id)
        .api_err("Failed to list reviews")?;

    let mut listed = Vec::with_capacity(reviews.len());
    for review in reviews {
        let photos = state
            .db
            .list_review_photos(&review.id)
            .api_err("Failed to list review photos")?;
        listed.push(ReviewWithPhotos { review, photos });
    }

    Ok(Json(ApiResponse::success(listed)))
}
