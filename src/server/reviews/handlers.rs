use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::photo_ops::allocate_positions;
use crate::auth::RequireUser;
use crate::error::Error;
use crate::media::{MediaStorage, StagedFile};
use crate::server::AppState;
use crate::server::activity::record_activity;
use crate::server::response::{ApiError, ApiResponse, DbOptionExt, DbResultExt};
use crate::server::upload::ImageUpload;
use crate::server::validation::{validate_image, validate_rating, validate_review_text};
use crate::types::{Beer, Brewery, Review, ReviewPhoto, ReviewWithPhotos};

/// Fields of the multipart review form, shared by create and edit.
#[derive(Default)]
struct ReviewForm {
    rating: Option<i64>,
    review: Option<String>,
    beer_id: Option<String>,
    deleted: Vec<String>,
    photos: Vec<ImageUpload>,
}

async fn parse_review_form(mut multipart: Multipart) -> Result<ReviewForm, ApiError> {
    let mut form = ReviewForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?
    {
        match field.name() {
            Some("rating") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read rating field"))?;
                form.rating = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| ApiError::bad_request("Rating must be a number"))?,
                );
            }
            Some("review") => {
                form.review = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Failed to read review field"))?,
                );
            }
            Some("beer_id") => {
                form.beer_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Failed to read beer_id field"))?,
                );
            }
            Some("deleted") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read deleted field"))?;
                form.deleted = serde_json::from_str(&text).map_err(|_| {
                    ApiError::bad_request("deleted must be a JSON array of photo ids")
                })?;
            }
            Some("photos") => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read uploaded photo"))?;
                validate_image(content_type.as_deref(), data.len())?;
                form.photos.push(ImageUpload {
                    content_type: content_type.unwrap_or_default(),
                    data,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// A photo planned for this request: final path decided, bytes staged,
/// row not yet committed.
struct PlannedPhoto {
    staged: StagedFile,
    row: ReviewPhoto,
}

async fn discard_planned(state: &AppState, planned: Vec<PlannedPhoto>) {
    for photo in planned {
        state.media.discard(photo.staged).await;
    }
}

/// Computes final paths and stages every upload. On any staging failure
/// the already-staged files are discarded and nothing is left behind.
async fn stage_photos(
    state: &AppState,
    brewery: &Brewery,
    beer: &Beer,
    review_id: &str,
    user_id: &str,
    uploads: &[ImageUpload],
    positions: &[i64],
) -> Result<Vec<PlannedPhoto>, ApiError> {
    let now = Utc::now();
    let mut planned = Vec::with_capacity(uploads.len());

    for (upload, &position) in uploads.iter().zip(positions) {
        let rel_path =
            MediaStorage::review_photo_path(&brewery.name, &beer.name, review_id, position)
                .map_err(|_| {
                    ApiError::bad_request("Invalid brewery or beer name for storage path")
                })?;

        match state.media.stage(&upload.data).await {
            Ok(staged) => planned.push(PlannedPhoto {
                staged,
                row: ReviewPhoto {
                    id: Uuid::new_v4().to_string(),
                    review_id: review_id.to_string(),
                    user_id: user_id.to_string(),
                    photo_url: rel_path,
                    position,
                    date_created: now,
                    date_updated: now,
                },
            }),
            Err(e) => {
                tracing::error!("Failed to stage review photo: {e}");
                discard_planned(state, planned).await;
                return Err(ApiError::internal("Failed to store photo"));
            }
        }
    }

    Ok(planned)
}

/// Renames staged files into place after the database commit. A rename
/// failure cannot un-commit; it is logged and the row keeps pointing at
/// the final path.
async fn promote_planned(state: &AppState, planned: Vec<PlannedPhoto>) -> Vec<ReviewPhoto> {
    let mut photos = Vec::with_capacity(planned.len());
    for photo in planned {
        if let Err(e) = state.media.promote(photo.staged, &photo.row.photo_url).await {
            tracing::error!("Failed to promote review photo {}: {e}", photo.row.photo_url);
        }
        photos.push(photo.row);
    }
    photos
}

pub async fn create_review(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = parse_review_form(multipart).await?;

    let rating = form
        .rating
        .ok_or_else(|| ApiError::bad_request("Rating is required"))?;
    validate_rating(rating)?;
    let review_text = form
        .review
        .ok_or_else(|| ApiError::bad_request("Review text is required"))?;
    validate_review_text(&review_text)?;
    let beer_id = form
        .beer_id
        .ok_or_else(|| ApiError::bad_request("beer_id is required"))?;

    let beer = state
        .db
        .get_beer(&beer_id)
        .api_err("Failed to look up beer")?
        .or_not_found("Beer not found")?;
    let brewery = state
        .db
        .get_brewery(&beer.brewery_id)
        .api_err("Failed to look up brewery")?
        .or_not_found("Brewery not found")?;

    // No slots occupied yet on create; rejects > 4 before any file I/O.
    let positions = allocate_positions(&[], form.photos.len())
        .map_err(|_| ApiError::bad_request("Photo limit exceeded"))?;

    let now = Utc::now();
    let review = Review {
        id: Uuid::new_v4().to_string(),
        author_id: caller.user_id.clone(),
        beer_id: beer.id.clone(),
        rating,
        review: review_text.trim().to_string(),
        date_created: now,
        date_updated: now,
    };

    let planned = stage_photos(
        &state,
        &brewery,
        &beer,
        &review.id,
        &caller.user_id,
        &form.photos,
        &positions,
    )
    .await?;

    let rows: Vec<ReviewPhoto> = planned.iter().map(|p| p.row.clone()).collect();
    match state.db.create_review_with_photos(&review, &rows) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => {
            discard_planned(&state, planned).await;
            return Err(ApiError::conflict("You have already reviewed this beer"));
        }
        Err(e) => {
            tracing::error!("Failed to create review: {e}");
            discard_planned(&state, planned).await;
            return Err(ApiError::internal("Failed to create review"));
        }
    }

    let photos = promote_planned(&state, planned).await;

    record_activity(
        &state,
        &caller.user_id,
        "review.create",
        "review",
        &review.id,
        Some(json!({ "beer_id": beer.id, "rating": rating })),
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ReviewWithPhotos { review, photos })),
    ))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state
        .db
        .get_review(&id)
        .api_err("Failed to get review")?
        .or_not_found("Review not found")?;
    let photos = state
        .db
        .list_review_photos(&id)
        .api_err("Failed to list review photos")?;

    Ok(Json(ApiResponse::success(ReviewWithPhotos {
        review,
        photos,
    })))
}

pub async fn edit_review(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut review = state
        .db
        .get_review(&id)
        .api_err("Failed to get review")?
        .or_not_found("Review not found")?;

    if review.author_id != caller.user_id {
        return Err(ApiError::forbidden("Not authorized to edit this review"));
    }

    let form = parse_review_form(multipart).await?;

    let rating = form
        .rating
        .ok_or_else(|| ApiError::bad_request("Rating is required"))?;
    validate_rating(rating)?;
    let review_text = form
        .review
        .ok_or_else(|| ApiError::bad_request("Review text is required"))?;
    validate_review_text(&review_text)?;

    let existing = state
        .db
        .list_review_photos(&id)
        .api_err("Failed to list review photos")?;

    // Every requested deletion must name a photo of this review.
    let mut to_delete = Vec::with_capacity(form.deleted.len());
    for photo_id in &form.deleted {
        let photo = existing
            .iter()
            .find(|p| p.id == *photo_id)
            .or_not_found("Photo not found on this review")?;
        to_delete.push(photo.clone());
    }

    // Occupied slots are those of the photos that survive the deletions.
    let surviving: Vec<i64> = existing
        .iter()
        .filter(|p| !form.deleted.contains(&p.id))
        .map(|p| p.position)
        .collect();

    // Enforce the combined limit before touching any file.
    let planned = if form.photos.is_empty() {
        Vec::new()
    } else {
        let positions = allocate_positions(&surviving, form.photos.len())
            .map_err(|_| ApiError::bad_request("Photo limit exceeded"))?;

        let beer = state
            .db
            .get_beer(&review.beer_id)
            .api_err("Failed to look up beer")?
            .or_not_found("Beer not found")?;
        let brewery = state
            .db
            .get_brewery(&beer.brewery_id)
            .api_err("Failed to look up brewery")?
            .or_not_found("Brewery not found")?;

        stage_photos(
            &state,
            &brewery,
            &beer,
            &review.id,
            &caller.user_id,
            &form.photos,
            &positions,
        )
        .await?
    };

    review.rating = rating;
    review.review = review_text.trim().to_string();
    review.date_updated = Utc::now();

    let rows: Vec<ReviewPhoto> = planned.iter().map(|p| p.row.clone()).collect();
    match state
        .db
        .update_review_with_photos(&review, &form.deleted, &rows)
    {
        Ok(()) => {}
        Err(Error::NotFound) => {
            discard_planned(&state, planned).await;
            return Err(ApiError::not_found("Review not found"));
        }
        Err(e) => {
            tracing::error!("Failed to update review: {e}");
            discard_planned(&state, planned).await;
            return Err(ApiError::internal("Failed to update review"));
        }
    }

    // Commit happened: remove deleted files, move new ones into place.
    for photo in to_delete {
        if let Err(e) = state.media.delete(&photo.photo_url).await {
            tracing::warn!("Failed to delete review photo {}: {e}", photo.photo_url);
        }
    }
    promote_planned(&state, planned).await;

    let photos = state
        .db
        .list_review_photos(&id)
        .api_err("Failed to list review photos")?;

    record_activity(
        &state,
        &caller.user_id,
        "review.edit",
        "review",
        &review.id,
        Some(json!({ "rating": rating })),
    );

    Ok(Json(ApiResponse::success(ReviewWithPhotos {
        review,
        photos,
    })))
}

pub async fn delete_review(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state
        .db
        .get_review(&id)
        .api_err("Failed to get review")?
        .or_not_found("Review not found")?;

    if !caller.can_moderate(Some(review.author_id.as_str())) {
        return Err(ApiError::forbidden("Not authorized to delete this review"));
    }

    let photos = state
        .db
        .list_review_photos(&id)
        .api_err("Failed to list review photos")?;

    state
        .db
        .delete_review(&id)
        .api_err("Failed to delete review")?;

    for photo in photos {
        if let Err(e) = state.media.delete(&photo.photo_url).await {
            tracing::warn!("Failed to delete review photo {}: {e}", photo.photo_url);
        }
    }

    record_activity(
        &state,
        &caller.user_id,
        "review.delete",
        "review",
        &id,
        None,
    );

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_photo(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = state
        .db
        .get_review_photo(&id)
        .api_err("Failed to get photo")?
        .or_not_found("Photo not found")?;

    if !caller.can_moderate(Some(photo.user_id.as_str())) {
        return Err(ApiError::forbidden("Not authorized to delete this photo"));
    }

    state
        .db
        .delete_review_photo(&id)
        .api_err("Failed to delete photo")?;

    if let Err(e) = state.media.delete(&photo.photo_url).await {
        tracing::warn!("Failed to delete review photo {}: {e}", photo.photo_url);
    }

    record_activity(
        &state,
        &caller.user_id,
        "review.photo_delete",
        "review_photo",
        &id,
        None,
    );

    Ok(StatusCode::NO_CONTENT)
}
