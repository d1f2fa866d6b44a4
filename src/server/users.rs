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

use crate::auth::{RequireAdmin, RequireUser, TokenGenerator, hash_password, verify_password};
use crate::error::Error;
use crate::media::MediaStorage;
use crate::server::AppState;
use crate::server::activity::record_activity;
use crate::server::dto::{
    ChangePasswordRequest, ChangeRoleRequest, LoginRequest, LoginResponse, SignupRequest,
    UpdateProfileRequest,
};
use crate::server::response::{ApiError, ApiResponse, DbOptionExt, DbResultExt};
use crate::server::upload::read_single_image;
use crate::server::validation::{validate_display_name, validate_email, validate_password};
use crate::types::{Role, SessionToken, User};

const SESSION_TTL_DAYS: i64 = 30;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}", put(update_profile))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/password", put(change_password))
        .route("/users/{id}/role", put(change_role))
        .route("/users/{id}/avatar", put(upload_avatar))
}

async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_email(req.email.trim())?;
    validate_password(&req.password)?;
    validate_display_name(&req.display_name)?;

    let password_hash =
        hash_password(&req.password).map_err(|_| ApiError::internal("Failed to hash password"))?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: req.email.trim().to_string(),
        password_hash,
        display_name: req.display_name.trim().to_string(),
        role: Role::Basic,
        profile_img_url: None,
        present_location: None,
        introduction: None,
        date_created: now,
        date_updated: now,
    };

    match state.db.create_user(&user) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => {
            return Err(ApiError::conflict("Email or display name already in use"));
        }
        Err(_) => return Err(ApiError::internal("Failed to create user")),
    }

    record_activity(&state, &user.id, "user.signup", "user", &user.id, None);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Same response for unknown email and wrong password.
    let user = state
        .db
        .get_user_by_email(req.email.trim())
        .api_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let correct = verify_password(&req.password, &user.password_hash)
        .map_err(|_| ApiError::internal("Failed to verify password"))?;
    if !correct {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let generator = TokenGenerator::new();
    let (raw_token, lookup, hash) = generator
        .generate()
        .map_err(|_| ApiError::internal("Failed to generate session token"))?;

    let token = SessionToken {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id: user.id.clone(),
        created_at: Utc::now(),
        expires_at: Some(Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS)),
        last_used_at: None,
    };
    state
        .db
        .create_session_token(&token)
        .api_err("Failed to create session")?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token: raw_token,
        user,
    })))
}

async fn list_users(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.list_users().api_err("Failed to list users")?;
    Ok(Json(ApiResponse::success(users)))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    Ok(Json(ApiResponse::success(user)))
}

async fn update_profile(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if caller.user_id != id {
        return Err(ApiError::forbidden("Cannot edit another user's profile"));
    }

    let mut user = state
        .db
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if let Some(display_name) = req.display_name {
        validate_display_name(&display_name)?;
        user.display_name = display_name.trim().to_string();
    }
    if let Some(present_location) = req.present_location {
        user.present_location = Some(present_location);
    }
    if let Some(introduction) = req.introduction {
        user.introduction = Some(introduction);
    }

    match state.db.update_user_profile(&user) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => {
            return Err(ApiError::conflict("Display name already in use"));
        }
        Err(Error::NotFound) => return Err(ApiError::not_found("User not found")),
        Err(_) => return Err(ApiError::internal("Failed to update profile")),
    }

    Ok(Json(ApiResponse::success(user)))
}

async fn change_password(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if caller.user_id != id {
        return Err(ApiError::forbidden("Cannot change another user's password"));
    }

    validate_password(&req.password)?;
    let password_hash =
        hash_password(&req.password).map_err(|_| ApiError::internal("Failed to hash password"))?;

    match state.db.update_user_password(&id, &password_hash) {
        Ok(()) => {}
        Err(Error::NotFound) => return Err(ApiError::not_found("User not found")),
        Err(_) => return Err(ApiError::internal("Failed to change password")),
    }

    Ok(Json(ApiResponse::success(json!({ "message": "Password updated" }))))
}

async fn change_role(
    RequireAdmin(caller): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match state.db.update_user_role(&id, req.role) {
        Ok(()) => {}
        Err(Error::NotFound) => return Err(ApiError::not_found("User not found")),
        Err(_) => return Err(ApiError::internal("Failed to change role")),
    }

    record_activity(
        &state,
        &caller.user_id,
        "user.role_change",
        "user",
        &id,
        Some(json!({ "role": req.role.as_str() })),
    );

    Ok(Json(ApiResponse::success(json!({ "message": "Role updated" }))))
}

async fn upload_avatar(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    if caller.user_id != id {
        return Err(ApiError::forbidden("Cannot change another user's avatar"));
    }

    let user = state
        .db
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    let upload = read_single_image(multipart, "image").await?;

    // Avatars use the flat naming convention.
    let rel_path = MediaStorage::flat_path(Utc::now().timestamp_millis(), upload.extension());

    let staged = state
        .media
        .stage(&upload.data)
        .await
        .map_err(|_| ApiError::internal("Failed to store avatar"))?;

    if let Err(e) = state.db.update_user_avatar(&id, Some(rel_path.as_str())) {
        state.media.discard(staged).await;
        return Err(match e {
            Error::NotFound => ApiError::not_found("User not found"),
            _ => ApiError::internal("Failed to update avatar"),
        });
    }

    if let Err(e) = state.media.promote(staged, &rel_path).await {
        tracing::error!("Failed to promote avatar {rel_path}: {e}");
    }

    if let Some(old) = user.profile_img_url {
        if let Err(e) = state.media.delete(&old).await {
            tracing::warn!("Failed to delete old avatar {old}: {e}");
        }
    }

    Ok(Json(ApiResponse::success(json!({ "profile_img_url": rel_path }))))
}

async fn delete_user(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !caller.can_moderate(Some(id.as_str())) {
        return Err(ApiError::forbidden("Not authorized to delete this user"));
    }

    let user = state
        .db
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    // Collect owned files before the cascade removes their rows.
    let photos = state
        .db
        .list_user_photos(&id)
        .api_err("Failed to list user photos")?;

    state.db.delete_user(&id).api_err("Failed to delete user")?;

    if let Some(avatar) = user.profile_img_url {
        if let Err(e) = state.media.delete(&avatar).await {
            tracing::warn!("Failed to delete avatar {avatar}: {e}");
        }
    }
    for photo in photos {
        if let Err(e) = state.media.delete(&photo.photo_url).await {
            tracing::warn!("Failed to delete review photo {}: {e}", photo.photo_url);
        }
    }

    record_activity(
        &state,
        &caller.user_id,
        "user.delete",
        "user",
        &id,
        None,
    );

    Ok(StatusCode::NO_CONTENT)
}
