use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{RequireAdmin, RequireUser};
use crate::server::AppState;
use crate::server::activity::record_activity;
use crate::server::dto::{
    CreateMenuItemRequest, CreateStoreRequest, UpdateMenuItemRequest, UpdateStoreRequest,
};
use crate::server::response::{ApiError, ApiResponse, DbOptionExt, DbResultExt};
use crate::server::validation::validate_required;
use crate::types::{Store, StoreMenuItem};

pub fn store_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_verified_stores))
        .route("/", post(create_store))
        .route("/all", get(list_all_stores))
        .route("/{id}", get(get_store))
        .route("/{id}", put(update_store))
        .route("/{id}", delete(delete_store))
        .route("/verified/{id}", put(mark_verified))
        .route("/unverified/{id}", put(mark_unverified))
        .route("/{id}/menu", get(list_store_menu))
        .route("/menu", post(create_menu_item))
        .route("/menu/{id}", put(update_menu_item))
        .route("/menu/{id}", delete(delete_menu_item))
}

async fn list_verified_stores(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let stores = state.db.list_stores(true).api_err("Failed to list stores")?;
    Ok(Json(ApiResponse::success(stores)))
}

async fn list_all_stores(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let stores = state
        .db
        .list_stores(false)
        .api_err("Failed to list stores")?;
    Ok(Json(ApiResponse::success(stores)))
}

async fn get_store(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state
        .db
        .get_store(&id)
        .api_err("Failed to get store")?
        .or_not_found("Store not found")?;

    Ok(Json(ApiResponse::success(store)))
}

async fn create_store(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStoreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_required(&req.name, "Store name")?;
    validate_required(&req.location, "Location")?;

    let now = Utc::now();
    let store = Store {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        location: req.location,
        date_of_founding: req.date_of_founding,
        owner: req.owner,
        verified: false,
        author_id: Some(caller.user_id.clone()),
        date_created: now,
        date_updated: now,
    };

    state
        .db
        .create_store(&store)
        .api_err("Failed to create store")?;

    record_activity(
        &state,
        &caller.user_id,
        "store.create",
        "store",
        &store.id,
        None,
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(store))))
}

async fn update_store(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStoreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut store = state
        .db
        .get_store(&id)
        .api_err("Failed to get store")?
        .or_not_found("Store not found")?;

    if !caller.can_moderate(store.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to edit this store"));
    }

    if let Some(name) = req.name {
        validate_required(&name, "Store name")?;
        store.name = name.trim().to_string();
    }
    if let Some(location) = req.location {
        store.location = location;
    }
    if let Some(date_of_founding) = req.date_of_founding {
        store.date_of_founding = date_of_founding;
    }
    if let Some(owner) = req.owner {
        store.owner = Some(owner);
    }

    state
        .db
        .update_store(&store)
        .api_err("Failed to update store")?;

    Ok(Json(ApiResponse::success(store)))
}

async fn delete_store(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state
        .db
        .get_store(&id)
        .api_err("Failed to get store")?
        .or_not_found("Store not found")?;

    if !caller.can_moderate(store.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to delete this store"));
    }

    state
        .db
        .delete_store(&id)
        .api_err("Failed to delete store")?;

    record_activity(
        &state,
        &caller.user_id,
        "store.delete",
        "store",
        &id,
        None,
    );

    Ok(StatusCode::NO_CONTENT)
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
    match state.db.set_store_verified(&id, verified) {
        Ok(()) => {}
        Err(crate::error::Error::NotFound) => return Err(ApiError::not_found("Store not found")),
        Err(_) => return Err(ApiError::internal("Failed to update store")),
    }

    record_activity(
        &state,
        &caller.user_id,
        if verified {
            "store.verify"
        } else {
            "store.unverify"
        },
        "store",
        &id,
        None,
    );

    Ok(Json(ApiResponse::success(json!({ "verified": verified }))))
}

async fn list_store_menu(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .get_store(&id)
        .api_err("Failed to get store")?
        .or_not_found("Store not found")?;

    let menu = state
        .db
        .list_store_menu(&id)
        .api_err("Failed to list store menu")?;

    Ok(Json(ApiResponse::success(menu)))
}

async fn create_menu_item(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMenuItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_required(&req.size, "Size")?;
    if req.price < 0.0 {
        return Err(ApiError::bad_request("Price must be a positive number"));
    }

    let store = state
        .db
        .get_store(&req.store_id)
        .api_err("Failed to look up store")?
        .or_not_found("Store not found")?;
    state
        .db
        .get_beer(&req.beer_id)
        .api_err("Failed to look up beer")?
        .or_not_found("Beer not found")?;

    if !caller.can_moderate(store.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to edit this store's menu"));
    }

    let now = Utc::now();
    let item = StoreMenuItem {
        id: Uuid::new_v4().to_string(),
        store_id: req.store_id,
        beer_id: req.beer_id,
        author_id: Some(caller.user_id.clone()),
        size: req.size,
        price: req.price,
        date_created: now,
        date_updated: now,
    };

    state
        .db
        .create_menu_item(&item)
        .api_err("Failed to create menu item")?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

async fn update_menu_item(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateMenuItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut item = state
        .db
        .get_menu_item(&id)
        .api_err("Failed to get menu item")?
        .or_not_found("Menu item not found")?;

    let store = state
        .db
        .get_store(&item.store_id)
        .api_err("Failed to look up store")?
        .or_not_found("Store not found")?;

    if !caller.can_moderate(store.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to edit this store's menu"));
    }

    if let Some(size) = req.size {
        validate_required(&size, "Size")?;
        item.size = size;
    }
    if let Some(price) = req.price {
        if price < 0.0 {
            return Err(ApiError::bad_request("Price must be a positive number"));
        }
        item.price = price;
    }

    state
        .db
        .update_menu_item(&item)
        .api_err("Failed to update menu item")?;

    Ok(Json(ApiResponse::success(item)))
}

async fn delete_menu_item(
    RequireUser(caller): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .db
        .get_menu_item(&id)
        .api_err("Failed to get menu item")?
        .or_not_found("Menu item not found")?;

    let store = state
        .db
        .get_store(&item.store_id)
        .api_err("Failed to look up store")?
        .or_not_found("Store not found")?;

    if !caller.can_moderate(store.author_id.as_deref()) {
        return Err(ApiError::forbidden("Not authorized to edit this store's menu"));
    }

    state
        .db
        .delete_menu_item(&id)
        .api_err("Failed to delete menu item")?;

    Ok(StatusCode::NO_CONTENT)
}
