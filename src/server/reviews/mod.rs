mod handlers;
mod photo_ops;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

/// Nested under `/beers` alongside the beer routes.
pub fn review_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/review", post(handlers::create_review))
        .route("/review/{id}", get(handlers::get_review))
        .route("/review/{id}", put(handlers::edit_review))
        .route("/review/{id}", delete(handlers::delete_review))
        .route("/review/photo/{id}", delete(handlers::delete_photo))
}
