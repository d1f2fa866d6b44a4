use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::{activity, beers, breweries, favorites, reviews, search, stores, users};
use crate::db::Db;
use crate::media::MediaStorage;

pub struct AppState {
    pub db: Arc<dyn Db>,
    pub media: MediaStorage,
}

impl AppState {
    pub fn new(db: Arc<dyn Db>, data_dir: &Path) -> Self {
        Self {
            db,
            media: MediaStorage::new(data_dir),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(users::user_router())
        .nest("/breweries", breweries::brewery_router())
        .nest("/beers", beers::beer_router().merge(reviews::review_router()))
        .nest("/favorites", favorites::favorite_router())
        .nest("/stores", stores::store_router())
        .merge(activity::activity_router())
        .merge(search::search_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
