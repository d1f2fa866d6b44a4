use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::feed::{self, Cursor, FEED_SOURCES};
use crate::server::AppState;
use crate::server::dto::{FeedParams, PaginationParams};
use crate::server::response::{ApiError, DbResultExt, OffsetPaginated};
use crate::server::validation::validate_pagination;
use crate::types::ActivityLogEntry;

pub fn activity_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recent", get(recent_activity))
        .route("/activity", get(list_activity_log))
}

/// Public cross-entity feed of recently updated rows, keyset-paginated.
async fn recent_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, _) = validate_pagination(params.limit, None)?;

    let cursor = match params.cursor.as_deref() {
        Some(raw) => Some(Cursor::parse(raw).ok_or_else(|| ApiError::bad_request("Invalid cursor"))?),
        None => None,
    };

    let page = feed::fetch_feed(
        state.db.as_ref(),
        FEED_SOURCES,
        cursor.as_ref(),
        limit as usize,
    )
    .api_err("Failed to fetch recent activity")?;

    Ok(Json(page))
}

/// Admin-only audit trail, offset-paginated.
async fn list_activity_log(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = validate_pagination(params.limit, params.offset)?;

    let entries = state
        .db
        .list_activity_log(limit, offset)
        .api_err("Failed to list activity log")?;
    let total = state
        .db
        .count_activity_log()
        .api_err("Failed to count activity log")?;

    Ok(Json(OffsetPaginated::new(entries, total, limit, offset)))
}

/// Records an audit-trail entry. Never blocks the primary response:
/// failures are logged and swallowed.
pub(crate) fn record_activity(
    state: &AppState,
    user_id: &str,
    action: &str,
    entity_type: &str,
    entity_id: &str,
    metadata: Option<serde_json::Value>,
) {
    let entry = ActivityLogEntry {
        id: Uuid::new_v4().to_string(),
        user_id: Some(user_id.to_string()),
        action: action.to_string(),
        entity_type: Some(entity_type.to_string()),
        entity_id: Some(entity_id.to_string()),
        metadata,
        created_at: Utc::now(),
    };

    if let Err(e) = state.db.log_activity(&entry) {
        tracing::warn!("Activity log failed: {e}");
    }
}
