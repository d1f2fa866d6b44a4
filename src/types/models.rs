use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_img_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brewery {
    pub id: String,
    pub name: String,
    pub location: String,
    pub date_of_founding: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// `abv` is served as a real number but persisted as an integer of
/// tenths of a percent; the store layer converts on the way in and out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beer {
    pub id: String,
    pub name: String,
    pub brewery_id: String,
    pub description: String,
    pub style: String,
    pub ibu: i64,
    pub abv: f64,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub author_id: String,
    pub beer_id: String,
    pub rating: i64,
    pub review: String,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// One of up to four photos attached to a review. `position` is the slot
/// in [0,3], unique per review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPhoto {
    pub id: String,
    pub review_id: String,
    pub user_id: String,
    pub photo_url: String,
    pub position: i64,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewWithPhotos {
    #[serde(flatten)]
    pub review: Review,
    pub photos: Vec<ReviewPhoto>,
}

/// A favorite row from either join table; `target_id` is the beer or
/// brewery id depending on which table it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub target_id: String,
    pub date_created: DateTime<Utc>,
}

/// A favorite joined with display names for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteListing {
    pub id: String,
    pub target_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brewery_name: Option<String>,
    pub source_table: String,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub location: String,
    pub date_of_founding: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMenuItem {
    pub id: String,
    pub store_id: String,
    pub beer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub size: String,
    pub price: f64,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// A menu row joined with its beer for `GET /stores/{id}/menu`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub store_id: String,
    pub size: String,
    pub price: f64,
    pub beer_id: String,
    pub beer_name: String,
    pub style: String,
    pub abv: f64,
    pub ibu: i64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// An activity-log row joined with the acting user's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogListing {
    #[serde(flatten)]
    pub entry: ActivityLogEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}
