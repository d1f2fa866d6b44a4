use serde::{Deserialize, Serialize};

use crate::types::{Role, User};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub present_location: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CreateBreweryRequest {
    pub name: String,
    pub location: String,
    pub date_of_founding: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBreweryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date_of_founding: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBeerRequest {
    pub name: String,
    pub brewery_id: String,
    pub description: String,
    pub style: String,
    pub ibu: i64,
    pub abv: f64,
    pub color: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBeerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub ibu: Option<i64>,
    #[serde(default)]
    pub abv: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub location: String,
    pub date_of_founding: String,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStoreRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date_of_founding: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMenuItemRequest {
    pub store_id: String,
    pub beer_id: String,
    pub size: String,
    pub price: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMenuItemRequest {
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub table: String,
    pub target_id: String,
}

#[derive(Debug, Serialize)]
pub struct FavoriteExistsResponse {
    pub favorited: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}
