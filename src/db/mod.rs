mod schema;
mod sqlite;

pub use sqlite::SqliteDb;

use crate::error::Result;
use crate::feed::{Cursor, FeedItem};
use crate::types::*;

/// Which favorites join table an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteTable {
    Beers,
    Breweries,
}

impl FavoriteTable {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beers" => Some(Self::Beers),
            "breweries" => Some(Self::Breweries),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beers => "beers",
            Self::Breweries => "breweries",
        }
    }
}

/// Scope for favorite listings: one table or the union of both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteScope {
    Beers,
    Breweries,
    All,
}

impl FavoriteScope {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beers" => Some(Self::Beers),
            "breweries" => Some(Self::Breweries),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Db defines the database interface.
pub trait Db: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn update_user_profile(&self, user: &User) -> Result<()>;
    fn update_user_password(&self, id: &str, password_hash: &str) -> Result<()>;
    fn update_user_role(&self, id: &str, role: Role) -> Result<()>;
    fn update_user_avatar(&self, id: &str, profile_img_url: Option<&str>) -> Result<()>;
    fn delete_user(&self, id: &str) -> Result<bool>;
    fn has_admin_user(&self) -> Result<bool>;

    // Session token operations
    fn create_session_token(&self, token: &SessionToken) -> Result<()>;
    fn get_session_token_by_lookup(&self, lookup: &str) -> Result<Option<SessionToken>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Brewery operations
    fn create_brewery(&self, brewery: &Brewery) -> Result<()>;
    fn get_brewery(&self, id: &str) -> Result<Option<Brewery>>;
    fn list_breweries(&self) -> Result<Vec<Brewery>>;
    fn update_brewery(&self, brewery: &Brewery) -> Result<()>;
    fn delete_brewery(&self, id: &str) -> Result<bool>;
    fn set_brewery_verified(&self, id: &str, verified: bool) -> Result<()>;
    fn set_brewery_cover(&self, id: &str, cover_image: Option<&str>) -> Result<()>;

    // Beer operations
    fn create_beer(&self, beer: &Beer) -> Result<()>;
    fn get_beer(&self, id: &str) -> Result<Option<Beer>>;
    fn list_beers(&self) -> Result<Vec<Beer>>;
    fn update_beer(&self, beer: &Beer) -> Result<()>;
    fn delete_beer(&self, id: &str) -> Result<bool>;
    fn set_beer_cover(&self, id: &str, cover_image: Option<&str>) -> Result<()>;

    // Review operations. Writes that touch photos run in one transaction;
    // a (author_id, beer_id) uniqueness violation surfaces as
    // `Error::AlreadyExists`.
    fn create_review_with_photos(&self, review: &Review, photos: &[ReviewPhoto]) -> Result<()>;
    fn update_review_with_photos(
        &self,
        review: &Review,
        deleted_photo_ids: &[String],
        new_photos: &[ReviewPhoto],
    ) -> Result<()>;
    fn get_review(&self, id: &str) -> Result<Option<Review>>;
    fn list_beer_reviews(&self, beer_id: &str) -> Result<Vec<Review>>;
    fn delete_review(&self, id: &str) -> Result<bool>;

    // Review photo operations
    fn list_review_photos(&self, review_id: &str) -> Result<Vec<ReviewPhoto>>;
    fn list_user_photos(&self, user_id: &str) -> Result<Vec<ReviewPhoto>>;
    fn get_review_photo(&self, id: &str) -> Result<Option<ReviewPhoto>>;
    fn delete_review_photo(&self, id: &str) -> Result<bool>;

    // Favorite operations. `add_favorite` returns `None` when the
    // (user, target) pair already exists.
    fn add_favorite(
        &self,
        table: FavoriteTable,
        favorite: &Favorite,
    ) -> Result<Option<Favorite>>;
    fn get_favorite(&self, table: FavoriteTable, id: &str) -> Result<Option<Favorite>>;
    fn delete_favorite(&self, table: FavoriteTable, id: &str) -> Result<bool>;
    fn favorite_exists(
        &self,
        table: FavoriteTable,
        user_id: &str,
        target_id: &str,
    ) -> Result<bool>;
    fn list_favorites(
        &self,
        scope: FavoriteScope,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FavoriteListing>>;
    fn count_favorites(&self, scope: FavoriteScope, user_id: &str) -> Result<i64>;

    // Store operations
    fn create_store(&self, store: &Store) -> Result<()>;
    fn get_store(&self, id: &str) -> Result<Option<Store>>;
    fn list_stores(&self, verified_only: bool) -> Result<Vec<Store>>;
    fn update_store(&self, store: &Store) -> Result<()>;
    fn delete_store(&self, id: &str) -> Result<bool>;
    fn set_store_verified(&self, id: &str, verified: bool) -> Result<()>;

    // Store menu operations
    fn create_menu_item(&self, item: &StoreMenuItem) -> Result<()>;
    fn get_menu_item(&self, id: &str) -> Result<Option<StoreMenuItem>>;
    fn update_menu_item(&self, item: &StoreMenuItem) -> Result<()>;
    fn delete_menu_item(&self, id: &str) -> Result<bool>;
    fn list_store_menu(&self, store_id: &str) -> Result<Vec<MenuEntry>>;

    // Activity log (append-only audit trail)
    fn log_activity(&self, entry: &ActivityLogEntry) -> Result<()>;
    fn list_activity_log(&self, limit: i64, offset: i64) -> Result<Vec<ActivityLogListing>>;
    fn count_activity_log(&self) -> Result<i64>;

    // Activity feed source: rows of one table strictly below the cursor
    // in (date_updated, id) order, newest first.
    fn list_source_updates(
        &self,
        table: &str,
        before: Option<&Cursor>,
        limit: i64,
    ) -> Result<Vec<FeedItem>>;

    // Catalog search across breweries and beers
    fn search_catalog(&self, query: &str, limit: i64, offset: i64) -> Result<Vec<SearchResult>>;

    fn close(&self) -> Result<()>;
}
