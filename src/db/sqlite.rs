use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::SCHEMA;
use super::{Db, FavoriteScope, FavoriteTable};
use crate::error::{Error, Result};
use crate::feed::{Cursor, FeedItem};
use crate::types::*;

pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width UTC text so timestamp columns order lexicographically;
/// the feed's keyset cursor depends on this.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn abv_to_tenths(abv: f64) -> i64 {
    (abv * 10.0).round() as i64
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        display_name: row.get(3)?,
        role: Role::from_db(&row.get::<_, String>(4)?),
        profile_img_url: row.get(5)?,
        present_location: row.get(6)?,
        introduction: row.get(7)?,
        date_created: parse_datetime(&row.get::<_, String>(8)?),
        date_updated: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<SessionToken> {
    Ok(SessionToken {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

fn brewery_from_row(row: &Row<'_>) -> rusqlite::Result<Brewery> {
    Ok(Brewery {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        date_of_founding: row.get(3)?,
        cover_image: row.get(4)?,
        verified: row.get(5)?,
        author_id: row.get(6)?,
        date_created: parse_datetime(&row.get::<_, String>(7)?),
        date_updated: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn beer_from_row(row: &Row<'_>) -> rusqlite::Result<Beer> {
    Ok(Beer {
        id: row.get(0)?,
        name: row.get(1)?,
        brewery_id: row.get(2)?,
        description: row.get(3)?,
        style: row.get(4)?,
        ibu: row.get(5)?,
        abv: row.get::<_, i64>(6)? as f64 / 10.0,
        color: row.get(7)?,
        cover_image: row.get(8)?,
        author_id: row.get(9)?,
        date_created: parse_datetime(&row.get::<_, String>(10)?),
        date_updated: parse_datetime(&row.get::<_, String>(11)?),
    })
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        author_id: row.get(1)?,
        beer_id: row.get(2)?,
        rating: row.get(3)?,
        review: row.get(4)?,
        date_created: parse_datetime(&row.get::<_, String>(5)?),
        date_updated: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewPhoto> {
    Ok(ReviewPhoto {
        id: row.get(0)?,
        review_id: row.get(1)?,
        user_id: row.get(2)?,
        photo_url: row.get(3)?,
        position: row.get(4)?,
        date_created: parse_datetime(&row.get::<_, String>(5)?),
        date_updated: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn store_from_row(row: &Row<'_>) -> rusqlite::Result<Store> {
    Ok(Store {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        date_of_founding: row.get(3)?,
        owner: row.get(4)?,
        verified: row.get(5)?,
        author_id: row.get(6)?,
        date_created: parse_datetime(&row.get::<_, String>(7)?),
        date_updated: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn menu_item_from_row(row: &Row<'_>) -> rusqlite::Result<StoreMenuItem> {
    Ok(StoreMenuItem {
        id: row.get(0)?,
        store_id: row.get(1)?,
        beer_id: row.get(2)?,
        author_id: row.get(3)?,
        size: row.get(4)?,
        price: row.get(5)?,
        date_created: parse_datetime(&row.get::<_, String>(6)?),
        date_updated: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn favorite_listing_from_row(row: &Row<'_>) -> rusqlite::Result<FavoriteListing> {
    Ok(FavoriteListing {
        id: row.get(0)?,
        target_id: row.get(1)?,
        name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        brewery_name: row.get(3)?,
        source_table: row.get(4)?,
        date_created: parse_datetime(&row.get::<_, String>(5)?),
    })
}

impl Db for SqliteDb {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, email, password_hash, display_name, role, profile_img_url, present_location, introduction, date_created, date_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id,
                user.email,
                user.password_hash,
                user.display_name,
                user.role.as_str(),
                user.profile_img_url,
                user.present_location,
                user.introduction,
                format_datetime(&user.date_created),
                format_datetime(&user.date_updated),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, password_hash, display_name, role, profile_img_url, present_location, introduction, date_created, date_updated
             FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, password_hash, display_name, role, profile_img_url, present_location, introduction, date_created, date_updated
             FROM users WHERE email = ?1",
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, display_name, role, profile_img_url, present_location, introduction, date_created, date_updated
             FROM users ORDER BY display_name",
        )?;

        let rows = stmt.query_map([], user_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user_profile(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE users SET display_name = ?1, present_location = ?2, introduction = ?3, date_updated = ?4
             WHERE id = ?5",
            params![
                user.display_name,
                user.present_location,
                user.introduction,
                format_datetime(&Utc::now()),
                user.id
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn update_user_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET password_hash = ?1, date_updated = ?2 WHERE id = ?3",
            params![password_hash, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn update_user_role(&self, id: &str, role: Role) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET role = ?1, date_updated = ?2 WHERE id = ?3",
            params![role.as_str(), format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn update_user_avatar(&self, id: &str, profile_img_url: Option<&str>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET profile_img_url = ?1, date_updated = ?2 WHERE id = ?3",
            params![profile_img_url, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Session token operations

    fn create_session_token(&self, token: &SessionToken) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO session_tokens (id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
                token.last_used_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_session_token_by_lookup(&self, lookup: &str) -> Result<Option<SessionToken>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM session_tokens WHERE token_lookup = ?1",
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE session_tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Brewery operations

    fn create_brewery(&self, brewery: &Brewery) -> Result<()> {
        self.conn().execute(
            "INSERT INTO breweries (id, name, location, date_of_founding, cover_image, verified, author_id, date_created, date_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                brewery.id,
                brewery.name,
                brewery.location,
                brewery.date_of_founding,
                brewery.cover_image,
                brewery.verified,
                brewery.author_id,
                format_datetime(&brewery.date_created),
                format_datetime(&brewery.date_updated),
            ],
        )?;
        Ok(())
    }

    fn get_brewery(&self, id: &str) -> Result<Option<Brewery>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, location, date_of_founding, cover_image, verified, author_id, date_created, date_updated
             FROM breweries WHERE id = ?1",
            params![id],
            brewery_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_breweries(&self) -> Result<Vec<Brewery>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, location, date_of_founding, cover_image, verified, author_id, date_created, date_updated
             FROM breweries ORDER BY name",
        )?;

        let rows = stmt.query_map([], brewery_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_brewery(&self, brewery: &Brewery) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE breweries SET name = ?1, location = ?2, date_of_founding = ?3, date_updated = ?4
             WHERE id = ?5",
            params![
                brewery.name,
                brewery.location,
                brewery.date_of_founding,
                format_datetime(&Utc::now()),
                brewery.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_brewery(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM breweries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn set_brewery_verified(&self, id: &str, verified: bool) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE breweries SET verified = ?1, date_updated = ?2 WHERE id = ?3",
            params![verified, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_brewery_cover(&self, id: &str, cover_image: Option<&str>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE breweries SET cover_image = ?1, date_updated = ?2 WHERE id = ?3",
            params![cover_image, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Beer operations

    fn create_beer(&self, beer: &Beer) -> Result<()> {
        self.conn().execute(
            "INSERT INTO beers (id, name, brewery_id, description, style, ibu, abv_tenths, color, cover_image, author_id, date_created, date_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                beer.id,
                beer.name,
                beer.brewery_id,
                beer.description,
                beer.style,
                beer.ibu,
                abv_to_tenths(beer.abv),
                beer.color,
                beer.cover_image,
                beer.author_id,
                format_datetime(&beer.date_created),
                format_datetime(&beer.date_updated),
            ],
        )?;
        Ok(())
    }

    fn get_beer(&self, id: &str) -> Result<Option<Beer>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, brewery_id, description, style, ibu, abv_tenths, color, cover_image, author_id, date_created, date_updated
             FROM beers WHERE id = ?1",
            params![id],
            beer_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_beers(&self) -> Result<Vec<Beer>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, brewery_id, description, style, ibu, abv_tenths, color, cover_image, author_id, date_created, date_updated
             FROM beers ORDER BY name",
        )?;

        let rows = stmt.query_map([], beer_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_beer(&self, beer: &Beer) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE beers SET name = ?1, description = ?2, style = ?3, ibu = ?4, abv_tenths = ?5, color = ?6, date_updated = ?7
             WHERE id = ?8",
            params![
                beer.name,
                beer.description,
                beer.style,
                beer.ibu,
                abv_to_tenths(beer.abv),
                beer.color,
                format_datetime(&Utc::now()),
                beer.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_beer(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM beers WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn set_beer_cover(&self, id: &str, cover_image: Option<&str>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE beers SET cover_image = ?1, date_updated = ?2 WHERE id = ?3",
            params![cover_image, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Review operations

    fn create_review_with_photos(&self, review: &Review, photos: &[ReviewPhoto]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO reviews (id, author_id, beer_id, rating, review, date_created, date_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                review.id,
                review.author_id,
                review.beer_id,
                review.rating,
                review.review,
                format_datetime(&review.date_created),
                format_datetime(&review.date_updated),
            ],
        );

        if let Err(e) = inserted {
            return if is_constraint_violation(&e) {
                Err(Error::AlreadyExists)
            } else {
                Err(Error::from(e))
            };
        }

        for photo in photos {
            tx.execute(
                "INSERT INTO review_photos (id, review_id, user_id, photo_url, position, date_created, date_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    photo.id,
                    photo.review_id,
                    photo.user_id,
                    photo.photo_url,
                    photo.position,
                    format_datetime(&photo.date_created),
                    format_datetime(&photo.date_updated),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn update_review_with_photos(
        &self,
        review: &Review,
        deleted_photo_ids: &[String],
        new_photos: &[ReviewPhoto],
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE reviews SET rating = ?1, review = ?2, date_updated = ?3 WHERE id = ?4",
            params![
                review.rating,
                review.review,
                format_datetime(&Utc::now()),
                review.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        for photo_id in deleted_photo_ids {
            tx.execute(
                "DELETE FROM review_photos WHERE id = ?1 AND review_id = ?2",
                params![photo_id, review.id],
            )?;
        }

        for photo in new_photos {
            tx.execute(
                "INSERT INTO review_photos (id, review_id, user_id, photo_url, position, date_created, date_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    photo.id,
                    photo.review_id,
                    photo.user_id,
                    photo.photo_url,
                    photo.position,
                    format_datetime(&photo.date_created),
                    format_datetime(&photo.date_updated),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_review(&self, id: &str) -> Result<Option<Review>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, author_id, beer_id, rating, review, date_created, date_updated
             FROM reviews WHERE id = ?1",
            params![id],
            review_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_beer_reviews(&self, beer_id: &str) -> Result<Vec<Review>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, author_id, beer_id, rating, review, date_created, date_updated
             FROM reviews WHERE beer_id = ?1 ORDER BY date_created DESC",
        )?;

        let rows = stmt.query_map(params![beer_id], review_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_review(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Review photo operations

    fn list_review_photos(&self, review_id: &str) -> Result<Vec<ReviewPhoto>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, review_id, user_id, photo_url, position, date_created, date_updated
             FROM review_photos WHERE review_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![review_id], photo_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_photos(&self, user_id: &str) -> Result<Vec<ReviewPhoto>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, review_id, user_id, photo_url, position, date_created, date_updated
             FROM review_photos WHERE user_id = ?1 ORDER BY date_created",
        )?;

        let rows = stmt.query_map(params![user_id], photo_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_review_photo(&self, id: &str) -> Result<Option<ReviewPhoto>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, review_id, user_id, photo_url, position, date_created, date_updated
             FROM review_photos WHERE id = ?1",
            params![id],
            photo_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_review_photo(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM review_photos WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Favorite operations

    fn add_favorite(
        &self,
        table: FavoriteTable,
        favorite: &Favorite,
    ) -> Result<Option<Favorite>> {
        let sql = match table {
            FavoriteTable::Beers => {
                "INSERT OR IGNORE INTO beer_favorites (id, user_id, beer_id, date_created)
                 VALUES (?1, ?2, ?3, ?4)"
            }
            FavoriteTable::Breweries => {
                "INSERT OR IGNORE INTO brewery_favorites (id, user_id, brewery_id, date_created)
                 VALUES (?1, ?2, ?3, ?4)"
            }
        };

        let rows = self.conn().execute(
            sql,
            params![
                favorite.id,
                favorite.user_id,
                favorite.target_id,
                format_datetime(&favorite.date_created),
            ],
        )?;

        // Zero affected rows means the (user, target) pair already exists.
        if rows == 0 {
            Ok(None)
        } else {
            Ok(Some(favorite.clone()))
        }
    }

    fn get_favorite(&self, table: FavoriteTable, id: &str) -> Result<Option<Favorite>> {
        let sql = match table {
            FavoriteTable::Beers => {
                "SELECT id, user_id, beer_id, date_created FROM beer_favorites WHERE id = ?1"
            }
            FavoriteTable::Breweries => {
                "SELECT id, user_id, brewery_id, date_created FROM brewery_favorites WHERE id = ?1"
            }
        };

        let conn = self.conn();
        conn.query_row(sql, params![id], |row| {
            Ok(Favorite {
                id: row.get(0)?,
                user_id: row.get(1)?,
                target_id: row.get(2)?,
                date_created: parse_datetime(&row.get::<_, String>(3)?),
            })
        })
        .optional()
        .map_err(Error::from)
    }

    fn delete_favorite(&self, table: FavoriteTable, id: &str) -> Result<bool> {
        let sql = match table {
            FavoriteTable::Beers => "DELETE FROM beer_favorites WHERE id = ?1",
            FavoriteTable::Breweries => "DELETE FROM brewery_favorites WHERE id = ?1",
        };

        let rows = self.conn().execute(sql, params![id])?;
        Ok(rows > 0)
    }

    fn favorite_exists(
        &self,
        table: FavoriteTable,
        user_id: &str,
        target_id: &str,
    ) -> Result<bool> {
        let sql = match table {
            FavoriteTable::Beers => {
                "SELECT EXISTS (SELECT 1 FROM beer_favorites WHERE user_id = ?1 AND beer_id = ?2)"
            }
            FavoriteTable::Breweries => {
                "SELECT EXISTS (SELECT 1 FROM brewery_favorites WHERE user_id = ?1 AND brewery_id = ?2)"
            }
        };

        let conn = self.conn();
        let exists: bool = conn.query_row(sql, params![user_id, target_id], |row| row.get(0))?;
        Ok(exists)
    }

    fn list_favorites(
        &self,
        scope: FavoriteScope,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FavoriteListing>> {
        const BEERS_SELECT: &str = "SELECT bf.id, bf.beer_id AS target_id, b.name, br.name AS brewery_name, 'beers' AS source_table, bf.date_created
             FROM beer_favorites bf
             LEFT JOIN beers b ON bf.beer_id = b.id
             LEFT JOIN breweries br ON b.brewery_id = br.id
             WHERE bf.user_id = ?1";
        const BREWERIES_SELECT: &str = "SELECT wf.id, wf.brewery_id AS target_id, w.name, NULL AS brewery_name, 'breweries' AS source_table, wf.date_created
             FROM brewery_favorites wf
             LEFT JOIN breweries w ON wf.brewery_id = w.id
             WHERE wf.user_id = ?1";

        let sql = match scope {
            FavoriteScope::Beers => format!(
                "{BEERS_SELECT} ORDER BY bf.date_created DESC LIMIT ?2 OFFSET ?3"
            ),
            FavoriteScope::Breweries => format!(
                "{BREWERIES_SELECT} ORDER BY wf.date_created DESC LIMIT ?2 OFFSET ?3"
            ),
            FavoriteScope::All => format!(
                "SELECT * FROM ({BEERS_SELECT} UNION ALL {BREWERIES_SELECT}) AS combined
                 ORDER BY date_created DESC LIMIT ?2 OFFSET ?3"
            ),
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id, limit, offset], favorite_listing_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_favorites(&self, scope: FavoriteScope, user_id: &str) -> Result<i64> {
        let sql = match scope {
            FavoriteScope::Beers => "SELECT COUNT(*) FROM beer_favorites WHERE user_id = ?1",
            FavoriteScope::Breweries => {
                "SELECT COUNT(*) FROM brewery_favorites WHERE user_id = ?1"
            }
            FavoriteScope::All => {
                "SELECT (SELECT COUNT(*) FROM beer_favorites WHERE user_id = ?1)
                      + (SELECT COUNT(*) FROM brewery_favorites WHERE user_id = ?1)"
            }
        };

        let conn = self.conn();
        let count: i64 = conn.query_row(sql, params![user_id], |row| row.get(0))?;
        Ok(count)
    }

    // Store operations

    fn create_store(&self, store: &Store) -> Result<()> {
        self.conn().execute(
            "INSERT INTO stores (id, name, location, date_of_founding, owner, verified, author_id, date_created, date_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                store.id,
                store.name,
                store.location,
                store.date_of_founding,
                store.owner,
                store.verified,
                store.author_id,
                format_datetime(&store.date_created),
                format_datetime(&store.date_updated),
            ],
        )?;
        Ok(())
    }

    fn get_store(&self, id: &str) -> Result<Option<Store>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, location, date_of_founding, owner, verified, author_id, date_created, date_updated
             FROM stores WHERE id = ?1",
            params![id],
            store_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_stores(&self, verified_only: bool) -> Result<Vec<Store>> {
        let conn = self.conn();
        let sql = if verified_only {
            "SELECT id, name, location, date_of_founding, owner, verified, author_id, date_created, date_updated
             FROM stores WHERE verified = 1 ORDER BY name"
        } else {
            "SELECT id, name, location, date_of_founding, owner, verified, author_id, date_created, date_updated
             FROM stores ORDER BY name"
        };

        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], store_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_store(&self, store: &Store) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE stores SET name = ?1, location = ?2, date_of_founding = ?3, owner = ?4, date_updated = ?5
             WHERE id = ?6",
            params![
                store.name,
                store.location,
                store.date_of_founding,
                store.owner,
                format_datetime(&Utc::now()),
                store.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_store(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM stores WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn set_store_verified(&self, id: &str, verified: bool) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE stores SET verified = ?1, date_updated = ?2 WHERE id = ?3",
            params![verified, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Store menu operations

    fn create_menu_item(&self, item: &StoreMenuItem) -> Result<()> {
        self.conn().execute(
            "INSERT INTO store_menus (id, store_id, beer_id, author_id, size, price, date_created, date_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.id,
                item.store_id,
                item.beer_id,
                item.author_id,
                item.size,
                item.price,
                format_datetime(&item.date_created),
                format_datetime(&item.date_updated),
            ],
        )?;
        Ok(())
    }

    fn get_menu_item(&self, id: &str) -> Result<Option<StoreMenuItem>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, store_id, beer_id, author_id, size, price, date_created, date_updated
             FROM store_menus WHERE id = ?1",
            params![id],
            menu_item_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_menu_item(&self, item: &StoreMenuItem) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE store_menus SET size = ?1, price = ?2, date_updated = ?3 WHERE id = ?4",
            params![item.size, item.price, format_datetime(&Utc::now()), item.id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_menu_item(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM store_menus WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn list_store_menu(&self, store_id: &str) -> Result<Vec<MenuEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT m.id, m.store_id, m.size, m.price, b.id, b.name, b.style, b.abv_tenths, b.ibu, b.color
             FROM store_menus m
             JOIN beers b ON m.beer_id = b.id
             WHERE m.store_id = ?1
             ORDER BY m.date_created DESC",
        )?;

        let rows = stmt.query_map(params![store_id], |row| {
            Ok(MenuEntry {
                id: row.get(0)?,
                store_id: row.get(1)?,
                size: row.get(2)?,
                price: row.get(3)?,
                beer_id: row.get(4)?,
                beer_name: row.get(5)?,
                style: row.get(6)?,
                abv: row.get::<_, i64>(7)? as f64 / 10.0,
                ibu: row.get(8)?,
                color: row.get(9)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Activity log

    fn log_activity(&self, entry: &ActivityLogEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO activity_log (id, user_id, action, entity_type, entity_id, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.user_id,
                entry.action,
                entry.entity_type,
                entry.entity_id,
                entry.metadata.as_ref().map(serde_json::Value::to_string),
                format_datetime(&entry.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_activity_log(&self, limit: i64, offset: i64) -> Result<Vec<ActivityLogListing>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT al.id, al.user_id, al.action, al.entity_type, al.entity_id, al.metadata, al.created_at, users.display_name
             FROM activity_log al
             LEFT JOIN users ON al.user_id = users.id
             ORDER BY al.created_at DESC
             LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt.query_map(params![limit, offset], |row| {
            Ok(ActivityLogListing {
                entry: ActivityLogEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    action: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    metadata: row
                        .get::<_, Option<String>>(5)?
                        .and_then(|s| serde_json::from_str(&s).ok()),
                    created_at: parse_datetime(&row.get::<_, String>(6)?),
                },
                display_name: row.get(7)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_activity_log(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM activity_log", [], |row| row.get(0))?;
        Ok(count)
    }

    // Activity feed source

    fn list_source_updates(
        &self,
        table: &str,
        before: Option<&Cursor>,
        limit: i64,
    ) -> Result<Vec<FeedItem>> {
        // Table names come from the static source list, never from input.
        if !crate::feed::FEED_SOURCES.contains(&table) {
            return Err(Error::BadRequest(format!("unknown feed source '{table}'")));
        }

        let conn = self.conn();
        let items = match before {
            Some(cursor) => {
                let sql = format!(
                    "SELECT id, date_updated FROM {table}
                     WHERE date_updated < ?1 OR (date_updated = ?1 AND id < ?2)
                     ORDER BY date_updated DESC, id DESC LIMIT ?3"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    params![cursor.date_updated, cursor.id, limit],
                    |row| {
                        Ok(FeedItem {
                            table_name: table.to_string(),
                            id: row.get(0)?,
                            date_updated: row.get(1)?,
                        })
                    },
                )?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!(
                    "SELECT id, date_updated FROM {table}
                     ORDER BY date_updated DESC, id DESC LIMIT ?1"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![limit], |row| {
                    Ok(FeedItem {
                        table_name: table.to_string(),
                        id: row.get(0)?,
                        date_updated: row.get(1)?,
                    })
                })?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(items)
    }

    // Catalog search

    fn search_catalog(&self, query: &str, limit: i64, offset: i64) -> Result<Vec<SearchResult>> {
        let pattern = format!("%{query}%");
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM (
                 SELECT id, name, location AS description, 'brewery' AS kind
                 FROM breweries
                 WHERE name LIKE ?1 OR location LIKE ?1
                 UNION ALL
                 SELECT id, name, description, 'beer' AS kind
                 FROM beers
                 WHERE name LIKE ?1 OR description LIKE ?1 OR style LIKE ?1 OR color LIKE ?1
             ) AS combined
             ORDER BY name LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(params![pattern, limit, offset], |row| {
            Ok(SearchResult {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                kind: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_db() -> (TempDir, SqliteDb) {
        let temp = TempDir::new().unwrap();
        let db = SqliteDb::new(temp.path().join("test.db")).unwrap();
        db.initialize().unwrap();
        (temp, db)
    }

    fn test_user(email: &str, display_name: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$test".to_string(),
            display_name: display_name.to_string(),
            role: Role::Basic,
            profile_img_url: None,
            present_location: None,
            introduction: None,
            date_created: now,
            date_updated: now,
        }
    }

    fn test_brewery(name: &str, author_id: &str) -> Brewery {
        let now = Utc::now();
        Brewery {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            location: "Portland, OR".to_string(),
            date_of_founding: "1988".to_string(),
            cover_image: None,
            verified: false,
            author_id: Some(author_id.to_string()),
            date_created: now,
            date_updated: now,
        }
    }

    fn test_beer(name: &str, brewery_id: &str, author_id: &str) -> Beer {
        let now = Utc::now();
        Beer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            brewery_id: brewery_id.to_string(),
            description: "A hazy IPA".to_string(),
            style: "IPA".to_string(),
            ibu: 60,
            abv: 6.5,
            color: "amber".to_string(),
            cover_image: None,
            author_id: Some(author_id.to_string()),
            date_created: now,
            date_updated: now,
        }
    }

    fn test_review(author_id: &str, beer_id: &str) -> Review {
        let now = Utc::now();
        Review {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            beer_id: beer_id.to_string(),
            rating: 4,
            review: "Great beer, loved it.".to_string(),
            date_created: now,
            date_updated: now,
        }
    }

    fn test_photo(review: &Review, position: i64) -> ReviewPhoto {
        let now = Utc::now();
        ReviewPhoto {
            id: Uuid::new_v4().to_string(),
            review_id: review.id.clone(),
            user_id: review.author_id.clone(),
            photo_url: format!("brewery/beer/{}-{}.webp", review.id, position),
            position,
            date_created: now,
            date_updated: now,
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, db) = test_db();

        let conn = db.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"session_tokens".to_string()));
        assert!(tables.contains(&"breweries".to_string()));
        assert!(tables.contains(&"beers".to_string()));
        assert!(tables.contains(&"reviews".to_string()));
        assert!(tables.contains(&"review_photos".to_string()));
        assert!(tables.contains(&"beer_favorites".to_string()));
        assert!(tables.contains(&"brewery_favorites".to_string()));
        assert!(tables.contains(&"stores".to_string()));
        assert!(tables.contains(&"store_menus".to_string()));
        assert!(tables.contains(&"activity_log".to_string()));
    }

    #[test]
    fn test_user_crud_and_email_conflict() {
        let (_temp, db) = test_db();

        let user = test_user("ada@example.com", "ada");
        db.create_user(&user).unwrap();

        let fetched = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(fetched.email, "ada@example.com");
        assert_eq!(fetched.role, Role::Basic);

        let by_email = db.get_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let dup = test_user("ada@example.com", "ada2");
        assert!(matches!(db.create_user(&dup), Err(Error::AlreadyExists)));

        let dup_name = test_user("other@example.com", "ada");
        assert!(matches!(
            db.create_user(&dup_name),
            Err(Error::AlreadyExists)
        ));

        assert!(db.delete_user(&user.id).unwrap());
        assert!(db.get_user(&user.id).unwrap().is_none());
    }

    #[test]
    fn test_abv_stored_as_tenths() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "brewer");
        db.create_user(&user).unwrap();
        let brewery = test_brewery("Cascade", &user.id);
        db.create_brewery(&brewery).unwrap();

        let mut beer = test_beer("Hop Czar", &brewery.id, &user.id);
        beer.abv = 5.6;
        db.create_beer(&beer).unwrap();

        let conn = db.conn();
        let stored: i64 = conn
            .query_row(
                "SELECT abv_tenths FROM beers WHERE id = ?1",
                params![beer.id],
                |row| row.get(0),
            )
            .unwrap();
        drop(conn);
        assert_eq!(stored, 56);

        let fetched = db.get_beer(&beer.id).unwrap().unwrap();
        assert!((fetched.abv - 5.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_one_review_per_author_and_beer() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "drinker");
        db.create_user(&user).unwrap();
        let brewery = test_brewery("Cascade", &user.id);
        db.create_brewery(&brewery).unwrap();
        let beer = test_beer("Hop Czar", &brewery.id, &user.id);
        db.create_beer(&beer).unwrap();

        let first = test_review(&user.id, &beer.id);
        db.create_review_with_photos(&first, &[]).unwrap();

        let second = test_review(&user.id, &beer.id);
        assert!(matches!(
            db.create_review_with_photos(&second, &[]),
            Err(Error::AlreadyExists)
        ));

        // Deleting the first review frees the (author, beer) pair.
        assert!(db.delete_review(&first.id).unwrap());
        db.create_review_with_photos(&second, &[]).unwrap();
    }

    #[test]
    fn test_review_conflict_rolls_back_photos() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "drinker");
        db.create_user(&user).unwrap();
        let brewery = test_brewery("Cascade", &user.id);
        db.create_brewery(&brewery).unwrap();
        let beer = test_beer("Hop Czar", &brewery.id, &user.id);
        db.create_beer(&beer).unwrap();

        let first = test_review(&user.id, &beer.id);
        db.create_review_with_photos(&first, &[test_photo(&first, 0)])
            .unwrap();

        let second = test_review(&user.id, &beer.id);
        let photos = vec![test_photo(&second, 0), test_photo(&second, 1)];
        assert!(matches!(
            db.create_review_with_photos(&second, &photos),
            Err(Error::AlreadyExists)
        ));

        // Only the first review's photo row exists.
        let conn = db.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM review_photos", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_photo_position_unique_per_review() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "drinker");
        db.create_user(&user).unwrap();
        let brewery = test_brewery("Cascade", &user.id);
        db.create_brewery(&brewery).unwrap();
        let beer = test_beer("Hop Czar", &brewery.id, &user.id);
        db.create_beer(&beer).unwrap();

        let review = test_review(&user.id, &beer.id);
        db.create_review_with_photos(&review, &[test_photo(&review, 0)])
            .unwrap();

        let result = db.update_review_with_photos(&review, &[], &[test_photo(&review, 0)]);
        assert!(result.is_err());

        // The failed update did not change the photo set.
        assert_eq!(db.list_review_photos(&review.id).unwrap().len(), 1);
    }

    #[test]
    fn test_update_review_reuses_freed_position() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "drinker");
        db.create_user(&user).unwrap();
        let brewery = test_brewery("Cascade", &user.id);
        db.create_brewery(&brewery).unwrap();
        let beer = test_beer("Hop Czar", &brewery.id, &user.id);
        db.create_beer(&beer).unwrap();

        let review = test_review(&user.id, &beer.id);
        let original = vec![
            test_photo(&review, 0),
            test_photo(&review, 1),
            test_photo(&review, 2),
        ];
        db.create_review_with_photos(&review, &original).unwrap();

        // Delete slot 1 and re-fill it in the same transaction.
        let replacement = test_photo(&review, 1);
        db.update_review_with_photos(&review, &[original[1].id.clone()], &[replacement.clone()])
            .unwrap();

        let photos = db.list_review_photos(&review.id).unwrap();
        let positions: Vec<i64> = photos.iter().map(|p| p.position).collect();
        assert_eq!(positions, [0, 1, 2]);
        assert!(photos.iter().any(|p| p.id == replacement.id));
    }

    #[test]
    fn test_favorite_add_is_idempotent() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "drinker");
        db.create_user(&user).unwrap();
        let brewery = test_brewery("Cascade", &user.id);
        db.create_brewery(&brewery).unwrap();
        let beer = test_beer("Hop Czar", &brewery.id, &user.id);
        db.create_beer(&beer).unwrap();

        let fav = Favorite {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            target_id: beer.id.clone(),
            date_created: Utc::now(),
        };
        assert!(db.add_favorite(FavoriteTable::Beers, &fav).unwrap().is_some());

        let again = Favorite {
            id: Uuid::new_v4().to_string(),
            ..fav.clone()
        };
        assert!(db.add_favorite(FavoriteTable::Beers, &again).unwrap().is_none());

        assert_eq!(db.count_favorites(FavoriteScope::Beers, &user.id).unwrap(), 1);
        assert!(db
            .favorite_exists(FavoriteTable::Beers, &user.id, &beer.id)
            .unwrap());
    }

    #[test]
    fn test_list_favorites_all_unions_both_tables() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "drinker");
        db.create_user(&user).unwrap();
        let brewery = test_brewery("Cascade", &user.id);
        db.create_brewery(&brewery).unwrap();
        let beer = test_beer("Hop Czar", &brewery.id, &user.id);
        db.create_beer(&beer).unwrap();

        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 2, 10, 0, 0).unwrap();

        db.add_favorite(
            FavoriteTable::Beers,
            &Favorite {
                id: "fav-beer".to_string(),
                user_id: user.id.clone(),
                target_id: beer.id.clone(),
                date_created: t0,
            },
        )
        .unwrap();
        db.add_favorite(
            FavoriteTable::Breweries,
            &Favorite {
                id: "fav-brewery".to_string(),
                user_id: user.id.clone(),
                target_id: brewery.id.clone(),
                date_created: t1,
            },
        )
        .unwrap();

        let all = db
            .list_favorites(FavoriteScope::All, &user.id, 10, 0)
            .unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert_eq!(all[0].id, "fav-brewery");
        assert_eq!(all[0].source_table, "breweries");
        assert_eq!(all[1].id, "fav-beer");
        assert_eq!(all[1].source_table, "beers");
        assert_eq!(all[1].brewery_name.as_deref(), Some("Cascade"));

        assert_eq!(db.count_favorites(FavoriteScope::All, &user.id).unwrap(), 2);
    }

    #[test]
    fn test_feed_pagination_enumerates_exactly_once() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "drinker");
        db.create_user(&user).unwrap();

        // Seed breweries sharing a timestamp to exercise the id tiebreak.
        let shared = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut expected = vec![user.id.clone()];
        for n in 0..5 {
            let mut brewery = test_brewery(&format!("Brewery {n}"), &user.id);
            brewery.id = format!("brewery-{n}");
            brewery.date_created = shared;
            brewery.date_updated = shared;
            db.create_brewery(&brewery).unwrap();
            expected.push(brewery.id);
        }

        let sources = ["users", "breweries"];
        let mut seen = Vec::new();
        let mut cursor: Option<Cursor> = None;
        let mut last_key: Option<(String, String)> = None;

        loop {
            let page =
                crate::feed::fetch_feed(&db, &sources, cursor.as_ref(), 2).unwrap();
            for item in &page.data {
                let key = (item.date_updated.clone(), item.id.clone());
                if let Some(prev) = &last_key {
                    assert!(key < *prev, "feed must be strictly decreasing");
                }
                last_key = Some(key);
                seen.push(item.id.clone());
            }
            match page.next_cursor {
                Some(next) => cursor = Some(Cursor::parse(&next).unwrap()),
                None => break,
            }
        }

        let mut seen_sorted = seen.clone();
        seen_sorted.sort();
        seen_sorted.dedup();
        assert_eq!(seen.len(), seen_sorted.len(), "no duplicates");
        assert_eq!(seen.len(), expected.len(), "no omissions");
    }

    #[test]
    fn test_store_menu_join() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "owner");
        db.create_user(&user).unwrap();
        let brewery = test_brewery("Cascade", &user.id);
        db.create_brewery(&brewery).unwrap();
        let beer = test_beer("Hop Czar", &brewery.id, &user.id);
        db.create_beer(&beer).unwrap();

        let now = Utc::now();
        let store = Store {
            id: Uuid::new_v4().to_string(),
            name: "Bottle Shop".to_string(),
            location: "Portland, OR".to_string(),
            date_of_founding: "2010".to_string(),
            owner: None,
            verified: true,
            author_id: Some(user.id.clone()),
            date_created: now,
            date_updated: now,
        };
        db.create_store(&store).unwrap();

        let item = StoreMenuItem {
            id: Uuid::new_v4().to_string(),
            store_id: store.id.clone(),
            beer_id: beer.id.clone(),
            author_id: Some(user.id.clone()),
            size: "pint".to_string(),
            price: 7.5,
            date_created: now,
            date_updated: now,
        };
        db.create_menu_item(&item).unwrap();

        let menu = db.list_store_menu(&store.id).unwrap();
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].beer_name, "Hop Czar");
        assert!((menu[0].abv - 6.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_search_catalog_spans_both_tables() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "brewer");
        db.create_user(&user).unwrap();
        let brewery = test_brewery("Cascade Brewing", &user.id);
        db.create_brewery(&brewery).unwrap();
        let mut beer = test_beer("Cascade Lager", &brewery.id, &user.id);
        beer.description = "Crisp and clean".to_string();
        db.create_beer(&beer).unwrap();

        let results = db.search_catalog("cascade", 10, 0).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|r| r.kind == "brewery"));
        assert!(results.iter().any(|r| r.kind == "beer"));
    }

    #[test]
    fn test_activity_log_round_trip() {
        let (_temp, db) = test_db();

        let user = test_user("u@example.com", "drinker");
        db.create_user(&user).unwrap();

        db.log_activity(&ActivityLogEntry {
            id: Uuid::new_v4().to_string(),
            user_id: Some(user.id.clone()),
            action: "review.create".to_string(),
            entity_type: Some("review".to_string()),
            entity_id: Some("r-1".to_string()),
            metadata: Some(serde_json::json!({"rating": 4})),
            created_at: Utc::now(),
        })
        .unwrap();

        let entries = db.list_activity_log(10, 0).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name.as_deref(), Some("drinker"));
        assert_eq!(entries[0].entry.metadata.as_ref().unwrap()["rating"], 4);
        assert_eq!(db.count_activity_log().unwrap(), 1);
    }
}
