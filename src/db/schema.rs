pub const SCHEMA: &str = r#"
-- Accounts
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,       -- argon2id hash with embedded salt
    display_name TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL DEFAULT 'basic',

    -- Profile
    profile_img_url TEXT,
    present_location TEXT,
    introduction TEXT,

    date_created TEXT DEFAULT (datetime('now')),
    date_updated TEXT DEFAULT (datetime('now'))
);

-- Session tokens are auth credentials; always bound to a user
CREATE TABLE IF NOT EXISTS session_tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of ID for fast lookup
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,

    -- Lifecycle
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

CREATE TABLE IF NOT EXISTS breweries (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    date_of_founding TEXT NOT NULL,

    cover_image TEXT,                  -- relative path under uploads/
    verified INTEGER NOT NULL DEFAULT 0,

    -- Weak owner reference: deleting the author keeps the brewery
    author_id TEXT REFERENCES users(id) ON DELETE SET NULL,

    date_created TEXT DEFAULT (datetime('now')),
    date_updated TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS beers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    brewery_id TEXT NOT NULL REFERENCES breweries(id) ON DELETE CASCADE,
    description TEXT NOT NULL,
    style TEXT NOT NULL,
    ibu INTEGER NOT NULL DEFAULT 0,
    abv_tenths INTEGER NOT NULL DEFAULT 0,  -- real abv x 10, divided on read
    color TEXT NOT NULL,

    cover_image TEXT,
    author_id TEXT REFERENCES users(id) ON DELETE SET NULL,

    date_created TEXT DEFAULT (datetime('now')),
    date_updated TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    beer_id TEXT NOT NULL REFERENCES beers(id) ON DELETE CASCADE,
    rating INTEGER NOT NULL,           -- 1-5
    review TEXT NOT NULL,

    date_created TEXT DEFAULT (datetime('now')),
    date_updated TEXT DEFAULT (datetime('now')),

    -- One review per (author, beer)
    UNIQUE(author_id, beer_id)
);

-- Photos are children of reviews; at most 4, one per position slot
CREATE TABLE IF NOT EXISTS review_photos (
    id TEXT PRIMARY KEY,
    review_id TEXT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    photo_url TEXT NOT NULL,           -- relative path under uploads/
    position INTEGER NOT NULL,         -- 0-3

    date_created TEXT DEFAULT (datetime('now')),
    date_updated TEXT DEFAULT (datetime('now')),

    UNIQUE(review_id, position)
);

CREATE TABLE IF NOT EXISTS beer_favorites (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    beer_id TEXT NOT NULL REFERENCES beers(id) ON DELETE CASCADE,
    date_created TEXT DEFAULT (datetime('now')),

    UNIQUE(user_id, beer_id)
);

CREATE TABLE IF NOT EXISTS brewery_favorites (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    brewery_id TEXT NOT NULL REFERENCES breweries(id) ON DELETE CASCADE,
    date_created TEXT DEFAULT (datetime('now')),

    UNIQUE(user_id, brewery_id)
);

CREATE TABLE IF NOT EXISTS stores (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    date_of_founding TEXT NOT NULL,
    owner TEXT,
    verified INTEGER NOT NULL DEFAULT 0,
    author_id TEXT REFERENCES users(id) ON DELETE SET NULL,

    date_created TEXT DEFAULT (datetime('now')),
    date_updated TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS store_menus (
    id TEXT PRIMARY KEY,
    store_id TEXT NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
    beer_id TEXT NOT NULL REFERENCES beers(id) ON DELETE CASCADE,
    author_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    size TEXT NOT NULL,
    price REAL NOT NULL,

    date_created TEXT DEFAULT (datetime('now')),
    date_updated TEXT DEFAULT (datetime('now'))
);

-- Append-only audit trail; writes are fire-and-forget
CREATE TABLE IF NOT EXISTS activity_log (
    id TEXT PRIMARY KEY,
    user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    action TEXT NOT NULL,
    entity_type TEXT,
    entity_id TEXT,
    metadata TEXT,                     -- JSON
    created_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_session_tokens_lookup ON session_tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_session_tokens_user ON session_tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_beers_brewery ON beers(brewery_id);
CREATE INDEX IF NOT EXISTS idx_reviews_beer ON reviews(beer_id);
CREATE INDEX IF NOT EXISTS idx_reviews_author ON reviews(author_id);
CREATE INDEX IF NOT EXISTS idx_review_photos_review ON review_photos(review_id);
CREATE INDEX IF NOT EXISTS idx_beer_favorites_user ON beer_favorites(user_id);
CREATE INDEX IF NOT EXISTS idx_brewery_favorites_user ON brewery_favorites(user_id);
CREATE INDEX IF NOT EXISTS idx_store_menus_store ON store_menus(store_id);
CREATE INDEX IF NOT EXISTS idx_activity_log_created ON activity_log(created_at);

-- Feed ordering: one per source table
CREATE INDEX IF NOT EXISTS idx_users_updated ON users(date_updated DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_breweries_updated ON breweries(date_updated DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_beers_updated ON beers(date_updated DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_reviews_updated ON reviews(date_updated DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_stores_updated ON stores(date_updated DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_store_menus_updated ON store_menus(date_updated DESC, id DESC);
"#;
