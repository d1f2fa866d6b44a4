//! # Taproom
//!
//! A beer and brewery review server, usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! taproom = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use taproom::server::{AppState, create_router};
//! use taproom::db::{Db, SqliteDb};
//!
//! let db = SqliteDb::new(&PathBuf::from("./data/taproom.db")).unwrap();
//! db.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(db),
//!     &PathBuf::from("./data"),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI entry point. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod media;
pub mod server;
pub mod types;
