mod activity;
mod beers;
mod breweries;
pub mod dto;
mod favorites;
pub mod response;
mod reviews;
mod router;
mod search;
mod stores;
mod upload;
mod users;
pub mod validation;

pub use router::{AppState, create_router};
