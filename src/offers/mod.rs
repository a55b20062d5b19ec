use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod query;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/offers", get(handlers::list_offers))
        .route("/offer/publish", post(handlers::publish_offer))
        .route("/offer/:id", get(handlers::get_offer))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}
