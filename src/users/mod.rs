use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub mod credentials;
pub mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/signup", post(handlers::signup))
        .route("/user/login", post(handlers::login))
        .route("/user/update_password", put(handlers::update_password))
        .route("/user", get(handlers::list_profiles))
        .route("/user/member/:id", get(handlers::get_profile))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}
