use axum::{routing::post, Router};

use crate::state::AppState;

pub mod client;
pub mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new().route("/payment", post(handlers::create_charge))
}
