use axum::{Router, routing::post};

use super::handlers;
use crate::state::AppState;

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route("/order/create", post(handlers::create_order))
        .route("/order/verify", post(handlers::verify_payment))
}
