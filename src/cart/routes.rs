use axum::{
    Router,
    routing::{get, post, put},
};

use super::handlers;
use crate::state::AppState;

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(handlers::get_cart))
        .route("/cart/items", post(handlers::add_item))
        .route(
            "/cart/items/{id}",
            put(handlers::update_item).delete(handlers::remove_item),
        )
}
