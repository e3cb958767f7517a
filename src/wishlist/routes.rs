use axum::{
    Router,
    routing::{delete, get},
};

use super::handlers;
use crate::state::AppState;

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/wishlist",
            get(handlers::list_entries).post(handlers::add_entry),
        )
        .route("/wishlist/{id}", delete(handlers::remove_entry))
}
