use axum::{
    Router,
    routing::get,
};

use super::handlers;
use crate::state::AppState;

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(handlers::get_products).post(handlers::create_product),
        )
        .route(
            "/products/{id}",
            get(handlers::get_product_by_id)
                .patch(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/variants",
            get(handlers::get_variants).post(handlers::create_variant),
        )
        .route(
            "/variants/{id}",
            get(handlers::get_variant_by_id)
                .patch(handlers::update_variant)
                .delete(handlers::delete_variant),
        )
}
