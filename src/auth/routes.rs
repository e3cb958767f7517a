use axum::{
    Router,
    routing::{post, put},
};

use super::handlers;
use crate::state::AppState;

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/forgot-password", post(handlers::forgot_password))
        .route("/auth/verify-otp", post(handlers::verify_otp))
        .route("/auth/reset-password", post(handlers::reset_password))
        .route("/auth/change-password", put(handlers::change_password))
}
