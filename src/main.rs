mod auth;
mod cart;
mod category;
mod config;
mod gateway;
mod notification;
mod order;
mod pool;
mod product;
mod state;
mod utils;
mod wishlist;

use std::sync::Arc;

use axum::Router;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use listenfd::ListenFd;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::gateway::client::GatewayClient;
use crate::notification::handlers::Mailer;
use crate::state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/");

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,info".into()),
        )
        .init();

    let config = AppConfig::from_env().expect("invalid configuration");
    let bind_addr = config.bind_addr.clone();

    let db_url = config.database_url.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn =
            storefront::establish_connection(&db_url).expect("failed to connect for migrations");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("failed to run migrations");
    })
    .await
    .expect("migration task failed");

    let pool = pool::get_pool(&config.database_url)
        .await
        .expect("failed to build db pool");
    let gateway = GatewayClient::new(&config.gateway).expect("failed to build gateway client");
    let mailer = Mailer::from_config(&config.smtp).expect("failed to build mailer");

    let state = AppState {
        pool,
        config: Arc::new(config),
        gateway,
        mailer,
    };

    let routes = Router::new()
        .merge(auth::routes::get_routes())
        .merge(category::routes::get_routes())
        .merge(product::routes::get_routes())
        .merge(cart::routes::get_routes())
        .merge(wishlist::routes::get_routes())
        .merge(order::routes::get_routes())
        .with_state(state);

    let app = Router::new().nest("/api", routes);
    let app = app.fallback(utils::handler_404);

    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0).unwrap() {
        // if we are given a tcp listener on listen fd 0, we use that one
        Some(listener) => {
            listener.set_nonblocking(true).unwrap();
            TcpListener::from_std(listener).unwrap()
        }
        // otherwise fall back to local listening
        None => TcpListener::bind(&bind_addr).await.unwrap(),
    };
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
