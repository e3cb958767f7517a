use std::sync::Arc;

use crate::config::AppConfig;
use crate::gateway::client::GatewayClient;
use crate::notification::handlers::Mailer;
use crate::utils::types::Pool;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<AppConfig>,
    pub gateway: GatewayClient,
    pub mailer: Mailer,
}
