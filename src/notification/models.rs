use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct PasswordResetNotification {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WelcomeNotification {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    PasswordReset(PasswordResetNotification),
    WelcomeUser(WelcomeNotification),
}
