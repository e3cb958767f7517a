use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::models::Notification;
use crate::config::SmtpConfig;
use crate::utils::error::ApiError;

/// Outbound email, built once from config. The SMTP transport is
/// synchronous, so sends run on the blocking pool.
#[derive(Clone)]
pub struct Mailer {
    transport: SmtpTransport,
    sender: Mailbox,
}

impl Mailer {
    pub fn from_config(cfg: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());

        let transport = SmtpTransport::relay(&cfg.relay)
            .map_err(|e| format!("wrong smtp transport: {}", e))?
            .credentials(creds)
            .build();

        let sender = format!("Storefront <{}>", cfg.sender)
            .parse::<Mailbox>()
            .map_err(|e| format!("failed to parse sender email: {}", e))?;

        Ok(Self { transport, sender })
    }

    pub async fn send(&self, notification: Notification) -> Result<(), ApiError> {
        let (to, subject, body) = match notification {
            Notification::PasswordReset(data) => (
                data.email,
                "Password reset code".to_owned(),
                format!("Your one-time code for resetting your password is: {}", data.code),
            ),
            Notification::WelcomeUser(data) => (
                data.email,
                "Welcome to Storefront".to_owned(),
                "Hi, and welcome to Storefront".to_owned(),
            ),
        };

        let mailer = self.clone();
        tokio::task::spawn_blocking(move || mailer.send_blocking(&to, &subject, body)).await??;

        Ok(())
    }

    fn send_blocking(&self, to: &str, subject: &str, body: String) -> Result<(), ApiError> {
        let email = Message::builder()
            .from(self.sender.clone())
            .reply_to(self.sender.clone())
            .to(to
                .parse::<Mailbox>()
                .map_err(|e| ApiError::Validation(format!("invalid recipient email: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| ApiError::Internal(format!("failed to build a message: {}", e)))?;

        self.transport
            .send(&email)
            .map_err(|e| ApiError::Internal(format!("failed to send an email: {}", e)))?;

        tracing::debug!(to, "email sent");

        Ok(())
    }
}
