//! Welcome emails sent after a successful registration.
//!
//! Delivery is best effort: the registration is complete before the email
//! goes out, so callers log failures and move on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Email webhook returned status {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WelcomeEmail {
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<(), MailerError>;
}

/// Default mailer when no delivery endpoint is configured: logs the email.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<(), MailerError> {
        info!(
            to = %email.email,
            role = %email.role,
            language = %email.language,
            "Welcome email queued (no delivery endpoint configured)"
        );
        Ok(())
    }
}

/// POSTs the email as JSON to an external delivery service.
pub struct WebhookMailer {
    client: Client,
    url: String,
}

impl WebhookMailer {
    pub fn new(url: String) -> Result<Self, MailerError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(15)).build()?,
            url,
        })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<(), MailerError> {
        let response = self.client.post(&self.url).json(email).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MailerError::Rejected(status.as_u16()));
        }
        info!(to = %email.email, "Welcome email sent");
        Ok(())
    }
}
