//! SMTP relay with an OAuth2 client-credentials token cache.
//!
//! The relay authenticates with XOAUTH2, so every send needs a valid access
//! token. Tokens are cached per process and refreshed shortly before they
//! expire; a cold start simply fetches a fresh one.

mod templates;

pub use templates::{MailLineItem, NotificationKind, OrderMailContext, Templates};

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use lettre::message::{Mailbox, SinglePart, header};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{Message, SmtpTransport, Transport};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::app_error::AppError;
use crate::config::MailConfig;

/// Tokens are refreshed this long before their reported expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

fn needs_refresh(expires_at: Instant, now: Instant) -> bool {
    now + TOKEN_REFRESH_MARGIN >= expires_at
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

pub struct Mailer {
    config: MailConfig,
    http_client: reqwest::Client,
    templates: Templates,
    token: Mutex<Option<CachedToken>>,
}

impl Mailer {
    pub fn new(config: MailConfig, http_client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            config,
            http_client,
            templates: Templates::new()?,
            token: Mutex::new(None),
        })
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    pub fn admin_mailbox(&self) -> &str {
        &self.config.admin_mailbox
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if !needs_refresh(token.expires_at, Instant::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        tracing::debug!("Fetching a fresh SMTP OAuth token");

        let response: TokenResponse = self
            .http_client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", self.config.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable("IdentityProvider".into()))?
            .error_for_status()
            .context("Token endpoint rejected the request")?
            .json()
            .await
            .context("Failed to parse token response")?;

        Ok(CachedToken {
            access_token: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        })
    }

    /// Sends one HTML mail through the relay as the configured sender.
    pub async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let token = self.access_token().await?;

        let message = Message::builder()
            .from(
                self.config
                    .sender
                    .parse::<Mailbox>()
                    .context("Invalid sender address")?,
            )
            .to(to.parse::<Mailbox>().context("Invalid recipient address")?)
            .subject(subject)
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(html_body.to_string()),
            )
            .context("Failed to build message")?;

        let credentials = Credentials::new(self.config.sender.clone(), token);
        let transport = SmtpTransport::starttls_relay(&self.config.smtp_host)
            .context("Failed to create SMTP transport")?
            .port(self.config.smtp_port)
            .authentication(vec![Mechanism::Xoauth2])
            .credentials(credentials)
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)))
            .build();

        // lettre's SMTP transport is synchronous, keep it off the runtime.
        tokio::task::spawn_blocking(move || {
            transport.send(&message).context("Failed to send email")
        })
        .await
        .context("Send task panicked")??;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_refreshed_inside_the_margin() {
        let now = Instant::now();

        // Plenty of lifetime left.
        assert!(!needs_refresh(now + Duration::from_secs(3600), now));
        // 61 seconds left is still fine, 59 is not.
        assert!(!needs_refresh(now + Duration::from_secs(61), now));
        assert!(needs_refresh(now + Duration::from_secs(59), now));
        // Already expired.
        assert!(needs_refresh(now, now + Duration::from_secs(1)));
    }
}
