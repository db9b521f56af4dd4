use std::env;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// The one mailbox every mail is sent as.
    pub sender: String,
    /// Destination for feedback and the admin copy of order notifications.
    pub admin_mailbox: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub timeout_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn load() -> Result<Config> {
    let port = env_or("PORT", "3000")
        .parse::<u16>()
        .context("PORT must be a valid port number")?;
    let smtp_port = env_or("SMTP_PORT", "587")
        .parse::<u16>()
        .context("SMTP_PORT must be a valid port number")?;
    let timeout_secs = env_or("SMTP_TIMEOUT_SECS", "30")
        .parse::<u64>()
        .context("SMTP_TIMEOUT_SECS must be a number of seconds")?;

    let sender = env_or("MAIL_SENDER", "orders@partnerportal.example");

    Ok(Config {
        server: ServerConfig { port },
        database: DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
        },
        auth: AuthConfig {
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
        },
        mail: MailConfig {
            smtp_host: env_or("SMTP_HOST", "smtp.office365.com"),
            smtp_port,
            admin_mailbox: env_or("ADMIN_MAILBOX", &sender),
            sender,
            token_url: env_or(
                "OAUTH_TOKEN_URL",
                "https://login.microsoftonline.com/common/oauth2/v2.0/token",
            ),
            client_id: env_or("OAUTH_CLIENT_ID", ""),
            client_secret: env_or("OAUTH_CLIENT_SECRET", ""),
            scope: env_or("OAUTH_SCOPE", "https://outlook.office365.com/.default"),
            timeout_secs,
        },
    })
}
