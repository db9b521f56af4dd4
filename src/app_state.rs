use std::sync::Arc;

use anyhow::Result;

use crate::{aliases::DbPool, config::Config, db, mailer::Mailer};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub http_client: reqwest::Client,
    pub mailer: Arc<Mailer>,
    pub admin_mailbox: String,
}

impl AppState {
    pub async fn init(config: &Config) -> Result<Self> {
        let db_pool = db::create_pool(&config.database.url).await?;
        let http_client = reqwest::Client::new();
        let mailer = Arc::new(Mailer::new(config.mail.clone(), http_client.clone())?);

        Ok(Self {
            db_pool,
            http_client,
            mailer,
            admin_mailbox: config.mail.admin_mailbox.clone(),
        })
    }
}
