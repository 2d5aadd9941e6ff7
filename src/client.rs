//! Backend handle shared by the session context, services and views

use std::sync::Arc;

use chess_trainer_auth::{Auth, AuthOptions};
use chess_trainer_postgrest::PostgrestClient;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::Result;

/// Connection to the Supabase project: one HTTP client, one auth client,
/// table clients created on demand.
#[derive(Clone)]
pub struct Backend {
    config: Arc<AppConfig>,
    http_client: Client,
    auth: Arc<Auth>,
}

impl Backend {
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let auth = Auth::new(
            config.url.as_str(),
            &config.anon_key,
            http_client.clone(),
            AuthOptions::default(),
        );
        debug!("backend initialised for {}", config.url);

        Ok(Self {
            config: Arc::new(config),
            http_client,
            auth: Arc::new(auth),
        })
    }

    /// Convenience constructor reading `SUPABASE_URL` and `SUPABASE_ANON_KEY`
    pub fn from_env() -> Result<Self> {
        Self::new(AppConfig::from_env()?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Id of the signed-in user, if any
    pub fn current_user_id(&self) -> Option<String> {
        self.auth.get_session().map(|session| session.user.id)
    }

    /// Query builder for `table`, carrying the signed-in user's token when
    /// there is one so row-level security sees the right user. An expired
    /// token is refreshed first.
    pub async fn from(&self, table: &str) -> PostgrestClient {
        let client = PostgrestClient::new(
            self.config.url.as_str(),
            &self.config.anon_key,
            table,
            self.http_client.clone(),
        );

        match self.auth.access_token().await {
            Some(token) => match client.clone().with_auth(&token) {
                Ok(authed) => authed,
                Err(e) => {
                    warn!("ignoring unusable access token: {}", e);
                    client
                }
            },
            None => client,
        }
    }
}
