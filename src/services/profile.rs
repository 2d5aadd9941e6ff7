use std::sync::Arc;

use tracing::{debug, error, info};

use super::PROFILES_TABLE;
use crate::client::Backend;
use crate::models::{Profile, ProfileUpdate};

/// Reads and updates rows of `profiles`
#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<Backend>,
}

impl ProfileService {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    pub async fn get_profile(&self, user_id: &str) -> Option<Profile> {
        debug!("fetching profile for user {}", user_id);
        let result = self
            .backend
            .from(PROFILES_TABLE)
            .await
            .select("*")
            .eq("id", user_id)
            .execute_one::<Profile>()
            .await;

        match result {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                info!("no profile row for user {}", user_id);
                None
            }
            Err(e) => {
                error!("error fetching profile for {}: {}", user_id, e);
                None
            }
        }
    }

    /// Apply `update` and return the row as stored afterwards
    pub async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Option<Profile> {
        if update.is_empty() {
            debug!("empty profile update for {}, re-reading instead", user_id);
            return self.get_profile(user_id).await;
        }

        let result = self
            .backend
            .from(PROFILES_TABLE)
            .await
            .eq("id", user_id)
            .select("*")
            .update(update)
            .await;

        let rows = match result {
            Ok(value) => value,
            Err(e) => {
                error!("error updating profile for {}: {}", user_id, e);
                return None;
            }
        };

        match serde_json::from_value::<Vec<Profile>>(rows) {
            Ok(profiles) => {
                let updated = profiles.into_iter().next();
                if updated.is_none() {
                    info!("profile update for {} matched no rows", user_id);
                }
                updated
            }
            Err(e) => {
                error!("unexpected profile update response for {}: {}", user_id, e);
                None
            }
        }
    }

    /// Profile of the user behind the current session
    pub async fn get_current_profile(&self) -> Option<Profile> {
        match self.backend.auth().get_user().await {
            Ok(user) => self.get_profile(&user.id).await,
            Err(e) => {
                debug!("no current user: {}", e);
                None
            }
        }
    }
}
