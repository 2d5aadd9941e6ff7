//! Session context: who is signed in, their profile, and whether the
//! startup check is still running
//!
//! [`SessionContext::start`] restores a saved session, subscribes to auth
//! changes and performs the initial session check. A spawned listener keeps
//! the snapshot in step with later sign-ins, sign-outs and token refreshes
//! until the context is shut down or dropped.

use std::sync::{Arc, Mutex};

use chess_trainer_auth::{AuthChangeEvent, AuthStateChange, AuthSubscription, User};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::Backend;
use crate::models::Profile;
use crate::services::ProfileService;
use crate::session_store::SessionStore;

/// Point-in-time view of the session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Clone)]
struct Shared {
    state: Arc<RwLock<SessionSnapshot>>,
    profiles: ProfileService,
    store: Option<SessionStore>,
}

impl Shared {
    async fn apply_user(&self, user: Option<User>) {
        let profile = match &user {
            Some(user) => self.profiles.get_profile(&user.id).await,
            None => None,
        };
        if user.is_some() && profile.is_none() {
            warn!("signed in without a readable profile");
        }

        let mut state = self.state.write().await;
        *state = SessionSnapshot {
            user,
            profile,
            loading: false,
        };
    }

    async fn handle_change(&self, change: AuthStateChange) {
        debug!("auth change: {:?}", change.event);

        let user = change.session.as_ref().map(|session| session.user.clone());
        self.apply_user(user).await;

        if let Some(store) = &self.store {
            let result = match (&change.event, &change.session) {
                (AuthChangeEvent::SignedOut, _) => store.clear().await,
                (_, Some(session)) => store.save(session).await,
                (_, None) => Ok(()),
            };
            if let Err(e) = result {
                warn!("could not persist session to {}: {}", store.path().display(), e);
            }
        }
    }
}

pub struct SessionContext {
    backend: Arc<Backend>,
    shared: Shared,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionContext {
    /// Restore, subscribe and run the initial session check. Loading is
    /// forced off if the check outlasts the configured session timeout.
    pub async fn start(backend: Arc<Backend>) -> Self {
        let store = backend.config().session_file.clone().map(SessionStore::new);
        let shared = Shared {
            state: Arc::new(RwLock::new(SessionSnapshot {
                loading: true,
                ..Default::default()
            })),
            profiles: ProfileService::new(backend.clone()),
            store,
        };

        if let Some(store) = &shared.store {
            match store.load().await {
                Ok(Some(session)) => backend.auth().restore_session(session),
                Ok(None) => debug!("no saved session at {}", store.path().display()),
                Err(e) => warn!("ignoring unreadable session file: {}", e),
            }
        }

        let subscription = backend.auth().on_auth_state_change();
        let listener = tokio::spawn(listen(subscription, shared.clone()));

        let context = Self {
            backend,
            shared,
            listener: Mutex::new(Some(listener)),
        };

        let timeout = context.backend.config().session_timeout;
        if tokio::time::timeout(timeout, context.sync()).await.is_err() {
            warn!("session check still running after {:?}, showing the app anyway", timeout);
            context.shared.state.write().await.loading = false;
        }
        context
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.read().await.clone()
    }

    /// Re-read the auth session and the matching profile
    pub async fn sync(&self) {
        let user = self.backend.auth().get_session().map(|session| session.user);
        self.shared.apply_user(user).await;
    }

    /// Replace the cached profile, e.g. after the user edited it
    pub async fn set_profile(&self, profile: Option<Profile>) {
        self.shared.state.write().await.profile = profile;
    }

    /// Stop listening for auth changes
    pub fn shutdown(&self) {
        let mut listener = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = listener.take() {
            handle.abort();
            info!("session listener stopped");
        }
    }

    pub fn is_listening(&self) -> bool {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listener.as_ref().map_or(false, |handle| !handle.is_finished())
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn listen(mut subscription: AuthSubscription, shared: Shared) {
    while let Some(change) = subscription.recv().await {
        shared.handle_change(change).await;
    }
    debug!("auth change stream closed");
}
