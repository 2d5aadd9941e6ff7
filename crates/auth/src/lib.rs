//! Supabase Auth client for chess-trainer
//!
//! Wraps the GoTrue endpoints the trainer signs users in with (email and
//! password, OAuth redirects, sign-up with profile metadata), keeps the current
//! session in memory and broadcasts every session change to subscribers.

use log::{debug, warn};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub app_metadata: Value,
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl User {
    /// String value stored under `key` in the user's metadata
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix timestamp in seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => chrono::Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }

    fn with_expiry(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(chrono::Utc::now().timestamp() + self.expires_in);
        }
        self
    }
}

/// Result of a sign-up. `session` is `None` while the email awaits confirmation.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub user: Option<User>,
    pub session: Option<Session>,
}

#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Refresh an expired session before handing out its access token
    pub auto_refresh_token: bool,
    /// Keep the session returned by sign-in calls in memory
    pub persist_session: bool,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
    Apple,
    Discord,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
            Self::Apple => "apple",
            Self::Discord => "discord",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OAuthSignInOptions {
    pub redirect_to: Option<String>,
    pub scopes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SignUpOptions {
    /// Stored as `user_metadata`; the backend's profile trigger reads it
    pub data: Option<Value>,
    pub email_redirect_to: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

#[derive(Debug, Clone)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

/// Receiving end of [`Auth::on_auth_state_change`]. Dropping it unsubscribes.
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthStateChange>,
}

impl AuthSubscription {
    /// Next change, or `None` once the auth client is gone
    pub async fn recv(&mut self) -> Option<AuthStateChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("auth subscriber lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

pub struct Auth {
    url: String,
    key: String,
    http_client: Client,
    options: AuthOptions,
    current_session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthStateChange>,
    refresh_lock: Mutex<()>,
}

impl Auth {
    pub fn new(url: &str, key: &str, http_client: Client, options: AuthOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            options,
            current_session: Arc::new(RwLock::new(None)),
            events,
            refresh_lock: Mutex::new(()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    /// Register a user. Metadata in `options.data` travels with the account.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: Option<SignUpOptions>,
    ) -> Result<AuthResponse, AuthError> {
        let options = options.unwrap_or_default();
        let mut url = self.endpoint("/signup");
        if let Some(redirect_to) = &options.email_redirect_to {
            url.push_str(&format!("?redirect_to={}", urlencoding::encode(redirect_to)));
        }

        let mut payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        if let Some(data) = options.data {
            payload["data"] = data;
        }

        let response = self.post_json(&url, &payload, None).await?;
        let body: Value = response.json().await?;

        // A confirmed sign-up answers with a session, a pending one with the bare user.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            let session = self.store_session(session, AuthChangeEvent::SignedIn);
            Ok(AuthResponse {
                user: Some(session.user.clone()),
                session: Some(session),
            })
        } else {
            let user = match body.get("user") {
                Some(user) => serde_json::from_value(user.clone())?,
                None => serde_json::from_value(body)?,
            };
            Ok(AuthResponse {
                user: Some(user),
                session: None,
            })
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = self.endpoint("/token?grant_type=password");
        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });

        let response = self.post_json(&url, &payload, None).await?;
        let session: Session = response.json().await?;
        Ok(self.store_session(session, AuthChangeEvent::SignedIn))
    }

    /// URL the user must open to sign in with an OAuth provider
    pub fn get_oauth_sign_in_url(
        &self,
        provider: OAuthProvider,
        options: Option<OAuthSignInOptions>,
    ) -> String {
        let options = options.unwrap_or_default();
        let mut url = format!("{}?provider={}", self.endpoint("/authorize"), provider.as_str());

        if let Some(redirect_to) = options.redirect_to {
            url.push_str(&format!("&redirect_to={}", urlencoding::encode(&redirect_to)));
        }
        if let Some(scopes) = options.scopes {
            url.push_str(&format!("&scopes={}", urlencoding::encode(&scopes)));
        }

        url
    }

    /// Trade the code from an OAuth callback for a session
    pub async fn exchange_code_for_session(&self, code: &str) -> Result<Session, AuthError> {
        let url = self.endpoint("/token?grant_type=authorization_code");
        let payload = serde_json::json!({ "code": code });

        let response = self.post_json(&url, &payload, None).await?;
        let session: Session = response.json().await?;
        Ok(self.store_session(session, AuthChangeEvent::SignedIn))
    }

    pub fn get_session(&self) -> Option<Session> {
        let guard = self
            .current_session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.clone()
    }

    /// Adopt a session saved by an earlier run
    pub fn restore_session(&self, session: Session) {
        debug!("restoring session for user {}", session.user.id);
        self.set_current(Some(session.clone()));
        self.emit(AuthChangeEvent::InitialSession, Some(session));
    }

    /// Access token of the current session, refreshed first when it has expired
    pub async fn access_token(&self) -> Option<String> {
        let session = self.get_session()?;
        if !session.is_expired() || !self.options.auto_refresh_token {
            return Some(session.access_token);
        }

        let _refreshing = self.refresh_lock.lock().await;
        // Concurrent callers wait here; only the first one hits the token endpoint.
        let session = self.get_session()?;
        if !session.is_expired() {
            return Some(session.access_token);
        }
        match self.refresh_session().await {
            Ok(refreshed) => Some(refreshed.access_token),
            Err(e) => {
                warn!("session refresh failed: {}", e);
                Some(session.access_token)
            }
        }
    }

    pub async fn get_user(&self) -> Result<User, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        let url = self.endpoint("/user");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(response.json().await?)
    }

    pub async fn update_user(&self, attributes: UserAttributes) -> Result<User, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        let url = self.endpoint("/user");

        let response = self
            .http_client
            .put(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .json(&attributes)
            .send()
            .await?;
        let response = check_status(response).await?;
        let user: User = response.json().await?;

        let updated = Session {
            user: user.clone(),
            ..session
        };
        self.set_current(Some(updated.clone()));
        self.emit(AuthChangeEvent::UserUpdated, Some(updated));
        Ok(user)
    }

    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        let url = self.endpoint("/token?grant_type=refresh_token");
        let payload = serde_json::json!({ "refresh_token": session.refresh_token });

        let response = self.post_json(&url, &payload, None).await?;
        let refreshed: Session = response.json().await?;
        Ok(self.store_session(refreshed, AuthChangeEvent::TokenRefreshed))
    }

    /// Revoke the session server-side. The local session is cleared even when
    /// the server rejects the call.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        let url = self.endpoint("/logout");

        let result = self
            .post_json(&url, &Value::Null, Some(&session.access_token))
            .await;

        self.set_current(None);
        self.emit(AuthChangeEvent::SignedOut, None);

        result.map(|_| ())
    }

    /// Subscribe to session changes for as long as the returned handle lives
    pub fn on_auth_state_change(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.events.subscribe(),
        }
    }

    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        bearer: Option<&str>,
    ) -> Result<Response, AuthError> {
        let mut request = self
            .http_client
            .post(url)
            .header("apikey", &self.key)
            .header("Content-Type", "application/json");
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if !payload.is_null() {
            request = request.json(payload);
        }

        let response = request.send().await?;
        check_status(response).await
    }

    fn store_session(&self, session: Session, event: AuthChangeEvent) -> Session {
        let session = session.with_expiry();
        if self.options.persist_session {
            self.set_current(Some(session.clone()));
        }
        self.emit(event, Some(session.clone()));
        session
    }

    fn set_current(&self, session: Option<Session>) {
        let mut guard = self
            .current_session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = session;
    }

    fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        if self.events.send(AuthStateChange { event, session }).is_err() {
            debug!("no auth subscribers for {:?}", event);
        }
    }
}

async fn check_status(response: Response) -> Result<Response, AuthError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await?;
    Err(AuthError::ApiError(api_error_message(&error_text, status)))
}

// GoTrue reports failures as `error_description`, `msg` or `message`
// depending on the endpoint.
fn api_error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        ["error_description", "msg", "message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
    });

    match message {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => format!("request failed with status {}", status),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body(access_token: &str) -> Value {
        serde_json::json!({
            "access_token": access_token,
            "refresh_token": "test_refresh_token",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": "test_user_id",
                "email": "test@example.com",
                "phone": null,
                "app_metadata": {},
                "user_metadata": { "username": "knightrider" },
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }
        })
    }

    #[test]
    fn test_sign_up_with_session() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/auth/v1/signup"))
                .respond_with(ResponseTemplate::new(200).set_body_json(session_body("tok")))
                .mount(&mock_server)
                .await;

            let auth = Auth::new(
                &mock_server.uri(),
                "test_key",
                Client::new(),
                AuthOptions::default(),
            );
            let options = SignUpOptions {
                data: Some(serde_json::json!({ "username": "knightrider" })),
                ..Default::default()
            };

            let result = auth
                .sign_up("test@example.com", "password123", Some(options))
                .await
                .unwrap();

            let session = result.session.unwrap();
            assert_eq!(session.access_token, "tok");
            assert!(session.expires_at.is_some());
            assert_eq!(auth.get_session().unwrap().access_token, "tok");
            assert_eq!(result.user.unwrap().metadata_str("username"), Some("knightrider"));
        });
    }

    #[test]
    fn test_sign_up_pending_confirmation() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/auth/v1/signup"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": "pending_user",
                    "email": "new@example.com",
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                })))
                .mount(&mock_server)
                .await;

            let auth = Auth::new(
                &mock_server.uri(),
                "test_key",
                Client::new(),
                AuthOptions::default(),
            );

            let result = auth.sign_up("new@example.com", "pw", None).await.unwrap();

            assert!(result.session.is_none());
            assert_eq!(result.user.unwrap().id, "pending_user");
            assert!(auth.get_session().is_none());
        });
    }

    #[test]
    fn test_oauth_sign_in_url() {
        let auth = Auth::new(
            "https://example.supabase.co",
            "test-key",
            Client::new(),
            AuthOptions::default(),
        );

        let url = auth.get_oauth_sign_in_url(OAuthProvider::Google, None);
        assert_eq!(
            url,
            "https://example.supabase.co/auth/v1/authorize?provider=google"
        );

        let options = OAuthSignInOptions {
            redirect_to: Some("http://localhost:5173/profile".to_string()),
            scopes: Some("email profile".to_string()),
        };
        let url = auth.get_oauth_sign_in_url(OAuthProvider::Github, Some(options));
        assert!(url.contains("provider=github"));
        assert!(url.contains("redirect_to=http%3A%2F%2Flocalhost%3A5173%2Fprofile"));
        assert!(url.contains("scopes=email%20profile"));
    }

    #[tokio::test]
    async fn test_sign_in_emits_signed_in() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("tok")))
            .mount(&mock_server)
            .await;

        let auth = Auth::new(
            &mock_server.uri(),
            "test_key",
            Client::new(),
            AuthOptions::default(),
        );
        let mut subscription = auth.on_auth_state_change();

        auth.sign_in_with_password("test@example.com", "pw")
            .await
            .unwrap();

        let change = subscription.recv().await.unwrap();
        assert_eq!(change.event, AuthChangeEvent::SignedIn);
        assert_eq!(change.session.unwrap().user.id, "test_user_id");
    }

    #[tokio::test]
    async fn test_error_description_is_surfaced() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&mock_server)
            .await;

        let auth = Auth::new(
            &mock_server.uri(),
            "test_key",
            Client::new(),
            AuthOptions::default(),
        );

        match auth.sign_in_with_password("a@b.c", "wrong").await {
            Err(AuthError::ApiError(message)) => {
                assert_eq!(message, "Invalid login credentials")
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
        assert!(auth.get_session().is_none());
    }

    #[test]
    fn test_expired_session() {
        let body = session_body("tok");
        let mut session: Session = serde_json::from_value(body).unwrap();
        session.expires_at = Some(chrono::Utc::now().timestamp() - 10);
        assert!(session.is_expired());

        session.expires_at = None;
        assert!(!session.is_expired());
    }

    #[test]
    fn test_api_error_message_fallbacks() {
        let status = reqwest::StatusCode::UNAUTHORIZED;
        assert_eq!(api_error_message(r#"{"msg":"Token expired"}"#, status), "Token expired");
        assert_eq!(api_error_message("plain failure", status), "plain failure");
        assert_eq!(
            api_error_message("", status),
            "request failed with status 401 Unauthorized"
        );
    }
}
