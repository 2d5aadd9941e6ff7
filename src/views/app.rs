use chess_trainer_auth::{AuthError, OAuthProvider, OAuthSignInOptions, SignUpOptions};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::debug::{self as debug_pages, PuzzleTestState};
use super::signup::SignUpStatus;
use super::{home, layout, login, not_found, profile, puzzle, BannerKind, Page, Route};
use crate::models::{ProfileUpdate, ProgressStats};
use crate::puzzle::{load_puzzle, PuzzleSession};
use crate::services::{ProfileService, ProgressService, PuzzleService};
use crate::session::SessionContext;

const LOAD_FAILED: &str = "Failed to load puzzle. Please try again.";

/// Something the user did at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    SignIn { email: String, password: String },
    SignInWithGoogle,
    /// Code from the OAuth redirect
    ExchangeCode(String),
    SignUp {
        email: String,
        password: String,
        username: String,
    },
    SignOut,
    Move { from: String, to: String },
    ResetPuzzle,
    NextPuzzle,
    UpdateBio(String),
    UpdateDisplayName(String),
    RefreshProfile,
    TestUpdateBio,
    FilterDifficulty(u8),
    CheckTable,
}

impl Action {
    /// Parse one prompt line. `None` when the line is not a known command.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.starts_with('/') {
            return Some(Action::Navigate(line.to_string()));
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let action = match (command.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("go", [path]) => Action::Navigate(path.to_string()),
            ("signin", [email, password]) => Action::SignIn {
                email: email.to_string(),
                password: password.to_string(),
            },
            ("google", []) => Action::SignInWithGoogle,
            ("code", [code]) => Action::ExchangeCode(code.to_string()),
            ("signup", [email, password, username]) => Action::SignUp {
                email: email.to_string(),
                password: password.to_string(),
                username: username.to_string(),
            },
            ("signout", []) => Action::SignOut,
            ("move", [from, to]) => Action::Move {
                from: from.to_string(),
                to: to.to_string(),
            },
            ("move", [squares]) if squares.len() == 4 && squares.is_ascii() => Action::Move {
                from: squares[..2].to_string(),
                to: squares[2..].to_string(),
            },
            ("reset", []) => Action::ResetPuzzle,
            ("next", []) => Action::NextPuzzle,
            ("bio", _) if !rest.is_empty() => Action::UpdateBio(rest.to_string()),
            ("name", _) if !rest.is_empty() => Action::UpdateDisplayName(rest.to_string()),
            ("refresh", []) => Action::RefreshProfile,
            ("testbio", []) => Action::TestUpdateBio,
            ("filter", [difficulty]) => Action::FilterDifficulty(difficulty.parse().ok()?),
            ("check", []) => Action::CheckTable,
            _ => return None,
        };
        Some(action)
    }
}

/// The trainer's screens and the state behind them
pub struct App {
    context: SessionContext,
    profiles: ProfileService,
    puzzles: PuzzleService,
    progress: ProgressService,
    route: Route,
    puzzle: PuzzleSession,
    puzzle_error: Option<String>,
    auth_error: Option<String>,
    oauth_url: Option<String>,
    signup: SignUpStatus,
    profile_notice: Option<(BannerKind, String)>,
    progress_stats: Option<ProgressStats>,
    puzzle_test: PuzzleTestState,
    profile_test_notice: Option<String>,
}

impl App {
    pub fn new(context: SessionContext) -> Self {
        let backend = context.backend().clone();
        Self {
            profiles: ProfileService::new(backend.clone()),
            puzzles: PuzzleService::new(backend.clone()),
            progress: ProgressService::new(backend),
            context,
            route: Route::Home,
            puzzle: PuzzleSession::new(),
            puzzle_error: None,
            auth_error: None,
            oauth_url: None,
            signup: SignUpStatus::Idle,
            profile_notice: None,
            progress_stats: None,
            puzzle_test: PuzzleTestState::default(),
            profile_test_notice: None,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn puzzle(&self) -> &PuzzleSession {
        &self.puzzle
    }

    /// Go to `path` and load whatever the page shows
    pub async fn navigate(&mut self, path: &str) {
        self.auth_error = None;
        self.profile_notice = None;
        self.profile_test_notice = None;
        self.signup = SignUpStatus::Idle;

        let route = Route::parse(path);
        debug!("navigating to {}", route);

        self.route = match route {
            Route::Puzzle(id) => {
                let id = match id {
                    Some(id) => id,
                    None => self.next_puzzle_id().await,
                };
                self.open_puzzle(&id).await;
                Route::Puzzle(Some(id))
            }
            Route::Profile => match self.user_id().await {
                Some(user_id) => {
                    self.progress_stats = Some(self.progress.stats(&user_id, today()).await);
                    Route::Profile
                }
                None => {
                    info!("profile needs a signed-in user, redirecting home");
                    Route::Home
                }
            },
            Route::PuzzleTest => {
                self.puzzle_test.run(&self.puzzles).await;
                Route::PuzzleTest
            }
            other => other,
        };
    }

    pub async fn dispatch(&mut self, action: Action) {
        match action {
            Action::Navigate(path) => self.navigate(&path).await,
            Action::SignIn { email, password } => self.sign_in(&email, &password).await,
            Action::SignInWithGoogle => self.start_google_sign_in(),
            Action::ExchangeCode(code) => self.finish_google_sign_in(&code).await,
            Action::SignUp {
                email,
                password,
                username,
            } => self.sign_up(&email, &password, &username).await,
            Action::SignOut => self.sign_out().await,
            Action::Move { from, to } => self.play(&from, &to).await,
            Action::ResetPuzzle => self.puzzle.reset(),
            Action::NextPuzzle => {
                if let Some(next) = self.puzzle.next_puzzle_id() {
                    self.navigate(&format!("/puzzle/{}", next)).await;
                }
            }
            Action::UpdateBio(bio) => {
                self.update_profile(ProfileUpdate::bio(&bio)).await;
            }
            Action::UpdateDisplayName(name) => {
                let update = ProfileUpdate {
                    display_name: Some(name),
                    ..Default::default()
                };
                self.update_profile(update).await;
            }
            Action::RefreshProfile => {
                self.context.sync().await;
                self.profile_test_notice = Some("Profile refreshed.".to_string());
            }
            Action::TestUpdateBio => {
                let bio = format!("Test bio updated at {}", Utc::now().to_rfc3339());
                let updated = self.update_profile(ProfileUpdate::bio(&bio)).await;
                self.profile_test_notice = Some(if updated {
                    format!("Bio set to \"{}\".", bio)
                } else {
                    "Bio update failed.".to_string()
                });
            }
            Action::FilterDifficulty(difficulty) => {
                self.puzzle_test.difficulty = difficulty.min(5);
                self.puzzle_test.run(&self.puzzles).await;
            }
            Action::CheckTable => self.puzzle_test.run(&self.puzzles).await,
        }
    }

    /// The current screen, wrapped in navbar and footer
    pub async fn render(&self) -> Page {
        let snapshot = self.context.snapshot().await;
        if snapshot.loading {
            return layout::loading_page();
        }

        let body = match &self.route {
            Route::Home => home::page(&snapshot, self.auth_error.as_deref()),
            Route::Login => login::page(self.auth_error.as_deref(), self.oauth_url.as_deref()),
            Route::SignUp => super::signup::page(&self.signup),
            Route::Puzzle(_) => puzzle::page(&self.puzzle, self.puzzle_error.as_deref()),
            Route::Profile => profile::page(
                &snapshot,
                self.progress_stats.as_ref(),
                self.profile_notice
                    .as_ref()
                    .map(|(kind, text)| (*kind, text.as_str())),
            ),
            Route::ProfileTest => {
                debug_pages::profile_test_page(&snapshot, self.profile_test_notice.as_deref())
            }
            Route::PuzzleTest => {
                debug_pages::puzzle_test_page(&self.puzzle_test, self.context.backend().config())
            }
            Route::NotFound(path) => not_found::page(path),
        };
        layout::wrap(&snapshot, body)
    }

    /// Stop the session listener
    pub fn shutdown(&self) {
        self.context.shutdown();
    }

    async fn user_id(&self) -> Option<String> {
        self.context.snapshot().await.user.map(|user| user.id)
    }

    // First due review, else the first listed puzzle, else the built-in one.
    async fn next_puzzle_id(&self) -> String {
        if let Some(user_id) = self.user_id().await {
            let due = self.progress.due_for_review(&user_id, today()).await;
            if let Some(entry) = due.into_iter().next() {
                return entry.puzzle_id;
            }
        }
        match self.puzzles.get_puzzles(Some(1), 0).await.into_iter().next() {
            Some(puzzle) => puzzle.id,
            None => "1".to_string(),
        }
    }

    async fn open_puzzle(&mut self, id: &str) {
        self.puzzle = PuzzleSession::new();
        self.puzzle_error = None;

        let record = load_puzzle(&self.puzzles, id).await;
        if let Err(e) = self.puzzle.load(record) {
            error!("puzzle {} could not be set up: {}", id, e);
            self.puzzle_error = Some(LOAD_FAILED.to_string());
        }
    }

    async fn play(&mut self, from: &str, to: &str) {
        if !matches!(self.route, Route::Puzzle(_)) {
            debug!("ignoring move outside the puzzle page");
            return;
        }

        let outcome = self.puzzle.on_drop(from, to);
        if !outcome.is_verdict() {
            return;
        }

        let (Some(user_id), Some(attempt)) =
            (self.user_id().await, self.puzzle.take_attempt())
        else {
            return;
        };
        if self
            .progress
            .record_attempt(&user_id, &attempt, today())
            .await
            .is_none()
        {
            warn!("attempt on puzzle {} was not recorded", attempt.puzzle_id);
        }
    }

    async fn sign_in(&mut self, email: &str, password: &str) {
        match self
            .context
            .backend()
            .auth()
            .sign_in_with_password(email, password)
            .await
        {
            Ok(_) => {
                self.context.sync().await;
                if self.route == Route::Login {
                    self.navigate("/").await;
                }
                self.auth_error = None;
            }
            Err(e) => {
                warn!("sign-in failed: {}", e);
                self.auth_error = Some(auth_message(e));
            }
        }
    }

    fn start_google_sign_in(&mut self) {
        let options = OAuthSignInOptions {
            redirect_to: Some(self.context.backend().config().oauth_redirect()),
            scopes: None,
        };
        let url = self
            .context
            .backend()
            .auth()
            .get_oauth_sign_in_url(OAuthProvider::Google, Some(options));
        info!("google sign-in started");
        self.oauth_url = Some(url);
        self.auth_error = None;
        self.route = Route::Login;
    }

    async fn finish_google_sign_in(&mut self, code: &str) {
        match self
            .context
            .backend()
            .auth()
            .exchange_code_for_session(code)
            .await
        {
            Ok(_) => {
                self.oauth_url = None;
                self.context.sync().await;
                self.navigate("/profile").await;
            }
            Err(e) => {
                warn!("oauth code exchange failed: {}", e);
                self.auth_error = Some(auth_message(e));
            }
        }
    }

    async fn sign_up(&mut self, email: &str, password: &str, username: &str) {
        let options = SignUpOptions {
            data: Some(json!({ "username": username, "name": username })),
            email_redirect_to: Some(self.context.backend().config().site_url.clone()),
        };

        match self
            .context
            .backend()
            .auth()
            .sign_up(email, password, Some(options))
            .await
        {
            Ok(response) => {
                let confirmed = response.session.is_some();
                if let Some(user) = &response.user {
                    // The backend creates the profile row from the sign-up metadata.
                    match self.profiles.get_profile(&user.id).await {
                        Some(_) => info!("profile for new user {} is in place", user.id),
                        None => info!("profile for new user {} not created yet", user.id),
                    }
                }
                if confirmed {
                    self.context.sync().await;
                }
                self.signup = SignUpStatus::Created { confirmed };
            }
            Err(e) => {
                warn!("sign-up failed: {}", e);
                self.signup = SignUpStatus::Failed(auth_message(e));
            }
        }
    }

    async fn sign_out(&mut self) {
        if let Err(e) = self.context.backend().auth().sign_out().await {
            error!("Error signing out: {}", e);
        }
        self.context.sync().await;
        self.navigate("/").await;
    }

    async fn update_profile(&mut self, update: ProfileUpdate) -> bool {
        let Some(user_id) = self.user_id().await else {
            self.profile_notice = Some((BannerKind::Error, "Sign in first.".to_string()));
            return false;
        };

        match self.profiles.update_profile(&user_id, &update).await {
            Some(profile) => {
                self.context.set_profile(Some(profile)).await;
                self.profile_notice = Some((BannerKind::Success, "Profile updated.".to_string()));
                true
            }
            None => {
                self.profile_notice = Some((
                    BannerKind::Error,
                    "Could not update your profile.".to_string(),
                ));
                false
            }
        }
    }
}

fn auth_message(error: AuthError) -> String {
    match error {
        AuthError::ApiError(message) => message,
        other => other.to_string(),
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
