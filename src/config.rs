//! Configuration for the chess trainer

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Result, TrainerError};

const URL_VARS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];
const KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"];

/// Connection settings and tunables for the trainer
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// The base URL for the Supabase project
    pub url: Url,

    /// The anonymous API key for the Supabase project
    pub anon_key: String,

    /// Public address of the app, used for OAuth and email redirects
    pub site_url: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Where the signed-in session is kept between runs
    pub session_file: Option<PathBuf>,

    /// How long the startup session check may take before loading is forced off
    pub session_timeout: Duration,

    /// How long the puzzle table access check may take
    pub table_check_timeout: Duration,

    /// Page size used when a caller does not pass one
    pub default_puzzle_limit: usize,

    /// Upper bound for any page size
    pub max_puzzle_limit: usize,

    /// Smallest review interval in days
    pub min_interval_days: i64,

    /// Largest review interval in days
    pub max_interval_days: i64,

    /// Ease factor given to a puzzle on its first attempt
    pub default_ease_factor: f64,
}

impl AppConfig {
    /// Create a configuration, validating the URL and key
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        if anon_key.trim().is_empty() {
            return Err(TrainerError::Config(
                "anon key cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            site_url: "http://localhost:5173".to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            session_file: None,
            session_timeout: Duration::from_secs(5),
            table_check_timeout: Duration::from_secs(5),
            default_puzzle_limit: 10,
            max_puzzle_limit: 100,
            min_interval_days: 1,
            max_interval_days: 365,
            default_ease_factor: 2.5,
        })
    }

    /// Build the configuration from the environment, reading `.env` first
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = first_var(&URL_VARS)?;
        let anon_key = first_var(&KEY_VARS)?;
        Self::new(&url, &anon_key)
    }

    /// Set the public site URL
    pub fn with_site_url(mut self, value: &str) -> Self {
        self.site_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the session file
    pub fn with_session_file(mut self, value: Option<PathBuf>) -> Self {
        self.session_file = value;
        self
    }

    /// Set the startup session timeout
    pub fn with_session_timeout(mut self, value: Duration) -> Self {
        self.session_timeout = value;
        self
    }

    /// Set the puzzle table access check timeout
    pub fn with_table_check_timeout(mut self, value: Duration) -> Self {
        self.table_check_timeout = value;
        self
    }

    /// Set the default and maximum puzzle page sizes
    pub fn with_puzzle_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.max_puzzle_limit = max_limit.max(1);
        self.default_puzzle_limit = default_limit.clamp(1, self.max_puzzle_limit);
        self
    }

    /// Set the review interval bounds in days
    pub fn with_interval_bounds(mut self, min_days: i64, max_days: i64) -> Self {
        self.min_interval_days = min_days.max(1);
        self.max_interval_days = max_days.max(self.min_interval_days);
        self
    }

    /// Clamp a requested page size, falling back to the default
    pub fn puzzle_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_puzzle_limit)
            .clamp(1, self.max_puzzle_limit)
    }

    /// Where OAuth providers send the user back to
    pub fn oauth_redirect(&self) -> String {
        format!("{}/profile", self.site_url)
    }
}

fn first_var(names: &[&str]) -> Result<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|value| !value.is_empty()))
        .ok_or_else(|| {
            TrainerError::Config(format!("{} environment variable not found", names[0]))
        })
}
