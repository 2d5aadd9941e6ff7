//! Chess puzzle trainer on Supabase
//!
//! Signs players in through Supabase auth, serves puzzles from the `puzzles`
//! table, checks moves against the stored solution and schedules reviews with
//! SM-2 spaced repetition in `user_progress`.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod puzzle;
pub mod rules;
pub mod services;
pub mod session;
pub mod session_store;
pub mod spaced_rep;
pub mod views;

pub use client::Backend;
pub use config::AppConfig;
pub use error::{Result, TrainerError};

/// Re-exports of the pieces most callers need
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use chess_trainer::prelude::*;
///
/// # async fn run() -> chess_trainer::Result<()> {
/// let backend = Arc::new(Backend::new(AppConfig::from_env()?)?);
/// let context = SessionContext::start(backend).await;
/// let mut app = App::new(context);
/// app.navigate("/puzzle").await;
/// println!("{}", app.render().await);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::client::Backend;
    pub use crate::config::AppConfig;
    pub use crate::error::{Result, TrainerError};
    pub use crate::models::{Profile, ProfileUpdate, ProgressStats, Puzzle, UserProgress};
    pub use crate::puzzle::{DropOutcome, PuzzleSession, PuzzleState};
    pub use crate::services::{ProfileService, ProgressService, PuzzleService};
    pub use crate::session::{SessionContext, SessionSnapshot};
    pub use crate::views::{Action, App, Route};
}
