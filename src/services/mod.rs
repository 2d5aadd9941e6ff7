//! Data-access services
//!
//! Each operation is one backend query. Failures are logged and come back as
//! `None` or an empty list so callers can render whatever they got.

mod profile;
mod progress;
mod puzzle;

pub use profile::ProfileService;
pub use progress::ProgressService;
pub use puzzle::PuzzleService;

pub(crate) const PROFILES_TABLE: &str = "profiles";
pub(crate) const PUZZLES_TABLE: &str = "puzzles";
pub(crate) const PROGRESS_TABLE: &str = "user_progress";
