//! Diagnostic pages for checking the backend wiring

use tracing::info;

use super::{BannerKind, Element, Page};
use crate::config::AppConfig;
use crate::models::Puzzle;
use crate::services::PuzzleService;
use crate::session::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) enum TableAccess {
    #[default]
    Unchecked,
    Accessible,
    Inaccessible,
    TimedOut,
}

impl TableAccess {
    fn label(&self) -> &'static str {
        match self {
            TableAccess::Unchecked => "Checking...",
            TableAccess::Accessible => "Successful",
            TableAccess::Inaccessible => "Failed",
            TableAccess::TimedOut => "Timed out",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct PuzzleTestState {
    pub access: TableAccess,
    /// 0 lists every difficulty
    pub difficulty: u8,
    pub puzzles: Vec<Puzzle>,
    pub error: Option<String>,
}

impl PuzzleTestState {
    /// Check table access, then list puzzles for the current filter
    pub async fn run(&mut self, service: &PuzzleService) {
        self.error = None;
        self.puzzles.clear();

        self.access = match service.check_table_access_with_timeout().await {
            Some(true) => TableAccess::Accessible,
            Some(false) => TableAccess::Inaccessible,
            None => TableAccess::TimedOut,
        };
        if self.access != TableAccess::Accessible {
            self.error = Some(
                "The puzzles table is not accessible. Check that it exists, its \
                 row-level security policies and the database connection."
                    .to_string(),
            );
            return;
        }

        self.puzzles = if self.difficulty > 0 {
            service
                .get_puzzles_by_difficulty(self.difficulty, None, 0)
                .await
        } else {
            service.get_puzzles(None, 0).await
        };
        info!("puzzle test listed {} puzzle(s)", self.puzzles.len());

        if self.puzzles.is_empty() {
            self.error = Some(if self.difficulty > 0 {
                format!("No puzzles found with difficulty {}.", self.difficulty)
            } else {
                "No puzzles found. Have you added sample data to your database?".to_string()
            });
        }
    }
}

pub(super) fn puzzle_test_page(state: &PuzzleTestState, config: &AppConfig) -> Page {
    let mut page = Page::new("Puzzle Test");
    page.push(Element::heading("Puzzle Service Test"));
    if let Some(error) = &state.error {
        page.push(Element::banner(BannerKind::Error, error.clone()));
    }

    let filter = if state.difficulty == 0 {
        "All".to_string()
    } else {
        state.difficulty.to_string()
    };
    page.push(Element::text(format!(
        "Table Access Check: {}",
        state.access.label()
    )))
    .push(Element::text(format!("Puzzles Count: {}", state.puzzles.len())))
    .push(Element::text(format!("Current Difficulty Filter: {}", filter)))
    .push(Element::text(format!("Supabase URL: {}", config.url)))
    .push(Element::text(format!(
        "Supabase Anon Key Set: {}",
        if config.anon_key.is_empty() { "No" } else { "Yes" }
    )))
    .push(Element::field("difficulty", "Difficulty (0 = all)"))
    .push(Element::button("Filter", "filter <difficulty>"))
    .push(Element::button("Retry", "check"));

    if !state.puzzles.is_empty() {
        page.push(Element::Table {
            headers: vec![
                "ID".to_string(),
                "Difficulty".to_string(),
                "Theme".to_string(),
                "Solution".to_string(),
            ],
            rows: state
                .puzzles
                .iter()
                .map(|puzzle| {
                    vec![
                        puzzle.id.clone(),
                        puzzle.difficulty.to_string(),
                        puzzle.theme.clone(),
                        puzzle.moves.clone(),
                    ]
                })
                .collect(),
        });
    }
    page
}

pub(super) fn profile_test_page(snapshot: &SessionSnapshot, notice: Option<&str>) -> Page {
    let mut page = Page::new("Profile Test");
    page.push(Element::heading("Profile Service Test"));
    if let Some(notice) = notice {
        page.push(Element::banner(BannerKind::Info, notice));
    }

    match (&snapshot.user, &snapshot.profile) {
        (None, _) => {
            page.push(Element::text("Not signed in."));
        }
        (Some(user), None) => {
            page.push(Element::text(format!("User: {}", user.id)))
                .push(Element::text("No profile loaded."));
        }
        (Some(user), Some(profile)) => {
            page.push(Element::text(format!("User: {}", user.id)));
            match serde_json::to_string_pretty(profile) {
                Ok(json) => page.push(Element::text(json)),
                Err(_) => page.push(Element::text(format!("{:?}", profile))),
            };
        }
    }

    if snapshot.is_signed_in() {
        page.push(Element::button("Refresh Profile", "refresh"))
            .push(Element::button("Test Update Bio", "testbio"));
    }
    page
}
