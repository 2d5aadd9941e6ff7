//! Puzzle solving state machine
//!
//! A [`PuzzleSession`] holds one puzzle's position and validates dropped
//! pieces through [`rules`](crate::rules). The first legal move is compared
//! with the puzzle's stored solution: a match solves the puzzle, anything
//! else is a failed attempt that can be retried (the board keeps the move)
//! or reset.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{NewAttempt, Puzzle};
use crate::rules::{Position, Side};
use crate::services::PuzzleService;

pub const PROMPT_MESSAGE: &str = "Your turn to move. Find the best move!";
pub const SOLVED_MESSAGE: &str = "Correct! Well done!";
pub const FAILED_MESSAGE: &str = "Incorrect. Try again!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleState {
    Loading,
    Ready,
    Solved,
    FailedAttempt,
}

/// What became of a dropped piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Illegal move, or the puzzle is not accepting moves; nothing changed
    Rejected,
    Solved,
    Incorrect,
}

impl DropOutcome {
    pub fn is_verdict(&self) -> bool {
        !matches!(self, DropOutcome::Rejected)
    }
}

#[derive(Debug)]
pub struct PuzzleSession {
    state: PuzzleState,
    puzzle: Option<Puzzle>,
    initial: Option<Position>,
    position: Option<Position>,
    history: Vec<String>,
    message: Option<String>,
    /// Tries concluded since the puzzle was loaded; `reset` keeps counting
    attempts: u32,
    /// A verdict that has not been handed out by `take_attempt` yet
    unrecorded: bool,
    started_at: Instant,
}

impl Default for PuzzleSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PuzzleSession {
    pub fn new() -> Self {
        Self {
            state: PuzzleState::Loading,
            puzzle: None,
            initial: None,
            position: None,
            history: Vec::new(),
            message: None,
            attempts: 0,
            unrecorded: false,
            started_at: Instant::now(),
        }
    }

    /// Start on `puzzle`. Fails without changing anything when its FEN does
    /// not describe a position.
    pub fn load(&mut self, puzzle: Puzzle) -> Result<()> {
        let position = Position::from_fen(&puzzle.fen)?;
        debug!("puzzle {} loaded, {} to move", puzzle.id, position.side_to_move().as_str());

        self.initial = Some(position.clone());
        self.position = Some(position);
        self.puzzle = Some(puzzle);
        self.attempts = 0;
        self.unrecorded = false;
        self.started_at = Instant::now();
        self.enter_ready();
        Ok(())
    }

    /// Drop the piece on `from` onto `to`
    pub fn on_drop(&mut self, from: &str, to: &str) -> DropOutcome {
        if !matches!(self.state, PuzzleState::Ready | PuzzleState::FailedAttempt) {
            return DropOutcome::Rejected;
        }
        let (Some(puzzle), Some(position)) = (&self.puzzle, &self.position) else {
            return DropOutcome::Rejected;
        };
        let Some(played) = position.try_move(from, to) else {
            debug!("rejected illegal move {}{}", from, to);
            return DropOutcome::Rejected;
        };

        let solved = played.notation == puzzle.moves;
        // A try ends with the first verdict after the puzzle was (re)set.
        if self.state == PuzzleState::Ready {
            self.attempts += 1;
            self.unrecorded = true;
        } else if solved {
            self.unrecorded = true;
        }
        self.history.push(played.notation);
        self.position = Some(played.position);

        if solved {
            info!("puzzle {} solved in {} move(s)", puzzle.id, self.history.len());
            self.state = PuzzleState::Solved;
            self.message = Some(SOLVED_MESSAGE.to_string());
            DropOutcome::Solved
        } else {
            self.state = PuzzleState::FailedAttempt;
            self.message = Some(FAILED_MESSAGE.to_string());
            DropOutcome::Incorrect
        }
    }

    /// Back to the puzzle's starting position with an empty history
    pub fn reset(&mut self) {
        if self.initial.is_none() {
            return;
        }
        self.position = self.initial.clone();
        self.enter_ready();
    }

    pub fn state(&self) -> PuzzleState {
        self.state
    }

    pub fn puzzle(&self) -> Option<&Puzzle> {
        self.puzzle.as_ref()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The board is shown from the side to move
    pub fn orientation(&self) -> Side {
        self.position
            .as_ref()
            .map_or(Side::White, Position::side_to_move)
    }

    /// Id of the following puzzle, for numeric ids
    pub fn next_puzzle_id(&self) -> Option<String> {
        let id: u64 = self.puzzle.as_ref()?.id.parse().ok()?;
        Some((id + 1).to_string())
    }

    /// The attempt as it stands: every try since loading, timed from the load
    pub fn attempt(&self) -> Option<NewAttempt> {
        let solved = match self.state {
            PuzzleState::Solved => true,
            PuzzleState::FailedAttempt => false,
            _ => return None,
        };
        let puzzle = self.puzzle.as_ref()?;

        Some(NewAttempt {
            puzzle_id: puzzle.id.clone(),
            solved,
            time_taken: Some(self.started_at.elapsed().as_secs() as i64),
            attempts: Some(i64::from(self.attempts.max(1))),
        })
    }

    /// The attempt to store, once per try. Further wrong drops after a
    /// failed move return `None`.
    pub fn take_attempt(&mut self) -> Option<NewAttempt> {
        if !self.unrecorded {
            return None;
        }
        self.unrecorded = false;
        self.attempt()
    }

    fn enter_ready(&mut self) {
        self.state = PuzzleState::Ready;
        self.history.clear();
        self.message = Some(PROMPT_MESSAGE.to_string());
    }
}

/// Built-in puzzle used when the backend has no row for `id`
pub fn stub_puzzle(id: &str) -> Puzzle {
    let (fen, moves) = if id == "2" {
        (
            "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
            "d2d3",
        )
    } else {
        (
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
            "d2d4",
        )
    };

    Puzzle {
        id: id.to_string(),
        fen: fen.to_string(),
        moves: moves.to_string(),
        difficulty: 1,
        theme: "opening".to_string(),
        description: Some("Develop with a central pawn move".to_string()),
        source: Some("built-in".to_string()),
        popularity: 0.0,
        success_rate: 0.0,
        created_at: None,
        updated_at: None,
    }
}

/// Where the puzzle view gets its records from
#[async_trait]
pub trait PuzzleSource: Send + Sync {
    async fn fetch_puzzle(&self, id: &str) -> Option<Puzzle>;
}

#[async_trait]
impl PuzzleSource for PuzzleService {
    async fn fetch_puzzle(&self, id: &str) -> Option<Puzzle> {
        self.get_puzzle_by_id(id).await
    }
}

/// Backend record for `id`, or the built-in stub when there is none
pub async fn load_puzzle(source: &dyn PuzzleSource, id: &str) -> Puzzle {
    match source.fetch_puzzle(id).await {
        Some(puzzle) => puzzle,
        None => {
            info!("using built-in puzzle for id {}", id);
            stub_puzzle(id)
        }
    }
}
