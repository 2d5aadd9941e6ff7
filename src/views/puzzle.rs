use super::{BannerKind, Element, Page};
use crate::puzzle::{PuzzleSession, PuzzleState};

pub(super) fn page(session: &PuzzleSession, error: Option<&str>) -> Page {
    let mut page = Page::new("Puzzle");
    if let Some(error) = error {
        page.push(Element::banner(BannerKind::Error, error));
        return page;
    }

    let (Some(puzzle), Some(position)) = (session.puzzle(), session.position()) else {
        page.push(Element::Spinner);
        return page;
    };

    page.push(Element::heading(format!("Chess Puzzle #{}", puzzle.id)));
    let difficulty = if puzzle.difficulty == 0 {
        "Unknown".to_string()
    } else {
        puzzle.difficulty.to_string()
    };
    let mut tags = format!("Difficulty: {}", difficulty);
    if !puzzle.theme.is_empty() {
        tags.push_str(&format!("  Theme: {}", puzzle.theme));
    }
    page.push(Element::text(tags));
    if let Some(description) = &puzzle.description {
        page.push(Element::text(description.clone()));
    }

    if let Some(message) = session.message() {
        let kind = match session.state() {
            PuzzleState::Solved => BannerKind::Success,
            PuzzleState::FailedAttempt => BannerKind::Error,
            _ => BannerKind::Info,
        };
        page.push(Element::banner(kind, message));
    }

    let orientation = session.orientation();
    page.push(Element::text(format!(
        "Board shown from {}",
        orientation.as_str()
    )))
        .push(Element::Board(position.diagram(orientation)))
        .push(Element::heading("Puzzle Information"))
        .push(Element::text(format!("Position (FEN): {}", puzzle.fen)));

    let moves = if session.history().is_empty() {
        "No moves yet".to_string()
    } else {
        session.history().join(" ")
    };
    page.push(Element::text(format!("Your moves: {}", moves)))
        .push(Element::field("from", "From square"))
        .push(Element::field("to", "To square"))
        .push(Element::button("Move", "move <from> <to>"))
        .push(Element::button("Reset Puzzle", "reset"));

    if let Some(next) = session.next_puzzle_id() {
        page.push(Element::button("Next Puzzle", "next"))
            .push(Element::link("Next Puzzle", &format!("/puzzle/{}", next)));
    }
    page
}
