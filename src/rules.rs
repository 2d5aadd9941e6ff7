//! Move validation on top of the `chess` crate

use chess::{Board, ChessMove, Color, File, Piece, Rank, Square};
use std::str::FromStr;

use crate::error::{Result, TrainerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

/// A legal move that was played, with the position it produced
#[derive(Debug, Clone)]
pub struct PlayedMove {
    /// Origin square followed by target square, e.g. `d2d4`
    pub notation: String,
    pub position: Position,
}

/// An immutable chess position
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    board: Board,
}

impl Position {
    pub fn from_fen(fen: &str) -> Result<Self> {
        let board = Board::from_str(fen.trim())
            .map_err(|_| TrainerError::InvalidPosition(fen.to_string()))?;
        Ok(Self { board })
    }

    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    pub fn side_to_move(&self) -> Side {
        self.board.side_to_move().into()
    }

    /// Play `from` to `to` if it is legal here. Pawns reaching the last rank
    /// become queens. Returns `None` for malformed squares or illegal moves.
    pub fn try_move(&self, from: &str, to: &str) -> Option<PlayedMove> {
        let from = parse_square(from)?;
        let to = parse_square(to)?;

        let promotion = if self.is_promotion(from, to) {
            Some(Piece::Queen)
        } else {
            None
        };
        let chess_move = ChessMove::new(from, to, promotion);
        if !self.board.legal(chess_move) {
            return None;
        }

        Some(PlayedMove {
            notation: format!("{}{}", from, to),
            position: Self {
                board: self.board.make_move_new(chess_move),
            },
        })
    }

    /// Board as eight text rows seen from `orientation`, rank labels on the
    /// left and file letters underneath
    pub fn diagram(&self, orientation: Side) -> Vec<String> {
        let ranks: Vec<usize> = match orientation {
            Side::White => (0..8).rev().collect(),
            Side::Black => (0..8).collect(),
        };
        let files: Vec<usize> = match orientation {
            Side::White => (0..8).collect(),
            Side::Black => (0..8).rev().collect(),
        };

        let mut rows = Vec::with_capacity(9);
        for &rank in &ranks {
            let mut row = format!("{} ", rank + 1);
            for &file in &files {
                let square = Square::make_square(Rank::from_index(rank), File::from_index(file));
                row.push(' ');
                row.push(self.piece_char(square).unwrap_or('.'));
            }
            rows.push(row);
        }

        let letters: String = files
            .iter()
            .map(|&file| format!(" {}", (b'a' + file as u8) as char))
            .collect();
        rows.push(format!("  {}", letters));
        rows
    }

    fn piece_char(&self, square: Square) -> Option<char> {
        let piece = self.board.piece_on(square)?;
        let symbol = match piece {
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        };
        match self.board.color_on(square) {
            Some(Color::White) => Some(symbol.to_ascii_uppercase()),
            _ => Some(symbol),
        }
    }

    fn is_promotion(&self, from: Square, to: Square) -> bool {
        if self.board.piece_on(from) != Some(Piece::Pawn) {
            return false;
        }
        let last_rank = match self.board.side_to_move() {
            Color::White => Rank::Eighth,
            Color::Black => Rank::First,
        };
        to.get_rank() == last_rank
    }
}

fn parse_square(text: &str) -> Option<Square> {
    Square::from_str(&text.trim().to_ascii_lowercase()).ok()
}
