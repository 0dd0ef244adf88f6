use crate::logic::board::{BoardCoordinate, Color, Piece, PieceKind};
use crate::logic::rules::RulesEngine;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod cache;
pub mod config;
pub mod eval;
pub mod ordering;
pub mod search;

/// Heuristic score in pawn units, positive when White is better.
pub type Score = f64;

/// Reserved for checkmate; every score is clamped to `[-CHECKMATE, CHECKMATE]`.
pub const CHECKMATE: Score = 1000.0;
pub const STALEMATE: Score = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: BoardCoordinate,
    pub to: BoardCoordinate,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub promotion: Option<PieceKind>,
    pub is_en_passant: bool,
    pub is_castle: bool,
}

impl Move {
    #[must_use]
    pub const fn quiet(from: BoardCoordinate, to: BoardCoordinate, piece: Piece) -> Self {
        Self {
            from,
            to,
            piece,
            captured: None,
            promotion: None,
            is_en_passant: false,
            is_castle: false,
        }
    }

    #[must_use]
    pub const fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    #[must_use]
    pub const fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }

    #[must_use]
    pub const fn color(&self) -> Color {
        self.piece.color
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.fen_char())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub depth: u8,
    pub nodes: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub time_ms: u64,
}

pub trait Evaluator {
    fn evaluate<R: RulesEngine + ?Sized>(&mut self, state: &mut R) -> Score;
}

pub trait Searcher {
    /// Picks a move for the side to move. `None` means there was nothing to
    /// choose from or the search was cancelled.
    fn find_best_move<R: RulesEngine + ?Sized>(
        &mut self,
        state: &mut R,
        legal_moves: &[Move],
    ) -> Option<(Move, SearchStats)>;
}
