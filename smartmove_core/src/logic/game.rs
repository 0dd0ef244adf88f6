use crate::engine::Move;
use crate::logic::board::{Board, BoardCoordinate, Color, PieceKind, Square};
use crate::logic::generator::MoveGenerator;
use crate::logic::rules::{is_in_check, MoveError, RulesEngine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Checkmate(Color), // Winner
    Stalemate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white_king_side: bool,
    pub white_queen_side: bool,
    pub black_king_side: bool,
    pub black_queen_side: bool,
}

impl CastlingRights {
    pub const ALL: Self = Self {
        white_king_side: true,
        white_queen_side: true,
        black_king_side: true,
        black_queen_side: true,
    };

    #[must_use]
    pub const fn king_side(self, color: Color) -> bool {
        match color {
            Color::White => self.white_king_side,
            Color::Black => self.black_king_side,
        }
    }

    #[must_use]
    pub const fn queen_side(self, color: Color) -> bool {
        match color {
            Color::White => self.white_queen_side,
            Color::Black => self.black_queen_side,
        }
    }

    fn revoke(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_king_side = false;
                self.white_queen_side = false;
            }
            Color::Black => {
                self.black_king_side = false;
                self.black_queen_side = false;
            }
        }
    }

    /// Drops the right tied to a rook corner once anything leaves or lands on it.
    fn touch(&mut self, at: BoardCoordinate) {
        match (at.row, at.col) {
            (7, 7) => self.white_king_side = false,
            (7, 0) => self.white_queen_side = false,
            (0, 7) => self.black_king_side = false,
            (0, 0) => self.black_queen_side = false,
            _ => {}
        }
    }

    fn to_fen(self) -> String {
        let mut s = String::new();
        for (flag, c) in [
            (self.white_king_side, 'K'),
            (self.white_queen_side, 'Q'),
            (self.black_king_side, 'k'),
            (self.black_queen_side, 'q'),
        ] {
            if flag {
                s.push(c);
            }
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

/// Everything `undo_move` needs to restore the previous position exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub mv: Move,
    pub castling: CastlingRights,
    pub en_passant: Option<BoardCoordinate>,
    pub status: GameStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected at least 2 fields, found {0}")]
    MissingFields(usize),
    #[error("expected 8 ranks, found {0}")]
    RankCount(usize),
    #[error("rank {0} does not describe exactly 8 squares")]
    RankWidth(usize),
    #[error("invalid piece character '{0}'")]
    InvalidPiece(char),
    #[error("invalid side to move '{0}'")]
    InvalidSide(String),
    #[error("invalid castling field '{0}'")]
    InvalidCastling(String),
    #[error("invalid en passant square '{0}'")]
    InvalidEnPassant(String),
    #[error("{0:?} has no king")]
    MissingKing(Color),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub turn: Color,
    pub status: GameStatus,
    pub castling: CastlingRights,
    pub en_passant: Option<BoardCoordinate>,
    pub history: Vec<MoveRecord>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Color::White,
            status: GameStatus::Playing,
            castling: CastlingRights::ALL,
            en_passant: None,
            history: Vec::new(),
        }
    }

    /// Parses placement, side, castling and en passant fields; move counters are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`FenError`] naming the first malformed field, or a side without a king.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let [placement, side, rest @ ..] = fields.as_slice() else {
            return Err(FenError::MissingFields(fields.len()));
        };

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount(ranks.len()));
        }
        let mut board = Board::empty();
        for (row, rank) in (0u8..).zip(&ranks) {
            let mut col = 0u8;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    col = col.saturating_add(u8::try_from(skip).unwrap_or(u8::MAX));
                    continue;
                }
                let kind = PieceKind::from_fen_char(c).ok_or(FenError::InvalidPiece(c))?;
                let color = if c.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                let at = BoardCoordinate::new(row, col).ok_or(FenError::RankWidth(usize::from(row)))?;
                board.add_piece(at, kind, color);
                col += 1;
            }
            if col != 8 {
                return Err(FenError::RankWidth(usize::from(row)));
            }
        }
        for color in [Color::White, Color::Black] {
            if board.find_king(color).is_none() {
                return Err(FenError::MissingKing(color));
            }
        }

        let turn = match *side {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidSide(other.to_string())),
        };

        let castling_field = rest.first().copied().unwrap_or("-");
        let mut castling = CastlingRights::default();
        if castling_field != "-" {
            for c in castling_field.chars() {
                match c {
                    'K' => castling.white_king_side = true,
                    'Q' => castling.white_queen_side = true,
                    'k' => castling.black_king_side = true,
                    'q' => castling.black_queen_side = true,
                    _ => return Err(FenError::InvalidCastling(castling_field.to_string())),
                }
            }
        }

        let en_passant = match rest.get(1).copied().unwrap_or("-") {
            "-" => None,
            sq => Some(
                BoardCoordinate::parse(sq)
                    .ok_or_else(|| FenError::InvalidEnPassant(sq.to_string()))?,
            ),
        };

        let mut state = Self {
            board,
            turn,
            status: GameStatus::Playing,
            castling,
            en_passant,
            history: Vec::new(),
        };
        state.update_status();
        Ok(state)
    }

    #[must_use]
    pub fn to_fen(&self) -> String {
        let side = match self.turn {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let ep = self
            .en_passant
            .map_or_else(|| "-".to_string(), |sq| sq.to_string());
        format!(
            "{} {side} {} {ep}",
            self.board.to_fen_placement(),
            self.castling.to_fen()
        )
    }

    /// Recomputes the terminal status from the legal moves available.
    pub fn update_status(&mut self) -> Vec<Move> {
        let moves = self.generate_legal_moves(usize::MAX);
        self.set_status(!moves.is_empty());
        moves
    }

    /// Same status as `update_status`, but stops at the first legal move.
    fn refresh_status(&mut self) {
        let has_move = !self.generate_legal_moves(1).is_empty();
        self.set_status(has_move);
    }

    fn set_status(&mut self, has_move: bool) {
        self.status = if has_move {
            GameStatus::Playing
        } else if is_in_check(&self.board, self.turn) {
            GameStatus::Checkmate(self.turn.opposite())
        } else {
            GameStatus::Stalemate
        };
    }

    fn generate_legal_moves(&mut self, limit: usize) -> Vec<Move> {
        let generator = MoveGenerator::new();
        let candidates =
            generator.generate_moves(&self.board, self.turn, self.castling, self.en_passant);
        let mover = self.turn;
        let mut legal = Vec::with_capacity(candidates.len().min(limit));
        for mv in candidates {
            if legal.len() >= limit {
                break;
            }
            if self.push_move(mv).is_err() {
                continue;
            }
            if !is_in_check(&self.board, mover) {
                legal.push(mv);
            }
            self.unmake_move();
        }
        legal
    }

    /// Plays `mv` and recomputes whether the side now to move is mated or stalemated.
    ///
    /// # Errors
    ///
    /// Fails without touching the position when `mv` is not for the side to move or its
    /// piece is not on the start square.
    pub fn make_move(&mut self, mv: Move) -> Result<(), MoveError> {
        self.push_move(mv)?;
        self.refresh_status();
        Ok(())
    }

    /// Board update and undo record only; `status` keeps its previous value.
    fn push_move(&mut self, mv: Move) -> Result<(), MoveError> {
        if mv.piece.color != self.turn {
            return Err(MoveError::NotYourTurn(mv.piece.color));
        }
        if self.board.get(mv.from) != Square::from(mv.piece) {
            return Err(MoveError::PieceMismatch {
                from: mv.from,
                expected: mv.piece,
            });
        }

        self.history.push(MoveRecord {
            mv,
            castling: self.castling,
            en_passant: self.en_passant,
            status: self.status,
        });

        let color = mv.piece.color;
        self.board.set(mv.from, Square::Empty);
        if mv.is_en_passant {
            self.board.set(
                BoardCoordinate {
                    row: mv.from.row,
                    col: mv.to.col,
                },
                Square::Empty,
            );
        }
        let placed = mv.promotion.unwrap_or(mv.piece.kind);
        self.board.set(mv.to, Square::Occupied(color, placed));

        if mv.is_castle {
            let (rook_from, rook_to) = Self::castle_rook_squares(mv);
            self.board.set(rook_from, Square::Empty);
            self.board.add_piece(rook_to, PieceKind::Rook, color);
        }

        if mv.piece.kind == PieceKind::King {
            self.castling.revoke(color);
        }
        self.castling.touch(mv.from);
        self.castling.touch(mv.to);

        self.en_passant = if mv.piece.kind == PieceKind::Pawn && mv.from.row.abs_diff(mv.to.row) == 2 {
            BoardCoordinate::new((mv.from.row + mv.to.row) / 2, mv.from.col)
        } else {
            None
        };

        self.turn = self.turn.opposite();
        Ok(())
    }

    pub fn unmake_move(&mut self) -> Option<Move> {
        let record = self.history.pop()?;
        let mv = record.mv;
        let color = mv.piece.color;

        self.board.set(mv.from, Square::from(mv.piece));
        if mv.is_en_passant {
            self.board.set(mv.to, Square::Empty);
            if let Some(captured) = mv.captured {
                self.board.set(
                    BoardCoordinate {
                        row: mv.from.row,
                        col: mv.to.col,
                    },
                    Square::from(captured),
                );
            }
        } else {
            self.board
                .set(mv.to, mv.captured.map_or(Square::Empty, Square::from));
        }

        if mv.is_castle {
            let (rook_from, rook_to) = Self::castle_rook_squares(mv);
            self.board.set(rook_to, Square::Empty);
            self.board.add_piece(rook_from, PieceKind::Rook, color);
        }

        self.castling = record.castling;
        self.en_passant = record.en_passant;
        self.status = record.status;
        self.turn = color;
        Some(mv)
    }

    const fn castle_rook_squares(mv: Move) -> (BoardCoordinate, BoardCoordinate) {
        let row = mv.from.row;
        if mv.to.col == 6 {
            (BoardCoordinate { row, col: 7 }, BoardCoordinate { row, col: 5 })
        } else {
            (BoardCoordinate { row, col: 0 }, BoardCoordinate { row, col: 3 })
        }
    }

    /// Looks up the legal move matching a coordinate string such as `e2e4`.
    pub fn find_move(&mut self, notation: &str) -> Option<Move> {
        self.legal_moves()
            .into_iter()
            .find(|mv| mv.to_string() == notation)
    }
}

impl RulesEngine for GameState {
    fn board(&self) -> &Board {
        &self.board
    }

    fn side_to_move(&self) -> Color {
        self.turn
    }

    fn is_checkmate(&self) -> bool {
        matches!(self.status, GameStatus::Checkmate(_))
    }

    fn is_stalemate(&self) -> bool {
        self.status == GameStatus::Stalemate
    }

    fn legal_moves(&mut self) -> Vec<Move> {
        self.update_status()
    }

    fn apply_move(&mut self, mv: Move) -> Result<(), MoveError> {
        self.make_move(mv)
    }

    fn undo_move(&mut self) -> Option<Move> {
        self.unmake_move()
    }

    fn in_check(&self) -> bool {
        is_in_check(&self.board, self.turn)
    }

    fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(game: &mut GameState, moves: &[&str]) {
        for notation in moves {
            let mv = game
                .find_move(notation)
                .unwrap_or_else(|| panic!("{notation} is not legal in {}", game.to_fen()));
            game.apply_move(mv).unwrap();
        }
    }

    #[test]
    fn test_start_position() {
        let mut game = GameState::new();
        assert_eq!(
            game.to_fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
        );
        assert_eq!(game.legal_moves().len(), 20);
        assert_eq!(game.status, GameStatus::Playing);
    }

    #[test]
    fn test_fen_roundtrip_and_errors() {
        let fen = "r3k2r/8/8/3pP3/8/8/8/R3K2R w Kq d6";
        assert_eq!(GameState::from_fen(fen).unwrap().to_fen(), fen);
        assert_eq!(
            GameState::from_fen("8/8/8 w").unwrap_err(),
            FenError::RankCount(3)
        );
        assert_eq!(
            GameState::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w").unwrap_err(),
            FenError::InvalidPiece('X')
        );
        assert_eq!(
            GameState::from_fen("8/8/8/8/8/8/8/K7 w").unwrap_err(),
            FenError::MissingKing(Color::Black)
        );
        assert!(matches!(
            GameState::from_fen("k7/8/8/8/8/8/8/K7 x"),
            Err(FenError::InvalidSide(_))
        ));
    }

    #[test]
    fn test_undo_restores_position() {
        let mut game = GameState::new();
        let initial = game.to_fen();
        play(&mut game, &["e2e4", "d7d5", "e4d5", "d8d5"]);
        assert_eq!(game.history_len(), 4);
        while game.undo_move().is_some() {}
        assert_eq!(game.to_fen(), initial);
        assert_eq!(game.turn, Color::White);
    }

    #[test]
    fn test_en_passant_make_and_undo() {
        let mut game = GameState::new();
        play(&mut game, &["e2e4", "a7a6", "e4e5", "d7d5"]);
        assert_eq!(game.en_passant, BoardCoordinate::parse("d6"));
        let before = game.to_fen();

        let ep = game.find_move("e5d6").unwrap();
        assert!(ep.is_en_passant);
        game.apply_move(ep).unwrap();
        assert!(game.board.get(BoardCoordinate::parse("d5").unwrap()).is_empty());

        game.undo_move();
        assert_eq!(game.to_fen(), before);
    }

    #[test]
    fn test_castling_moves_rook_and_revokes_rights() {
        let mut game = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq -").unwrap();
        let castle = game.find_move("e1g1").unwrap();
        assert!(castle.is_castle);
        game.apply_move(castle).unwrap();
        assert_eq!(game.to_fen(), "r3k2r/8/8/8/8/8/8/R4RK1 b kq -");
        assert!(game.find_move("e8c8").unwrap().is_castle);
        game.undo_move();
        assert_eq!(game.to_fen(), "r3k2r/8/8/8/8/8/8/R3K2R w KQkq -");
    }

    #[test]
    fn test_cannot_castle_through_check() {
        // The black rook on f8 covers f1.
        let mut game = GameState::from_fen("4kr2/8/8/8/8/8/8/R3K2R w KQ -").unwrap();
        assert!(game.find_move("e1g1").is_none());
        assert!(game.find_move("e1c1").is_some());
    }

    #[test]
    fn test_promotion_to_queen() {
        let mut game = GameState::from_fen("k7/4P3/8/8/8/8/8/K7 w - -").unwrap();
        let promo = game.find_move("e7e8q").unwrap();
        game.apply_move(promo).unwrap();
        assert_eq!(
            game.board.get(BoardCoordinate::parse("e8").unwrap()),
            Square::Occupied(Color::White, PieceKind::Queen)
        );
        game.undo_move();
        assert_eq!(
            game.board.get(BoardCoordinate::parse("e7").unwrap()),
            Square::Occupied(Color::White, PieceKind::Pawn)
        );
    }

    #[test]
    fn test_checkmate_and_stalemate_status() {
        let mut game = GameState::new();
        play(&mut game, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert!(game.legal_moves().is_empty());
        assert_eq!(game.status, GameStatus::Checkmate(Color::Black));
        assert!(game.is_checkmate());

        game.undo_move();
        assert_eq!(game.status, GameStatus::Playing);

        let stalemate = GameState::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - -").unwrap();
        assert!(stalemate.is_stalemate());
        assert!(!stalemate.in_check());
    }

    #[test]
    fn test_status_follows_apply_and_undo() {
        let mut game = GameState::new();
        play(&mut game, &["f2f3", "e7e5", "g2g4"]);

        // No legal_moves call between the mating move and the queries.
        let mate = game.find_move("d8h4").unwrap();
        game.apply_move(mate).unwrap();
        assert!(game.is_checkmate());
        assert_eq!(game.status, GameStatus::Checkmate(Color::Black));

        game.undo_move();
        assert!(!game.is_checkmate());

        let mut cornered = GameState::from_fen("7k/8/4Q3/6K1/8/8/8/8 w - -").unwrap();
        let stalemating = cornered.find_move("e6f7").unwrap();
        cornered.apply_move(stalemating).unwrap();
        assert!(cornered.is_stalemate());
        cornered.undo_move();
        assert_eq!(cornered.status, GameStatus::Playing);
    }

    #[test]
    fn test_rejects_mismatched_move() {
        let mut game = GameState::new();
        let mut mv = game.find_move("e2e4").unwrap();
        mv.from = BoardCoordinate::parse("e3").unwrap();
        assert!(matches!(
            game.apply_move(mv),
            Err(MoveError::PieceMismatch { .. })
        ));
        assert_eq!(game.history_len(), 0);
    }
}
