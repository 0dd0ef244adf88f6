use crate::engine::Move;
use crate::logic::board::{Board, BoardCoordinate, Color, Piece, PieceKind, Square};
use thiserror::Error;

pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

pub const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

pub const ROOK_DIRECTIONS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
pub const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("no {expected:?} on {from}")]
    PieceMismatch {
        from: BoardCoordinate,
        expected: Piece,
    },
    #[error("it is not {0:?}'s turn")]
    NotYourTurn(Color),
}

/// The boundary the search consumes. Implementors own the position and its
/// undo history; every `apply_move` is expected to be paired with one `undo_move`.
pub trait RulesEngine {
    fn board(&self) -> &Board;
    fn side_to_move(&self) -> Color;
    /// Terminal flags describe the current position, including right after `apply_move`.
    fn is_checkmate(&self) -> bool;
    fn is_stalemate(&self) -> bool;
    /// Legal moves for the side to move.
    fn legal_moves(&mut self) -> Vec<Move>;
    fn apply_move(&mut self, mv: Move) -> Result<(), MoveError>;
    fn undo_move(&mut self) -> Option<Move>;
    fn in_check(&self) -> bool;
    /// Number of outstanding undo records.
    fn history_len(&self) -> usize;
}

/// Squares attacked by one side, as a 64-bit set indexed by `BoardCoordinate::index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttackSet(u64);

impl AttackSet {
    pub fn insert(&mut self, at: BoardCoordinate) {
        self.0 |= 1u64 << at.index();
    }

    #[must_use]
    pub const fn contains(self, at: BoardCoordinate) -> bool {
        self.0 & (1u64 << at.index()) != 0
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Every square `by` attacks, whoever stands on it. Own pieces count as
/// attacked so that defended pieces can be told apart from hanging ones.
#[must_use]
pub fn attacked_squares(board: &Board, by: Color) -> AttackSet {
    let mut set = AttackSet::default();
    for (from, piece) in board.pieces() {
        if piece.color != by {
            continue;
        }
        match piece.kind {
            PieceKind::Pawn => {
                for dc in [-1, 1] {
                    if let Some(to) = from.offset(by.forward(), dc) {
                        set.insert(to);
                    }
                }
            }
            PieceKind::Knight => add_steps(from, &KNIGHT_OFFSETS, &mut set),
            PieceKind::King => add_steps(from, &KING_OFFSETS, &mut set),
            PieceKind::Bishop => add_rays(board, from, &BISHOP_DIRECTIONS, &mut set),
            PieceKind::Rook => add_rays(board, from, &ROOK_DIRECTIONS, &mut set),
            PieceKind::Queen => {
                add_rays(board, from, &BISHOP_DIRECTIONS, &mut set);
                add_rays(board, from, &ROOK_DIRECTIONS, &mut set);
            }
        }
    }
    set
}

fn add_steps(from: BoardCoordinate, offsets: &[(i8, i8)], set: &mut AttackSet) {
    for &(dr, dc) in offsets {
        if let Some(to) = from.offset(dr, dc) {
            set.insert(to);
        }
    }
}

fn add_rays(board: &Board, from: BoardCoordinate, dirs: &[(i8, i8)], set: &mut AttackSet) {
    for &(dr, dc) in dirs {
        let mut cur = from;
        while let Some(to) = cur.offset(dr, dc) {
            set.insert(to);
            if !board.get(to).is_empty() {
                break;
            }
            cur = to;
        }
    }
}

/// Whether `by` attacks `target`, scanning outward from the target.
#[must_use]
pub fn is_square_attacked(board: &Board, target: BoardCoordinate, by: Color) -> bool {
    // A pawn of `by` attacks `target` from one row behind it.
    for dc in [-1, 1] {
        if let Some(from) = target.offset(-by.forward(), dc) {
            if board.get(from).is(by, PieceKind::Pawn) {
                return true;
            }
        }
    }

    let hits_step = |offsets: &[(i8, i8)], kind: PieceKind| {
        offsets.iter().any(|&(dr, dc)| {
            target
                .offset(dr, dc)
                .is_some_and(|from| board.get(from).is(by, kind))
        })
    };
    if hits_step(&KNIGHT_OFFSETS, PieceKind::Knight) || hits_step(&KING_OFFSETS, PieceKind::King) {
        return true;
    }

    let hits_ray = |dirs: &[(i8, i8)], slider: PieceKind| {
        dirs.iter().any(|&(dr, dc)| {
            let mut cur = target;
            while let Some(next) = cur.offset(dr, dc) {
                match board.get(next) {
                    Square::Empty => cur = next,
                    Square::Occupied(color, kind) => {
                        return color == by && (kind == slider || kind == PieceKind::Queen);
                    }
                }
            }
            false
        })
    };
    hits_ray(&ROOK_DIRECTIONS, PieceKind::Rook) || hits_ray(&BISHOP_DIRECTIONS, PieceKind::Bishop)
}

/// Checks if `color`'s king is attacked. A board without that king is never in check.
#[must_use]
pub fn is_in_check(board: &Board, color: Color) -> bool {
    board
        .find_king(color)
        .is_some_and(|king| is_square_attacked(board, king, color.opposite()))
}
