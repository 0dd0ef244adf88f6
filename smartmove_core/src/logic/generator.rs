use crate::engine::Move;
use crate::logic::board::{Board, BoardCoordinate, Color, Piece, PieceKind, Square};
use crate::logic::game::CastlingRights;
use crate::logic::rules::{
    is_in_check, is_square_attacked, BISHOP_DIRECTIONS, KING_OFFSETS, KNIGHT_OFFSETS,
    ROOK_DIRECTIONS,
};

/// Pseudo-legal move generation. Moves may leave the mover's king in check;
/// `GameState::legal_moves` filters those out. Castling is fully checked here.
#[derive(Debug, Default, Clone, Copy)]
pub struct MoveGenerator;

impl MoveGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn generate_moves(
        &self,
        board: &Board,
        turn: Color,
        castling: CastlingRights,
        en_passant: Option<BoardCoordinate>,
    ) -> Vec<Move> {
        let mut moves = Vec::with_capacity(48);

        for (from, piece) in board.pieces() {
            if piece.color != turn {
                continue;
            }
            match piece.kind {
                PieceKind::Pawn => Self::gen_pawn_moves(board, from, piece, en_passant, &mut moves),
                PieceKind::Knight => Self::gen_step_moves(board, from, piece, &KNIGHT_OFFSETS, &mut moves),
                PieceKind::Bishop => {
                    Self::gen_slider_moves(board, from, piece, &BISHOP_DIRECTIONS, &mut moves);
                }
                PieceKind::Rook => {
                    Self::gen_slider_moves(board, from, piece, &ROOK_DIRECTIONS, &mut moves);
                }
                PieceKind::Queen => {
                    Self::gen_slider_moves(board, from, piece, &ROOK_DIRECTIONS, &mut moves);
                    Self::gen_slider_moves(board, from, piece, &BISHOP_DIRECTIONS, &mut moves);
                }
                PieceKind::King => {
                    Self::gen_step_moves(board, from, piece, &KING_OFFSETS, &mut moves);
                    Self::gen_castling_moves(board, from, piece, castling, &mut moves);
                }
            }
        }

        moves
    }

    fn push_target(board: &Board, from: BoardCoordinate, to: BoardCoordinate, piece: Piece, moves: &mut Vec<Move>) {
        match board.get(to) {
            Square::Empty => moves.push(Move::quiet(from, to, piece)),
            Square::Occupied(color, kind) if color != piece.color => moves.push(Move {
                captured: Some(Piece::new(color, kind)),
                ..Move::quiet(from, to, piece)
            }),
            Square::Occupied(..) => {}
        }
    }

    fn gen_step_moves(
        board: &Board,
        from: BoardCoordinate,
        piece: Piece,
        offsets: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        for &(dr, dc) in offsets {
            if let Some(to) = from.offset(dr, dc) {
                Self::push_target(board, from, to, piece, moves);
            }
        }
    }

    fn gen_slider_moves(
        board: &Board,
        from: BoardCoordinate,
        piece: Piece,
        dirs: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        for &(dr, dc) in dirs {
            let mut cur = from;
            while let Some(to) = cur.offset(dr, dc) {
                Self::push_target(board, from, to, piece, moves);
                if !board.get(to).is_empty() {
                    break;
                }
                cur = to;
            }
        }
    }

    fn gen_pawn_moves(
        board: &Board,
        from: BoardCoordinate,
        piece: Piece,
        en_passant: Option<BoardCoordinate>,
        moves: &mut Vec<Move>,
    ) {
        let color = piece.color;
        let forward = color.forward();
        // Promotions always queen.
        let promotion_row = color.opposite().home_row();
        let start_row = match color {
            Color::White => 6,
            Color::Black => 1,
        };
        let promote = |to: BoardCoordinate| (to.row == promotion_row).then_some(PieceKind::Queen);

        if let Some(one) = from.offset(forward, 0) {
            if board.get(one).is_empty() {
                moves.push(Move {
                    promotion: promote(one),
                    ..Move::quiet(from, one, piece)
                });
                if from.row == start_row {
                    if let Some(two) = one.offset(forward, 0) {
                        if board.get(two).is_empty() {
                            moves.push(Move::quiet(from, two, piece));
                        }
                    }
                }
            }
        }

        for dc in [-1, 1] {
            let Some(to) = from.offset(forward, dc) else {
                continue;
            };
            match board.get(to) {
                Square::Occupied(target_color, kind) if target_color != color => {
                    moves.push(Move {
                        captured: Some(Piece::new(target_color, kind)),
                        promotion: promote(to),
                        ..Move::quiet(from, to, piece)
                    });
                }
                Square::Empty if en_passant == Some(to) => {
                    moves.push(Move {
                        captured: Some(Piece::new(color.opposite(), PieceKind::Pawn)),
                        is_en_passant: true,
                        ..Move::quiet(from, to, piece)
                    });
                }
                _ => {}
            }
        }
    }

    fn gen_castling_moves(
        board: &Board,
        from: BoardCoordinate,
        piece: Piece,
        castling: CastlingRights,
        moves: &mut Vec<Move>,
    ) {
        let color = piece.color;
        let row = color.home_row();
        if from != (BoardCoordinate { row, col: 4 }) || is_in_check(board, color) {
            return;
        }
        let enemy = color.opposite();
        let square = |col: u8| BoardCoordinate { row, col };
        let rook_home = |col: u8| board.get(square(col)).is(color, PieceKind::Rook);
        let empty = |cols: &[u8]| cols.iter().all(|&c| board.get(square(c)).is_empty());
        let safe = |cols: &[u8]| cols.iter().all(|&c| !is_square_attacked(board, square(c), enemy));

        if castling.king_side(color) && rook_home(7) && empty(&[5, 6]) && safe(&[5, 6]) {
            moves.push(Move {
                is_castle: true,
                ..Move::quiet(from, square(6), piece)
            });
        }
        if castling.queen_side(color) && rook_home(0) && empty(&[1, 2, 3]) && safe(&[2, 3]) {
            moves.push(Move {
                is_castle: true,
                ..Move::quiet(from, square(2), piece)
            });
        }
    }
}
