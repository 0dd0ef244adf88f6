use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
        }
    }

    /// Row of this side's back rank.
    #[must_use]
    pub const fn home_row(self) -> u8 {
        match self {
            Self::White => 7,
            Self::Black => 0,
        }
    }

    /// Row delta of a pawn step for this side.
    #[must_use]
    pub const fn forward(self) -> i8 {
        match self {
            Self::White => -1,
            Self::Black => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn fen_char(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }

    #[must_use]
    pub const fn from_fen_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    #[must_use]
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    #[must_use]
    pub const fn fen_char(self) -> char {
        let c = self.kind.fen_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Square {
    #[default]
    Empty,
    Occupied(Color, PieceKind),
}

impl Square {
    #[must_use]
    pub const fn piece(self) -> Option<Piece> {
        match self {
            Self::Empty => None,
            Self::Occupied(color, kind) => Some(Piece { color, kind }),
        }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn is(self, color: Color, kind: PieceKind) -> bool {
        self == Self::Occupied(color, kind)
    }

    /// 4-bit code used by [`PositionKey`]: 0 empty, 1..=6 white, 7..=12 black.
    #[allow(clippy::cast_possible_truncation)]
    const fn code(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Occupied(color, kind) => 1 + (color.index() * 6 + kind.index()) as u8,
        }
    }
}

impl From<Piece> for Square {
    fn from(piece: Piece) -> Self {
        Self::Occupied(piece.color, piece.kind)
    }
}

/// Row 0 is the eighth rank (Black's home), row 7 the first rank; column 0 is the a-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardCoordinate {
    pub row: u8,
    pub col: u8,
}

impl BoardCoordinate {
    #[must_use]
    pub const fn new(row: u8, col: u8) -> Option<Self> {
        if row < 8 && col < 8 {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// Inverse of `index`; `None` past the last square.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_index(sq: usize) -> Option<Self> {
        if sq < 64 {
            Some(Self {
                row: (sq / 8) as u8,
                col: (sq % 8) as u8,
            })
        } else {
            None
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.row as usize * 8 + self.col as usize
    }

    #[must_use]
    pub fn offset(self, dr: i8, dc: i8) -> Option<Self> {
        let row = i16::from(self.row) + i16::from(dr);
        let col = i16::from(self.col) + i16::from(dc);
        if (0..8).contains(&row) && (0..8).contains(&col) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Self::new(row as u8, col as u8)
        } else {
            None
        }
    }

    /// Parses algebraic notation such as `e4`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() || !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return None;
        }
        Self::new(b'8' - rank as u8, file as u8 - b'a')
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..64).filter_map(Self::from_index)
    }
}

impl fmt::Display for BoardCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = char::from(b'a' + self.col);
        let rank = char::from(b'8' - self.row);
        write!(f, "{file}{rank}")
    }
}

/// Injective encoding of the board contents plus the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey {
    cells: [u8; 32],
    white_to_move: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(with = "BigArray")]
    squares: [Square; 64],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Standard starting position.
    #[must_use]
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.setup_initial_position();
        board
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self {
            squares: [Square::Empty; 64],
        }
    }

    fn setup_initial_position(&mut self) {
        self.setup_pieces(Color::White, 7, 6);
        self.setup_pieces(Color::Black, 0, 1);
    }

    fn setup_pieces(&mut self, color: Color, back_row: u8, pawn_row: u8) {
        let pieces = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        for (col, kind) in (0u8..).zip(pieces) {
            self.squares[usize::from(back_row) * 8 + usize::from(col)] =
                Square::Occupied(color, kind);
            self.squares[usize::from(pawn_row) * 8 + usize::from(col)] =
                Square::Occupied(color, PieceKind::Pawn);
        }
    }

    #[must_use]
    pub const fn get(&self, at: BoardCoordinate) -> Square {
        self.squares[at.index()]
    }

    #[must_use]
    pub const fn get_piece(&self, at: BoardCoordinate) -> Option<Piece> {
        self.get(at).piece()
    }

    pub fn set(&mut self, at: BoardCoordinate, square: Square) {
        self.squares[at.index()] = square;
    }

    pub fn add_piece(&mut self, at: BoardCoordinate, kind: PieceKind, color: Color) {
        self.set(at, Square::Occupied(color, kind));
    }

    /// Occupied squares with their pieces, in row-major order.
    #[must_use = "iterators are lazy"]
    pub fn pieces(&self) -> impl Iterator<Item = (BoardCoordinate, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(sq, square)| Some((BoardCoordinate::from_index(sq)?, square.piece()?)))
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.squares.iter().filter(|s| !s.is_empty()).count()
    }

    #[must_use]
    pub fn count(&self, color: Color, kind: PieceKind) -> usize {
        self.squares.iter().filter(|s| s.is(color, kind)).count()
    }

    #[must_use]
    pub fn find_king(&self, color: Color) -> Option<BoardCoordinate> {
        self.squares
            .iter()
            .position(|s| s.is(color, PieceKind::King))
            .and_then(BoardCoordinate::from_index)
    }

    /// Pawns of `color` on each file.
    #[must_use]
    pub fn pawns_per_file(&self, color: Color) -> [u8; 8] {
        let mut files = [0u8; 8];
        for (at, piece) in self.pieces() {
            if piece.color == color && piece.kind == PieceKind::Pawn {
                files[usize::from(at.col)] += 1;
            }
        }
        files
    }

    #[must_use]
    pub fn key(&self, side_to_move: Color) -> PositionKey {
        let mut cells = [0u8; 32];
        for (cell, pair) in cells.iter_mut().zip(self.squares.chunks_exact(2)) {
            if let [lo, hi] = pair {
                *cell = lo.code() | (hi.code() << 4);
            }
        }
        PositionKey {
            cells,
            white_to_move: side_to_move == Color::White,
        }
    }

    /// Piece placement field of a FEN string.
    #[must_use]
    pub fn to_fen_placement(&self) -> String {
        let mut fen = String::new();
        for row in 0..8u8 {
            let mut empty_count = 0;
            for col in 0..8u8 {
                let at = BoardCoordinate { row, col };
                if let Some(piece) = self.get_piece(at) {
                    if empty_count > 0 {
                        fen.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    fen.push(piece.fen_char());
                } else {
                    empty_count += 1;
                }
            }
            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            if row < 7 {
                fen.push('/');
            }
        }
        fen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> BoardCoordinate {
        BoardCoordinate::parse(s).unwrap()
    }

    #[test]
    fn test_initial_setup() {
        let board = Board::new();
        assert_eq!(board.get(at("e1")), Square::Occupied(Color::White, PieceKind::King));
        assert_eq!(board.get(at("d8")), Square::Occupied(Color::Black, PieceKind::Queen));
        assert_eq!(board.get(at("a2")), Square::Occupied(Color::White, PieceKind::Pawn));
        assert_eq!(board.occupied_count(), 32);
        assert_eq!(board.find_king(Color::Black), Some(at("e8")));
    }

    #[test]
    fn test_square_index_bounds() {
        assert_eq!(BoardCoordinate::all().count(), 64);
        for sq in BoardCoordinate::all() {
            assert_eq!(BoardCoordinate::from_index(sq.index()), Some(sq));
        }
        assert_eq!(BoardCoordinate::from_index(63), Some(at("h1")));
        assert_eq!(BoardCoordinate::from_index(64), None);
    }

    #[test]
    fn test_fen_placement() {
        let board = Board::new();
        assert_eq!(
            board.to_fen_placement(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"
        );
    }

    #[test]
    fn test_coordinate_notation() {
        let e4 = at("e4");
        assert_eq!((e4.row, e4.col), (4, 4));
        assert_eq!(e4.to_string(), "e4");
        assert_eq!(BoardCoordinate::parse("i1"), None);
        assert_eq!(BoardCoordinate::parse("a9"), None);
        assert_eq!(at("h1").offset(0, 1), None);
        assert_eq!(at("a1").offset(-1, 1), Some(at("b2")));
    }

    #[test]
    fn test_key_distinguishes_side_and_contents() {
        let board = Board::new();
        assert_ne!(board.key(Color::White), board.key(Color::Black));
        assert_eq!(board.key(Color::White), Board::new().key(Color::White));

        // Swapping two different pieces must change the key.
        let mut swapped = board.clone();
        swapped.set(at("b1"), Square::Occupied(Color::White, PieceKind::Bishop));
        swapped.set(at("c1"), Square::Occupied(Color::White, PieceKind::Knight));
        assert_ne!(board.key(Color::White), swapped.key(Color::White));

        let mut recolored = board.clone();
        recolored.set(at("a2"), Square::Occupied(Color::Black, PieceKind::Pawn));
        assert_ne!(board.key(Color::White), recolored.key(Color::White));
    }
}
