use crate::engine::cache::{AttackCache, EvalCache};
use crate::engine::config::EngineConfig;
use crate::engine::{Evaluator, Score, CHECKMATE, STALEMATE};
use crate::logic::board::{Board, BoardCoordinate, Color, PieceKind, PositionKey};
use crate::logic::eval_constants::get_pst_value;
use crate::logic::rules::{AttackSet, RulesEngine, KING_OFFSETS};
use std::sync::Arc;

/// Weighted sum of material, placement, structure and tactical terms, in
/// pawns from White's point of view. Results are memoized per position.
pub struct HeuristicEvaluator {
    config: Arc<EngineConfig>,
    cache: EvalCache,
    attacks: AttackCache,
    cache_hits: u64,
    cache_misses: u64,
}

const fn sign(color: Color) -> f64 {
    match color {
        Color::White => 1.0,
        Color::Black => -1.0,
    }
}

/// Both sides' attack sets for one position.
#[derive(Clone, Copy)]
struct Coverage {
    white: AttackSet,
    black: AttackSet,
}

impl Coverage {
    const fn of(&self, color: Color) -> AttackSet {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

impl HeuristicEvaluator {
    #[must_use]
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            cache: EvalCache::new(config.eval_cache_capacity),
            attacks: AttackCache::new(config.attack_cache_capacity),
            config,
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// Forgets every memoized score and attack set. Called at the start of each root search.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.attacks.clear();
        self.cache_hits = 0;
        self.cache_misses = 0;
    }

    #[must_use]
    pub const fn cache(&self) -> &EvalCache {
        &self.cache
    }

    #[must_use]
    pub const fn attack_cache(&self) -> &AttackCache {
        &self.attacks
    }

    #[must_use]
    pub const fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    #[must_use]
    pub const fn cache_misses(&self) -> u64 {
        self.cache_misses
    }

    fn coverage(&mut self, board: &Board, key: PositionKey) -> Coverage {
        Coverage {
            white: self.attacks.attacks(board, key, Color::White),
            black: self.attacks.attacks(board, key, Color::Black),
        }
    }

    /// Every term that depends on the board alone.
    fn positional_score(&mut self, board: &Board, key: PositionKey) -> Score {
        let coverage = self.coverage(board, key);
        let cfg = &*self.config;

        material_and_pst(cfg, board)
            + bishop_pair(cfg, board)
            + rook_files(cfg, board)
            + opening_phase(cfg, board)
            + mobility(cfg, coverage)
            + king_safety(cfg, board, coverage)
            + checks(cfg, board, coverage)
            + pawn_structure(cfg, board)
            + hanging_pieces(cfg, board, coverage)
    }

    /// Material currently en prise for the side to move.
    fn capture_threats<R: RulesEngine + ?Sized>(&self, state: &mut R) -> Score {
        let mover = state.side_to_move();
        let available: f64 = state
            .legal_moves()
            .iter()
            .filter_map(|mv| mv.captured)
            .map(|victim| self.config.piece_value(victim.kind))
            .sum();
        sign(mover) * self.config.capture_threat * available
    }
}

impl Evaluator for HeuristicEvaluator {
    fn evaluate<R: RulesEngine + ?Sized>(&mut self, state: &mut R) -> Score {
        let side = state.side_to_move();
        if state.is_checkmate() {
            return -sign(side) * CHECKMATE;
        }
        if state.is_stalemate() {
            return STALEMATE;
        }

        let key = state.board().key(side);
        if let Some(score) = self.cache.get(&key) {
            self.cache_hits += 1;
            return score;
        }
        self.cache_misses += 1;

        let positional = self.positional_score(state.board(), key);
        let tactical = self.capture_threats(state);
        let score = (positional + tactical).clamp(-CHECKMATE, CHECKMATE);

        self.cache.put(key, score);
        score
    }
}

fn material_and_pst(cfg: &EngineConfig, board: &Board) -> Score {
    board
        .pieces()
        .map(|(at, piece)| {
            let pst = if piece.kind == PieceKind::King {
                0.0
            } else {
                f64::from(get_pst_value(piece.kind, piece.color, at)) * cfg.pst_scale
            };
            sign(piece.color) * (cfg.piece_value(piece.kind) + pst)
        })
        .sum()
}

fn bishop_pair(cfg: &EngineConfig, board: &Board) -> Score {
    [Color::White, Color::Black]
        .into_iter()
        .filter(|&color| board.count(color, PieceKind::Bishop) >= 2)
        .map(|color| sign(color) * cfg.bishop_pair)
        .sum()
}

fn rook_files(cfg: &EngineConfig, board: &Board) -> Score {
    let pawns = [
        board.pawns_per_file(Color::White),
        board.pawns_per_file(Color::Black),
    ];
    let mut score = 0.0;
    for (at, piece) in board.pieces() {
        if piece.kind != PieceKind::Rook {
            continue;
        }
        let file = usize::from(at.col);
        if pawns[piece.color.index()][file] == 0 {
            score += sign(piece.color) * cfg.rook_half_open_file;
            if pawns[piece.color.opposite().index()][file] == 0 {
                score += sign(piece.color) * cfg.rook_open_file;
            }
        }
    }
    score
}

/// Knights and bishops no longer on their original squares.
fn developed_minors(board: &Board, color: Color) -> usize {
    let row = color.home_row();
    [
        (1, PieceKind::Knight),
        (6, PieceKind::Knight),
        (2, PieceKind::Bishop),
        (5, PieceKind::Bishop),
    ]
    .into_iter()
    .filter(|&(col, kind)| !board.get(BoardCoordinate { row, col }).is(color, kind))
    .count()
}

fn has_castled(board: &Board, color: Color) -> bool {
    board
        .find_king(color)
        .is_some_and(|king| king.row == color.home_row() && (king.col == 2 || king.col == 6))
}

fn opening_phase(cfg: &EngineConfig, board: &Board) -> Score {
    if board.occupied_count() <= cfg.opening_piece_threshold {
        return 0.0;
    }

    let mut score = 0.0;
    for color in [Color::White, Color::Black] {
        let s = sign(color);
        let home = color.home_row();
        let pawn_row = match color {
            Color::White => 6,
            Color::Black => 1,
        };

        let developed = developed_minors(board, color);
        #[allow(clippy::cast_precision_loss)]
        let developed_f = developed as f64;
        score += s * cfg.development * developed_f;

        let center_moved = [3, 4]
            .into_iter()
            .any(|col| !board.get(BoardCoordinate { row: pawn_row, col }).is(color, PieceKind::Pawn));
        if center_moved {
            score += s * cfg.center_pawn;
        }

        let queen_moved = !board
            .get(BoardCoordinate { row: home, col: 3 })
            .is(color, PieceKind::Queen);
        let castled = has_castled(board, color);

        if queen_moved {
            // Fully developed with a center pawn out is a normal queen sortie.
            let mut penalty = if developed >= 3 && center_moved {
                0.0
            } else {
                cfg.early_queen[developed.min(3)]
            };
            if !castled {
                penalty += cfg.early_queen_uncastled;
            }
            score -= s * penalty;
        }
        if castled {
            score += s * cfg.castled;
            if developed >= 2 {
                score += s * cfg.castled_developed;
            }
        } else if developed >= 2 && !queen_moved {
            score += s * cfg.castle_ready;
        }
    }
    score
}

fn mobility(cfg: &EngineConfig, coverage: Coverage) -> Score {
    #[allow(clippy::cast_precision_loss)]
    let diff = coverage.white.len() as f64 - coverage.black.len() as f64;
    diff * cfg.mobility
}

fn king_safety(cfg: &EngineConfig, board: &Board, coverage: Coverage) -> Score {
    let mut score = 0.0;
    for color in [Color::White, Color::Black] {
        let Some(king) = board.find_king(color) else {
            continue;
        };
        let s = sign(color);
        let enemy = coverage.of(color.opposite());

        for &(dr, dc) in &KING_OFFSETS {
            if king.offset(dr, dc).is_some_and(|sq| enemy.contains(sq)) {
                score -= s * cfg.king_zone_attack;
            }
        }
        for dc in [-1, 0, 1] {
            let shielded = king
                .offset(color.forward(), dc)
                .is_some_and(|sq| board.get(sq).is(color, PieceKind::Pawn));
            if shielded {
                score += s * cfg.pawn_shield;
            }
        }
    }
    score
}

fn checks(cfg: &EngineConfig, board: &Board, coverage: Coverage) -> Score {
    let mut score = 0.0;
    for color in [Color::White, Color::Black] {
        let checked = board
            .find_king(color)
            .is_some_and(|king| coverage.of(color.opposite()).contains(king));
        if checked {
            score -= sign(color) * cfg.in_check;
        }
    }
    score
}

/// Whether no enemy pawn stands ahead of `at` on its own or an adjacent file.
fn is_passed(board: &Board, at: BoardCoordinate, color: Color) -> bool {
    let enemy = color.opposite();
    let mut cur = at;
    while let Some(ahead) = cur.offset(color.forward(), 0) {
        for dc in [-1, 0, 1] {
            if ahead
                .offset(0, dc)
                .is_some_and(|sq| board.get(sq).is(enemy, PieceKind::Pawn))
            {
                return false;
            }
        }
        cur = ahead;
    }
    true
}

fn pawn_structure(cfg: &EngineConfig, board: &Board) -> Score {
    let mut score = 0.0;
    for color in [Color::White, Color::Black] {
        let s = sign(color);
        let files = board.pawns_per_file(color);

        for (file, &count) in files.iter().enumerate() {
            if count == 0 {
                continue;
            }
            if count > 1 {
                score -= s * cfg.doubled_pawn * f64::from(count - 1);
            }
            let left = file.checked_sub(1).map_or(0, |f| files[f]);
            let right = files.get(file + 1).copied().unwrap_or(0);
            if left == 0 && right == 0 {
                score -= s * cfg.isolated_pawn;
            }
        }

        // Only the leading pawn of each file can be passed.
        let mut leaders: [Option<BoardCoordinate>; 8] = [None; 8];
        for (at, piece) in board.pieces() {
            if piece.color != color || piece.kind != PieceKind::Pawn {
                continue;
            }
            let slot = &mut leaders[usize::from(at.col)];
            let further = match (color, *slot) {
                (_, None) => true,
                (Color::White, Some(prev)) => at.row < prev.row,
                (Color::Black, Some(prev)) => at.row > prev.row,
            };
            if further {
                *slot = Some(at);
            }
        }
        for at in leaders.into_iter().flatten() {
            if is_passed(board, at, color) {
                let advanced = match color {
                    Color::White => 7 - at.row,
                    Color::Black => at.row,
                };
                score += s * cfg.passed_pawn_per_rank.mul_add(f64::from(advanced), cfg.passed_pawn);
            }
        }
    }
    score
}

fn hanging_pieces(cfg: &EngineConfig, board: &Board, coverage: Coverage) -> Score {
    board
        .pieces()
        .filter(|(at, piece)| {
            coverage.of(piece.color.opposite()).contains(*at) && !coverage.of(piece.color).contains(*at)
        })
        .map(|(_, piece)| -sign(piece.color) * cfg.hanging_piece * cfg.piece_value(piece.kind))
        .sum()
}
