use crate::engine::config::EngineConfig;
use crate::engine::Move;
use crate::logic::board::PieceKind;
use crate::logic::rules::RulesEngine;
use std::cmp::Reverse;
use std::sync::Arc;

/// Ranks candidate moves so alpha-beta sees likely refutations first.
/// Priorities only affect pruning; they never change which move wins.
pub struct MoveOrderer {
    config: Arc<EngineConfig>,
}

impl MoveOrderer {
    #[must_use]
    pub const fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    pub fn priority<R: RulesEngine + ?Sized>(&self, state: &mut R, mv: Move) -> i32 {
        let cfg = &*self.config;
        let mut priority = 0;

        if let Some(victim) = mv.captured {
            priority += cfg.score_capture_base
                + cfg.score_capture_victim * cfg.piece_value_int(victim.kind)
                - cfg.piece_value_int(mv.piece.kind);
        }

        if mv.is_promotion() {
            priority += cfg.score_promotion;
        }

        if state.board().occupied_count() > cfg.opening_piece_threshold {
            let from_home = mv.from.row == mv.piece.color.home_row();
            match mv.piece.kind {
                PieceKind::Knight if from_home => priority += cfg.score_knight_development,
                PieceKind::Bishop if from_home => priority += cfg.score_bishop_development,
                PieceKind::King if mv.is_castle => priority += cfg.score_castle,
                _ => {}
            }
        }

        if (3..=4).contains(&mv.to.row) && (3..=4).contains(&mv.to.col) {
            priority += cfg.score_center;
        }

        // Checks are found by trying the move.
        if state.apply_move(mv).is_ok() {
            if state.in_check() {
                priority += cfg.score_check;
            }
            state.undo_move();
        }

        priority
    }

    /// Returns `moves` sorted by descending priority; ties keep their input order.
    pub fn order<R: RulesEngine + ?Sized>(&self, state: &mut R, moves: &[Move]) -> Vec<Move> {
        let mut scored: Vec<(Move, i32)> = moves
            .iter()
            .map(|&mv| (mv, self.priority(state, mv)))
            .collect();
        scored.sort_by_key(|&(_, priority)| Reverse(priority));
        scored.into_iter().map(|(mv, _)| mv).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::game::GameState;

    fn orderer() -> MoveOrderer {
        MoveOrderer::new(Arc::new(EngineConfig::default()))
    }

    fn is_plain(game: &mut GameState, mv: Move) -> bool {
        if mv.is_capture() || mv.is_promotion() {
            return false;
        }
        game.apply_move(mv).unwrap();
        let check = game.in_check();
        game.undo_move();
        !check
    }

    #[test]
    fn test_captures_outrank_plain_moves() {
        let orderer = orderer();
        for fen in [
            "r1bqkbnr/pppp1ppp/2n5/4p3/3PP3/5N2/PPP2PPP/RNBQKB1R b KQkq -",
            "r3k2r/ppp2ppp/2n1bn2/3qp3/3P4/2N1BN2/PPPQ1PPP/R3K2R w KQkq -",
            "4k3/4p3/8/3p4/4Q3/8/8/4K2R w K -",
        ] {
            let mut game = GameState::from_fen(fen).unwrap();
            let moves = game.legal_moves();
            let lowest_capture = moves
                .iter()
                .filter(|mv| mv.is_capture())
                .map(|&mv| orderer.priority(&mut game, mv))
                .min()
                .unwrap();
            let plain: Vec<Move> = moves
                .iter()
                .copied()
                .filter(|&mv| is_plain(&mut game, mv))
                .collect();
            let highest_plain = plain
                .iter()
                .map(|&mv| orderer.priority(&mut game, mv))
                .max()
                .unwrap();
            assert!(lowest_capture > highest_plain, "{fen}");
        }
    }

    #[test]
    fn test_capture_prefers_valuable_victim_and_cheap_attacker() {
        let orderer = orderer();
        let mut game = GameState::from_fen("4k3/8/2q1r3/3P4/8/8/8/K7 w - -").unwrap();
        let takes_queen = game.find_move("d5c6").unwrap();
        let takes_rook = game.find_move("d5e6").unwrap();
        assert!(orderer.priority(&mut game, takes_queen) > orderer.priority(&mut game, takes_rook));
        // 1000 + 10 * 9 - 1
        assert_eq!(orderer.priority(&mut game, takes_queen), 1089);
    }

    #[test]
    fn test_check_and_promotion_bonuses() {
        let orderer = orderer();
        let mut game = GameState::from_fen("k7/4P3/8/8/8/8/8/1R2K3 w - -").unwrap();
        let promote = game.find_move("e7e8q").unwrap();
        // Promotes with check along the eighth rank.
        assert_eq!(orderer.priority(&mut game, promote), 900 + 800);

        let rook_check = game.find_move("b1a1").unwrap();
        assert_eq!(orderer.priority(&mut game, rook_check), 800);
        let quiet = game.find_move("b1b2").unwrap();
        assert_eq!(orderer.priority(&mut game, quiet), 0);
    }

    #[test]
    fn test_opening_development_and_castling() {
        let orderer = orderer();
        let mut game =
            GameState::from_fen("rnbqkbnr/pppppppp/8/8/8/5NP1/PPPPPPBP/RNBQK2R w KQkq -").unwrap();
        let castle = game.find_move("e1g1").unwrap();
        let knight = game.find_move("b1c3").unwrap();
        let center_pawn = game.find_move("d2d4").unwrap();
        assert_eq!(orderer.priority(&mut game, castle), 1000);
        assert_eq!(orderer.priority(&mut game, knight), 200);
        assert_eq!(orderer.priority(&mut game, center_pawn), 50);
    }

    #[test]
    fn test_order_is_stable_and_restores_state() {
        let orderer = orderer();
        let mut game = GameState::new();
        let before = game.to_fen();
        let moves = game.legal_moves();
        let ordered = orderer.order(&mut game, &moves);

        assert_eq!(game.to_fen(), before);
        assert_eq!(game.history_len(), 0);
        assert_eq!(ordered.len(), moves.len());

        // Knight moves come first, in generator order.
        let knights: Vec<String> = moves
            .iter()
            .filter(|mv| mv.piece.kind == PieceKind::Knight)
            .map(ToString::to_string)
            .collect();
        let leading: Vec<String> = ordered[..knights.len()]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(leading, knights);
    }
}
