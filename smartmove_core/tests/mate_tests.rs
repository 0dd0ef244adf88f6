use smartmove_core::engine::config::EngineConfig;
use smartmove_core::engine::search::AlphaBetaEngine;
use smartmove_core::engine::{Searcher, CHECKMATE};
use smartmove_core::logic::game::GameState;
use smartmove_core::logic::rules::RulesEngine;
use std::sync::Arc;

fn engine(depth: u8) -> AlphaBetaEngine {
    AlphaBetaEngine::new(Arc::new(EngineConfig {
        max_depth: depth,
        ..EngineConfig::default()
    }))
}

fn best_move(fen: &str, depth: u8) -> String {
    let mut game = GameState::from_fen(fen).expect("valid FEN");
    let moves = game.legal_moves();
    let (mv, stats) = engine(depth)
        .find_best_move(&mut game, &moves)
        .expect("a move");
    assert_eq!(stats.depth, depth);
    assert_eq!(game.to_fen(), GameState::from_fen(fen).unwrap().to_fen());
    mv.to_string()
}

#[test]
fn test_white_back_rank_mate() {
    for depth in [1, 2, 3] {
        assert_eq!(
            best_move("6k1/5ppp/8/8/8/8/5PPP/4Q1K1 w - - 0 1", depth),
            "e1e8",
            "depth {depth}"
        );
    }
}

#[test]
fn test_black_back_rank_mate() {
    for depth in [1, 2, 3] {
        assert_eq!(
            best_move("4q1k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1", depth),
            "e8e1",
            "depth {depth}"
        );
    }
}

#[test]
fn test_mate_scores_full_checkmate() {
    let mut game = GameState::from_fen("6k1/5ppp/8/8/8/8/5PPP/4Q1K1 w - - 0 1").unwrap();
    let moves = game.legal_moves();
    let result = engine(2)
        .search(&mut game, &moves, 2, -CHECKMATE, CHECKMATE, true)
        .unwrap();
    assert_eq!(result.score, CHECKMATE);
    assert_eq!(result.best_move.map(|mv| mv.to_string()).as_deref(), Some("e1e8"));
}

#[test]
fn test_takes_free_queen() {
    // The knight on c3 can take an undefended queen on d5.
    assert_eq!(
        best_move("4k3/pp6/8/3q4/8/2N5/PP6/4K3 w - - 0 1", 2),
        "c3d5"
    );
}
