use crate::engine::config::EngineConfig;
use crate::engine::eval::HeuristicEvaluator;
use crate::engine::ordering::MoveOrderer;
use crate::engine::{Evaluator, Move, Score, SearchStats, Searcher, CHECKMATE};
use crate::logic::board::Color;
use crate::logic::rules::{MoveError, RulesEngine};
use log::{debug, error, info};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search cancelled")]
    Cancelled,
    #[error("rules engine rejected a move: {0}")]
    Rules(#[from] MoveError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub score: Score,
    /// Best root move, `None` when the root was a leaf.
    pub best_move: Option<Move>,
}

pub struct AlphaBetaEngine {
    config: Arc<EngineConfig>,
    evaluator: HeuristicEvaluator,
    orderer: MoveOrderer,
    stop: Arc<AtomicBool>,
    nodes_searched: u64,
}

impl AlphaBetaEngine {
    #[must_use]
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            evaluator: HeuristicEvaluator::new(config.clone()),
            orderer: MoveOrderer::new(config.clone()),
            config,
            stop: Arc::new(AtomicBool::new(false)),
            nodes_searched: 0,
        }
    }

    /// Shares a cancellation flag; once raised, the running search unwinds with `Cancelled`.
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn update_config(&mut self, config: Arc<EngineConfig>) {
        self.evaluator = HeuristicEvaluator::new(config.clone());
        self.orderer = MoveOrderer::new(config.clone());
        self.config = config;
    }

    #[must_use]
    pub const fn evaluator(&self) -> &HeuristicEvaluator {
        &self.evaluator
    }

    #[must_use]
    pub const fn nodes_searched(&self) -> u64 {
        self.nodes_searched
    }

    /// Minimax with alpha-beta pruning from `state`, whose legal moves are `moves`.
    ///
    /// Every move applied here is undone before this returns, errors included.
    ///
    /// # Errors
    ///
    /// [`SearchError::Cancelled`] once the stop flag is raised, or the rules engine's
    /// rejection of a move.
    pub fn search<R: RulesEngine + ?Sized>(
        &mut self,
        state: &mut R,
        moves: &[Move],
        depth: u8,
        alpha: Score,
        beta: Score,
        maximizing: bool,
    ) -> Result<SearchResult, SearchError> {
        let (score, best_move) = self.alpha_beta(state, moves, depth, 0, alpha, beta, maximizing)?;
        Ok(SearchResult { score, best_move })
    }

    #[allow(clippy::too_many_arguments)]
    fn alpha_beta<R: RulesEngine + ?Sized>(
        &mut self,
        state: &mut R,
        moves: &[Move],
        depth: u8,
        ply: u8,
        mut alpha: Score,
        mut beta: Score,
        maximizing: bool,
    ) -> Result<(Score, Option<Move>), SearchError> {
        self.nodes_searched += 1;

        if self.stop.load(Ordering::Relaxed) {
            return Err(SearchError::Cancelled);
        }

        if depth == 0 || state.is_checkmate() || state.is_stalemate() || moves.is_empty() {
            return Ok((self.evaluator.evaluate(state), None));
        }

        // Sorting costs a trial move per candidate, so only the top plies pay for it.
        let ordered = if ply < self.config.ordering_plies {
            self.orderer.order(state, moves)
        } else {
            moves.to_vec()
        };

        let mut best_score = if maximizing {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        let mut best_move = None;

        for mv in ordered {
            state.apply_move(mv)?;
            let replies = state.legal_moves();
            let child = self.alpha_beta(state, &replies, depth - 1, ply + 1, alpha, beta, !maximizing);
            state.undo_move();
            let (score, _) = child?;

            if maximizing {
                if score > best_score {
                    best_score = score;
                    best_move = Some(mv);
                }
                alpha = alpha.max(score);
            } else {
                if score < best_score {
                    best_score = score;
                    best_move = Some(mv);
                }
                beta = beta.min(score);
            }

            if beta <= alpha {
                break;
            }
        }

        Ok((best_score, best_move))
    }

    fn stats(&self, depth: u8, started: Instant) -> SearchStats {
        SearchStats {
            depth,
            nodes: self.nodes_searched,
            cache_hits: self.evaluator.cache_hits(),
            cache_misses: self.evaluator.cache_misses(),
            time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl Searcher for AlphaBetaEngine {
    fn find_best_move<R: RulesEngine + ?Sized>(
        &mut self,
        state: &mut R,
        legal_moves: &[Move],
    ) -> Option<(Move, SearchStats)> {
        let first = *legal_moves.first()?;
        let started = Instant::now();

        self.nodes_searched = 0;
        self.evaluator.invalidate();

        if legal_moves.len() <= self.config.shortcut_move_count {
            debug!("{} legal moves, skipping search", legal_moves.len());
            return Some((first, self.stats(0, started)));
        }

        let depth = self.config.max_depth;
        let maximizing = state.side_to_move() == Color::White;
        let base_history = state.history_len();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.search(state, legal_moves, depth, -CHECKMATE, CHECKMATE, maximizing)
        }));

        // A panic may have skipped undos.
        while state.history_len() > base_history {
            if state.undo_move().is_none() {
                break;
            }
        }

        let chosen = match outcome {
            Ok(Ok(result)) => {
                let mv = result.best_move.unwrap_or(first);
                info!("best move {mv} (score {:.2}, depth {depth})", result.score);
                mv
            }
            Ok(Err(SearchError::Cancelled)) => {
                debug!("search cancelled after {} nodes", self.nodes_searched);
                return None;
            }
            Ok(Err(err)) => {
                error!("search failed: {err}; playing {first}");
                first
            }
            Err(_) => {
                error!("search panicked; playing {first}");
                first
            }
        };

        let stats = self.stats(depth, started);
        debug!(
            "searched {} nodes in {} ms, cache {} hits / {} misses",
            stats.nodes, stats.time_ms, stats.cache_hits, stats.cache_misses
        );
        Some((chosen, stats))
    }
}
