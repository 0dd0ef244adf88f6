use crate::engine::config::EngineConfig;
use crate::engine::search::AlphaBetaEngine;
use crate::engine::{Move, SearchStats, Searcher};
use crate::logic::game::GameState;
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("a search is already outstanding")]
    Busy,
    #[error("search {0} is not outstanding")]
    UnknownHandle(u64),
    #[error("could not start search thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Ticket for one submitted search. Consumed by `cancel`.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SearchHandle(u64);

impl SearchHandle {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPoll {
    Pending,
    /// `None` asks the caller to pick a random legal move instead.
    Ready(Option<Move>),
}

enum Output {
    MoveFound(Move, SearchStats),
    NoMove,
}

struct Outstanding {
    id: u64,
    stop: Arc<AtomicBool>,
    rx: Receiver<Output>,
    thread: JoinHandle<()>,
}

/// Runs one search at a time on a background thread.
///
/// Every submit builds a fresh engine, so caches never outlive their search.
pub struct SearchCoordinator {
    config: Arc<EngineConfig>,
    next_id: u64,
    outstanding: Option<Outstanding>,
    last_stats: Option<SearchStats>,
}

impl SearchCoordinator {
    #[must_use]
    pub const fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            config,
            next_id: 0,
            outstanding: None,
            last_stats: None,
        }
    }

    /// Applies to the next submit; a running search keeps its settings.
    pub fn update_config(&mut self, config: Arc<EngineConfig>) {
        self.config = config;
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Statistics of the most recent search that produced a move.
    #[must_use]
    pub const fn last_stats(&self) -> Option<SearchStats> {
        self.last_stats
    }

    /// Starts a search of `state` on a fresh engine in the background.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::Busy`] while another search is outstanding, or
    /// [`CoordinatorError::Spawn`] when the thread cannot start.
    pub fn submit(
        &mut self,
        state: GameState,
        legal_moves: Vec<Move>,
    ) -> Result<SearchHandle, CoordinatorError> {
        if self.outstanding.is_some() {
            return Err(CoordinatorError::Busy);
        }

        let id = self.next_id;
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let config = self.config.clone();
        let worker_stop = stop.clone();

        let thread = thread::Builder::new()
            .name(format!("smartmove-search-{id}"))
            .spawn(move || {
                let mut state = state;
                let mut engine = AlphaBetaEngine::new(config).with_stop_flag(worker_stop);
                let output = match engine.find_best_move(&mut state, &legal_moves) {
                    Some((mv, stats)) => Output::MoveFound(mv, stats),
                    None => Output::NoMove,
                };
                // The receiver is gone once the search was cancelled.
                let _ = tx.send(output);
            })?;

        self.next_id += 1;
        self.outstanding = Some(Outstanding {
            id,
            stop,
            rx,
            thread,
        });
        debug!("submitted search {id}");
        Ok(SearchHandle(id))
    }

    fn check_handle(&self, handle: &SearchHandle) -> Result<&Outstanding, CoordinatorError> {
        self.outstanding
            .as_ref()
            .filter(|o| o.id == handle.0)
            .ok_or(CoordinatorError::UnknownHandle(handle.0))
    }

    /// Non-blocking. Once `Ready` is returned the handle is spent.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::UnknownHandle`] for a spent or cancelled handle.
    pub fn poll(&mut self, handle: &SearchHandle) -> Result<SearchPoll, CoordinatorError> {
        let received = self.check_handle(handle)?.rx.try_recv();
        let result = match received {
            Ok(Output::MoveFound(mv, stats)) => {
                self.last_stats = Some(stats);
                Some(mv)
            }
            Ok(Output::NoMove) => None,
            Err(TryRecvError::Empty) => return Ok(SearchPoll::Pending),
            Err(TryRecvError::Disconnected) => {
                warn!("search {} ended without a result", handle.0);
                None
            }
        };

        if let Some(done) = self.outstanding.take() {
            if done.thread.join().is_err() {
                warn!("search thread {} panicked", done.id);
            }
        }
        Ok(SearchPoll::Ready(result))
    }

    /// Stops the search and forgets it. The worker exits at its next node and
    /// its result, if any, is dropped.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::UnknownHandle`] when `handle` is not the outstanding search.
    pub fn cancel(&mut self, handle: SearchHandle) -> Result<(), CoordinatorError> {
        self.check_handle(&handle)?;
        if let Some(cancelled) = self.outstanding.take() {
            cancelled.stop.store(true, Ordering::Relaxed);
            debug!("cancelled search {}", cancelled.id);
        }
        Ok(())
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        if let Some(outstanding) = self.outstanding.take() {
            outstanding.stop.store(true, Ordering::Relaxed);
        }
    }
}

/// Uniform choice among `moves`, for when the search returns no move.
pub fn random_move<R: Rng + ?Sized>(moves: &[Move], rng: &mut R) -> Option<Move> {
    moves.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::rules::RulesEngine;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::{Duration, Instant};

    fn coordinator(depth: u8) -> SearchCoordinator {
        SearchCoordinator::new(Arc::new(EngineConfig {
            max_depth: depth,
            ..EngineConfig::default()
        }))
    }

    fn wait(coord: &mut SearchCoordinator, handle: &SearchHandle) -> Option<Move> {
        let deadline = Instant::now() + Duration::from_secs(60);
        loop {
            match coord.poll(handle).unwrap() {
                SearchPoll::Ready(mv) => return mv,
                SearchPoll::Pending => {
                    assert!(Instant::now() < deadline, "search never finished");
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }

    #[test]
    fn test_single_legal_move_is_returned() {
        let mut coord = coordinator(5);
        let mut game = GameState::from_fen("7k/R7/8/8/8/8/8/7K b - - 0 1").unwrap();
        let moves = game.legal_moves();
        let handle = coord.submit(game, moves).unwrap();
        let mv = wait(&mut coord, &handle).unwrap();
        assert_eq!(mv.to_string(), "h8g8");
        assert!(!coord.is_busy());
        assert_eq!(coord.last_stats().unwrap().nodes, 0);
    }

    #[test]
    fn test_second_submit_is_rejected_while_pending() {
        let mut coord = coordinator(1);
        let mut game = GameState::new();
        let moves = game.legal_moves();
        let handle = coord.submit(game.clone(), moves.clone()).unwrap();
        assert!(matches!(
            coord.submit(game, moves),
            Err(CoordinatorError::Busy)
        ));
        assert!(wait(&mut coord, &handle).is_some());
    }

    #[test]
    fn test_spent_handle_is_unknown() {
        let mut coord = coordinator(1);
        let mut game = GameState::new();
        let moves = game.legal_moves();
        let handle = coord.submit(game, moves).unwrap();
        wait(&mut coord, &handle);
        assert!(matches!(
            coord.poll(&handle),
            Err(CoordinatorError::UnknownHandle(0))
        ));
        assert!(matches!(
            coord.cancel(handle),
            Err(CoordinatorError::UnknownHandle(0))
        ));
    }

    #[test]
    fn test_cancel_then_resubmit_starts_clean() {
        let mut coord = coordinator(4);
        let mut game =
            GameState::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq -")
                .unwrap();
        let moves = game.legal_moves();
        let handle = coord.submit(game, moves).unwrap();
        coord.cancel(handle).unwrap();
        assert!(!coord.is_busy());
        assert!(coord.last_stats().is_none());

        coord.update_config(Arc::new(EngineConfig {
            max_depth: 1,
            ..EngineConfig::default()
        }));
        let mut start = GameState::new();
        let moves = start.legal_moves();
        let handle = coord.submit(start, moves.clone()).unwrap();
        assert_eq!(handle.id(), 1);
        let mv = wait(&mut coord, &handle).unwrap();
        assert!(moves.contains(&mv));

        // Twenty distinct leaves, none of them inherited from the cancelled search.
        let stats = coord.last_stats().unwrap();
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 20);
    }

    #[test]
    fn test_no_moves_asks_for_random_choice() {
        let mut coord = coordinator(3);
        let handle = coord.submit(GameState::new(), Vec::new()).unwrap();
        assert_eq!(wait(&mut coord, &handle), None);
    }

    #[test]
    fn test_random_move_picks_from_the_list() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut game = GameState::new();
        let moves = game.legal_moves();
        for _ in 0..50 {
            let mv = random_move(&moves, &mut rng).unwrap();
            assert!(moves.contains(&mv));
        }
        assert_eq!(random_move(&[], &mut rng), None);
    }
}
