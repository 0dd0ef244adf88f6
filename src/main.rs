use rand::thread_rng;
use smartmove_core::engine::config::EngineConfig;
use smartmove_core::logic::game::{GameState, GameStatus};
use smartmove_core::logic::rules::RulesEngine;
use smartmove_core::worker::{random_move, SearchCoordinator, SearchPoll};
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs, thread};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(10);
const DEFAULT_MAX_PLIES: usize = 40;

fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let json = fs::read_to_string(path)?;
    Ok(EngineConfig::load_from_json(&json)?)
}

/// Engine against itself from the initial position.
fn self_play(config: EngineConfig, max_plies: usize) -> Result<GameState, Box<dyn Error>> {
    let mut coordinator = SearchCoordinator::new(Arc::new(config));
    let mut game = GameState::new();
    let mut rng = thread_rng();

    for ply in 1..=max_plies {
        let moves = game.legal_moves();
        if moves.is_empty() {
            break;
        }

        let handle = coordinator.submit(game.clone(), moves.clone())?;
        let chosen = loop {
            match coordinator.poll(&handle)? {
                SearchPoll::Pending => thread::sleep(TICK),
                SearchPoll::Ready(Some(mv)) => break Some(mv),
                SearchPoll::Ready(None) => {
                    warn!("search gave no move, picking at random");
                    break random_move(&moves, &mut rng);
                }
            }
        };
        let Some(mv) = chosen else {
            break;
        };

        game.apply_move(mv)?;
        match coordinator.last_stats() {
            Some(stats) => info!(
                ply,
                nodes = stats.nodes,
                time_ms = stats.time_ms,
                "{:?} plays {mv}",
                mv.color()
            ),
            None => info!(ply, "{:?} plays {mv}", mv.color()),
        }
    }

    Ok(game)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    let config = match load_config(args.first().map(String::as_str)) {
        Ok(config) => config,
        Err(err) => {
            error!("could not load config: {err}");
            return ExitCode::FAILURE;
        }
    };
    let max_plies = match args.get(1).map(|s| s.parse::<usize>()) {
        None => DEFAULT_MAX_PLIES,
        Some(Ok(n)) => n,
        Some(Err(err)) => {
            error!("invalid ply limit: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(depth = config.max_depth, max_plies, "starting self-play");
    match self_play(config, max_plies) {
        Ok(game) => {
            match game.status {
                GameStatus::Checkmate(winner) => info!("checkmate, {winner:?} wins"),
                GameStatus::Stalemate => info!("stalemate"),
                GameStatus::Playing => info!("ply limit reached"),
            }
            info!("final position {}", game.to_fen());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("self-play aborted: {err}");
            ExitCode::FAILURE
        }
    }
}
