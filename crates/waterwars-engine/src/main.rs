//! Game engine binary for WaterWars.
//!
//! This is the main entry point that wires together configuration, the
//! starting board, the configured strategies, and the simulated players.
//! It loads a game, plays every configured round, and logs the results.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `waterwars-config.yaml` (or the path given
//!    as the first argument)
//! 3. Build the strategies and the starting board
//! 4. Play rounds: build, allocation with concurrent player requests,
//!    revenue
//! 5. Log the final standings

mod error;
mod players;
mod summary_callback;

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use waterwars_core::config::GameConfig;
use waterwars_core::round::RoundManager;

use crate::error::EngineError;
use crate::summary_callback::SummaryLog;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "waterwars-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the game cannot
/// be built, or a round fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("waterwars-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        game = config.game.name,
        seed = config.game.seed,
        max_rounds = config.game.max_rounds,
        rainfall = ?config.strategies.rainfall,
        distributor = ?config.strategies.distributor,
        "Configuration loaded"
    );

    // 3. Build the game.
    let (mut manager, roster) = RoundManager::from_config(&config).map_err(EngineError::from)?;
    info!(
        players = roster.players.len(),
        parcels = roster.parcels.len(),
        assets = roster.assets.len(),
        "Game ready"
    );

    // 4. Play.
    let mut callback = SummaryLog::new();
    while !manager.is_finished() {
        play_round(&mut manager, &mut callback).await?;
    }

    // 5. Final standings.
    let state = manager.game().snapshot().map_err(|e| EngineError::Round {
        source: e.into(),
    })?;
    for player in state.players().values() {
        info!(player = player.name, money = %player.money, "Final standing");
    }
    info!(
        rounds = callback.summaries().len(),
        total_revenue = %callback.total_revenue(),
        ledger_entries = state.ledger().len(),
        "waterwars-engine shutdown complete"
    );

    Ok(())
}

/// Run one round from build phase to revenue phase.
async fn play_round(
    manager: &mut RoundManager,
    callback: &mut SummaryLog,
) -> Result<(), EngineError> {
    manager.start_build_phase()?;
    manager.start_allocation_phase()?;

    let desk = manager.allocation_desk()?;
    let game = manager.game().clone();
    players::submit_requests(&desk, &game).await?;

    manager.start_revenue_phase(callback)?;
    Ok(())
}

/// Load the game configuration.
///
/// Uses the first command-line argument as the path if one is given.
fn load_config() -> Result<GameConfig, EngineError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config_path = Path::new(&path);
    if !config_path.exists() {
        return Err(EngineError::MissingConfig { path });
    }
    Ok(GameConfig::from_file(config_path)?)
}
