//! ROC game binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `roc-config.yaml`
//! 3. Open the JSON progress store
//! 4. Assemble the game and install the game over autopilot
//! 5. Enter Bootstrap, which lands on the main menu
//! 6. Select level 0
//! 7. Run the frame driver until the frame limit or Ctrl-C
//! 8. Shut down

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use roc_core::CancellationToken;
use roc_core::config::GameConfig;
use roc_game::adapters::JsonProgressStore;
use roc_game::app::Game;
use roc_game::driver::install_autopilot;
use roc_game::error::GameError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "roc-config.yaml";

/// Pause on the game over screen before the autopilot moves on.
const AUTOPILOT_DELAY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        name = %config.app.name,
        frame_interval_ms = config.app.frame_interval_ms,
        max_frames = config.app.max_frames,
        levels = config.levels.len(),
        "configuration loaded"
    );

    // 3. Progress store.
    let store = Arc::new(JsonProgressStore::new(&config.app.save_path));
    info!(path = %config.app.save_path, "progress store ready");

    // 4. Assemble.
    let max_frames = config.app.max_frames;
    let game = Game::assemble(config, store);
    install_autopilot(&game.bus, AUTOPILOT_DELAY);

    // 5. Boot to the main menu.
    game.boot().await.map_err(GameError::from)?;

    // 6. Start the first level.
    game.select_level(0);

    // 7. Drive frames.
    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received"),
            Err(e) => warn!(error = %e, "could not listen for Ctrl-C"),
        }
        ctrl_c.cancel();
    });
    let frames = game
        .driver()
        .run(game.frame_interval(), max_frames, token)
        .await;

    // 8. Shut down.
    let summary = game.session.summary();
    game.shutdown().await;
    info!(
        frames,
        score = summary.score,
        level_index = summary.level_index,
        "roc-game finished"
    );
    Ok(())
}

/// Load `roc-config.yaml`, falling back to defaults when it is absent.
fn load_config() -> Result<GameConfig, GameError> {
    let path = Path::new(CONFIG_PATH);
    if path.exists() {
        Ok(GameConfig::from_file(path)?)
    } else {
        info!("config file not found, using defaults");
        let mut config = GameConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}
