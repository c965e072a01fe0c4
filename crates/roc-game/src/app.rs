//! Wiring: builds the services, registers the states, hands out a driver.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use roc_core::config::GameConfig;
use roc_core::machine::{MachineError, StateMachine};
use roc_core::ports::{ProgressStore, ResourceLoader, WindowManager};
use roc_core::spawner::SpawnController;
use roc_events::{EventBus, LevelSelected};
use roc_types::{ProgressData, StateId};
use tracing::info;

use crate::adapters::{CatalogLoader, LoggingWindowManager};
use crate::driver::FrameDriver;
use crate::session::RunSession;
use crate::states::{BootstrapState, GameplayState, MainMenuState, Services};

/// A fully wired game.
#[derive(Debug)]
pub struct Game {
    /// Loaded configuration.
    pub config: Arc<GameConfig>,
    /// Shared event bus.
    pub bus: Arc<EventBus>,
    /// Application state machine with every state registered.
    pub machine: Arc<StateMachine>,
    /// Enemy pools and spawn loops.
    pub spawner: Arc<SpawnController>,
    /// The level run in progress.
    pub session: Arc<RunSession>,
    /// Resource loader, kept concrete for inspection.
    pub loader: Arc<CatalogLoader>,
    /// Window manager, kept concrete for inspection.
    pub windows: Arc<LoggingWindowManager>,
    /// Cached progress shared with the states.
    pub progress: Arc<Mutex<ProgressData>>,
}

impl Game {
    /// Build every service around `config` and `store` and register the
    /// bootstrap, main menu and gameplay states.
    pub fn assemble(config: GameConfig, store: Arc<dyn ProgressStore>) -> Self {
        let config = Arc::new(config);
        let bus = Arc::new(EventBus::new());
        let loader = Arc::new(CatalogLoader::new(Arc::clone(&config)));
        let windows = Arc::new(LoggingWindowManager::new());
        let spawner = Arc::new(SpawnController::new(
            Arc::clone(&loader) as Arc<dyn ResourceLoader>,
            Arc::clone(&bus),
            config.arena,
            config.pool,
        ));
        let session = Arc::new(RunSession::new());
        let progress = Arc::new(Mutex::new(ProgressData::default()));
        let machine = Arc::new(StateMachine::new());

        let services = Services {
            config: Arc::clone(&config),
            bus: Arc::clone(&bus),
            loader: Arc::clone(&loader) as Arc<dyn ResourceLoader>,
            windows: Arc::clone(&windows) as Arc<dyn WindowManager>,
            store,
            spawner: Arc::clone(&spawner),
            session: Arc::clone(&session),
            progress: Arc::clone(&progress),
            machine: Arc::downgrade(&machine),
        };
        machine.register_state(Arc::new(BootstrapState::new(services.clone())));
        machine.register_state(Arc::new(MainMenuState::new(services.clone())));
        machine.register_state(Arc::new(GameplayState::new(services)));
        info!(levels = config.levels.len(), "game assembled");

        Self {
            config,
            bus,
            machine,
            spawner,
            session,
            loader,
            windows,
            progress,
        }
    }

    /// Enter the bootstrap state. Returns once the main menu is up.
    pub async fn boot(&self) -> Result<(), MachineError> {
        self.machine.enter(StateId::Bootstrap).await
    }

    /// Pick `level_index` as if from the menu.
    pub fn select_level(&self, level_index: u32) {
        self.bus.fire(LevelSelected { level_index });
    }

    /// A frame driver over this game's services.
    pub fn driver(&self) -> FrameDriver {
        FrameDriver::new(
            Arc::clone(&self.bus),
            Arc::clone(&self.spawner),
            Arc::clone(&self.session),
            self.config.arena,
            self.config.player,
        )
    }

    /// Frame interval from configuration.
    pub fn frame_interval(&self) -> Duration {
        self.config.app.frame_interval()
    }

    /// Exit the current state and release every pooled enemy and asset.
    pub async fn shutdown(&self) {
        self.machine.shutdown().await;
        self.spawner.shutdown();
        info!("game shut down");
    }
}
