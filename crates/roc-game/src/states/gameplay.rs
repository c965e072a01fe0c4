//! Playing a level: setup, scoring, game over and teardown.
//!
//! Everything one entry acquires (subscriptions, the player instance,
//! loaded level assets) is recorded on a [`GameplayEntry`]. Teardown takes
//! from that record, so it is idempotent and only ever touches the entry it
//! belongs to, even when a cancelled `enter` unwinds after a newer entry
//! has started.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use roc_core::CancellationToken;
use roc_core::cancel::{self, Cancelled};
use roc_core::config::LevelConfig;
use roc_core::machine::{GameState, StateError};
use roc_core::ports::{Instance, Resource, ResourceLoader};
use roc_events::{
    EnemyKilled, GameOverScreenOpened, HeightChanged, LevelLoaded, LevelUnloading,
    MaxHeightChanged, MaxSpeedChanged, NextLevel, PlayerDied, PlayerLivesChanged, RestartLevel,
    ReturnToMainMenu, ScoreChanged, SpeedChanged,
};
use roc_types::{StateId, StatePayload, UiLayer, ViewKey, asset_keys};
use tracing::{debug, error, info, warn};

use super::{Services, Subscriptions};
use crate::session::RunSummary;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Resources held by one gameplay entry.
struct GameplayEntry {
    level_index: u32,
    token: CancellationToken,
    subs: Subscriptions,
    player: Mutex<Option<Instance>>,
    loaded: Mutex<Vec<String>>,
    level_loaded: AtomicBool,
}

impl GameplayEntry {
    fn track_resource(&self, key: &str) {
        lock(&self.loaded).push(key.to_owned());
    }

    fn track_player(&self, loader: &dyn ResourceLoader, player: Instance) {
        let mut slot = lock(&self.player);
        if self.token.is_cancelled() {
            drop(slot);
            loader.destroy_instance(player);
            return;
        }
        *slot = Some(player);
    }

    /// Cancel the entry and give back everything it acquired.
    fn teardown(&self, loader: &dyn ResourceLoader) {
        self.token.cancel();
        self.subs.clear();
        let player = lock(&self.player).take();
        if let Some(player) = player {
            loader.destroy_instance(player);
        }
        let loaded = std::mem::take(&mut *lock(&self.loaded));
        for key in &loaded {
            loader.release(key);
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Runs one level: loads it, keeps score, and handles game over.
pub struct GameplayState {
    services: Services,
    entry: Mutex<Option<Arc<GameplayEntry>>>,
}

impl core::fmt::Debug for GameplayState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GameplayState")
            .field("level", &lock(&self.entry).as_ref().map(|e| e.level_index))
            .finish_non_exhaustive()
    }
}

impl GameplayState {
    /// Create the state.
    pub const fn new(services: Services) -> Self {
        Self {
            services,
            entry: Mutex::new(None),
        }
    }

    async fn setup(&self, entry: &Arc<GameplayEntry>) -> Result<(), StateError> {
        let services = &self.services;
        let token = &entry.token;
        let level_index = entry.level_index;

        let progress = cancel::guard(token, services.store.load_progress()).await?;
        services.set_progress(progress);

        if cancel::guard(token, services.loader.load(asset_keys::GAMEPLAY_SCENE))
            .await?
            .is_some()
        {
            entry.track_resource(asset_keys::GAMEPLAY_SCENE);
        } else {
            warn!(key = asset_keys::GAMEPLAY_SCENE, "gameplay scene missing");
        }

        let level_key = asset_keys::level(level_index);
        let level = match cancel::guard(token, services.loader.load(&level_key)).await? {
            Some(Resource::Level(level)) => level,
            _ => return Err(StateError::ResourceMissing { key: level_key }),
        };
        entry.track_resource(&level_key);

        cancel::guard(token, services.windows.show_window(ViewKey::GameHud, UiLayer::Hud))
            .await??;
        cancel::guard(token, services.windows.hide_layer(UiLayer::Loading)).await?;

        let lives = services.config.player.lives;
        services.bus.fire(PlayerLivesChanged {
            current: lives,
            max: lives,
        });
        services.bus.fire(ScoreChanged { score: 0 });
        services.bus.fire(HeightChanged { height: 0.0 });
        services.bus.fire(SpeedChanged { speed: 0.0 });

        let Some(player) = cancel::guard(token, services.loader.instantiate(asset_keys::PLAYER)).await?
        else {
            return Err(StateError::ResourceMissing {
                key: asset_keys::PLAYER.to_owned(),
            });
        };
        entry.track_player(services.loader.as_ref(), player);

        services.spawner.initialize_pools(&level.spawns, token).await?;
        cancel::checkpoint(token)?;
        services.session.begin(level_index, lives);
        services.spawner.start_spawning(&level.spawns, token);
        entry.level_loaded.store(true, Ordering::SeqCst);
        services.bus.fire(LevelLoaded { level_index });

        self.subscribe(entry, &level);
        info!(
            level_index,
            name = %level.name,
            target_score = level.target_score,
            subscriptions = entry.subs.len(),
            "level started"
        );
        Ok(())
    }

    fn subscribe(&self, entry: &Arc<GameplayEntry>, level: &LevelConfig) {
        let target_score = level.target_score;

        let services = self.services.clone();
        let weak = Arc::downgrade(entry);
        entry.subs.add::<EnemyKilled, _>(move |event| {
            let Some(score) = services.session.add_score(event.points) else {
                return;
            };
            services.bus.fire(ScoreChanged { score });
            if target_score > 0 && score >= target_score {
                info!(score, target_score, "level target reached");
                begin_game_over(&services, &weak, true);
            }
        });

        let services = self.services.clone();
        let weak = Arc::downgrade(entry);
        entry.subs.add::<PlayerDied, _>(move |event| {
            info!(final_score = event.final_score, "player died");
            begin_game_over(&services, &weak, false);
        });

        let bus = Arc::clone(&self.services.bus);
        entry.subs.add::<MaxHeightChanged, _>(move |event| {
            bus.fire(HeightChanged {
                height: event.value,
            });
        });

        let bus = Arc::clone(&self.services.bus);
        entry.subs.add::<MaxSpeedChanged, _>(move |event| {
            bus.fire(SpeedChanged { speed: event.value });
        });
    }
}

fn begin_game_over(services: &Services, entry: &Weak<GameplayEntry>, is_win: bool) {
    let Some(entry) = entry.upgrade() else {
        return;
    };
    let Some(summary) = services.session.finish() else {
        debug!("run already finished");
        return;
    };
    let services = services.clone();
    tokio::spawn(async move {
        if run_game_over(&services, &entry, summary, is_win).await.is_err() {
            debug!(level_index = summary.level_index, "game over interrupted");
        }
    });
}

async fn run_game_over(
    services: &Services,
    entry: &GameplayEntry,
    summary: RunSummary,
    is_win: bool,
) -> Result<(), Cancelled> {
    cancel::checkpoint(&entry.token)?;
    let level_index = summary.level_index;
    services.spawner.stop_spawning();

    let mut progress = services.progress();
    progress.record_run(level_index, summary.score, summary.max_height, summary.max_speed);
    let next = level_index.saturating_add(1);
    if is_win && services.config.level(next).is_some() {
        progress.unlock_next(level_index);
        info!(level_index = next, "level unlocked");
    }
    services.set_progress(progress.clone());

    match cancel::guard(&entry.token, services.store.save_progress(&progress)).await? {
        Ok(()) => debug!(total_score = progress.total_score, "progress saved"),
        Err(e) => error!(error = %e, "failed to save progress"),
    }

    if let Err(e) = cancel::guard(
        &entry.token,
        services.windows.show_window(ViewKey::GameOver, UiLayer::Popup),
    )
    .await?
    {
        warn!(error = %e, "could not show game over view");
    }

    let s = services.clone();
    entry.subs.add::<ReturnToMainMenu, _>(move |_| {
        s.request_transition(StateId::MainMenu, None);
    });
    let s = services.clone();
    entry.subs.add::<RestartLevel, _>(move |event| {
        s.request_transition(StateId::Gameplay, Some(StatePayload::Level(event.level_index)));
    });
    let s = services.clone();
    entry.subs.add::<NextLevel, _>(move |event| {
        s.request_transition(StateId::Gameplay, Some(StatePayload::Level(event.level_index)));
    });
    cancel::checkpoint(&entry.token)?;

    info!(is_win, level_index, score = summary.score, "game over");
    services.bus.fire(GameOverScreenOpened {
        is_win,
        level_index,
        score: summary.score,
    });
    Ok(())
}

#[async_trait]
impl GameState for GameplayState {
    fn id(&self) -> StateId {
        StateId::Gameplay
    }

    async fn enter(
        &self,
        payload: Option<StatePayload>,
        token: CancellationToken,
    ) -> Result<(), StateError> {
        let level_index = match payload {
            Some(StatePayload::Level(index)) => index,
            None => 0,
        };
        let scope = token.child_token();
        let entry = Arc::new(GameplayEntry {
            level_index,
            subs: Subscriptions::new(Arc::clone(&self.services.bus), scope.clone()),
            token: scope,
            player: Mutex::new(None),
            loaded: Mutex::new(Vec::new()),
            level_loaded: AtomicBool::new(false),
        });
        let stale = lock(&self.entry).replace(Arc::clone(&entry));
        if let Some(stale) = stale {
            stale.teardown(self.services.loader.as_ref());
        }

        info!(level_index, "loading level");
        match self.setup(&entry).await {
            Ok(()) => Ok(()),
            Err(StateError::Cancelled) => {
                entry.teardown(self.services.loader.as_ref());
                Err(StateError::Cancelled)
            }
            Err(e) => {
                error!(level_index, error = %e, "level setup failed, returning to menu");
                entry.teardown(self.services.loader.as_ref());
                self.services.request_transition(StateId::MainMenu, None);
                Err(e)
            }
        }
    }

    async fn exit(&self, _token: CancellationToken) -> Result<(), StateError> {
        let Some(entry) = lock(&self.entry).take() else {
            return Ok(());
        };
        let services = &self.services;
        if entry.level_loaded.load(Ordering::SeqCst) {
            services.bus.fire(LevelUnloading {
                level_index: entry.level_index,
            });
        }
        entry.teardown(services.loader.as_ref());
        services.spawner.stop_spawning();
        services.session.finish();
        services.windows.hide_window(ViewKey::GameHud).await;
        services.windows.hide_window(ViewKey::GameOver).await;
        debug!(level_index = entry.level_index, "level unloaded");
        Ok(())
    }
}
