//! Title screen and level selection.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use roc_core::CancellationToken;
use roc_core::cancel;
use roc_core::machine::{GameState, StateError};
use roc_events::{LevelSelected, LevelSelectionOpened, MainMenuOpened};
use roc_types::{StateId, StatePayload, UiLayer, ViewKey};
use tracing::{debug, info, warn};

use super::{Services, Subscriptions};

struct MenuEntry {
    token: CancellationToken,
    subs: Subscriptions,
}

/// Shows the main menu and turns level picks into gameplay transitions.
pub struct MainMenuState {
    services: Services,
    entry: Mutex<Option<Arc<MenuEntry>>>,
}

impl core::fmt::Debug for MainMenuState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MainMenuState")
            .field("active", &self.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl MainMenuState {
    /// Create the state.
    pub const fn new(services: Services) -> Self {
        Self {
            services,
            entry: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<MenuEntry>>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, entry: &Arc<MenuEntry>) {
        let services = self.services.clone();
        let token = entry.token.clone();
        entry.subs.add::<LevelSelected, _>(move |event| {
            on_level_selected(&services, &token, event.level_index);
        });

        let services = self.services.clone();
        let token = entry.token.clone();
        entry.subs.add::<LevelSelectionOpened, _>(move |_| {
            let windows = Arc::clone(&services.windows);
            spawn_ui(&token, async move {
                windows.hide_window(ViewKey::MainMenu).await;
                if let Err(e) = windows.show_window(ViewKey::LevelSelection, UiLayer::Content).await {
                    warn!(error = %e, "could not show level selection");
                }
            });
        });

        let services = self.services.clone();
        let token = entry.token.clone();
        entry.subs.add::<MainMenuOpened, _>(move |_| {
            let windows = Arc::clone(&services.windows);
            spawn_ui(&token, async move {
                windows.hide_window(ViewKey::LevelSelection).await;
                if let Err(e) = windows.show_window(ViewKey::MainMenu, UiLayer::Content).await {
                    warn!(error = %e, "could not show main menu");
                }
            });
        });
    }
}

fn spawn_ui(token: &CancellationToken, work: impl Future<Output = ()> + Send + 'static) {
    let token = token.clone();
    tokio::spawn(async move {
        if cancel::guard(&token, work).await.is_err() {
            debug!("menu UI update cancelled");
        }
    });
}

fn on_level_selected(services: &Services, token: &CancellationToken, level_index: u32) {
    if services.config.level(level_index).is_none() {
        warn!(level_index, "selected level does not exist");
        return;
    }
    if !services.progress().is_unlocked(level_index) {
        warn!(level_index, "selected level is locked");
        return;
    }
    info!(level_index, "level selected");

    let services = services.clone();
    let token = token.clone();
    tokio::spawn(async move {
        let windows = Arc::clone(&services.windows);
        let curtain = async move {
            windows.hide_layer(UiLayer::Content).await;
            windows.show_window(ViewKey::Loading, UiLayer::Loading).await
        };
        match cancel::guard(&token, curtain).await {
            Ok(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "could not show loading view");
                }
                services.request_transition(StateId::Gameplay, Some(StatePayload::Level(level_index)));
            }
            Err(_) => debug!(level_index, "menu left before level start"),
        }
    });
}

#[async_trait]
impl GameState for MainMenuState {
    fn id(&self) -> StateId {
        StateId::MainMenu
    }

    async fn enter(
        &self,
        _payload: Option<StatePayload>,
        token: CancellationToken,
    ) -> Result<(), StateError> {
        let scope = token.child_token();
        let entry = Arc::new(MenuEntry {
            subs: Subscriptions::new(Arc::clone(&self.services.bus), scope.clone()),
            token: scope,
        });
        if let Some(stale) = self.lock().replace(Arc::clone(&entry)) {
            stale.token.cancel();
            stale.subs.clear();
        }

        let windows = &self.services.windows;
        cancel::guard(&entry.token, windows.show_window(ViewKey::MainMenu, UiLayer::Content))
            .await??;
        cancel::guard(&entry.token, windows.hide_layer(UiLayer::Loading)).await?;

        self.subscribe(&entry);
        info!(subscriptions = entry.subs.len(), "main menu ready");
        Ok(())
    }

    async fn exit(&self, _token: CancellationToken) -> Result<(), StateError> {
        let Some(entry) = self.lock().take() else {
            return Ok(());
        };
        entry.token.cancel();
        entry.subs.clear();
        let windows = &self.services.windows;
        windows.hide_window(ViewKey::MainMenu).await;
        windows.hide_window(ViewKey::LevelSelection).await;
        debug!("main menu closed");
        Ok(())
    }
}
