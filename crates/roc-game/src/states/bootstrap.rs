//! First state entered: warm up the menu scene and saved progress.

use async_trait::async_trait;
use roc_core::CancellationToken;
use roc_core::cancel;
use roc_core::machine::{GameState, StateError};
use roc_types::{StateId, StatePayload, asset_keys};
use tracing::{error, info, warn};

use super::Services;

/// Loads the main menu scene and the player's progress, then hands over
/// to the main menu.
#[derive(Debug)]
pub struct BootstrapState {
    services: Services,
}

impl BootstrapState {
    /// Create the state.
    pub const fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl GameState for BootstrapState {
    fn id(&self) -> StateId {
        StateId::Bootstrap
    }

    async fn enter(
        &self,
        _payload: Option<StatePayload>,
        token: CancellationToken,
    ) -> Result<(), StateError> {
        info!("bootstrapping");
        let services = &self.services;

        if cancel::guard(&token, services.loader.load(asset_keys::MAIN_MENU_SCENE))
            .await?
            .is_none()
        {
            warn!(key = asset_keys::MAIN_MENU_SCENE, "main menu scene missing");
        }

        let progress = cancel::guard(&token, services.store.load_progress()).await?;
        info!(
            total_score = progress.total_score,
            levels = progress.levels.len(),
            "progress loaded"
        );
        services.set_progress(progress);

        let Some(machine) = services.machine.upgrade() else {
            return Err(StateError::Cancelled);
        };
        if let Err(e) = machine.enter(StateId::MainMenu).await {
            error!(error = %e, "could not reach main menu");
        }
        Ok(())
    }

    async fn exit(&self, _token: CancellationToken) -> Result<(), StateError> {
        Ok(())
    }
}
