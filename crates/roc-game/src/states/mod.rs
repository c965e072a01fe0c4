//! Application states: bootstrap, main menu and gameplay.
//!
//! Each state is registered once with the [`StateMachine`] and shares the
//! same [`Services`] bundle. States never hold a strong reference to the
//! machine; transitions requested from event handlers run on their own
//! tokio task so the handler returns before the machine starts exiting
//! the state that owns it.

mod bootstrap;
mod gameplay;
mod menu;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use roc_core::CancellationToken;
use roc_core::config::GameConfig;
use roc_core::machine::StateMachine;
use roc_core::ports::{ProgressStore, ResourceLoader, WindowManager};
use roc_core::spawner::SpawnController;
use roc_events::{Event, EventBus};
use roc_types::{ProgressData, StateId, StatePayload};
use tracing::{debug, error};

pub use bootstrap::BootstrapState;
pub use gameplay::GameplayState;
pub use menu::MainMenuState;

use crate::session::RunSession;

/// Everything a state needs to talk to the rest of the game.
#[derive(Clone)]
pub struct Services {
    /// Loaded configuration.
    pub config: Arc<GameConfig>,
    /// Shared event bus.
    pub bus: Arc<EventBus>,
    /// Asset access.
    pub loader: Arc<dyn ResourceLoader>,
    /// Window presentation.
    pub windows: Arc<dyn WindowManager>,
    /// Progress persistence.
    pub store: Arc<dyn ProgressStore>,
    /// Enemy pools and spawn loops.
    pub spawner: Arc<SpawnController>,
    /// The level run in progress.
    pub session: Arc<RunSession>,
    /// Last loaded or saved progress.
    pub progress: Arc<Mutex<ProgressData>>,
    /// The machine the states are registered with.
    pub machine: Weak<StateMachine>,
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services")
            .field("bus", &self.bus)
            .field("spawner", &self.spawner)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Current progress.
    pub fn progress(&self) -> ProgressData {
        self.lock_progress().clone()
    }

    /// Replace the cached progress.
    pub fn set_progress(&self, progress: ProgressData) {
        *self.lock_progress() = progress;
    }

    fn lock_progress(&self) -> MutexGuard<'_, ProgressData> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the machine to enter `id` from a fresh task.
    pub fn request_transition(&self, id: StateId, payload: Option<StatePayload>) {
        let machine = self.machine.clone();
        tokio::spawn(async move {
            let Some(machine) = machine.upgrade() else {
                debug!(state = %id, "machine gone, dropping transition request");
                return;
            };
            let result = match payload {
                Some(payload) => machine.enter_with(id, payload).await,
                None => machine.enter(id).await,
            };
            if let Err(e) = result {
                error!(state = %id, error = %e, "requested transition failed");
            }
        });
    }
}

type Unsubscribe = Box<dyn FnOnce(&EventBus) + Send>;

/// Bus subscriptions owned by one state entry.
///
/// Tied to the entry's token: once the token is cancelled, [`add`] refuses
/// new subscriptions. Checking the token and registering happen under the
/// same lock that [`clear`] takes, so an entry that is cancelled and then
/// cleared can never be left holding a subscription.
///
/// [`add`]: Subscriptions::add
/// [`clear`]: Subscriptions::clear
pub struct Subscriptions {
    bus: Arc<EventBus>,
    token: CancellationToken,
    entries: Mutex<Vec<Unsubscribe>>,
}

impl core::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("count", &self.len())
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Subscriptions {
    /// Create an empty set bound to `token`.
    pub fn new(bus: Arc<EventBus>, token: CancellationToken) -> Self {
        Self {
            bus,
            token,
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Unsubscribe>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe `handler` to `E`. Returns `false` without subscribing when
    /// the owning entry is already cancelled.
    pub fn add<E, F>(&self, handler: F) -> bool
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut entries = self.lock();
        if self.token.is_cancelled() {
            debug!(kind = %E::KIND, "entry cancelled, subscription refused");
            return false;
        }
        let id = self.bus.subscribe::<E, F>(handler);
        entries.push(Box::new(move |bus: &EventBus| bus.unsubscribe::<E>(id)));
        true
    }

    /// Unsubscribe everything added so far.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.lock());
        for unsubscribe in entries {
            unsubscribe(&self.bus);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no subscription is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
