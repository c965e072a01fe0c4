//! Application state machine.
//!
//! Holds one registered instance per [`StateId`] and runs transitions
//! between them. Every transition cancels the previous cancellation scope
//! before anything else happens, so work still in flight in the outgoing
//! state unwinds at its next suspension point. Only the most recent
//! transition request ever reaches its target's `enter`.
//!
//! States are shared behind `Arc<dyn GameState>` and may call back into the
//! machine from inside their own `enter` (bootstrap does exactly that). The
//! machine never holds its lock across an `.await`, so such nested
//! transitions cannot deadlock.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::FutureExt;
use roc_types::{StateId, StatePayload};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cancel::Cancelled;
use crate::ports::PortError;

/// Errors returned to the caller of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    /// No state is registered under the requested id.
    #[error("state {0} is not registered")]
    StateNotRegistered(StateId),
}

/// Errors a state's `enter` or `exit` may end with. The machine logs these
/// and never propagates them.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The state's scope was cancelled by a newer transition or shutdown.
    #[error("state work cancelled")]
    Cancelled,

    /// A required resource could not be loaded.
    #[error("resource missing: {key}")]
    ResourceMissing {
        /// Key of the missing resource.
        key: String,
    },

    /// A collaborator failed.
    #[error("collaborator error: {source}")]
    Port {
        /// The underlying port error.
        #[from]
        source: PortError,
    },
}

impl From<Cancelled> for StateError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// One application-level mode of the game.
///
/// Implementations are registered once and reused across transitions, so
/// per-entry data lives behind interior mutability and is reset in
/// `enter`/`exit`. `exit` may be called on a state whose `enter` never
/// finished and must tolerate that.
#[async_trait]
pub trait GameState: Send + Sync {
    /// Registration key.
    fn id(&self) -> StateId;

    /// Activate the state. `token` is cancelled when a newer transition
    /// starts; every suspension point should observe it.
    async fn enter(
        &self,
        payload: Option<StatePayload>,
        token: CancellationToken,
    ) -> Result<(), StateError>;

    /// Deactivate the state. `token` belongs to the incoming transition.
    async fn exit(&self, token: CancellationToken) -> Result<(), StateError>;
}

struct Inner {
    states: HashMap<StateId, Arc<dyn GameState>>,
    current: Option<Arc<dyn GameState>>,
    scope: CancellationToken,
    generation: u64,
}

/// Owner of the registered states and the active cancellation scope.
pub struct StateMachine {
    root: CancellationToken,
    inner: Mutex<Inner>,
}

impl core::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.lock();
        f.debug_struct("StateMachine")
            .field("registered", &inner.states.len())
            .field("current", &inner.current.as_ref().map(|s| s.id()))
            .field("generation", &inner.generation)
            .finish_non_exhaustive()
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create an empty machine with its own root scope.
    pub fn new() -> Self {
        let root = CancellationToken::new();
        let scope = root.child_token();
        Self {
            root,
            inner: Mutex::new(Inner {
                states: HashMap::new(),
                current: None,
                scope,
                generation: 0,
            }),
        }
    }

    /// Register `state` under its own id, replacing any previous state with
    /// that id.
    pub fn register_state(&self, state: Arc<dyn GameState>) {
        let id = state.id();
        if self.lock().states.insert(id, state).is_some() {
            debug!(state = %id, "state re-registered");
        } else {
            debug!(state = %id, "state registered");
        }
    }

    /// Whether a state is registered under `id`.
    pub fn is_registered(&self, id: StateId) -> bool {
        self.lock().states.contains_key(&id)
    }

    /// Id of the current state, if any.
    pub fn current_state(&self) -> Option<StateId> {
        self.lock().current.as_ref().map(|s| s.id())
    }

    /// Transition to `id` without a payload.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::StateNotRegistered`] if nothing is registered
    /// under `id`.
    pub async fn enter(&self, id: StateId) -> Result<(), MachineError> {
        self.transition(id, None).await
    }

    /// Transition to `id`, handing `payload` to its `enter`.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::StateNotRegistered`] if nothing is registered
    /// under `id`.
    pub async fn enter_with(&self, id: StateId, payload: StatePayload) -> Result<(), MachineError> {
        self.transition(id, Some(payload)).await
    }

    /// Cancel every in-flight state operation, then exit the current state.
    ///
    /// The final `exit` runs under a fresh token so it can still reach its
    /// collaborators. Later transitions are ignored.
    pub async fn shutdown(&self) {
        self.root.cancel();
        let previous = {
            let mut inner = self.lock();
            inner.generation = inner.generation.wrapping_add(1);
            inner.current.take()
        };
        if let Some(state) = previous {
            info!(state = %state.id(), "shutting down state machine");
            run_exit(state.as_ref(), CancellationToken::new()).await;
        }
    }

    async fn transition(
        &self,
        id: StateId,
        payload: Option<StatePayload>,
    ) -> Result<(), MachineError> {
        if self.root.is_cancelled() {
            warn!(state = %id, "transition requested after shutdown, ignoring");
            return Ok(());
        }

        let (token, generation, previous) = {
            let mut inner = self.lock();
            inner.scope.cancel();
            inner.scope = self.root.child_token();
            inner.generation = inner.generation.wrapping_add(1);
            (inner.scope.clone(), inner.generation, inner.current.clone())
        };

        if let Some(state) = previous {
            run_exit(state.as_ref(), token.clone()).await;
        }

        let target = {
            let mut inner = self.lock();
            if inner.generation != generation {
                debug!(state = %id, "transition superseded before enter");
                return Ok(());
            }
            let Some(target) = inner.states.get(&id).cloned() else {
                inner.current = None;
                error!(state = %id, "transition target is not registered");
                return Err(MachineError::StateNotRegistered(id));
            };
            inner.current = Some(Arc::clone(&target));
            target
        };

        info!(state = %id, ?payload, "entering state");
        match AssertUnwindSafe(target.enter(payload, token)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(StateError::Cancelled)) => {
                debug!(state = %id, "state enter cancelled");
            }
            Ok(Err(e)) => error!(state = %id, error = %e, "state enter failed"),
            Err(_) => error!(state = %id, "state enter panicked"),
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StateMachine {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn run_exit(state: &dyn GameState, token: CancellationToken) {
    let id = state.id();
    debug!(state = %id, "exiting state");
    match AssertUnwindSafe(state.exit(token)).catch_unwind().await {
        Ok(Ok(()) | Err(StateError::Cancelled)) => {}
        Ok(Err(e)) => error!(state = %id, error = %e, "state exit failed"),
        Err(_) => error!(state = %id, "state exit panicked"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::Weak;

    use super::*;
    use crate::cancel;

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Behaviour {
        Finish,
        WaitForCancel,
        FailExit,
        PanicOnExit,
    }

    struct Recording {
        id: StateId,
        tag: &'static str,
        log: Log,
        behaviour: Behaviour,
    }

    impl Recording {
        fn new(id: StateId, tag: &'static str, log: &Log, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                id,
                tag,
                log: Arc::clone(log),
                behaviour,
            })
        }

        fn push(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    #[async_trait]
    impl GameState for Recording {
        fn id(&self) -> StateId {
            self.id
        }

        async fn enter(
            &self,
            payload: Option<StatePayload>,
            token: CancellationToken,
        ) -> Result<(), StateError> {
            self.push(format!("enter {} {payload:?}", self.tag));
            if self.behaviour == Behaviour::WaitForCancel {
                let result = cancel::guard(&token, std::future::pending::<()>()).await;
                self.push(format!("unwound {}", self.tag));
                result?;
            }
            Ok(())
        }

        async fn exit(&self, _token: CancellationToken) -> Result<(), StateError> {
            self.push(format!("exit {}", self.tag));
            match self.behaviour {
                Behaviour::FailExit => Err(StateError::ResourceMissing {
                    key: "gone".to_owned(),
                }),
                Behaviour::PanicOnExit => panic!("exit blew up"),
                _ => Ok(()),
            }
        }
    }

    /// Enters `next` from inside its own `enter`, like bootstrap does.
    struct Forwarding {
        machine: Weak<StateMachine>,
        next: StateId,
        log: Log,
    }

    #[async_trait]
    impl GameState for Forwarding {
        fn id(&self) -> StateId {
            StateId::Bootstrap
        }

        async fn enter(
            &self,
            _payload: Option<StatePayload>,
            token: CancellationToken,
        ) -> Result<(), StateError> {
            self.log.lock().unwrap().push("enter boot".to_owned());
            cancel::checkpoint(&token)?;
            if let Some(machine) = self.machine.upgrade() {
                machine.enter(self.next).await.unwrap();
            }
            self.log.lock().unwrap().push(format!(
                "boot resumed, cancelled={}",
                token.is_cancelled()
            ));
            Ok(())
        }

        async fn exit(&self, _token: CancellationToken) -> Result<(), StateError> {
            self.log.lock().unwrap().push("exit boot".to_owned());
            Ok(())
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn transition_exits_previous_then_enters_target() {
        let log = Log::default();
        let machine = StateMachine::new();
        machine.register_state(Recording::new(StateId::MainMenu, "menu", &log, Behaviour::Finish));
        machine.register_state(Recording::new(StateId::Gameplay, "game", &log, Behaviour::Finish));

        machine.enter(StateId::MainMenu).await.unwrap();
        machine
            .enter_with(StateId::Gameplay, StatePayload::Level(2))
            .await
            .unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "enter menu None",
                "exit menu",
                "enter game Some(Level(2))",
            ]
        );
        assert_eq!(machine.current_state(), Some(StateId::Gameplay));
    }

    #[tokio::test]
    async fn unregistered_target_is_an_error() {
        let log = Log::default();
        let machine = StateMachine::new();
        machine.register_state(Recording::new(StateId::MainMenu, "menu", &log, Behaviour::Finish));
        machine.enter(StateId::MainMenu).await.unwrap();

        let err = machine.enter(StateId::Gameplay).await.unwrap_err();

        assert_eq!(err, MachineError::StateNotRegistered(StateId::Gameplay));
        assert_eq!(entries(&log), vec!["enter menu None", "exit menu"]);
        assert_eq!(machine.current_state(), None);
    }

    #[tokio::test]
    async fn newer_transition_cancels_pending_enter() {
        let log = Log::default();
        let machine = Arc::new(StateMachine::new());
        machine.register_state(Recording::new(
            StateId::MainMenu,
            "slow",
            &log,
            Behaviour::WaitForCancel,
        ));
        machine.register_state(Recording::new(StateId::Gameplay, "game", &log, Behaviour::Finish));

        let first = {
            let machine = Arc::clone(&machine);
            tokio::spawn(async move { machine.enter(StateId::MainMenu).await })
        };
        while entries(&log).is_empty() {
            tokio::task::yield_now().await;
        }

        machine.enter(StateId::Gameplay).await.unwrap();
        first.await.unwrap().unwrap();

        let log = entries(&log);
        assert_eq!(log.first().unwrap(), "enter slow None");
        assert!(log.contains(&"unwound slow".to_owned()));
        assert!(log.contains(&"exit slow".to_owned()));
        assert!(log.contains(&"enter game None".to_owned()));
        assert_eq!(machine.current_state(), Some(StateId::Gameplay));
    }

    #[tokio::test]
    async fn nested_transition_from_enter_completes() {
        let log = Log::default();
        let machine = Arc::new(StateMachine::new());
        machine.register_state(Arc::new(Forwarding {
            machine: Arc::downgrade(&machine),
            next: StateId::MainMenu,
            log: Arc::clone(&log),
        }));
        machine.register_state(Recording::new(StateId::MainMenu, "menu", &log, Behaviour::Finish));

        machine.enter(StateId::Bootstrap).await.unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "enter boot",
                "exit boot",
                "enter menu None",
                "boot resumed, cancelled=true",
            ]
        );
        assert_eq!(machine.current_state(), Some(StateId::MainMenu));
    }

    #[tokio::test]
    async fn failing_exit_does_not_block_transition() {
        let log = Log::default();
        let machine = StateMachine::new();
        machine.register_state(Recording::new(StateId::MainMenu, "menu", &log, Behaviour::FailExit));
        machine.register_state(Recording::new(StateId::Gameplay, "game", &log, Behaviour::Finish));

        machine.enter(StateId::MainMenu).await.unwrap();
        machine.enter(StateId::Gameplay).await.unwrap();

        assert_eq!(machine.current_state(), Some(StateId::Gameplay));
    }

    #[tokio::test]
    async fn panicking_exit_does_not_block_transition() {
        let log = Log::default();
        let machine = StateMachine::new();
        machine.register_state(Recording::new(
            StateId::MainMenu,
            "menu",
            &log,
            Behaviour::PanicOnExit,
        ));
        machine.register_state(Recording::new(StateId::Gameplay, "game", &log, Behaviour::Finish));

        machine.enter(StateId::MainMenu).await.unwrap();
        machine.enter(StateId::Gameplay).await.unwrap();

        assert_eq!(entries(&log).last().unwrap(), "enter game None");
        assert_eq!(machine.current_state(), Some(StateId::Gameplay));
    }

    #[tokio::test]
    async fn re_registering_replaces_state() {
        let log = Log::default();
        let machine = StateMachine::new();
        machine.register_state(Recording::new(StateId::MainMenu, "old", &log, Behaviour::Finish));
        machine.register_state(Recording::new(StateId::MainMenu, "new", &log, Behaviour::Finish));
        assert!(machine.is_registered(StateId::MainMenu));
        assert!(!machine.is_registered(StateId::Gameplay));

        machine.enter(StateId::MainMenu).await.unwrap();

        assert_eq!(entries(&log), vec!["enter new None"]);
    }

    #[tokio::test]
    async fn shutdown_cancels_and_exits_current() {
        let log = Log::default();
        let machine = Arc::new(StateMachine::new());
        machine.register_state(Recording::new(
            StateId::MainMenu,
            "slow",
            &log,
            Behaviour::WaitForCancel,
        ));

        let pending = {
            let machine = Arc::clone(&machine);
            tokio::spawn(async move { machine.enter(StateId::MainMenu).await })
        };
        while entries(&log).is_empty() {
            tokio::task::yield_now().await;
        }

        machine.shutdown().await;
        pending.await.unwrap().unwrap();

        assert!(entries(&log).contains(&"unwound slow".to_owned()));
        assert!(entries(&log).contains(&"exit slow".to_owned()));
        assert_eq!(machine.current_state(), None);

        machine.enter(StateId::MainMenu).await.unwrap();
        assert_eq!(machine.current_state(), None);
    }
}
