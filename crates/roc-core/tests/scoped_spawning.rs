//! A state that spawns under its entry token stops spawning as soon as the
//! machine leaves it.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use roc_core::CancellationToken;
use roc_core::config::{ArenaConfig, EnemyProfile, PoolConfig, SpawnConfig};
use roc_core::machine::{GameState, StateError, StateMachine};
use roc_core::ports::{Instance, Resource, ResourceLoader};
use roc_core::spawner::SpawnController;
use roc_events::EventBus;
use roc_types::{EnemyKind, StateId, StatePayload};

struct Catalog;

#[async_trait]
impl ResourceLoader for Catalog {
    async fn load(&self, key: &str) -> Option<Resource> {
        if key.starts_with("EnemyConfigs/") {
            return Some(Resource::EnemyProfile(EnemyProfile {
                health: 2,
                points: 5,
                move_speed: 1.0,
            }));
        }
        Some(Resource::Prefab {
            key: key.to_owned(),
        })
    }

    async fn instantiate(&self, _key: &str) -> Option<Instance> {
        None
    }

    fn release(&self, _key: &str) {}

    fn destroy_instance(&self, _instance: Instance) {}
}

const SPAWNS: [SpawnConfig; 1] = [SpawnConfig {
    kind: EnemyKind::Fast,
    start_delay_ms: 100,
    interval_ms: 500,
    max_enemies: 10,
}];

struct Arena {
    spawner: Arc<SpawnController>,
}

#[async_trait]
impl GameState for Arena {
    fn id(&self) -> StateId {
        StateId::Gameplay
    }

    async fn enter(
        &self,
        _payload: Option<StatePayload>,
        token: CancellationToken,
    ) -> Result<(), StateError> {
        self.spawner.initialize_pools(&SPAWNS, &token).await?;
        self.spawner.start_spawning(&SPAWNS, &token);
        Ok(())
    }

    async fn exit(&self, _token: CancellationToken) -> Result<(), StateError> {
        Ok(())
    }
}

struct Menu;

#[async_trait]
impl GameState for Menu {
    fn id(&self) -> StateId {
        StateId::MainMenu
    }

    async fn enter(
        &self,
        _payload: Option<StatePayload>,
        _token: CancellationToken,
    ) -> Result<(), StateError> {
        Ok(())
    }

    async fn exit(&self, _token: CancellationToken) -> Result<(), StateError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn leaving_the_state_cancels_its_spawn_loops() {
    let spawner = Arc::new(SpawnController::new(
        Arc::new(Catalog),
        Arc::new(EventBus::new()),
        ArenaConfig::default(),
        PoolConfig::default(),
    ));
    let machine = StateMachine::new();
    machine.register_state(Arc::new(Arena {
        spawner: Arc::clone(&spawner),
    }));
    machine.register_state(Arc::new(Menu));

    machine.enter(StateId::Gameplay).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    let spawned = spawner.active_count(EnemyKind::Fast);
    assert_eq!(spawned, 3);

    machine.enter(StateId::MainMenu).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(spawner.active_count(EnemyKind::Fast), spawned);
}
