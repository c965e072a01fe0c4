//! In-process resource loader backed by [`GameConfig`].
//!
//! Scenes and prefabs are synthetic; enemy profiles and level definitions
//! come straight from the configuration. Every load, release and live
//! instance is recorded so tests can check what the game asked for.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use roc_core::config::GameConfig;
use roc_core::ports::{Instance, Resource, ResourceLoader};
use roc_types::{EnemyKind, InstanceId, ViewKey, asset_keys};
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct Ledger {
    loads: Vec<String>,
    releases: Vec<String>,
    instances: BTreeMap<InstanceId, String>,
}

/// [`ResourceLoader`] serving assets from configuration.
#[derive(Debug)]
pub struct CatalogLoader {
    config: Arc<GameConfig>,
    latency: Duration,
    next_instance: AtomicU64,
    ledger: Mutex<Ledger>,
}

impl CatalogLoader {
    /// Create a loader over `config`, delaying every load by the
    /// configured latency.
    pub fn new(config: Arc<GameConfig>) -> Self {
        let latency = config.app.load_latency();
        Self {
            config,
            latency,
            next_instance: AtomicU64::new(1),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How many times `key` has been loaded.
    pub fn load_count(&self, key: &str) -> usize {
        self.ledger().loads.iter().filter(|k| *k == key).count()
    }

    /// How many times `key` has been released.
    pub fn release_count(&self, key: &str) -> usize {
        self.ledger().releases.iter().filter(|k| *k == key).count()
    }

    /// Number of instances created and not yet destroyed.
    pub fn live_instances(&self) -> usize {
        self.ledger().instances.len()
    }

    fn resolve(&self, key: &str) -> Option<Resource> {
        if key == asset_keys::MAIN_MENU_SCENE || key == asset_keys::GAMEPLAY_SCENE {
            return Some(Resource::Scene {
                key: key.to_owned(),
            });
        }
        if key == asset_keys::PLAYER || is_view_key(key) {
            return Some(Resource::Prefab {
                key: key.to_owned(),
            });
        }
        if let Some(kind) = EnemyKind::ALL.into_iter().find(|k| k.prefab_key() == key) {
            return self.config.enemies.contains_key(&kind).then(|| Resource::Prefab {
                key: key.to_owned(),
            });
        }
        if let Some(kind) = EnemyKind::ALL.into_iter().find(|k| k.profile_key() == key) {
            return self.config.enemies.get(&kind).copied().map(Resource::EnemyProfile);
        }
        let index = key
            .strip_prefix(asset_keys::LEVEL_PREFIX)
            .and_then(|n| n.parse::<u32>().ok())?;
        self.config.level(index).cloned().map(Resource::Level)
    }
}

fn is_view_key(key: &str) -> bool {
    ViewKey::ALL.into_iter().any(|view| view.asset_key() == key)
}

#[async_trait]
impl ResourceLoader for CatalogLoader {
    async fn load(&self, key: &str) -> Option<Resource> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let resource = self.resolve(key);
        if resource.is_some() {
            trace!(key, "resource loaded");
            self.ledger().loads.push(key.to_owned());
        } else {
            warn!(key, "resource not found");
        }
        resource
    }

    async fn instantiate(&self, key: &str) -> Option<Instance> {
        match self.load(key).await {
            Some(Resource::Prefab { .. }) => {
                let id = InstanceId::new(self.next_instance.fetch_add(1, Ordering::Relaxed));
                self.ledger().instances.insert(id, key.to_owned());
                debug!(key, instance = %id, "instance created");
                Some(Instance {
                    id,
                    key: key.to_owned(),
                })
            }
            Some(_) => {
                warn!(key, "resource is not instantiable");
                None
            }
            None => None,
        }
    }

    fn release(&self, key: &str) {
        trace!(key, "resource released");
        self.ledger().releases.push(key.to_owned());
    }

    fn destroy_instance(&self, instance: Instance) {
        if self.ledger().instances.remove(&instance.id).is_some() {
            debug!(key = %instance.key, instance = %instance.id, "instance destroyed");
        }
    }
}
