//! Interfaces of the collaborators the core consumes but does not own.
//!
//! Asset streaming, persistence and UI presentation live outside the core.
//! States and the spawn controller only ever see these traits; the game
//! binary supplies in-process adapters and tests supply fakes.
//!
//! Lookups that can legitimately miss return `Option` rather than an
//! error, so callers always get to run their own cleanup.

use async_trait::async_trait;
use roc_types::{InstanceId, ProgressData, UiLayer, ViewKey};

use crate::config::{EnemyProfile, LevelConfig};

/// Errors surfaced by collaborator adapters.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Underlying storage I/O failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Data could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// The collaborator refused the request.
    #[error("rejected: {reason}")]
    Rejected {
        /// Why the request was refused.
        reason: String,
    },
}

/// A loaded, shareable resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// An instantiable template (enemy or player body).
    Prefab {
        /// Key the prefab was loaded under.
        key: String,
    },
    /// Gameplay numbers for one enemy category.
    EnemyProfile(EnemyProfile),
    /// A loaded scene.
    Scene {
        /// Key the scene was loaded under.
        key: String,
    },
    /// A level definition.
    Level(LevelConfig),
}

/// A live object created from a prefab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// Identifier assigned by the loader.
    pub id: InstanceId,
    /// Prefab key the instance was created from.
    pub key: String,
}

/// Asset access: load, instantiate, release.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Load the resource stored under `key`. `None` when it does not exist.
    async fn load(&self, key: &str) -> Option<Resource>;

    /// Create a live instance of the prefab stored under `key`.
    async fn instantiate(&self, key: &str) -> Option<Instance>;

    /// Release a resource previously returned by [`load`](Self::load).
    /// Releasing a key that is not loaded is a no-op.
    fn release(&self, key: &str);

    /// Destroy an instance previously returned by
    /// [`instantiate`](Self::instantiate).
    fn destroy_instance(&self, instance: Instance);
}

/// Persistence of [`ProgressData`]. The encoding is the adapter's concern.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load saved progress, falling back to fresh progress when nothing
    /// usable is stored.
    async fn load_progress(&self) -> ProgressData;

    /// Persist `progress`.
    async fn save_progress(&self, progress: &ProgressData) -> Result<(), PortError>;
}

/// Window presentation.
#[async_trait]
pub trait WindowManager: Send + Sync {
    /// Show `view` on `layer`.
    async fn show_window(&self, view: ViewKey, layer: UiLayer) -> Result<(), PortError>;

    /// Hide `view` if it is shown. Hiding a hidden view is a no-op.
    async fn hide_window(&self, view: ViewKey);

    /// Hide every view currently shown on `layer`.
    async fn hide_layer(&self, layer: UiLayer);
}
