//! Shared type definitions for the ROC arcade runtime.
//!
//! This crate is the vocabulary every other workspace crate speaks: actor
//! identifiers, the closed tag sets for states and enemy categories, UI
//! layers and views, and the persisted player progress record.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe numeric identifiers for runtime entities
//! - [`enums`] -- Closed tag sets (states, enemy kinds, UI layers, views)
//! - [`structs`] -- Plain data records (positions, progress)

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EnemyKind, StateId, StatePayload, UiLayer, ViewKey};
pub use ids::{ActorId, InstanceId};
pub use structs::{LevelProgress, ProgressData, Vec2};

/// Well-known resource keys shared by the states and the resource loader.
pub mod asset_keys {
    /// Scene loaded by the bootstrap state before the menu is shown.
    pub const MAIN_MENU_SCENE: &str = "Scenes/MainMenu";
    /// Scene loaded when gameplay starts.
    pub const GAMEPLAY_SCENE: &str = "Scenes/Gameplay";
    /// Player prefab instantiated by the gameplay state.
    pub const PLAYER: &str = "Player";

    /// Prefix shared by every level config key.
    pub const LEVEL_PREFIX: &str = "Levels/Level";

    /// Key of the level config at `index`.
    pub fn level(index: u32) -> String {
        format!("{LEVEL_PREFIX}{index}")
    }
}
