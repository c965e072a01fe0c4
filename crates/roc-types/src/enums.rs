//! Closed tag sets used as registry keys across the runtime.
//!
//! States, enemy categories and UI views are all known at compile time, so
//! every registry in the workspace is keyed by one of these enums rather
//! than by a runtime type lookup.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Application states
// ---------------------------------------------------------------------------

/// Identity of an application state registered with the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StateId {
    /// Startup: loads the menu scene and the player's progress.
    Bootstrap,
    /// Title screen and level selection.
    MainMenu,
    /// A running level, including its game-over screen.
    Gameplay,
}

impl core::fmt::Display for StateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Bootstrap => "Bootstrap",
            Self::MainMenu => "MainMenu",
            Self::Gameplay => "Gameplay",
        };
        f.write_str(name)
    }
}

/// Typed payload handed to a state on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatePayload {
    /// Zero-based index of the level to play.
    Level(u32),
}

// ---------------------------------------------------------------------------
// Enemy categories
// ---------------------------------------------------------------------------

/// Category of spawnable enemy. Each category owns one object pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Slow melee chaser.
    Basic,
    /// Quick, fragile chaser.
    Fast,
    /// Slow, high-health chaser.
    Tank,
    /// Keeps its distance.
    Ranged,
    /// One per level, worth a lot of points.
    Boss,
}

impl EnemyKind {
    /// Every category, in declaration order.
    pub const ALL: [Self; 5] = [Self::Basic, Self::Fast, Self::Tank, Self::Ranged, Self::Boss];

    /// Resource key of the category's prefab.
    pub fn prefab_key(self) -> String {
        format!("Enemies/{self}Enemy")
    }

    /// Resource key of the category's gameplay profile.
    pub fn profile_key(self) -> String {
        format!("EnemyConfigs/{self}Config")
    }
}

impl core::fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Basic => "Basic",
            Self::Fast => "Fast",
            Self::Tank => "Tank",
            Self::Ranged => "Ranged",
            Self::Boss => "Boss",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// UI
// ---------------------------------------------------------------------------

/// Sorting layer a window is shown on. Higher layers draw on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UiLayer {
    /// Full-screen backdrops.
    Background,
    /// Main screens (menu, level selection).
    Content,
    /// In-game heads-up display.
    Hud,
    /// Dialogs over content.
    Popup,
    /// Loading curtain; above everything gameplay related.
    Loading,
}

/// A window the states can ask the UI manager to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViewKey {
    /// Title screen.
    MainMenu,
    /// Level picker.
    LevelSelection,
    /// Loading curtain.
    Loading,
    /// In-game HUD (score, lives, height, speed).
    GameHud,
    /// Win/lose summary with restart and next-level buttons.
    GameOver,
}

impl ViewKey {
    /// Every view, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::MainMenu,
        Self::LevelSelection,
        Self::Loading,
        Self::GameHud,
        Self::GameOver,
    ];

    /// Resource key of the view asset.
    pub const fn asset_key(self) -> &'static str {
        match self {
            Self::MainMenu => "UI/MainMenuView",
            Self::LevelSelection => "UI/LevelSelectionScreen",
            Self::Loading => "UI/LoadingView",
            Self::GameHud => "UI/GameplayHUDView",
            Self::GameOver => "UI/GameOverView",
        }
    }
}
