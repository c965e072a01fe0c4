//! The event catalogue.
//!
//! Each event is a small immutable value type. [`register_events!`] ties the
//! catalogue together: it generates the closed [`EventKind`] tag set, the
//! [`GameEvent`] envelope the bus dispatches internally, and the [`Event`]
//! impl for every listed type. Adding an event means declaring its struct
//! and listing it in the macro call at the bottom of this file.

/// A value that can be fired on the [`EventBus`](crate::EventBus).
///
/// Implemented by [`register_events!`]; do not implement by hand.
pub trait Event: Clone + Send + Sync + 'static {
    /// Compile-time tag identifying the event's channel on the bus.
    const KIND: EventKind;

    /// Wrap the event into the bus envelope.
    fn into_envelope(self) -> GameEvent;

    /// Borrow the event back out of an envelope of the matching kind.
    fn from_envelope(envelope: &GameEvent) -> Option<&Self>;
}

/// Generates [`EventKind`], [`GameEvent`] and the [`Event`] impls.
macro_rules! register_events {
    ($($name:ident),+ $(,)?) => {
        /// Closed tag set: one variant per event type in the catalogue.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum EventKind {
            $(
                #[doc = concat!("Tag of [`", stringify!($name), "`].")]
                $name,
            )+
        }

        impl core::fmt::Display for EventKind {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let name = match self {
                    $(Self::$name => stringify!($name),)+
                };
                f.write_str(name)
            }
        }

        /// Envelope carrying any catalogue event through the bus.
        #[derive(Debug, Clone, PartialEq)]
        pub enum GameEvent {
            $(
                #[doc = concat!("Envelope for [`", stringify!($name), "`].")]
                $name($name),
            )+
        }

        impl GameEvent {
            /// Tag of the wrapped event.
            pub const fn kind(&self) -> EventKind {
                match self {
                    $(Self::$name(_) => EventKind::$name,)+
                }
            }
        }

        $(
            impl Event for $name {
                const KIND: EventKind = EventKind::$name;

                fn into_envelope(self) -> GameEvent {
                    GameEvent::$name(self)
                }

                #[allow(unreachable_patterns)]
                fn from_envelope(envelope: &GameEvent) -> Option<&Self> {
                    match envelope {
                        GameEvent::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )+
    };
}

// ---------------------------------------------------------------------------
// Enemies
// ---------------------------------------------------------------------------

/// An enemy was defeated and returned to its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyKilled {
    /// Points awarded for the kill.
    pub points: u32,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// The player lost a life but is still alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDamaged {
    /// Lives left after the hit.
    pub remaining_lives: u32,
}

/// The player ran out of lives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerDied {
    /// Score at the moment of death.
    pub final_score: u64,
    /// Highest point reached during the run.
    pub max_height: f32,
    /// Fastest speed reached during the run.
    pub max_speed: f32,
}

/// The player reached a new height record for the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxHeightChanged {
    /// The new record.
    pub value: f32,
}

/// The player reached a new speed record for the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxSpeedChanged {
    /// The new record.
    pub value: f32,
}

// ---------------------------------------------------------------------------
// HUD
// ---------------------------------------------------------------------------

/// HUD: the score display should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreChanged {
    /// Current score.
    pub score: u64,
}

/// HUD: the height display should change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightChanged {
    /// Current best height.
    pub height: f32,
}

/// HUD: the speed display should change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedChanged {
    /// Current best speed.
    pub speed: f32,
}

/// HUD: the lives display should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLivesChanged {
    /// Lives left.
    pub current: u32,
    /// Lives at the start of the level.
    pub max: u32,
}

// ---------------------------------------------------------------------------
// Menus
// ---------------------------------------------------------------------------

/// The player picked a level in the level selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSelected {
    /// Zero-based level index.
    pub level_index: u32,
}

/// The player opened the level selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSelectionOpened;

/// The player navigated back to the title screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainMenuOpened;

/// Game over screen: back to the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnToMainMenu;

/// Game over screen: replay a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartLevel {
    /// Level to replay.
    pub level_index: u32,
}

/// Game over screen: continue to a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextLevel {
    /// Level to start.
    pub level_index: u32,
}

/// The game over screen was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOverScreenOpened {
    /// Whether the level was completed rather than failed.
    pub is_win: bool,
    /// Level that just ended.
    pub level_index: u32,
    /// Final score.
    pub score: u64,
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// A level finished loading and its spawn loops are running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelLoaded {
    /// Level that was loaded.
    pub level_index: u32,
}

/// A level is about to be torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUnloading {
    /// Level being unloaded.
    pub level_index: u32,
}

register_events! {
    EnemyKilled,
    PlayerDamaged,
    PlayerDied,
    MaxHeightChanged,
    MaxSpeedChanged,
    ScoreChanged,
    HeightChanged,
    SpeedChanged,
    PlayerLivesChanged,
    LevelSelected,
    LevelSelectionOpened,
    MainMenuOpened,
    ReturnToMainMenu,
    RestartLevel,
    NextLevel,
    GameOverScreenOpened,
    LevelLoaded,
    LevelUnloading,
}
