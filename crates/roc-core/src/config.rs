//! Game configuration loaded from `roc-config.yaml`.
//!
//! Every section carries `#[serde(default)]`, so an empty document yields
//! the built-in defaults and a partial file only overrides what it names.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use roc_types::EnemyKind;
use serde::Deserialize;

/// Environment variable overriding [`AppConfig::save_path`].
pub const SAVE_PATH_ENV: &str = "ROC_SAVE_PATH";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },

    /// The document parsed but describes an unusable game.
    #[error("invalid config: {message}")]
    Invalid {
        /// What is wrong with it.
        message: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Process-level settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Playfield bounds.
    #[serde(default)]
    pub arena: ArenaConfig,

    /// Player tuning.
    #[serde(default)]
    pub player: PlayerConfig,

    /// Enemy pool sizing.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Per-category enemy numbers.
    #[serde(default = "default_enemies")]
    pub enemies: BTreeMap<EnemyKind, EnemyProfile>,

    /// Levels in play order. Index 0 is the first level.
    #[serde(default = "default_levels")]
    pub levels: Vec<LevelConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            arena: ArenaConfig::default(),
            player: PlayerConfig::default(),
            pool: PoolConfig::default(),
            enemies: default_enemies(),
            levels: default_levels(),
        }
    }
}

impl GameConfig {
    /// Load configuration from a YAML file, apply environment overrides and
    /// validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment overrides
    /// and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml rejects a fully empty document; treat it as `{}`.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(SAVE_PATH_ENV).filter(|p| !p.is_empty()) {
            self.app.save_path = path;
        }
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no level is defined, a spawn
    /// entry has a zero interval, or a size, radius or speed is negative or
    /// not finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_extent("arena.width", self.arena.width)?;
        check_extent("arena.height", self.arena.height)?;
        check_extent("player.attack_radius", self.player.attack_radius)?;
        check_extent("player.contact_radius", self.player.contact_radius)?;
        for (kind, profile) in &self.enemies {
            check_extent(&format!("enemies.{kind}.move_speed"), profile.move_speed)?;
        }
        if self.levels.is_empty() {
            return Err(ConfigError::Invalid {
                message: "at least one level must be defined".to_owned(),
            });
        }
        for level in &self.levels {
            if let Some(spawn) = level.spawns.iter().find(|s| s.interval_ms == 0) {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "level '{}': spawn interval for {} must be non-zero",
                        level.name, spawn.kind
                    ),
                });
            }
        }
        Ok(())
    }

    /// Level definition by zero-based index.
    pub fn level(&self, level_index: u32) -> Option<&LevelConfig> {
        self.levels.get(usize::try_from(level_index).ok()?)
    }
}

fn check_extent(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            message: format!("{field} must be finite and non-negative, got {value}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Display name used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Milliseconds between frame driver ticks.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Frames to run before exiting. Zero runs until interrupted.
    #[serde(default)]
    pub max_frames: u64,

    /// Where player progress is stored.
    #[serde(default = "default_save_path")]
    pub save_path: String,

    /// Artificial delay added to every resource load, in milliseconds.
    #[serde(default)]
    pub load_latency_ms: u64,
}

impl AppConfig {
    /// Frame interval as a [`Duration`].
    pub const fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Resource load latency as a [`Duration`].
    pub const fn load_latency(&self) -> Duration {
        Duration::from_millis(self.load_latency_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            frame_interval_ms: default_frame_interval_ms(),
            max_frames: 0,
            save_path: default_save_path(),
            load_latency_ms: 0,
        }
    }
}

/// Playfield bounds. Spawn positions are drawn uniformly from
/// `[-width/2, width/2] x [-height/2, height/2]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ArenaConfig {
    /// Horizontal extent.
    #[serde(default = "default_arena_width")]
    pub width: f32,

    /// Vertical extent.
    #[serde(default = "default_arena_height")]
    pub height: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: default_arena_width(),
            height: default_arena_height(),
        }
    }
}

/// Player tuning.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PlayerConfig {
    /// Lives at the start of a level.
    #[serde(default = "default_lives")]
    pub lives: u32,

    /// Damage dealt to each enemy in reach per attack.
    #[serde(default = "default_attack_damage")]
    pub attack_damage: u32,

    /// Reach of the player's attack.
    #[serde(default = "default_attack_radius")]
    pub attack_radius: f32,

    /// Distance at which an enemy hurts the player.
    #[serde(default = "default_contact_radius")]
    pub contact_radius: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            lives: default_lives(),
            attack_damage: default_attack_damage(),
            attack_radius: default_attack_radius(),
            contact_radius: default_contact_radius(),
        }
    }
}

/// Enemy pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PoolConfig {
    /// Lower bound on every category pool's retained count.
    #[serde(default = "default_pool_min_size")]
    pub min_size: usize,

    /// Free-store reservation for a newly created pool.
    #[serde(default = "default_pool_initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: default_pool_min_size(),
            initial_capacity: default_pool_initial_capacity(),
        }
    }
}

/// Gameplay numbers for one enemy category.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EnemyProfile {
    /// Hit points at spawn.
    pub health: u32,
    /// Points awarded on defeat.
    pub points: u32,
    /// Units per second towards the player.
    pub move_speed: f32,
}

impl Default for EnemyProfile {
    fn default() -> Self {
        Self {
            health: 3,
            points: 10,
            move_speed: 2.0,
        }
    }
}

/// One level.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LevelConfig {
    /// Display name.
    pub name: String,

    /// Score that completes the level. Zero means the level only ends on
    /// death.
    #[serde(default)]
    pub target_score: u64,

    /// Spawn loops started when the level loads.
    #[serde(default)]
    pub spawns: Vec<SpawnConfig>,
}

/// Spawn loop parameters for one category within a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SpawnConfig {
    /// Category to spawn.
    pub kind: EnemyKind,

    /// Milliseconds before the first spawn attempt.
    #[serde(default)]
    pub start_delay_ms: u64,

    /// Milliseconds between spawn attempts.
    #[serde(default = "default_spawn_interval_ms")]
    pub interval_ms: u64,

    /// Maximum simultaneously active enemies of this category.
    #[serde(default = "default_max_enemies")]
    pub max_enemies: u32,
}

impl SpawnConfig {
    /// Delay before the first attempt.
    pub const fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Delay between attempts.
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_app_name() -> String {
    "Rise of Champions".to_owned()
}

const fn default_frame_interval_ms() -> u64 {
    16
}

fn default_save_path() -> String {
    "player_progress.json".to_owned()
}

const fn default_arena_width() -> f32 {
    30.0
}

const fn default_arena_height() -> f32 {
    20.0
}

const fn default_lives() -> u32 {
    3
}

const fn default_attack_damage() -> u32 {
    1
}

const fn default_attack_radius() -> f32 {
    2.5
}

const fn default_contact_radius() -> f32 {
    0.75
}

const fn default_pool_min_size() -> usize {
    5
}

const fn default_pool_initial_capacity() -> usize {
    5
}

const fn default_spawn_interval_ms() -> u64 {
    2000
}

const fn default_max_enemies() -> u32 {
    5
}

fn default_enemies() -> BTreeMap<EnemyKind, EnemyProfile> {
    let profile = |health, points, move_speed| EnemyProfile {
        health,
        points,
        move_speed,
    };
    BTreeMap::from([
        (EnemyKind::Basic, profile(3, 10, 2.0)),
        (EnemyKind::Fast, profile(2, 15, 4.0)),
        (EnemyKind::Tank, profile(8, 30, 1.0)),
        (EnemyKind::Ranged, profile(3, 20, 1.5)),
        (EnemyKind::Boss, profile(25, 100, 1.2)),
    ])
}

fn default_levels() -> Vec<LevelConfig> {
    let spawn = |kind, start_delay_ms, interval_ms, max_enemies| SpawnConfig {
        kind,
        start_delay_ms,
        interval_ms,
        max_enemies,
    };
    vec![
        LevelConfig {
            name: "Outskirts".to_owned(),
            target_score: 100,
            spawns: vec![spawn(EnemyKind::Basic, 1000, 2000, 5)],
        },
        LevelConfig {
            name: "Foothills".to_owned(),
            target_score: 250,
            spawns: vec![
                spawn(EnemyKind::Basic, 500, 1500, 6),
                spawn(EnemyKind::Fast, 3000, 3000, 3),
            ],
        },
        LevelConfig {
            name: "Summit".to_owned(),
            target_score: 500,
            spawns: vec![
                spawn(EnemyKind::Basic, 500, 1200, 6),
                spawn(EnemyKind::Fast, 2000, 2500, 4),
                spawn(EnemyKind::Tank, 5000, 6000, 2),
                spawn(EnemyKind::Ranged, 4000, 4000, 3),
                spawn(EnemyKind::Boss, 20000, 30000, 1),
            ],
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = GameConfig::parse("").unwrap();
        assert_eq!(config.app.frame_interval_ms, 16);
        assert_eq!(config.arena.width, 30.0);
        assert_eq!(config.player.lives, 3);
        assert_eq!(config.pool.min_size, 5);
        assert_eq!(config.enemies.len(), EnemyKind::ALL.len());
        assert_eq!(config.levels.len(), 3);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
app:
  max_frames: 120
enemies:
  basic: { health: 1, points: 5, move_speed: 3.0 }
levels:
  - name: Test
    target_score: 20
    spawns:
      - kind: fast
        start_delay_ms: 0
        interval_ms: 100
        max_enemies: 2
";
        let config = GameConfig::parse(yaml).unwrap();
        assert_eq!(config.app.max_frames, 120);
        assert_eq!(config.app.frame_interval_ms, 16);
        assert_eq!(config.enemies.len(), 1);
        assert_eq!(config.enemies[&EnemyKind::Basic].points, 5);

        let level = config.level(0).unwrap();
        assert_eq!(level.target_score, 20);
        assert_eq!(level.spawns[0].kind, EnemyKind::Fast);
        assert_eq!(level.spawns[0].interval(), Duration::from_millis(100));
        assert!(config.level(1).is_none());
    }

    #[test]
    fn empty_level_list_is_rejected() {
        let err = GameConfig::parse("levels: []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let yaml = r"
levels:
  - name: Broken
    spawns:
      - kind: basic
        interval_ms: 0
";
        let err = GameConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn non_finite_or_negative_extents_are_rejected() {
        for yaml in [
            "arena: { width: .inf }",
            "arena: { height: .nan }",
            "arena: { width: -4.0 }",
            "player: { attack_radius: .inf }",
            "player: { contact_radius: -1.0 }",
            "enemies:\n  basic: { health: 1, points: 1, move_speed: .inf }",
        ] {
            let err = GameConfig::parse(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{yaml}");
        }
        assert!(GameConfig::parse("arena: { width: 12.0, height: 8.0 }").is_ok());
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = GameConfig::parse("app: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn save_path_override() {
        let mut config = GameConfig::default();
        config.apply_overrides_from(|name| {
            (name == SAVE_PATH_ENV).then(|| "/tmp/elsewhere.json".to_owned())
        });
        assert_eq!(config.app.save_path, "/tmp/elsewhere.json");

        config.apply_overrides_from(|_| Some(String::new()));
        assert_eq!(config.app.save_path, "/tmp/elsewhere.json");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = GameConfig::from_file(Path::new("/nonexistent/roc-config.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
