//! Plain data records shared between the runtime crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point or direction in the 2D play field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl Vec2 {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Build a vector from its components.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Move toward `target` by at most `max_step`, never overshooting.
    pub fn move_towards(self, target: Self, max_step: f32) -> Self {
        let distance = self.distance(target);
        if distance <= max_step || distance <= f32::EPSILON {
            return target;
        }
        let scale = max_step / distance;
        Self {
            x: self.x + (target.x - self.x) * scale,
            y: self.y + (target.y - self.y) * scale,
        }
    }
}

/// Persisted player progress across sessions.
///
/// The storage encoding belongs to the persistence adapter; this struct
/// only fixes the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressData {
    /// Sum of final scores over all finished runs.
    pub total_score: u64,
    /// Best height ever reached.
    pub max_height: f32,
    /// Best speed ever reached.
    pub max_speed: f32,
    /// Per-level records, one entry per level the player has touched.
    #[serde(default)]
    pub levels: Vec<LevelProgress>,
    /// When this record was last written.
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for ProgressData {
    /// Fresh progress: nothing scored, level 0 unlocked.
    fn default() -> Self {
        Self {
            total_score: 0,
            max_height: 0.0,
            max_speed: 0.0,
            levels: vec![LevelProgress::unlocked(0)],
            saved_at: None,
        }
    }
}

impl ProgressData {
    /// Record for `level_index`, if one exists.
    pub fn level(&self, level_index: u32) -> Option<&LevelProgress> {
        self.levels.iter().find(|l| l.level_index == level_index)
    }

    /// Record for `level_index`, inserting an unlocked one if missing.
    #[allow(clippy::indexing_slicing)]
    pub fn level_mut(&mut self, level_index: u32) -> &mut LevelProgress {
        let position = self.levels.iter().position(|l| l.level_index == level_index);
        let idx = position.unwrap_or_else(|| {
            self.levels.push(LevelProgress::unlocked(level_index));
            self.levels.len().saturating_sub(1)
        });
        // `idx` is either a found position or the slot just pushed.
        &mut self.levels[idx]
    }

    /// Whether the player may start `level_index`.
    pub fn is_unlocked(&self, level_index: u32) -> bool {
        self.level(level_index).is_some_and(|l| l.unlocked)
    }

    /// Fold a finished run into the record.
    ///
    /// Global bests and the level's bests are raised, never lowered; the
    /// final score is added to the running total.
    pub fn record_run(&mut self, level_index: u32, score: u64, height: f32, speed: f32) {
        self.total_score = self.total_score.saturating_add(score);
        self.max_height = self.max_height.max(height);
        self.max_speed = self.max_speed.max(speed);

        let level = self.level_mut(level_index);
        level.unlocked = true;
        level.max_score = level.max_score.max(score);
        level.max_height = level.max_height.max(height);
        level.max_speed = level.max_speed.max(speed);
    }

    /// Unlock the level after `level_index`.
    pub fn unlock_next(&mut self, level_index: u32) {
        let next = level_index.saturating_add(1);
        self.level_mut(next).unlocked = true;
    }
}

/// Progress for a single level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Zero-based level index.
    pub level_index: u32,
    /// Whether the level can be selected from the menu.
    pub unlocked: bool,
    /// Best score on this level.
    pub max_score: u64,
    /// Best height on this level.
    pub max_height: f32,
    /// Best speed on this level.
    pub max_speed: f32,
}

impl LevelProgress {
    /// An unlocked level with no records yet.
    pub const fn unlocked(level_index: u32) -> Self {
        Self {
            level_index,
            unlocked: true,
            max_score: 0,
            max_height: 0.0,
            max_speed: 0.0,
        }
    }
}
