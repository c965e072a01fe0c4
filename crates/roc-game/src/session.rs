//! Shared record of the level run in progress.
//!
//! The gameplay state opens a run when a level finishes loading and closes
//! it at game over; the frame driver reads and updates it every tick. A run
//! can only be closed once, which is what keeps a simultaneous death and
//! level completion from producing two game over screens.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use roc_types::Vec2;

/// Values captured when a run closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Level that was played.
    pub level_index: u32,
    /// Final score.
    pub score: u64,
    /// Best height reached.
    pub max_height: f32,
    /// Best speed reached.
    pub max_speed: f32,
}

/// Result of a contact hit on the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Lives left after the hit.
    pub remaining: u32,
    /// Lives at the start of the run.
    pub max: u32,
}

#[derive(Debug, Default)]
struct Run {
    active: bool,
    level_index: u32,
    score: u64,
    lives: u32,
    max_lives: u32,
    max_height: f32,
    max_speed: f32,
    position: Vec2,
    invulnerable: Duration,
}

impl Run {
    const fn summary(&self) -> RunSummary {
        RunSummary {
            level_index: self.level_index,
            score: self.score,
            max_height: self.max_height,
            max_speed: self.max_speed,
        }
    }
}

/// Thread-safe handle to the current run.
#[derive(Debug, Default)]
pub struct RunSession {
    run: Mutex<Run>,
}

impl RunSession {
    /// Create a session with no run open.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Run> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a fresh run, discarding any previous one.
    pub fn begin(&self, level_index: u32, lives: u32) {
        *self.lock() = Run {
            active: true,
            level_index,
            lives,
            max_lives: lives,
            ..Run::default()
        };
    }

    /// Close the run. Only the first call after [`begin`](Self::begin)
    /// returns the summary.
    pub fn finish(&self) -> Option<RunSummary> {
        let mut run = self.lock();
        if !run.active {
            return None;
        }
        run.active = false;
        Some(run.summary())
    }

    /// Whether a run is open.
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Snapshot of the current (or last) run.
    pub fn summary(&self) -> RunSummary {
        self.lock().summary()
    }

    /// Lives left and lives at start.
    pub fn lives(&self) -> (u32, u32) {
        let run = self.lock();
        (run.lives, run.max_lives)
    }

    /// Add `points` to an open run and return the new score.
    pub fn add_score(&self, points: u32) -> Option<u64> {
        let mut run = self.lock();
        if !run.active {
            return None;
        }
        run.score = run.score.saturating_add(u64::from(points));
        Some(run.score)
    }

    /// Player position.
    pub fn position(&self) -> Vec2 {
        self.lock().position
    }

    /// Move the player and count down hit invulnerability.
    pub fn set_position(&self, position: Vec2, dt: Duration) {
        let mut run = self.lock();
        run.position = position;
        run.invulnerable = run.invulnerable.saturating_sub(dt);
    }

    /// Record a height sample. Returns the new record when beaten.
    pub fn record_height(&self, height: f32) -> Option<f32> {
        let mut run = self.lock();
        (run.active && height > run.max_height).then(|| {
            run.max_height = height;
            height
        })
    }

    /// Record a speed sample. Returns the new record when beaten.
    pub fn record_speed(&self, speed: f32) -> Option<f32> {
        let mut run = self.lock();
        (run.active && speed > run.max_speed).then(|| {
            run.max_speed = speed;
            speed
        })
    }

    /// Take one life unless the player is still invulnerable from the
    /// previous hit. `grace` is the invulnerability granted by this hit.
    pub fn take_hit(&self, grace: Duration) -> Option<Hit> {
        let mut run = self.lock();
        if !run.active || run.lives == 0 || !run.invulnerable.is_zero() {
            return None;
        }
        run.lives = run.lives.saturating_sub(1);
        run.invulnerable = grace;
        Some(Hit {
            remaining: run.lives,
            max: run.max_lives,
        })
    }
}
