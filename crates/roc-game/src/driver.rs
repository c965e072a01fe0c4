//! Fixed-step frame driver.
//!
//! There is no renderer or input device, so the driver plays the part of
//! both: the player follows a scripted path through the arena, attacks on a
//! cooldown, and gets hurt when an enemy reaches them. Everything observable
//! still flows through the event bus exactly as it would with a real front
//! end.

use std::sync::Arc;
use std::time::Duration;

use roc_core::CancellationToken;
use roc_core::cancel;
use roc_core::config::{ArenaConfig, PlayerConfig};
use roc_core::spawner::SpawnController;
use roc_events::{
    EventBus, GameOverScreenOpened, MaxHeightChanged, MaxSpeedChanged, NextLevel, PlayerDamaged,
    PlayerDied, PlayerLivesChanged, RestartLevel, SubscriptionId,
};
use roc_types::Vec2;
use tracing::{debug, info};

use crate::session::RunSession;

/// Time between two player attacks.
pub const ATTACK_COOLDOWN: Duration = Duration::from_millis(400);

/// Invulnerability granted after a contact hit.
pub const HIT_GRACE: Duration = Duration::from_secs(1);

/// Advances the simulation one frame at a time.
#[derive(Debug)]
pub struct FrameDriver {
    bus: Arc<EventBus>,
    spawner: Arc<SpawnController>,
    session: Arc<RunSession>,
    arena: ArenaConfig,
    player: PlayerConfig,
    clock: Duration,
    attack_ready_in: Duration,
}

impl FrameDriver {
    /// Create a driver over the shared game services.
    pub const fn new(
        bus: Arc<EventBus>,
        spawner: Arc<SpawnController>,
        session: Arc<RunSession>,
        arena: ArenaConfig,
        player: PlayerConfig,
    ) -> Self {
        Self {
            bus,
            spawner,
            session,
            arena,
            player,
            clock: Duration::ZERO,
            attack_ready_in: Duration::ZERO,
        }
    }

    /// Where the scripted player is after `t` seconds: a Lissajous loop
    /// inside the arena.
    fn player_path(&self, t: f32) -> Vec2 {
        Vec2::new(
            self.arena.width * 0.3 * (0.7 * t).sin(),
            self.arena.height * 0.3 * (1.1 * t).sin(),
        )
    }

    /// Advance one frame of `dt`. Does nothing while no run is open.
    pub fn tick(&mut self, dt: Duration) {
        if !self.session.is_active() || dt.is_zero() {
            return;
        }
        self.clock = self.clock.saturating_add(dt);

        let previous = self.session.position();
        let position = self.player_path(self.clock.as_secs_f32());
        self.session.set_position(position, dt);

        let height = position.y + self.arena.height / 2.0;
        if let Some(value) = self.session.record_height(height) {
            self.bus.fire(MaxHeightChanged { value });
        }
        let speed = previous.distance(position) / dt.as_secs_f32();
        if let Some(value) = self.session.record_speed(speed) {
            self.bus.fire(MaxSpeedChanged { value });
        }

        self.spawner.advance(dt, position);
        self.attack(position, dt);
        self.check_contact(position);
    }

    fn attack(&mut self, position: Vec2, dt: Duration) {
        self.attack_ready_in = self.attack_ready_in.saturating_sub(dt);
        if !self.attack_ready_in.is_zero() {
            return;
        }
        let targets = self.spawner.enemies_near(position, self.player.attack_radius);
        if targets.is_empty() {
            return;
        }
        self.attack_ready_in = ATTACK_COOLDOWN;
        for id in targets {
            let outcome = self.spawner.damage(id, self.player.attack_damage);
            debug!(actor = %id, ?outcome, "player attack");
        }
    }

    fn check_contact(&self, position: Vec2) {
        if self
            .spawner
            .enemies_near(position, self.player.contact_radius)
            .is_empty()
        {
            return;
        }
        let Some(hit) = self.session.take_hit(HIT_GRACE) else {
            return;
        };
        self.bus.fire(PlayerDamaged {
            remaining_lives: hit.remaining,
        });
        self.bus.fire(PlayerLivesChanged {
            current: hit.remaining,
            max: hit.max,
        });
        if hit.remaining == 0 {
            let summary = self.session.summary();
            self.bus.fire(PlayerDied {
                final_score: summary.score,
                max_height: summary.max_height,
                max_speed: summary.max_speed,
            });
        }
    }

    /// Tick every `interval` until `token` is cancelled or `max_frames`
    /// frames have run (zero means no limit). Returns the frame count.
    pub async fn run(mut self, interval: Duration, max_frames: u64, token: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut frames = 0_u64;
        while cancel::guard(&token, ticker.tick()).await.is_ok() {
            self.tick(interval);
            frames = frames.saturating_add(1);
            if max_frames > 0 && frames >= max_frames {
                info!(frames, "frame limit reached");
                break;
            }
        }
        frames
    }
}

/// Stands in for the player on the game over screen: after `delay` it
/// continues to the next level on a win and retries on a loss.
///
/// Returns the subscription so the caller can remove it.
pub fn install_autopilot(bus: &Arc<EventBus>, delay: Duration) -> SubscriptionId {
    let weak = Arc::downgrade(bus);
    bus.subscribe::<GameOverScreenOpened, _>(move |event| {
        let event = *event;
        let weak = weak.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(bus) = weak.upgrade() else {
                return;
            };
            if event.is_win {
                let level_index = event.level_index.saturating_add(1);
                info!(level_index, "autopilot: next level");
                bus.fire(NextLevel { level_index });
            } else {
                info!(level_index = event.level_index, "autopilot: retry");
                bus.fire(RestartLevel {
                    level_index: event.level_index,
                });
            }
        });
    })
}
