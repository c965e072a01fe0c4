//! Pooled enemy spawning.
//!
//! [`SpawnController`] owns one [`ObjectPool`] per enemy category plus the
//! set of enemies currently checked out of it. Spawn loops run as tokio
//! tasks, one per [`SpawnConfig`], each under its own child token of the
//! scope passed to [`SpawnController::start_spawning`].
//!
//! Lock discipline: the controller mutex is never held across an `.await`
//! or while firing on the bus.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use rand::Rng;
use roc_events::{EnemyKilled, EventBus};
use roc_types::{ActorId, EnemyKind, Vec2};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::cancel::{self, Cancelled};
use crate::config::{ArenaConfig, EnemyProfile, PoolConfig, SpawnConfig};
use crate::pool::ObjectPool;
use crate::ports::{Resource, ResourceLoader};

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

/// A pooled enemy.
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    id: ActorId,
    kind: EnemyKind,
    profile: EnemyProfile,
    health: u32,
    position: Vec2,
}

impl Enemy {
    /// Actor id. Stable across trips through the pool.
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Category.
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Remaining hit points.
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Current position.
    pub const fn position(&self) -> Vec2 {
        self.position
    }
}

/// Result of [`SpawnController::damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// No active enemy has that id.
    Missed,
    /// The enemy survived.
    Hurt {
        /// Hit points left.
        remaining: u32,
    },
    /// The enemy was defeated and returned to its pool.
    Defeated {
        /// Points awarded.
        points: u32,
    },
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

struct Category {
    pool: ObjectPool<Enemy>,
    profile: EnemyProfile,
    cap: usize,
    active: HashMap<ActorId, Enemy>,
}

#[derive(Default)]
struct Tracking {
    categories: BTreeMap<EnemyKind, Category>,
    loops: Vec<CancellationToken>,
}

/// Per-category pools, active sets and spawn loops.
pub struct SpawnController {
    loader: Arc<dyn ResourceLoader>,
    bus: Arc<EventBus>,
    arena: ArenaConfig,
    pool_config: PoolConfig,
    next_actor: Arc<AtomicU64>,
    tracking: Mutex<Tracking>,
}

impl core::fmt::Debug for SpawnController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let tracking = self.lock();
        f.debug_struct("SpawnController")
            .field("categories", &tracking.categories.keys().collect::<Vec<_>>())
            .field("loops", &tracking.loops.len())
            .finish_non_exhaustive()
    }
}

impl SpawnController {
    /// Create a controller with no pools.
    pub fn new(
        loader: Arc<dyn ResourceLoader>,
        bus: Arc<EventBus>,
        arena: ArenaConfig,
        pool_config: PoolConfig,
    ) -> Self {
        Self {
            loader,
            bus,
            arena,
            pool_config,
            next_actor: Arc::new(AtomicU64::new(1)),
            tracking: Mutex::new(Tracking::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tracking> {
        self.tracking.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Prepare pools for a new level.
    ///
    /// Enemies still active from a previous level go back to their pools
    /// first. Each category named in `configs` has its prefab and profile
    /// loaded once for the controller's lifetime; a category whose assets
    /// fail to load is skipped. Pools are sized to the larger of the
    /// category cap and the configured floor.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if `token` is cancelled while assets load.
    pub async fn initialize_pools(
        &self,
        configs: &[SpawnConfig],
        token: &CancellationToken,
    ) -> Result<(), Cancelled> {
        cancel::checkpoint(token)?;
        let released = self.reset_active();
        if released > 0 {
            debug!(released, "returned stale enemies to their pools");
        }

        let mut caps: BTreeMap<EnemyKind, usize> = BTreeMap::new();
        for config in configs {
            let cap = usize::try_from(config.max_enemies).unwrap_or(usize::MAX);
            let entry = caps.entry(config.kind).or_insert(0);
            *entry = (*entry).max(cap);
        }

        for (&kind, &cap) in &caps {
            let loaded = self.lock().categories.contains_key(&kind);
            if !loaded {
                let Some(profile) = self.load_category(kind, token).await? else {
                    continue;
                };
                let pool = self.build_pool(kind, profile);
                self.lock().categories.insert(
                    kind,
                    Category {
                        pool,
                        profile,
                        cap: 0,
                        active: HashMap::new(),
                    },
                );
                info!(%kind, "enemy pool created");
            }

            let mut tracking = self.lock();
            if let Some(category) = tracking.categories.get_mut(&kind) {
                category.cap = cap;
                category.pool.set_max_size(cap.max(self.pool_config.min_size));
                debug!(%kind, cap, pool_size = category.pool.max_size(), "enemy pool sized");
            }
        }
        Ok(())
    }

    fn reset_active(&self) -> usize {
        let mut tracking = self.lock();
        let mut released = 0_usize;
        for category in tracking.categories.values_mut() {
            category.cap = 0;
            for (_, enemy) in category.active.drain() {
                category.pool.release(enemy);
                released = released.saturating_add(1);
            }
        }
        released
    }

    async fn load_category(
        &self,
        kind: EnemyKind,
        token: &CancellationToken,
    ) -> Result<Option<EnemyProfile>, Cancelled> {
        let prefab_key = kind.prefab_key();
        let profile_key = kind.profile_key();

        let prefab = cancel::guard(token, self.loader.load(&prefab_key)).await?;
        if !matches!(prefab, Some(Resource::Prefab { .. })) {
            warn!(%kind, key = %prefab_key, "enemy prefab missing, skipping category");
            return Ok(None);
        }

        let profile = cancel::guard(token, self.loader.load(&profile_key)).await;
        let profile = match profile {
            Ok(Some(Resource::EnemyProfile(profile))) => profile,
            Ok(_) => {
                warn!(%kind, key = %profile_key, "enemy profile missing, skipping category");
                self.loader.release(&prefab_key);
                return Ok(None);
            }
            Err(cancelled) => {
                self.loader.release(&prefab_key);
                return Err(cancelled);
            }
        };
        Ok(Some(profile))
    }

    fn build_pool(&self, kind: EnemyKind, profile: EnemyProfile) -> ObjectPool<Enemy> {
        let next_actor = Arc::clone(&self.next_actor);
        ObjectPool::builder(move || {
            let id = ActorId::new(next_actor.fetch_add(1, Ordering::Relaxed));
            trace!(%kind, actor = %id, "enemy constructed");
            Enemy {
                id,
                kind,
                profile,
                health: profile.health,
                position: Vec2::ZERO,
            }
        })
        .on_get(|enemy| enemy.health = enemy.profile.health)
        .on_destroy(|enemy| trace!(kind = %enemy.kind, actor = %enemy.id, "enemy destroyed"))
        .initial_capacity(self.pool_config.initial_capacity)
        .build()
    }

    /// Check an enemy out of its pool at `position`.
    ///
    /// Returns `None` when the category has no pool or is already at its
    /// cap.
    pub fn spawn_enemy(&self, kind: EnemyKind, position: Vec2) -> Option<ActorId> {
        let mut tracking = self.lock();
        let Some(category) = tracking.categories.get_mut(&kind) else {
            warn!(%kind, "no pool for enemy kind, not spawning");
            return None;
        };
        if category.active.len() >= category.cap {
            debug!(%kind, cap = category.cap, "enemy cap reached, not spawning");
            return None;
        }
        let mut enemy = category.pool.get();
        enemy.position = position;
        let id = enemy.id;
        category.active.insert(id, enemy);
        debug!(%kind, actor = %id, x = position.x, y = position.y, "enemy spawned");
        Some(id)
    }

    /// Start one spawn loop per config under child tokens of `parent`.
    ///
    /// Categories without a pool are skipped.
    pub fn start_spawning(self: &Arc<Self>, configs: &[SpawnConfig], parent: &CancellationToken) {
        for config in configs {
            if !self.lock().categories.contains_key(&config.kind) {
                warn!(kind = %config.kind, "no pool for enemy kind, spawn loop not started");
                continue;
            }
            let token = parent.child_token();
            {
                let mut tracking = self.lock();
                tracking.loops.retain(|t| !t.is_cancelled());
                tracking.loops.push(token.clone());
            }
            tokio::spawn(run_spawn_loop(Arc::downgrade(self), *config, token));
            debug!(kind = %config.kind, interval_ms = config.interval_ms, "spawn loop started");
        }
    }

    /// Cancel every running spawn loop.
    pub fn stop_spawning(&self) {
        let loops = std::mem::take(&mut self.lock().loops);
        if !loops.is_empty() {
            debug!(count = loops.len(), "stopping spawn loops");
        }
        for token in loops {
            token.cancel();
        }
    }

    /// Apply `amount` damage to the active enemy `id`.
    ///
    /// A defeated enemy leaves the active set and returns to its pool
    /// before [`EnemyKilled`] is fired.
    pub fn damage(&self, id: ActorId, amount: u32) -> DamageOutcome {
        let points = {
            let mut tracking = self.lock();
            let Some(category) = tracking
                .categories
                .values_mut()
                .find(|c| c.active.contains_key(&id))
            else {
                return DamageOutcome::Missed;
            };
            let Some(enemy) = category.active.get_mut(&id) else {
                return DamageOutcome::Missed;
            };
            enemy.health = enemy.health.saturating_sub(amount);
            if enemy.health > 0 {
                return DamageOutcome::Hurt {
                    remaining: enemy.health,
                };
            }
            let Some(enemy) = category.active.remove(&id) else {
                return DamageOutcome::Missed;
            };
            let points = category.profile.points;
            debug!(kind = %enemy.kind, actor = %id, points, "enemy defeated");
            category.pool.release(enemy);
            points
        };

        self.bus.fire(EnemyKilled { points });
        DamageOutcome::Defeated { points }
    }

    /// Move every active enemy towards `target` for `dt` of game time.
    pub fn advance(&self, dt: Duration, target: Vec2) {
        let seconds = dt.as_secs_f32();
        let mut tracking = self.lock();
        for category in tracking.categories.values_mut() {
            let step = category.profile.move_speed * seconds;
            for enemy in category.active.values_mut() {
                enemy.position = enemy.position.move_towards(target, step);
            }
        }
    }

    /// Ids of active enemies within `radius` of `point`.
    pub fn enemies_near(&self, point: Vec2, radius: f32) -> Vec<ActorId> {
        self.lock()
            .categories
            .values()
            .flat_map(|c| c.active.values())
            .filter(|e| e.position.distance(point) <= radius)
            .map(|e| e.id)
            .collect()
    }

    /// Snapshot of one active enemy.
    pub fn enemy(&self, id: ActorId) -> Option<Enemy> {
        self.lock()
            .categories
            .values()
            .find_map(|c| c.active.get(&id))
            .cloned()
    }

    /// Active enemies of `kind`.
    pub fn active_count(&self, kind: EnemyKind) -> usize {
        self.lock()
            .categories
            .get(&kind)
            .map_or(0, |c| c.active.len())
    }

    /// Active enemies across every category.
    pub fn active_total(&self) -> usize {
        self.lock()
            .categories
            .values()
            .map(|c| c.active.len())
            .sum()
    }

    /// Free instances waiting in the pool for `kind`.
    pub fn pool_free_count(&self, kind: EnemyKind) -> usize {
        self.lock()
            .categories
            .get(&kind)
            .map_or(0, |c| c.pool.free_count())
    }

    /// Categories that currently have a pool.
    pub fn pooled_kinds(&self) -> BTreeSet<EnemyKind> {
        self.lock().categories.keys().copied().collect()
    }

    /// Stop every loop, drop all enemies and release category assets.
    pub fn shutdown(&self) {
        self.stop_spawning();
        let categories = std::mem::take(&mut self.lock().categories);
        for (kind, mut category) in categories {
            category.active.clear();
            category.pool.clear();
            self.loader.release(&kind.prefab_key());
            self.loader.release(&kind.profile_key());
        }
        info!("spawn controller shut down");
    }

    fn random_position(&self) -> Vec2 {
        let half_w = (self.arena.width / 2.0).abs();
        let half_h = (self.arena.height / 2.0).abs();
        let mut rng = rand::rng();
        Vec2::new(
            rng.random_range(-half_w..=half_w),
            rng.random_range(-half_h..=half_h),
        )
    }

    /// Whether a loop capped at `cap` may spawn another `kind`. The
    /// category cap still bounds every loop of the kind.
    fn has_room(&self, kind: EnemyKind, cap: u32) -> bool {
        let cap = usize::try_from(cap).unwrap_or(usize::MAX);
        self.lock()
            .categories
            .get(&kind)
            .is_some_and(|c| c.active.len() < cap.min(c.cap))
    }
}

impl Drop for SpawnController {
    fn drop(&mut self) {
        for token in &self.lock().loops {
            token.cancel();
        }
    }
}

async fn run_spawn_loop(
    controller: Weak<SpawnController>,
    config: SpawnConfig,
    token: CancellationToken,
) {
    if cancel::sleep(&token, config.start_delay()).await.is_ok() {
        loop {
            let Some(this) = controller.upgrade() else {
                break;
            };
            if this.has_room(config.kind, config.max_enemies) {
                let position = this.random_position();
                this.spawn_enemy(config.kind, position);
            }
            drop(this);
            if cancel::sleep(&token, config.interval()).await.is_err() {
                break;
            }
        }
    }
    debug!(kind = %config.kind, "spawn loop stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;

    use super::*;
    use crate::ports::Instance;

    #[derive(Default)]
    struct FakeLoader {
        missing: HashSet<String>,
        loads: Mutex<Vec<String>>,
        releases: Mutex<Vec<String>>,
    }

    impl FakeLoader {
        fn without(keys: &[String]) -> Self {
            Self {
                missing: keys.iter().cloned().collect(),
                ..Self::default()
            }
        }

        fn load_count(&self, key: &str) -> usize {
            self.loads.lock().unwrap().iter().filter(|k| *k == key).count()
        }

        fn released(&self, key: &str) -> bool {
            self.releases.lock().unwrap().iter().any(|k| k == key)
        }
    }

    #[async_trait]
    impl ResourceLoader for FakeLoader {
        async fn load(&self, key: &str) -> Option<Resource> {
            self.loads.lock().unwrap().push(key.to_owned());
            if self.missing.contains(key) {
                return None;
            }
            if key.starts_with("EnemyConfigs/") {
                Some(Resource::EnemyProfile(EnemyProfile::default()))
            } else {
                Some(Resource::Prefab {
                    key: key.to_owned(),
                })
            }
        }

        async fn instantiate(&self, _key: &str) -> Option<Instance> {
            None
        }

        fn release(&self, key: &str) {
            self.releases.lock().unwrap().push(key.to_owned());
        }

        fn destroy_instance(&self, _instance: Instance) {}
    }

    fn controller(loader: &Arc<FakeLoader>, bus: &Arc<EventBus>) -> Arc<SpawnController> {
        Arc::new(SpawnController::new(
            Arc::clone(loader) as Arc<dyn ResourceLoader>,
            Arc::clone(bus),
            ArenaConfig::default(),
            PoolConfig::default(),
        ))
    }

    const fn spawn(kind: EnemyKind, max_enemies: u32) -> SpawnConfig {
        SpawnConfig {
            kind,
            start_delay_ms: 100,
            interval_ms: 100,
            max_enemies,
        }
    }

    #[tokio::test]
    async fn spawn_respects_cap() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        spawner
            .initialize_pools(&[spawn(EnemyKind::Basic, 3)], &CancellationToken::new())
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).is_some());
        }
        assert!(spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).is_none());
        assert_eq!(spawner.active_count(EnemyKind::Basic), 3);
        assert!(spawner.spawn_enemy(EnemyKind::Fast, Vec2::ZERO).is_none());
    }

    #[tokio::test]
    async fn assets_load_once_per_category() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        let configs = [spawn(EnemyKind::Basic, 2), spawn(EnemyKind::Basic, 4)];
        let token = CancellationToken::new();

        spawner.initialize_pools(&configs, &token).await.unwrap();
        spawner.initialize_pools(&configs, &token).await.unwrap();

        assert_eq!(loader.load_count("Enemies/BasicEnemy"), 1);
        assert_eq!(loader.load_count("EnemyConfigs/BasicConfig"), 1);
        for _ in 0..4 {
            assert!(spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).is_some());
        }
        assert!(spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).is_none());
    }

    #[tokio::test]
    async fn missing_profile_skips_only_that_kind() {
        let loader = Arc::new(FakeLoader::without(&[EnemyKind::Fast.profile_key()]));
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);

        spawner
            .initialize_pools(
                &[spawn(EnemyKind::Basic, 2), spawn(EnemyKind::Fast, 2)],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(spawner.pooled_kinds(), BTreeSet::from([EnemyKind::Basic]));
        assert!(loader.released("Enemies/FastEnemy"));
        assert!(spawner.spawn_enemy(EnemyKind::Fast, Vec2::ZERO).is_none());
        assert!(spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).is_some());
    }

    #[tokio::test]
    async fn cancelled_initialization_stops_early() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        let token = CancellationToken::new();
        token.cancel();

        let result = spawner
            .initialize_pools(&[spawn(EnemyKind::Basic, 2)], &token)
            .await;

        assert_eq!(result, Err(Cancelled));
        assert!(spawner.pooled_kinds().is_empty());
    }

    #[tokio::test]
    async fn defeat_returns_enemy_to_pool_and_fires_event() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        spawner
            .initialize_pools(&[spawn(EnemyKind::Basic, 3)], &CancellationToken::new())
            .await
            .unwrap();

        let killed = Arc::new(Mutex::new(Vec::new()));
        let observed = Arc::new(Mutex::new(None));
        {
            let killed = Arc::clone(&killed);
            let observed = Arc::clone(&observed);
            let probe = Arc::clone(&spawner);
            bus.subscribe::<EnemyKilled, _>(move |event| {
                killed.lock().unwrap().push(event.points);
                *observed.lock().unwrap() = Some((
                    probe.active_count(EnemyKind::Basic),
                    probe.pool_free_count(EnemyKind::Basic),
                ));
            });
        }

        let id = spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).unwrap();
        assert_eq!(spawner.damage(id, 1), DamageOutcome::Hurt { remaining: 2 });
        assert_eq!(spawner.damage(id, 5), DamageOutcome::Defeated { points: 10 });
        assert_eq!(spawner.damage(id, 1), DamageOutcome::Missed);

        assert_eq!(*killed.lock().unwrap(), vec![10]);
        assert_eq!(*observed.lock().unwrap(), Some((0, 1)));

        let again = spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).unwrap();
        assert_eq!(again, id);
        assert_eq!(spawner.enemy(again).unwrap().health(), 3);
    }

    #[tokio::test]
    async fn reinitializing_releases_stale_enemies() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        let configs = [spawn(EnemyKind::Basic, 3)];
        let token = CancellationToken::new();
        spawner.initialize_pools(&configs, &token).await.unwrap();
        spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).unwrap();
        spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).unwrap();

        spawner.initialize_pools(&configs, &token).await.unwrap();

        assert_eq!(spawner.active_total(), 0);
        assert_eq!(spawner.pool_free_count(EnemyKind::Basic), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_loops_fill_to_cap_and_stop_on_cancel() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        let configs = [spawn(EnemyKind::Basic, 3)];
        let scope = CancellationToken::new();
        spawner.initialize_pools(&configs, &scope).await.unwrap();

        spawner.start_spawning(&configs, &scope);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(spawner.active_count(EnemyKind::Basic), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(spawner.active_count(EnemyKind::Basic), 3);

        scope.cancel();
        let id = spawner.enemies_near(Vec2::ZERO, 100.0)[0];
        spawner.damage(id, 100);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(spawner.active_count(EnemyKind::Basic), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn each_loop_honours_its_own_cap() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        let small = spawn(EnemyKind::Basic, 1);
        let large = SpawnConfig {
            start_delay_ms: 10_000_000,
            ..spawn(EnemyKind::Basic, 3)
        };
        let scope = CancellationToken::new();
        spawner.initialize_pools(&[small, large], &scope).await.unwrap();

        spawner.start_spawning(&[small], &scope);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(spawner.active_count(EnemyKind::Basic), 1);
        assert!(spawner.spawn_enemy(EnemyKind::Basic, Vec2::ZERO).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_prunes_loops_ended_by_their_scope() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        let configs = [spawn(EnemyKind::Basic, 2)];
        let first = CancellationToken::new();
        spawner.initialize_pools(&configs, &first).await.unwrap();
        spawner.start_spawning(&configs, &first);
        first.cancel();

        let second = CancellationToken::new();
        spawner.start_spawning(&configs, &second);

        assert_eq!(spawner.lock().loops.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_spawning_halts_loops() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        let configs = [spawn(EnemyKind::Basic, 10)];
        let scope = CancellationToken::new();
        spawner.initialize_pools(&configs, &scope).await.unwrap();

        spawner.start_spawning(&configs, &scope);
        tokio::time::sleep(Duration::from_millis(350)).await;
        let before = spawner.active_count(EnemyKind::Basic);
        assert!(before >= 2);

        spawner.stop_spawning();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(spawner.active_count(EnemyKind::Basic), before);
        assert!(!scope.is_cancelled());
    }

    #[tokio::test]
    async fn advance_moves_enemies_towards_target() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        spawner
            .initialize_pools(&[spawn(EnemyKind::Basic, 2)], &CancellationToken::new())
            .await
            .unwrap();
        let far = spawner.spawn_enemy(EnemyKind::Basic, Vec2::new(10.0, 0.0)).unwrap();
        let near = spawner.spawn_enemy(EnemyKind::Basic, Vec2::new(1.0, 0.0)).unwrap();

        // Default profile speed is 2 units per second.
        spawner.advance(Duration::from_secs(1), Vec2::ZERO);

        assert_eq!(spawner.enemy(far).unwrap().position(), Vec2::new(8.0, 0.0));
        assert_eq!(spawner.enemy(near).unwrap().position(), Vec2::ZERO);
        assert_eq!(spawner.enemies_near(Vec2::ZERO, 0.5), vec![near]);
    }

    #[tokio::test]
    async fn shutdown_releases_assets_and_pools() {
        let loader = Arc::new(FakeLoader::default());
        let bus = Arc::new(EventBus::new());
        let spawner = controller(&loader, &bus);
        spawner
            .initialize_pools(&[spawn(EnemyKind::Tank, 2)], &CancellationToken::new())
            .await
            .unwrap();
        spawner.spawn_enemy(EnemyKind::Tank, Vec2::ZERO).unwrap();

        spawner.shutdown();

        assert_eq!(spawner.active_total(), 0);
        assert!(spawner.pooled_kinds().is_empty());
        assert!(loader.released("Enemies/TankEnemy"));
        assert!(loader.released("EnemyConfigs/TankConfig"));
    }
}
