//! Runtime orchestration core for the ROC arcade game.
//!
//! This crate owns the three engines that drive the game's control flow:
//! the application state machine, the pooled spawn controller, and (via
//! `roc-events`) the event bus they communicate through.
//!
//! # Modules
//!
//! - [`cancel`] -- cooperative cancellation helpers wrapping every
//!   suspension point in a race against a [`CancellationToken`].
//! - [`config`] -- configuration loading from `roc-config.yaml` into
//!   strongly-typed structs.
//! - [`machine`] -- [`StateMachine`] and the [`GameState`] trait.
//! - [`pool`] -- generic bounded [`ObjectPool`] with lifecycle hooks.
//! - [`ports`] -- traits for the external collaborators (resource loader,
//!   progress store, window manager).
//! - [`spawner`] -- [`SpawnController`]: per-category pools, timed spawn
//!   loops, and the enemy defeat path.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken
//! [`StateMachine`]: machine::StateMachine
//! [`GameState`]: machine::GameState
//! [`ObjectPool`]: pool::ObjectPool
//! [`SpawnController`]: spawner::SpawnController

pub mod cancel;
pub mod config;
pub mod machine;
pub mod pool;
pub mod ports;
pub mod spawner;

// Re-export the cancellation scope type so downstream crates need not
// depend on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
