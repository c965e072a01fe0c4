//! Game layer of the ROC arcade runtime.
//!
//! Wires the `roc-core` state machine, spawner and ports into a playable
//! loop: concrete adapters, the bootstrap, menu and gameplay states, the
//! per-run session and a fixed-step frame driver.
//!
//! # Modules
//!
//! - [`adapters`] -- in-process loader, progress stores and window manager
//! - [`app`] -- [`Game`](app::Game) assembly and shutdown
//! - [`driver`] -- frame driver and game over autopilot
//! - [`error`] -- top-level error for the binary
//! - [`session`] -- score, lives and records of the current run
//! - [`states`] -- the application states and their shared services

pub mod adapters;
pub mod app;
pub mod driver;
pub mod error;
pub mod session;
pub mod states;
