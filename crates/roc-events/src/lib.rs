//! Typed publish/subscribe messaging for the ROC arcade runtime.
//!
//! Gameplay code, UI code and the application states never call each
//! other directly; they fire immutable events on a shared [`EventBus`] and
//! subscribe to the kinds they care about.
//!
//! # Modules
//!
//! - [`catalog`] -- every event the game fires, plus the closed
//!   [`EventKind`] tag set and the [`Event`] trait tying them together.
//! - [`bus`] -- the [`EventBus`] itself. Dispatch is synchronous, runs over
//!   a snapshot of the subscriber list, and defers subscription changes
//!   made by handlers until the dispatch completes.
//!
//! [`EventKind`]: catalog::EventKind
//! [`Event`]: catalog::Event
//! [`EventBus`]: bus::EventBus

pub mod bus;
pub mod catalog;

pub use bus::{EventBus, SubscriptionId};
pub use catalog::*;
