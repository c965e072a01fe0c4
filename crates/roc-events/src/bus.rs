//! The in-process event bus.
//!
//! # Dispatch rules
//!
//! - [`EventBus::fire`] is synchronous. Handlers run on the caller's task,
//!   in subscription order, before `fire` returns.
//! - A dispatch iterates a snapshot of the channel's subscribers. While any
//!   dispatch of a kind is in progress, subscribe and unsubscribe calls for
//!   that kind are queued and applied, in call order, once the outermost
//!   dispatch of that kind finishes. A handler added during a dispatch is
//!   therefore not called by it, and a handler removed during a dispatch is
//!   still called by it.
//! - A panicking handler is caught and logged; the remaining handlers of the
//!   same dispatch still run.
//! - The internal lock is released before any handler runs, so handlers may
//!   freely subscribe, unsubscribe and fire (including other kinds).

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::catalog::{Event, EventKind, GameEvent};

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

type ErasedHandler = Arc<dyn Fn(&GameEvent) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    handler: ErasedHandler,
}

enum PendingOp {
    Subscribe(Subscriber),
    Unsubscribe(SubscriptionId),
}

/// Subscribers of one event kind plus the queue of deferred changes.
#[derive(Default)]
struct Channel {
    subscribers: Vec<Subscriber>,
    /// Number of `fire` calls for this kind currently on the stack.
    dispatch_depth: u32,
    pending: Vec<PendingOp>,
}

impl Channel {
    const fn is_dispatching(&self) -> bool {
        self.dispatch_depth > 0
    }

    fn remove(&mut self, id: SubscriptionId) {
        if let Some(pos) = self.subscribers.iter().position(|s| s.id == id) {
            self.subscribers.remove(pos);
        }
    }

    fn apply_pending(&mut self) {
        for op in std::mem::take(&mut self.pending) {
            match op {
                PendingOp::Subscribe(subscriber) => self.subscribers.push(subscriber),
                PendingOp::Unsubscribe(id) => self.remove(id),
            }
        }
    }

    fn is_idle_and_empty(&self) -> bool {
        !self.is_dispatching() && self.pending.is_empty() && self.subscribers.is_empty()
    }
}

#[derive(Default)]
struct BusInner {
    channels: HashMap<EventKind, Channel>,
    next_id: u64,
}

/// Typed publish/subscribe register.
///
/// Shared as `Arc<EventBus>`; every method takes `&self`.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.total_subscriptions())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        // Handlers never run under the lock, so a poisoned lock only means
        // a panic inside the bus bookkeeping itself; the data is still
        // consistent between operations.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `handler` for events of type `E`.
    ///
    /// When called while an `E` dispatch is running, the registration takes
    /// effect after that dispatch completes.
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let erased: ErasedHandler = Arc::new(move |envelope: &GameEvent| {
            if let Some(event) = E::from_envelope(envelope) {
                handler(event);
            }
        });

        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id = inner.next_id.saturating_add(1);

        let channel = inner.channels.entry(E::KIND).or_default();
        let subscriber = Subscriber { id, handler: erased };
        if channel.is_dispatching() {
            debug!(kind = %E::KIND, %id, "subscribe deferred until dispatch completes");
            channel.pending.push(PendingOp::Subscribe(subscriber));
        } else {
            channel.subscribers.push(subscriber);
        }
        id
    }

    /// Remove the handler registered under `id` for events of type `E`.
    ///
    /// Unknown or already removed ids are ignored.
    pub fn unsubscribe<E: Event>(&self, id: SubscriptionId) {
        let mut inner = self.lock();
        let Some(channel) = inner.channels.get_mut(&E::KIND) else {
            return;
        };

        if channel.is_dispatching() {
            debug!(kind = %E::KIND, %id, "unsubscribe deferred until dispatch completes");
            channel.pending.push(PendingOp::Unsubscribe(id));
            return;
        }

        channel.remove(id);
        if channel.is_idle_and_empty() {
            inner.channels.remove(&E::KIND);
        }
    }

    /// Deliver `event` to every current subscriber of `E`.
    ///
    /// Does nothing when `E` has no subscribers.
    pub fn fire<E: Event>(&self, event: E) {
        let snapshot: Vec<(SubscriptionId, ErasedHandler)> = {
            let mut inner = self.lock();
            let Some(channel) = inner.channels.get_mut(&E::KIND) else {
                return;
            };
            if channel.subscribers.is_empty() {
                return;
            }
            channel.dispatch_depth = channel.dispatch_depth.saturating_add(1);
            channel
                .subscribers
                .iter()
                .map(|s| (s.id, Arc::clone(&s.handler)))
                .collect()
        };

        let envelope = event.into_envelope();
        for (id, handler) in &snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&envelope)));
            if let Err(payload) = outcome {
                error!(
                    kind = %E::KIND,
                    subscription = %id,
                    panic = panic_message(payload.as_ref()),
                    "event handler panicked, continuing dispatch"
                );
            }
        }

        let mut inner = self.lock();
        if let Some(channel) = inner.channels.get_mut(&E::KIND) {
            channel.dispatch_depth = channel.dispatch_depth.saturating_sub(1);
            if !channel.is_dispatching() {
                channel.apply_pending();
                if channel.is_idle_and_empty() {
                    inner.channels.remove(&E::KIND);
                }
            }
        }
    }

    /// Number of active (not pending) subscribers for `E`.
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.lock()
            .channels
            .get(&E::KIND)
            .map_or(0, |c| c.subscribers.len())
    }

    /// Number of active subscribers across every event kind.
    pub fn total_subscriptions(&self) -> usize {
        self.lock()
            .channels
            .values()
            .map(|c| c.subscribers.len())
            .sum()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
