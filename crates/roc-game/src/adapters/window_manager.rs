//! Headless window manager.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use roc_core::ports::{PortError, WindowManager};
use roc_types::{UiLayer, ViewKey};
use tracing::info;

/// [`WindowManager`] that keeps the open views per layer in memory and
/// logs every change. A view is open on at most one layer.
#[derive(Debug, Default)]
pub struct LoggingWindowManager {
    layers: Mutex<BTreeMap<UiLayer, BTreeSet<ViewKey>>>,
}

impl LoggingWindowManager {
    /// Create a manager with nothing shown.
    pub fn new() -> Self {
        Self::default()
    }

    fn layers(&self) -> MutexGuard<'_, BTreeMap<UiLayer, BTreeSet<ViewKey>>> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `view` is currently shown.
    pub fn is_visible(&self, view: ViewKey) -> bool {
        self.layers().values().any(|views| views.contains(&view))
    }

    /// Views shown on `layer`.
    pub fn views_on(&self, layer: UiLayer) -> Vec<ViewKey> {
        self.layers()
            .get(&layer)
            .map(|views| views.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl WindowManager for LoggingWindowManager {
    async fn show_window(&self, view: ViewKey, layer: UiLayer) -> Result<(), PortError> {
        let mut layers = self.layers();
        for views in layers.values_mut() {
            views.remove(&view);
        }
        layers.entry(layer).or_default().insert(view);
        info!(?view, ?layer, "window shown");
        Ok(())
    }

    async fn hide_window(&self, view: ViewKey) {
        let mut removed = false;
        for views in self.layers().values_mut() {
            removed |= views.remove(&view);
        }
        if removed {
            info!(?view, "window hidden");
        }
    }

    async fn hide_layer(&self, layer: UiLayer) {
        let hidden = self.layers().remove(&layer).unwrap_or_default();
        if !hidden.is_empty() {
            info!(?layer, count = hidden.len(), "layer hidden");
        }
    }
}
