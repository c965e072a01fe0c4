//! In-process implementations of the `roc-core` collaborator ports.

mod catalog_loader;
mod progress_store;
mod window_manager;

pub use catalog_loader::CatalogLoader;
pub use progress_store::{JsonProgressStore, MemoryProgressStore};
pub use window_manager::LoggingWindowManager;
