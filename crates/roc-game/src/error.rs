//! Error type for the game binary.

/// Top-level error that `main` propagates with `?`.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: roc_core::config::ConfigError,
    },

    /// The state machine refused a transition.
    #[error("state machine error: {source}")]
    Machine {
        /// The underlying machine error.
        #[from]
        source: roc_core::machine::MachineError,
    },
}
