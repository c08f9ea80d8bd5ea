//! Error types for configuration and event delivery

use thiserror::Error;

/// Rejected configuration. Raised before a session exists, never mid-run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("number of rounds must be positive")]
    ZeroRounds,

    #[error("monte carlo runs must be positive")]
    ZeroRuns,

    #[error("batch size must be positive")]
    ZeroBatchSize,

    #[error("cooperate_probability must lie in [0, 1], got {value}")]
    ProbabilityOutOfRange { value: f64 },

    #[error("missing cooperate_probability for probabilistic strategy (player {player})")]
    MissingProbability { player: usize },

    #[error("unsupported strategy '{kind}'")]
    UnknownStrategy { kind: String },

    #[error("two player strategies are required, got {count}")]
    StrategyCount { count: usize },

    #[error("payoff '{name}' must be finite, got {value}")]
    NonFinitePayoff { name: &'static str, value: f64 },

    #[error("invalid simulation request: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure while handing events to a consumer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("consumer disconnected")]
    Disconnected,
}
