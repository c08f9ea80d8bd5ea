//! Simulation configuration and the request shape accepted from callers

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::payoff::PayoffConfig;
use crate::strategy::{StrategyConfig, StrategyKind};

/// Round records per `round_batch` event when the caller does not choose
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Validated, immutable simulation configuration
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationConfig {
    rounds: u32,
    monte_carlo_runs: u32,
    strategies: [StrategyConfig; 2],
    payoffs: PayoffConfig,
    batch_size: usize,
}

impl SimulationConfig {
    /// Create a config with canonical payoffs and the default batch size
    pub fn new(
        rounds: u32,
        monte_carlo_runs: u32,
        strategies: [StrategyConfig; 2],
    ) -> Result<Self, ConfigError> {
        if rounds == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        if monte_carlo_runs == 0 {
            return Err(ConfigError::ZeroRuns);
        }
        Ok(Self {
            rounds,
            monte_carlo_runs,
            strategies,
            payoffs: PayoffConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn with_payoffs(mut self, payoffs: PayoffConfig) -> Result<Self, ConfigError> {
        if let Some((name, value)) = payoffs.entries().into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinitePayoff { name, value });
        }
        self.payoffs = payoffs;
        Ok(self)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn monte_carlo_runs(&self) -> u32 {
        self.monte_carlo_runs
    }

    pub fn strategies(&self) -> &[StrategyConfig; 2] {
        &self.strategies
    }

    pub fn payoffs(&self) -> &PayoffConfig {
        &self.payoffs
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rounds across every run
    pub fn total_rounds(&self) -> u64 {
        self.rounds as u64 * self.monte_carlo_runs as u64
    }

    /// Canonical JSON form, for logging and debugging
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Strategy entry of a [`SimulationRequest`]
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StrategyRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub cooperate_probability: Option<f64>,
}

impl StrategyRequest {
    pub fn new(kind: impl Into<String>, cooperate_probability: Option<f64>) -> Self {
        Self {
            kind: kind.into(),
            cooperate_probability,
        }
    }

    /// `player` is 1-based and only used in error messages
    fn into_config(self, player: usize) -> Result<StrategyConfig, ConfigError> {
        let kind: StrategyKind = self.kind.parse()?;
        let probability = match (kind.requires_probability(), self.cooperate_probability) {
            (true, None) => return Err(ConfigError::MissingProbability { player }),
            (_, Some(p)) => p,
            (false, None) => 1.0,
        };
        StrategyConfig::new(kind, probability)
    }
}

fn default_runs() -> u32 {
    1
}

/// Unvalidated configuration as received from a calling layer
#[derive(Clone, Debug, Deserialize)]
pub struct SimulationRequest {
    pub rounds: u32,
    #[serde(default = "default_runs")]
    pub monte_carlo_runs: u32,
    #[serde(default)]
    pub strategies: Vec<StrategyRequest>,
    #[serde(default)]
    pub payoffs: Option<PayoffConfig>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationRequest {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate into a [`SimulationConfig`]. The seed is left to the session.
    pub fn into_config(self) -> Result<SimulationConfig, ConfigError> {
        let count = self.strategies.len();
        let [first, second]: [StrategyRequest; 2] = self
            .strategies
            .try_into()
            .map_err(|_| ConfigError::StrategyCount { count })?;
        let strategies = [first.into_config(1)?, second.into_config(2)?];

        let mut config = SimulationConfig::new(self.rounds, self.monte_carlo_runs, strategies)?
            .with_payoffs(self.payoffs.unwrap_or_default())?;
        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size)?;
        }
        Ok(config)
    }
}
