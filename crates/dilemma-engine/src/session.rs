//! Session handle: one simulation, owned by the caller from creation to stream

use uuid::Uuid;

use crate::config::{SimulationConfig, SimulationRequest};
use crate::error::ConfigError;
use crate::events::{EventStream, StopHandle};
use crate::game::Simulation;
use crate::random::SeededRng;

/// A validated simulation waiting to be streamed.
///
/// Created once, then consumed by [`Session::into_stream`]. The stop handle
/// can be cloned out beforehand to cancel from another thread.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    config: SimulationConfig,
    seed: u64,
    stop: StopHandle,
}

impl Session {
    /// Session seeded from OS entropy
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_seed(config, SeededRng::entropy_seed())
    }

    /// Deterministic session: the same seed replays the same events
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Self {
        let id = Uuid::new_v4();
        log::debug!("Session {} created (seed {}): {}", id, seed, config.to_json());
        Self {
            id,
            config,
            seed,
            stop: StopHandle::new(),
        }
    }

    /// Validate a request; uses its seed when one is given
    pub fn from_request(request: SimulationRequest) -> Result<Self, ConfigError> {
        let seed = request.seed;
        let config = request.into_config()?;
        Ok(match seed {
            Some(seed) => Self::with_seed(config, seed),
            None => Self::new(config),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn into_stream(self) -> EventStream {
        log::info!(
            "Session {}: {} runs x {} rounds, {} vs {}",
            self.id,
            self.config.monte_carlo_runs(),
            self.config.rounds(),
            self.config.strategies()[0].kind(),
            self.config.strategies()[1].kind(),
        );
        EventStream::new(Simulation::new(self.config, self.seed), self.stop)
    }
}
