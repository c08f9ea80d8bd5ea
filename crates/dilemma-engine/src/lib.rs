//! Monte Carlo engine for the repeated Prisoner's Dilemma
//!
//! Two configured strategies play a fixed number of rounds per run, over
//! one or more independent runs. Progress comes out as a lazy, ordered
//! stream of events (`round_batch`, `run_complete`, `summary`) that a
//! transport can forward as it is produced.
//! This crate is compiled to:
//! - Native (for the streaming host)
//! - WASM (for the browser frontend)

mod config;
mod error;
mod events;
mod game;
mod outcome;
mod payoff;
mod random;
mod session;
mod strategy;
mod transport;

#[cfg(feature = "wasm")]
mod wasm;

pub use config::{SimulationConfig, SimulationRequest, StrategyRequest, DEFAULT_BATCH_SIZE};
pub use error::{ConfigError, TransportError};
pub use events::{Event, EventStream, Failure, RoundBatch, StopHandle};
pub use game::{simulate, PerPlayer, RoundRecord, RunSummary, Simulation, Step, Summary, Totals};
pub use outcome::{Outcome, OutcomeCounts, OutcomeDistribution};
pub use payoff::PayoffConfig;
pub use random::SeededRng;
pub use session::Session;
pub use strategy::{catalog, Action, StrategyConfig, StrategyInfo, StrategyKind};
pub use transport::{pump, spawn_channel, JsonLines, ServerSentEvents, Sink};
