//! Dilemma Stream - run a Monte Carlo Prisoner's Dilemma session
//!
//! Reads a configuration from flags and/or a JSON file, then streams the
//! session's events to stdout as JSON lines or server-sent event frames.
//! Logs go to stderr.

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dilemma_engine::{
    pump, JsonLines, PayoffConfig, ServerSentEvents, Session, SimulationRequest, StrategyRequest,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Jsonl,
    Sse,
}

#[derive(Debug, Parser)]
#[command(name = "dilemma-stream", about = "Stream repeated Prisoner's Dilemma simulations")]
struct Args {
    /// JSON simulation request; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rounds per Monte Carlo run
    #[arg(long)]
    rounds: Option<u32>,

    /// Number of Monte Carlo runs
    #[arg(long)]
    runs: Option<u32>,

    /// Strategy for player 1
    #[arg(long)]
    player1: Option<String>,

    #[arg(long)]
    player1_probability: Option<f64>,

    /// Strategy for player 2
    #[arg(long)]
    player2: Option<String>,

    #[arg(long)]
    player2_probability: Option<f64>,

    #[arg(long)]
    reward: Option<f64>,

    #[arg(long)]
    temptation: Option<f64>,

    #[arg(long)]
    sucker: Option<f64>,

    #[arg(long)]
    punishment: Option<f64>,

    /// Round records per batch event
    #[arg(long)]
    batch_size: Option<usize>,

    /// Fixed seed for a reproducible session
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = Format::Jsonl)]
    format: Format,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Merge the optional config file with flag overrides
    fn request(&self) -> anyhow::Result<SimulationRequest> {
        let mut request = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                SimulationRequest::from_json(&json)?
            }
            None => SimulationRequest {
                rounds: 100,
                monte_carlo_runs: 1,
                strategies: vec![
                    StrategyRequest::new("tit_for_tat", None),
                    StrategyRequest::new("random", None),
                ],
                payoffs: None,
                batch_size: None,
                seed: None,
            },
        };

        if let Some(rounds) = self.rounds {
            request.rounds = rounds;
        }
        if let Some(runs) = self.runs {
            request.monte_carlo_runs = runs;
        }
        // A missing entry is only filled in when its flag names a strategy
        if request.strategies.is_empty() && self.player1.is_some() {
            request.strategies.push(StrategyRequest::default());
        }
        if request.strategies.len() == 1 && self.player2.is_some() {
            request.strategies.push(StrategyRequest::default());
        }
        if let Some(strategy) = request.strategies.get_mut(0) {
            override_strategy(strategy, &self.player1, self.player1_probability);
        }
        if let Some(strategy) = request.strategies.get_mut(1) {
            override_strategy(strategy, &self.player2, self.player2_probability);
        }

        let payoff_flags = [self.reward, self.temptation, self.sucker, self.punishment];
        if payoff_flags.iter().any(Option::is_some) {
            let payoffs = request.payoffs.get_or_insert_with(PayoffConfig::default);
            payoffs.reward = self.reward.unwrap_or(payoffs.reward);
            payoffs.temptation = self.temptation.unwrap_or(payoffs.temptation);
            payoffs.sucker = self.sucker.unwrap_or(payoffs.sucker);
            payoffs.punishment = self.punishment.unwrap_or(payoffs.punishment);
        }
        if self.batch_size.is_some() {
            request.batch_size = self.batch_size;
        }
        if self.seed.is_some() {
            request.seed = self.seed;
        }
        Ok(request)
    }
}

fn override_strategy(
    strategy: &mut StrategyRequest,
    kind: &Option<String>,
    probability: Option<f64>,
) {
    if let Some(kind) = kind {
        strategy.kind = kind.clone();
    }
    if probability.is_some() {
        strategy.cooperate_probability = probability;
    }
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let session = Session::from_request(args.request()?)?;
    log::info!("Session {} (seed {})", session.id(), session.seed());

    let stdout = io::stdout().lock();
    let terminal = match args.format {
        Format::Jsonl => pump(session.into_stream(), &mut JsonLines(stdout))?,
        Format::Sse => pump(session.into_stream(), &mut ServerSentEvents(stdout))?,
    };
    log::info!("Stream finished with {}", terminal);
    Ok(())
}
