//! Simulation loop: rounds within a run, runs within a simulation

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::outcome::{Outcome, OutcomeCounts, OutcomeDistribution};
use crate::payoff::PayoffConfig;
use crate::random::SeededRng;
use crate::strategy::Action;

/// A value for each of the two players
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PerPlayer<T> {
    pub player1: T,
    pub player2: T,
}

impl<T> PerPlayer<T> {
    pub fn new(player1: T, player2: T) -> Self {
        Self { player1, player2 }
    }

    pub fn map<U>(self, f: impl Fn(T) -> U) -> PerPlayer<U> {
        PerPlayer {
            player1: f(self.player1),
            player2: f(self.player2),
        }
    }
}

fn ratio(numerator: f64, rounds: u64) -> f64 {
    if rounds == 0 {
        0.0
    } else {
        numerator / rounds as f64
    }
}

/// Running totals, shared by the per-run and overall accumulators
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Totals {
    pub payoff: PerPlayer<f64>,
    pub cooperation: PerPlayer<u64>,
    pub outcomes: OutcomeCounts,
    pub rounds: u64,
}

impl Totals {
    fn record(&mut self, actions: (Action, Action), payoff: (f64, f64)) {
        self.payoff.player1 += payoff.0;
        self.payoff.player2 += payoff.1;
        self.cooperation.player1 += actions.0.cooperated() as u64;
        self.cooperation.player2 += actions.1.cooperated() as u64;
        self.outcomes.record(Outcome::classify(actions.0, actions.1));
        self.rounds += 1;
    }

    fn absorb(&mut self, other: &Totals) {
        self.payoff.player1 += other.payoff.player1;
        self.payoff.player2 += other.payoff.player2;
        self.cooperation.player1 += other.cooperation.player1;
        self.cooperation.player2 += other.cooperation.player2;
        self.outcomes.absorb(&other.outcomes);
        self.rounds += other.rounds;
    }

    pub fn cooperation_rate(&self) -> PerPlayer<f64> {
        self.cooperation.map(|c| ratio(c as f64, self.rounds))
    }

    pub fn average_payoff(&self) -> PerPlayer<f64> {
        self.payoff.map(|p| ratio(p, self.rounds))
    }
}

/// Detail of one played round
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundRecord {
    pub run: u32,
    /// 1-based, resets every run
    pub round: u32,
    /// 1-based across all runs
    pub cumulative_round: u64,
    pub actions: PerPlayer<Action>,
    pub cooperated: PerPlayer<bool>,
    pub cumulative_cooperation: PerPlayer<u64>,
    pub round_payoff: PerPlayer<f64>,
    pub total_payoff: PerPlayer<f64>,
    pub cooperation_rate: PerPlayer<f64>,
    pub outcome_counts: OutcomeCounts,
}

/// Totals of one completed run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub run: u32,
    pub total_payoff: PerPlayer<f64>,
    pub total_cooperation: PerPlayer<u64>,
    pub average_payoff_per_round: PerPlayer<f64>,
    pub cooperation_rate: PerPlayer<f64>,
    pub outcome_counts: OutcomeCounts,
}

/// Aggregate over every run played
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub runs: u32,
    pub rounds: u32,
    pub runs_completed: u32,
    pub rounds_played: u64,
    pub total_payoff: PerPlayer<f64>,
    pub average_payoff_per_round: PerPlayer<f64>,
    pub cooperation_rate: PerPlayer<f64>,
    pub total_cooperation: PerPlayer<u64>,
    pub outcome_counts: OutcomeCounts,
    pub outcome_distribution: OutcomeDistribution,
    pub payoffs: PayoffConfig,
}

/// One unit of progress from [`Simulation::step`]
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Round(RoundRecord),
    RunComplete(RunSummary),
    Summary(Summary),
}

/// State of a run in progress. Dropped once folded into the overall totals.
struct RunState {
    run: u32,
    totals: Totals,
    previous: Option<(Action, Action)>,
    rng: SeededRng,
}

impl RunState {
    fn new(run: u32, seed: u64) -> Self {
        Self {
            run,
            totals: Totals::default(),
            previous: None,
            rng: SeededRng::for_run(seed, run),
        }
    }

    fn play_round(&mut self, config: &SimulationConfig) -> RoundRecord {
        let round = self.totals.rounds as u32 + 1;
        let [strategy_1, strategy_2] = config.strategies();

        // Player 1 draws first so a fixed seed replays the same sequence
        let action_1 = strategy_1.sample_action(round, self.previous.map(|p| p.1), &mut self.rng);
        let action_2 = strategy_2.sample_action(round, self.previous.map(|p| p.0), &mut self.rng);
        let actions = (action_1, action_2);

        let payoff = config.payoffs().payoff_for(action_1, action_2);
        self.totals.record(actions, payoff);
        self.previous = Some(actions);

        RoundRecord {
            run: self.run,
            round,
            cumulative_round: (self.run as u64 - 1) * config.rounds() as u64 + round as u64,
            actions: PerPlayer::new(action_1, action_2),
            cooperated: PerPlayer::new(action_1.cooperated(), action_2.cooperated()),
            cumulative_cooperation: self.totals.cooperation,
            round_payoff: PerPlayer::new(payoff.0, payoff.1),
            total_payoff: self.totals.payoff,
            cooperation_rate: self.totals.cooperation_rate(),
            outcome_counts: self.totals.outcomes,
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            run: self.run,
            total_payoff: self.totals.payoff,
            total_cooperation: self.totals.cooperation,
            average_payoff_per_round: self.totals.average_payoff(),
            cooperation_rate: self.totals.cooperation_rate(),
            outcome_counts: self.totals.outcomes,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    RunInProgress,
    RunComplete,
    AllRunsComplete,
    SummaryEmitted,
    Terminal,
}

/// Sequential Monte Carlo simulation, advanced one [`Step`] at a time
pub struct Simulation {
    config: SimulationConfig,
    seed: u64,
    phase: Phase,
    current: Option<RunState>,
    overall: Totals,
    runs_completed: u32,
}

impl Simulation {
    pub fn new(config: SimulationConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            phase: Phase::Idle,
            current: None,
            overall: Totals::default(),
            runs_completed: 0,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rounds played so far, across runs
    pub fn rounds_played(&self) -> u64 {
        self.overall.rounds + self.current.as_ref().map_or(0, |run| run.totals.rounds)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::SummaryEmitted | Phase::Terminal)
    }

    /// Advance to the next round, run end, or final summary.
    /// Returns `None` once the summary has been produced.
    pub fn step(&mut self) -> Option<Step> {
        loop {
            match self.phase {
                Phase::Idle | Phase::RunComplete => {
                    let run = self.runs_completed + 1;
                    self.current = Some(RunState::new(run, self.seed));
                    self.phase = Phase::RunInProgress;
                }
                Phase::RunInProgress => {
                    let Some(run) = self.current.as_mut() else {
                        self.phase = Phase::Terminal;
                        return None;
                    };
                    if run.totals.rounds < self.config.rounds() as u64 {
                        return Some(Step::Round(run.play_round(&self.config)));
                    }
                    return self.finish_run().map(Step::RunComplete);
                }
                Phase::AllRunsComplete => {
                    self.phase = Phase::SummaryEmitted;
                    return Some(Step::Summary(self.summary()));
                }
                Phase::SummaryEmitted | Phase::Terminal => return None,
            }
        }
    }

    fn finish_run(&mut self) -> Option<RunSummary> {
        let run = self.current.take()?;
        let summary = run.summary();
        self.overall.absorb(&run.totals);
        self.runs_completed += 1;
        self.phase = if self.runs_completed < self.config.monte_carlo_runs() {
            Phase::RunComplete
        } else {
            Phase::AllRunsComplete
        };

        log::debug!(
            "Run {}/{}: {:.1} : {:.1}, cooperation {:.3} / {:.3}",
            summary.run,
            self.config.monte_carlo_runs(),
            summary.total_payoff.player1,
            summary.total_payoff.player2,
            summary.cooperation_rate.player1,
            summary.cooperation_rate.player2,
        );
        Some(summary)
    }

    /// End the simulation early. Any partial run is folded into the totals
    /// and the summary covers exactly the rounds played so far.
    pub fn halt(&mut self) -> Summary {
        if let Some(run) = self.current.take() {
            self.overall.absorb(&run.totals);
        }
        self.phase = Phase::Terminal;
        self.summary()
    }

    fn summary(&self) -> Summary {
        let totals = &self.overall;
        Summary {
            runs: self.config.monte_carlo_runs(),
            rounds: self.config.rounds(),
            runs_completed: self.runs_completed,
            rounds_played: totals.rounds,
            total_payoff: totals.payoff,
            average_payoff_per_round: totals.average_payoff(),
            cooperation_rate: totals.cooperation_rate(),
            total_cooperation: totals.cooperation,
            outcome_counts: totals.outcomes,
            outcome_distribution: totals.outcomes.distribution(totals.rounds),
            payoffs: *self.config.payoffs(),
        }
    }
}

/// Run a complete simulation and return only the final summary
pub fn simulate(config: SimulationConfig, seed: u64) -> Summary {
    let mut simulation = Simulation::new(config, seed);
    while let Some(step) = simulation.step() {
        if let Step::Summary(summary) = step {
            return summary;
        }
    }
    simulation.halt()
}
