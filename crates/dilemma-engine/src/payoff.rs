//! Payoff matrix for the Prisoner's Dilemma

use serde::{Deserialize, Serialize};

use crate::strategy::Action;

/// The four values of the 2x2 payoff table.
///
/// No ordering between them is enforced, so degenerate games can be
/// configured on purpose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoffConfig {
    /// Mutual cooperation
    pub reward: f64,
    /// Defecting against a cooperator
    pub temptation: f64,
    /// Cooperating against a defector
    pub sucker: f64,
    /// Mutual defection
    pub punishment: f64,
}

impl Default for PayoffConfig {
    fn default() -> Self {
        Self {
            reward: 3.0,
            temptation: 5.0,
            sucker: 0.0,
            punishment: 1.0,
        }
    }
}

impl PayoffConfig {
    pub fn new(reward: f64, temptation: f64, sucker: f64, punishment: f64) -> Self {
        Self {
            reward,
            temptation,
            sucker,
            punishment,
        }
    }

    /// Returns (payoff_1, payoff_2)
    pub fn payoff_for(&self, a: Action, b: Action) -> (f64, f64) {
        match (a, b) {
            (Action::Cooperate, Action::Cooperate) => (self.reward, self.reward),
            (Action::Cooperate, Action::Defect) => (self.sucker, self.temptation),
            (Action::Defect, Action::Cooperate) => (self.temptation, self.sucker),
            (Action::Defect, Action::Defect) => (self.punishment, self.punishment),
        }
    }

    /// Named values, for validation and display
    pub(crate) fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("reward", self.reward),
            ("temptation", self.temptation),
            ("sucker", self.sucker),
            ("punishment", self.punishment),
        ]
    }
}
