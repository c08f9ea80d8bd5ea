//! Outcome buckets for aggregate reporting

use serde::Serialize;

use crate::strategy::Action;

/// Round outcome; first letter is player 1's action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    CC,
    CD,
    DC,
    DD,
}

impl Outcome {
    pub fn classify(a: Action, b: Action) -> Self {
        match (a, b) {
            (Action::Cooperate, Action::Cooperate) => Outcome::CC,
            (Action::Cooperate, Action::Defect) => Outcome::CD,
            (Action::Defect, Action::Cooperate) => Outcome::DC,
            (Action::Defect, Action::Defect) => Outcome::DD,
        }
    }
}

/// Count per outcome bucket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    #[serde(rename = "CC")]
    pub cc: u64,
    #[serde(rename = "CD")]
    pub cd: u64,
    #[serde(rename = "DC")]
    pub dc: u64,
    #[serde(rename = "DD")]
    pub dd: u64,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::CC => self.cc += 1,
            Outcome::CD => self.cd += 1,
            Outcome::DC => self.dc += 1,
            Outcome::DD => self.dd += 1,
        }
    }

    pub fn get(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::CC => self.cc,
            Outcome::CD => self.cd,
            Outcome::DC => self.dc,
            Outcome::DD => self.dd,
        }
    }

    pub fn total(&self) -> u64 {
        self.cc + self.cd + self.dc + self.dd
    }

    pub fn absorb(&mut self, other: &OutcomeCounts) {
        self.cc += other.cc;
        self.cd += other.cd;
        self.dc += other.dc;
        self.dd += other.dd;
    }

    /// Share of each bucket over `rounds` (all zero when nothing was played)
    pub fn distribution(&self, rounds: u64) -> OutcomeDistribution {
        let share = |count: u64| if rounds == 0 { 0.0 } else { count as f64 / rounds as f64 };
        OutcomeDistribution {
            cc: share(self.cc),
            cd: share(self.cd),
            dc: share(self.dc),
            dd: share(self.dd),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OutcomeDistribution {
    #[serde(rename = "CC")]
    pub cc: f64,
    #[serde(rename = "CD")]
    pub cd: f64,
    #[serde(rename = "DC")]
    pub dc: f64,
    #[serde(rename = "DD")]
    pub dd: f64,
}
