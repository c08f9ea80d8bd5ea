//! Strategy definitions and evaluation

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;

use crate::error::ConfigError;

/// An action in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    #[serde(rename = "C")]
    Cooperate,
    #[serde(rename = "D")]
    Defect,
}

impl Action {
    pub fn cooperated(self) -> bool {
        self == Action::Cooperate
    }
}

/// Strategy kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Always cooperate, never defect.
    AlwaysCooperate,
    /// Always defect, never cooperate.
    AlwaysDefect,
    /// Cooperate with a fixed probability each round.
    Probabilistic,
    /// Copy opponent's last action. Start with cooperate.
    TitForTat,
    /// Fair coin flip each round.
    Random,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::AlwaysCooperate,
        StrategyKind::AlwaysDefect,
        StrategyKind::Probabilistic,
        StrategyKind::TitForTat,
        StrategyKind::Random,
    ];

    /// Wire identifier
    pub fn id(self) -> &'static str {
        match self {
            StrategyKind::AlwaysCooperate => "always_cooperate",
            StrategyKind::AlwaysDefect => "always_defect",
            StrategyKind::Probabilistic => "probabilistic",
            StrategyKind::TitForTat => "tit_for_tat",
            StrategyKind::Random => "random",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::AlwaysCooperate => "Always Cooperate",
            StrategyKind::AlwaysDefect => "Always Defect",
            StrategyKind::Probabilistic => "Probabilistic",
            StrategyKind::TitForTat => "Tit for Tat",
            StrategyKind::Random => "Random",
        }
    }

    /// Get a human-readable description of the strategy
    pub fn describe(self) -> &'static str {
        match self {
            StrategyKind::AlwaysCooperate => "Never defects. Always cooperates.",
            StrategyKind::AlwaysDefect => "Never cooperates. Always defects.",
            StrategyKind::Probabilistic => "Cooperates with a fixed probability each round.",
            StrategyKind::TitForTat => "Copies opponent's last move. Starts by cooperating.",
            StrategyKind::Random => "Cooperates or defects with equal chance each round.",
        }
    }

    pub fn requires_probability(self) -> bool {
        matches!(self, StrategyKind::Probabilistic)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        match key.as_str() {
            "always_cooperate" => Ok(StrategyKind::AlwaysCooperate),
            "always_defect" => Ok(StrategyKind::AlwaysDefect),
            "probabilistic" => Ok(StrategyKind::Probabilistic),
            "tit_for_tat" | "tit-for-tat" => Ok(StrategyKind::TitForTat),
            "random" => Ok(StrategyKind::Random),
            _ => Err(ConfigError::UnknownStrategy { kind: key }),
        }
    }
}

/// One entry of the strategy listing shown to clients
#[derive(Clone, Debug, Serialize)]
pub struct StrategyInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub requires_probability: bool,
}

/// All available strategy kinds
pub fn catalog() -> Vec<StrategyInfo> {
    StrategyKind::ALL
        .iter()
        .map(|kind| StrategyInfo {
            id: kind.id(),
            label: kind.label(),
            description: kind.describe(),
            requires_probability: kind.requires_probability(),
        })
        .collect()
}

/// Immutable per-player strategy configuration
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StrategyConfig {
    kind: StrategyKind,
    cooperate_probability: f64,
}

impl StrategyConfig {
    /// Build a strategy. The probability is checked only for the
    /// probabilistic kind; the others ignore it.
    pub fn new(kind: StrategyKind, cooperate_probability: f64) -> Result<Self, ConfigError> {
        if kind.requires_probability() && !(0.0..=1.0).contains(&cooperate_probability) {
            return Err(ConfigError::ProbabilityOutOfRange {
                value: cooperate_probability,
            });
        }
        Ok(Self {
            kind,
            cooperate_probability,
        })
    }

    pub fn always_cooperate() -> Self {
        Self::deterministic(StrategyKind::AlwaysCooperate)
    }

    pub fn always_defect() -> Self {
        Self::deterministic(StrategyKind::AlwaysDefect)
    }

    pub fn tit_for_tat() -> Self {
        Self::deterministic(StrategyKind::TitForTat)
    }

    pub fn random() -> Self {
        Self::deterministic(StrategyKind::Random)
    }

    pub fn probabilistic(cooperate_probability: f64) -> Result<Self, ConfigError> {
        Self::new(StrategyKind::Probabilistic, cooperate_probability)
    }

    fn deterministic(kind: StrategyKind) -> Self {
        Self {
            kind,
            cooperate_probability: 1.0,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn cooperate_probability(&self) -> f64 {
        self.cooperate_probability
    }

    /// Draw an action for the current round
    ///
    /// # Arguments
    /// * `round_index` - 1-based round number within the current run
    /// * `opponent_previous` - Opponent's action last round (`None` on round 1)
    /// * `rng` - Session random source; only the random kinds draw from it
    pub fn sample_action<R: Rng + ?Sized>(
        &self,
        round_index: u32,
        opponent_previous: Option<Action>,
        rng: &mut R,
    ) -> Action {
        match self.kind {
            StrategyKind::AlwaysCooperate => Action::Cooperate,
            StrategyKind::AlwaysDefect => Action::Defect,
            StrategyKind::Probabilistic => {
                if rng.gen_bool(self.cooperate_probability) {
                    Action::Cooperate
                } else {
                    Action::Defect
                }
            }
            StrategyKind::TitForTat => {
                if round_index <= 1 {
                    return Action::Cooperate;
                }
                opponent_previous.unwrap_or(Action::Cooperate)
            }
            StrategyKind::Random => {
                if rng.gen_bool(0.5) {
                    Action::Cooperate
                } else {
                    Action::Defect
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRng;

    fn make_rng() -> SeededRng {
        SeededRng::for_run(42, 1)
    }

    #[test]
    fn test_tit_for_tat_first_move() {
        let strategy = StrategyConfig::tit_for_tat();
        let mut rng = make_rng();

        assert_eq!(strategy.sample_action(1, None, &mut rng), Action::Cooperate);
        // Round 1 ignores whatever history is passed in
        assert_eq!(
            strategy.sample_action(1, Some(Action::Defect), &mut rng),
            Action::Cooperate
        );
    }

    #[test]
    fn test_tit_for_tat_copies() {
        let strategy = StrategyConfig::tit_for_tat();
        let mut rng = make_rng();

        let m = strategy.sample_action(2, Some(Action::Cooperate), &mut rng);
        assert_eq!(m, Action::Cooperate);

        let m = strategy.sample_action(2, Some(Action::Defect), &mut rng);
        assert_eq!(m, Action::Defect);
    }

    #[test]
    fn test_always_defect() {
        let strategy = StrategyConfig::always_defect();
        let mut rng = make_rng();

        for round in 1..=10 {
            let m = strategy.sample_action(round, Some(Action::Cooperate), &mut rng);
            assert_eq!(m, Action::Defect);
        }
    }

    #[test]
    fn test_always_cooperate() {
        let strategy = StrategyConfig::always_cooperate();
        let mut rng = make_rng();

        for round in 1..=10 {
            let m = strategy.sample_action(round, Some(Action::Defect), &mut rng);
            assert_eq!(m, Action::Cooperate);
        }
    }

    #[test]
    fn test_probability_zero_means_always_defect() {
        let strategy = StrategyConfig::probabilistic(0.0).unwrap();
        let mut rng = make_rng();
        for round in 1..=20 {
            assert_eq!(strategy.sample_action(round, None, &mut rng), Action::Defect);
        }
    }

    #[test]
    fn test_probability_one_means_always_cooperate() {
        let strategy = StrategyConfig::probabilistic(1.0).unwrap();
        let mut rng = make_rng();
        for round in 1..=20 {
            assert_eq!(strategy.sample_action(round, None, &mut rng), Action::Cooperate);
        }
    }

    #[test]
    fn test_probabilistic_rate_statistical() {
        let strategy = StrategyConfig::probabilistic(0.75).unwrap();
        let mut rng = make_rng();
        let samples = 10_000;
        let cooperations = (1..=samples)
            .filter(|round| strategy.sample_action(*round, None, &mut rng).cooperated())
            .count();
        let rate = cooperations as f64 / samples as f64;
        assert!(rate > 0.72 && rate < 0.78, "rate {} not ~0.75", rate);
    }

    #[test]
    fn test_random_is_fair_coin() {
        // Configured probability is ignored for the uniform kind
        let strategy = StrategyConfig::new(StrategyKind::Random, 0.0).unwrap();
        let mut rng = make_rng();
        let samples = 10_000;
        let cooperations = (1..=samples)
            .filter(|round| strategy.sample_action(*round, None, &mut rng).cooperated())
            .count();
        let rate = cooperations as f64 / samples as f64;
        assert!(rate > 0.47 && rate < 0.53, "rate {} not ~0.5", rate);
    }

    #[test]
    fn test_probabilistic_determinism() {
        let strategy = StrategyConfig::probabilistic(0.4).unwrap();
        let mut rng1 = make_rng();
        let mut rng2 = make_rng();
        for round in 1..=100 {
            assert_eq!(
                strategy.sample_action(round, None, &mut rng1),
                strategy.sample_action(round, None, &mut rng2)
            );
        }
    }

    #[test]
    fn test_invalid_probability_rejected() {
        assert!(matches!(
            StrategyConfig::probabilistic(1.5),
            Err(ConfigError::ProbabilityOutOfRange { .. })
        ));
        assert!(StrategyConfig::probabilistic(-0.1).is_err());
        assert!(StrategyConfig::probabilistic(f64::NAN).is_err());
    }

    #[test]
    fn test_probability_ignored_for_other_kinds() {
        let strategy = StrategyConfig::new(StrategyKind::AlwaysCooperate, 7.0).unwrap();
        assert_eq!(strategy.kind(), StrategyKind::AlwaysCooperate);
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("tit_for_tat".parse::<StrategyKind>().unwrap(), StrategyKind::TitForTat);
        assert_eq!("tit-for-tat".parse::<StrategyKind>().unwrap(), StrategyKind::TitForTat);
        assert_eq!("Always_Defect".parse::<StrategyKind>().unwrap(), StrategyKind::AlwaysDefect);
        for kind in StrategyKind::ALL {
            assert_eq!(kind.id().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_unknown_kind() {
        match "grim_trigger".parse::<StrategyKind>() {
            Err(ConfigError::UnknownStrategy { kind }) => assert_eq!(kind, "grim_trigger"),
            other => panic!("expected unknown strategy, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_lists_every_kind() {
        let entries = catalog();
        assert_eq!(entries.len(), 5);
        let probabilistic: Vec<_> = entries.iter().filter(|e| e.requires_probability).collect();
        assert_eq!(probabilistic.len(), 1);
        assert_eq!(probabilistic[0].id, "probabilistic");
    }

    #[test]
    fn test_action_wire_names() {
        assert_eq!(serde_json::to_string(&Action::Cooperate).unwrap(), "\"C\"");
        assert_eq!(serde_json::to_string(&Action::Defect).unwrap(), "\"D\"");
    }
}
