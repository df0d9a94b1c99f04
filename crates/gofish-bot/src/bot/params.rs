use core::fmt;
use core::str::FromStr;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Named strategy tiers. Each maps to one fixed set of tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyProfile {
    Casual,
    Scout,
    Greedy,
    Denial,
}

impl StrategyProfile {
    pub const ALL: [StrategyProfile; 4] = [
        StrategyProfile::Casual,
        StrategyProfile::Scout,
        StrategyProfile::Greedy,
        StrategyProfile::Denial,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            StrategyProfile::Casual => "casual",
            StrategyProfile::Scout => "scout",
            StrategyProfile::Greedy => "greedy",
            StrategyProfile::Denial => "denial",
        }
    }
}

impl fmt::Display for StrategyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyProfile {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        StrategyProfile::ALL
            .iter()
            .copied()
            .find(|profile| profile.as_str() == lowered)
            .ok_or(ParamError::UnknownProfile(lowered))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("unknown strategy profile '{0}'")]
    UnknownProfile(String),
    #[error("unknown parameter '{0}'")]
    UnknownKey(String),
    #[error("parameter '{key}' is out of range: {message}")]
    OutOfRange { key: String, message: String },
}

/// Linear weights of the per-move score components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringWeights {
    /// (own + expected take) / 4.
    pub completion: f64,
    /// 1.0 at three held, 0.45 at two.
    pub near_book: f64,
    /// Opponent holding probability scaled by own share.
    pub deny: f64,
    /// Binary entropy of the fused probability.
    pub info_gain: f64,
    /// Event-informed probability with the decaying bias added.
    pub belief: f64,
    /// Averaged root value from the endgame search.
    pub endgame: f64,
    /// One-step rollout utility over particles.
    pub monte_carlo: f64,
}

/// Everything a strategy tier tunes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileParams {
    pub profile: StrategyProfile,
    pub weights: ScoringWeights,
    pub particles: usize,
    pub rollouts: usize,
    /// Search plies; 0 disables the endgame search.
    pub search_depth: u8,
    pub search_node_budget: usize,
    pub determinizations: usize,
    pub endgame_deck_threshold: usize,
    pub endgame_hand_threshold: usize,
    pub temperature: f64,
    pub tolerance: f64,
}

impl ProfileParams {
    pub fn for_profile(profile: StrategyProfile) -> Self {
        match profile {
            StrategyProfile::Casual => Self {
                profile,
                weights: ScoringWeights {
                    completion: 1.0,
                    near_book: 0.6,
                    deny: 0.2,
                    info_gain: 0.1,
                    belief: 0.5,
                    endgame: 0.0,
                    monte_carlo: 0.2,
                },
                particles: 24,
                rollouts: 16,
                search_depth: 0,
                search_node_budget: 0,
                determinizations: 0,
                endgame_deck_threshold: 0,
                endgame_hand_threshold: 0,
                temperature: 0.6,
                tolerance: 0.35,
            },
            StrategyProfile::Scout => Self {
                profile,
                weights: ScoringWeights {
                    completion: 0.8,
                    near_book: 0.6,
                    deny: 0.3,
                    info_gain: 1.2,
                    belief: 0.8,
                    endgame: 0.15,
                    monte_carlo: 0.3,
                },
                particles: 64,
                rollouts: 32,
                search_depth: 4,
                search_node_budget: 20_000,
                determinizations: 3,
                endgame_deck_threshold: 6,
                endgame_hand_threshold: 4,
                temperature: 0.15,
                tolerance: 0.1,
            },
            StrategyProfile::Greedy => Self {
                profile,
                weights: ScoringWeights {
                    completion: 1.4,
                    near_book: 1.1,
                    deny: 0.3,
                    info_gain: 0.1,
                    belief: 1.0,
                    endgame: 0.25,
                    monte_carlo: 0.6,
                },
                particles: 96,
                rollouts: 48,
                search_depth: 4,
                search_node_budget: 20_000,
                determinizations: 4,
                endgame_deck_threshold: 6,
                endgame_hand_threshold: 4,
                temperature: 0.05,
                tolerance: 0.05,
            },
            StrategyProfile::Denial => Self {
                profile,
                weights: ScoringWeights {
                    completion: 1.0,
                    near_book: 0.8,
                    deny: 1.2,
                    info_gain: 0.2,
                    belief: 1.3,
                    endgame: 0.35,
                    monte_carlo: 0.4,
                },
                particles: 128,
                rollouts: 48,
                search_depth: 6,
                search_node_budget: 40_000,
                determinizations: 6,
                endgame_deck_threshold: 8,
                endgame_hand_threshold: 5,
                temperature: 0.0,
                tolerance: 0.0,
            },
        }
    }

    pub fn search_enabled(&self) -> bool {
        self.search_depth > 0 && self.weights.endgame != 0.0
    }

    /// Applies named overrides such as `temperature` or `weights.deny`.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, f64>) -> Result<Self, ParamError> {
        for (key, &value) in overrides {
            if !value.is_finite() {
                return Err(ParamError::OutOfRange {
                    key: key.clone(),
                    message: "must be finite".into(),
                });
            }
            let w = &mut self.weights;
            match key.as_str() {
                "weights.completion" => w.completion = value,
                "weights.near_book" => w.near_book = value,
                "weights.deny" => w.deny = value,
                "weights.info_gain" => w.info_gain = value,
                "weights.belief" => w.belief = value,
                "weights.endgame" => w.endgame = value,
                "weights.monte_carlo" => w.monte_carlo = value,
                "particles" => self.particles = count(key, value, 4096)?,
                "rollouts" => self.rollouts = count(key, value, 4096)?,
                "search_depth" => self.search_depth = count(key, value, 12)? as u8,
                "search_node_budget" => self.search_node_budget = count(key, value, 5_000_000)?,
                "determinizations" => self.determinizations = count(key, value, 64)?,
                "endgame_deck_threshold" => self.endgame_deck_threshold = count(key, value, 52)?,
                "endgame_hand_threshold" => self.endgame_hand_threshold = count(key, value, 52)?,
                "temperature" => self.temperature = non_negative(key, value)?,
                "tolerance" => self.tolerance = non_negative(key, value)?,
                _ => return Err(ParamError::UnknownKey(key.clone())),
            }
        }
        Ok(self)
    }
}

fn count(key: &str, value: f64, max: usize) -> Result<usize, ParamError> {
    if value < 0.0 || value.fract() != 0.0 || value > max as f64 {
        return Err(ParamError::OutOfRange {
            key: key.to_string(),
            message: format!("expected a whole number between 0 and {max}"),
        });
    }
    Ok(value as usize)
}

fn non_negative(key: &str, value: f64) -> Result<f64, ParamError> {
    if value < 0.0 {
        return Err(ParamError::OutOfRange {
            key: key.to_string(),
            message: "must not be negative".into(),
        });
    }
    Ok(value)
}
