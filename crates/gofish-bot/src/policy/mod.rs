mod analytical;
mod heuristic;
mod simple;

pub use analytical::AnalyticalPolicy;
pub use heuristic::HeuristicPolicy;
pub use simple::{BaselinePolicy, RandomPolicy};

use crate::bot::{ParamError, StrategyProfile};
use gofish_core::game::state::{Action, GameState};
use gofish_core::game::view::SeatView;
use gofish_core::model::player::Seat;
use gofish_core::model::rank::Rank;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Numeric tunables passed to a policy constructor.
pub type PolicyParams = BTreeMap<String, f64>;

/// Context provided to policies for decision-making.
pub struct PolicyContext<'a> {
    pub state: &'a GameState,
    pub legal: &'a [Action],
    pub seat: Seat,
}

impl<'a> PolicyContext<'a> {
    pub fn new(state: &'a GameState, legal: &'a [Action], seat: Seat) -> Self {
        Self { state, legal, seat }
    }

    /// What the acting seat is allowed to see.
    pub fn view(&self) -> SeatView<'a> {
        self.state.seat_view(self.seat)
    }

    pub fn legal_ranks(&self) -> Vec<Rank> {
        self.legal.iter().map(|action| action.ask_rank).collect()
    }
}

/// Stable description of a configured policy, hashed into run fingerprints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyDescriptor {
    pub kind: String,
    pub version: u32,
    pub params: BTreeMap<String, serde_json::Value>,
}

impl PolicyDescriptor {
    pub fn new(kind: impl Into<String>, version: u32) -> Self {
        Self {
            kind: kind.into(),
            version,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.params.insert(key.to_string(), value);
        self
    }
}

/// Unified interface for move selection.
pub trait Policy: Send {
    fn name(&self) -> &str;

    /// Called once per game with that game's seed.
    fn reset(&mut self, _seed: u64) {}

    /// Choose one of `ctx.legal`. `None` lets the caller fall back.
    fn pick_move(&mut self, ctx: &PolicyContext<'_>) -> Option<Action>;

    fn descriptor(&self) -> PolicyDescriptor;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("unknown policy '{0}'")]
    UnknownPolicy(String),
    #[error("policy '{policy}' does not accept parameter '{key}'")]
    UnknownParam { policy: String, key: String },
    #[error("policy '{policy}': {source}")]
    InvalidParam {
        policy: String,
        #[source]
        source: ParamError,
    },
}

type Factory = fn(&str, &PolicyParams) -> Result<Box<dyn Policy>, PolicyError>;

/// Names and aliases mapped to policy constructors.
pub struct PolicyRegistry {
    factories: BTreeMap<String, Factory>,
    aliases: BTreeMap<String, String>,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl PolicyRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("random", build_random);
        registry.register("baseline", build_baseline);
        registry.register("analytical", build_analytical);
        for profile in StrategyProfile::ALL {
            registry.register(profile.as_str(), build_heuristic);
        }
        registry.alias("easy", "casual");
        registry.alias("normal", "greedy");
        registry.alias("heuristic", "greedy");
        registry.alias("hard", "denial");
        registry.alias("clawbuddy", "analytical");
        registry.alias("dadslayer", "denial");
        registry.alias("dad-slayer", "denial");
        registry
    }

    pub fn register(&mut self, name: &str, factory: Factory) {
        self.factories.insert(name.to_ascii_lowercase(), factory);
    }

    pub fn alias(&mut self, alias: &str, target: &str) {
        self.aliases
            .insert(alias.to_ascii_lowercase(), target.to_ascii_lowercase());
    }

    /// Canonical name for `name`, following one level of aliasing.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let lowered = name.trim().to_ascii_lowercase();
        let canonical = self.aliases.get(&lowered).cloned().unwrap_or(lowered);
        self.factories
            .contains_key(&canonical)
            .then_some(canonical)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn build(&self, name: &str, params: &PolicyParams) -> Result<Box<dyn Policy>, PolicyError> {
        let canonical = self
            .resolve(name)
            .ok_or_else(|| PolicyError::UnknownPolicy(name.to_string()))?;
        let factory = self
            .factories
            .get(&canonical)
            .ok_or_else(|| PolicyError::UnknownPolicy(name.to_string()))?;
        factory(&canonical, params)
    }
}

fn build_random(name: &str, params: &PolicyParams) -> Result<Box<dyn Policy>, PolicyError> {
    reject_params(name, params)?;
    Ok(Box::new(RandomPolicy::new()))
}

fn build_baseline(name: &str, params: &PolicyParams) -> Result<Box<dyn Policy>, PolicyError> {
    reject_params(name, params)?;
    Ok(Box::new(BaselinePolicy::new()))
}

fn build_analytical(name: &str, params: &PolicyParams) -> Result<Box<dyn Policy>, PolicyError> {
    Ok(Box::new(AnalyticalPolicy::from_params(name, params)?))
}

fn build_heuristic(name: &str, params: &PolicyParams) -> Result<Box<dyn Policy>, PolicyError> {
    Ok(Box::new(HeuristicPolicy::from_params(name, params)?))
}

fn reject_params(policy: &str, params: &PolicyParams) -> Result<(), PolicyError> {
    match params.keys().next() {
        Some(key) => Err(PolicyError::UnknownParam {
            policy: policy.to_string(),
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

/// First legal action whose rank equals `rank`.
pub(crate) fn action_for(ctx: &PolicyContext<'_>, rank: Rank) -> Option<Action> {
    ctx.legal
        .iter()
        .copied()
        .find(|action| action.ask_rank == rank)
}
