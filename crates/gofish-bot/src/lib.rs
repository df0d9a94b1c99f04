pub mod bot;
pub mod policy;

pub use bot::{
    Decision, EndgameSearch, MoveScore, ProfileParams, ScoringWeights, SearchReport,
    SelectionMode, StrategyPlanner, StrategyProfile,
};
pub use policy::{
    AnalyticalPolicy, BaselinePolicy, HeuristicPolicy, Policy, PolicyContext, PolicyDescriptor,
    PolicyError, PolicyParams, PolicyRegistry, RandomPolicy,
};
