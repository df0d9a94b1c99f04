use super::{Policy, PolicyContext, PolicyDescriptor, PolicyError, PolicyParams, action_for};
use crate::bot::{Decision, ParamError, ProfileParams, StrategyPlanner, StrategyProfile};
use gofish_core::belief::TrackerConfig;
use gofish_core::game::state::Action;
use tracing::{Level, event};

/// Adapter that wraps the profile-driven planner to implement the Policy trait.
pub struct HeuristicPolicy {
    name: String,
    params: ProfileParams,
    overrides: PolicyParams,
    planner: StrategyPlanner,
}

impl HeuristicPolicy {
    pub fn new(profile: StrategyProfile) -> Self {
        let params = ProfileParams::for_profile(profile);
        Self {
            name: profile.as_str().to_string(),
            params,
            overrides: PolicyParams::new(),
            planner: StrategyPlanner::new(params, 0),
        }
    }

    /// Profile named `name` with `params` applied as overrides.
    pub fn from_params(name: &str, params: &PolicyParams) -> Result<Self, PolicyError> {
        let invalid = |source: ParamError| match source {
            ParamError::UnknownKey(key) => PolicyError::UnknownParam {
                policy: name.to_string(),
                key,
            },
            source => PolicyError::InvalidParam {
                policy: name.to_string(),
                source,
            },
        };
        let profile: StrategyProfile = name.parse().map_err(invalid)?;
        let tuned = ProfileParams::for_profile(profile)
            .with_overrides(params)
            .map_err(invalid)?;
        Ok(Self {
            name: profile.as_str().to_string(),
            params: tuned,
            overrides: params.clone(),
            planner: StrategyPlanner::new(tuned, 0),
        })
    }

    pub fn with_tracker_config(mut self, config: TrackerConfig) -> Self {
        self.planner = self.planner.with_tracker_config(config);
        self
    }

    pub fn profile(&self) -> StrategyProfile {
        self.params.profile
    }
}

impl Policy for HeuristicPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self, seed: u64) {
        self.planner.reset(seed);
    }

    fn pick_move(&mut self, ctx: &PolicyContext<'_>) -> Option<Action> {
        let view = ctx.view();
        let legal = ctx.legal_ranks();
        let decision = self.planner.choose(&view, &legal)?;
        log_decision(ctx, self.params.profile, &decision);
        action_for(ctx, decision.rank)
    }

    fn descriptor(&self) -> PolicyDescriptor {
        let mut descriptor = PolicyDescriptor::new(self.params.profile.as_str(), 1)
            .with_param("weights", self.params.weights)
            .with_param("particles", self.params.particles)
            .with_param("rollouts", self.params.rollouts)
            .with_param("search_depth", self.params.search_depth)
            .with_param("temperature", self.params.temperature)
            .with_param("tolerance", self.params.tolerance)
            .with_param("belief", self.planner.tracker_config());
        if !self.overrides.is_empty() {
            descriptor = descriptor.with_param("overrides", &self.overrides);
        }
        descriptor
    }
}

fn details_enabled() -> bool {
    std::env::var("GOFISH_DECISION_DETAILS")
        .map(|raw| matches!(raw.trim(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(false)
}

fn log_decision(ctx: &PolicyContext, profile: StrategyProfile, decision: &Decision) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    let chosen = decision.chosen();
    event!(
        target: "gofish_bot::decision",
        Level::INFO,
        seat = %ctx.seat,
        profile = %profile,
        ply = ctx.state.ply(),
        legal_count = ctx.legal.len(),
        chosen = %decision.rank,
        mode = decision.mode.as_str(),
        score = chosen.map(|s| s.total).unwrap_or_default(),
        prob_has = chosen.map(|s| s.prob_has).unwrap_or_default(),
        particles = decision.sampling.particles,
        relaxed = decision.sampling.relaxed_absent || decision.sampling.relaxed_has,
        search_nodes = decision.search.as_ref().map(|r| r.nodes).unwrap_or(0),
    );

    if !details_enabled() {
        return;
    }
    let breakdown = serde_json::to_string(&decision.scores).unwrap_or_default();
    event!(
        target: "gofish_bot::decision",
        Level::DEBUG,
        seat = %ctx.seat,
        breakdown = %breakdown,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use gofish_core::game::state::{GameOptions, GameState};

    #[test]
    fn overrides_flow_into_descriptor() {
        let mut params = PolicyParams::new();
        params.insert("temperature".into(), 0.0);
        let policy = HeuristicPolicy::from_params("scout", &params).unwrap();
        assert_eq!(policy.profile(), StrategyProfile::Scout);
        let descriptor = policy.descriptor();
        assert_eq!(descriptor.kind, "scout");
        assert_eq!(descriptor.params["temperature"], serde_json::json!(0.0));
        assert!(descriptor.params.contains_key("overrides"));
    }

    #[test]
    fn belief_tuning_is_part_of_the_descriptor() {
        let stock = HeuristicPolicy::new(StrategyProfile::Greedy)
            .with_tracker_config(TrackerConfig::default());
        let slow_decay = TrackerConfig::from_reader(|key| {
            (key == "GOFISH_BELIEF_DECAY").then(|| "0.5".to_string())
        });
        let tuned = HeuristicPolicy::new(StrategyProfile::Greedy).with_tracker_config(slow_decay);
        assert_eq!(stock.descriptor().params["belief"]["decay"], serde_json::json!(0.92));
        assert_eq!(tuned.descriptor().params["belief"]["decay"], serde_json::json!(0.5));
        assert_ne!(stock.descriptor(), tuned.descriptor());
    }

    #[test]
    fn unknown_override_is_reported_as_param() {
        let mut params = PolicyParams::new();
        params.insert("bravery".into(), 1.0);
        assert!(matches!(
            HeuristicPolicy::from_params("greedy", &params),
            Err(PolicyError::UnknownParam { .. })
        ));
    }

    #[test]
    fn reset_replays_the_same_choices() {
        let state = GameState::new(GameOptions::with_seed(21)).unwrap();
        let legal = state.legal_moves();
        let ctx = PolicyContext::new(&state, &legal, state.current_seat());
        let mut policy = HeuristicPolicy::new(StrategyProfile::Casual);
        policy.reset(6);
        let first: Vec<_> = (0..4).map(|_| policy.pick_move(&ctx).unwrap()).collect();
        policy.reset(6);
        let second: Vec<_> = (0..4).map(|_| policy.pick_move(&ctx).unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn details_disabled_without_env() {
        unsafe {
            std::env::remove_var("GOFISH_DECISION_DETAILS");
        }
        assert!(!super::details_enabled());
    }
}
