pub mod endgame;
pub mod params;
pub mod scoring;
pub mod select;

pub use endgame::{AbstractState, EndgameSearch, SearchReport, endgame_active};
pub use params::{ParamError, ProfileParams, ScoringWeights, StrategyProfile};
pub use scoring::{MoveScore, ScoreInputs, score_moves};
pub use select::SelectionMode;

use gofish_core::belief::{BeliefTracker, ParticleConfig, ParticleModel, SamplingStats, TrackerConfig};
use gofish_core::game::view::SeatView;
use gofish_core::model::rank::Rank;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Outcome of one planning step.
#[derive(Debug, Clone)]
pub struct Decision {
    pub rank: Rank,
    pub mode: SelectionMode,
    pub scores: Vec<MoveScore>,
    pub search: Option<SearchReport>,
    pub sampling: SamplingStats,
}

impl Decision {
    pub fn chosen(&self) -> Option<&MoveScore> {
        self.scores.iter().find(|score| score.rank == self.rank)
    }
}

/// Profile-driven planner: belief tracking, particle sampling, optional
/// endgame search, weighted scoring, then argmax or softmax selection.
pub struct StrategyPlanner {
    params: ProfileParams,
    tracker: Option<BeliefTracker>,
    tracker_config: TrackerConfig,
    particles: ParticleModel,
    rng: StdRng,
}

impl StrategyPlanner {
    pub fn new(params: ProfileParams, seed: u64) -> Self {
        let particles = ParticleModel::new(ParticleConfig {
            count: params.particles,
            ..ParticleConfig::default()
        });
        Self {
            params,
            tracker: None,
            tracker_config: TrackerConfig::from_env(),
            particles,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_tracker_config(mut self, config: TrackerConfig) -> Self {
        self.tracker_config = config;
        self.tracker = None;
        self
    }

    pub fn params(&self) -> &ProfileParams {
        &self.params
    }

    pub fn tracker_config(&self) -> &TrackerConfig {
        &self.tracker_config
    }

    pub fn tracker(&self) -> Option<&BeliefTracker> {
        self.tracker.as_ref()
    }

    /// Forgets the previous game and reseeds.
    pub fn reset(&mut self, seed: u64) {
        self.tracker = None;
        self.particles.clear();
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn choose(&mut self, view: &SeatView<'_>, legal: &[Rank]) -> Option<Decision> {
        if legal.is_empty() {
            return None;
        }
        let config = self.tracker_config;
        let tracker = self
            .tracker
            .get_or_insert_with(|| BeliefTracker::new(view.seat, config));
        tracker.sync(view);

        if self.params.particles > 0 {
            self.particles.resample(view, tracker, &mut self.rng);
        } else {
            self.particles.clear();
        }

        let search = if self.params.search_enabled()
            && endgame_active(
                view,
                self.params.endgame_deck_threshold,
                self.params.endgame_hand_threshold,
            ) {
            let hypotheses = self
                .particles
                .most_probable(self.params.determinizations.max(1));
            let mut search =
                EndgameSearch::new(self.params.search_depth, self.params.search_node_budget);
            Some(search.run(view, &hypotheses, legal))
        } else {
            None
        };

        let inputs = ScoreInputs {
            view,
            tracker,
            particles: &self.particles,
            weights: &self.params.weights,
            rollouts: self.params.rollouts,
            search: search.as_ref(),
        };
        let scores = score_moves(&inputs, legal, &mut self.rng);
        let ranked: Vec<(Rank, f64)> = scores.iter().map(|s| (s.rank, s.total)).collect();
        let (index, mode) = select::select(
            &ranked,
            self.params.temperature,
            self.params.tolerance,
            &mut self.rng,
        )?;
        Some(Decision {
            rank: ranked[index].0,
            mode,
            scores,
            search,
            sampling: self.particles.stats(),
        })
    }
}
