use super::{Policy, PolicyContext, PolicyDescriptor, action_for};
use crate::bot::select::argmax;
use gofish_core::estimate::estimate_for;
use gofish_core::game::state::Action;
use gofish_core::game::view::SeatView;
use gofish_core::model::rank::Rank;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Uniform choice among the legal moves.
pub struct RandomPolicy {
    rng: SmallRng,
}

impl RandomPolicy {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::seed_from_u64(0),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn reset(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    fn pick_move(&mut self, ctx: &PolicyContext<'_>) -> Option<Action> {
        if ctx.legal.is_empty() {
            return None;
        }
        Some(ctx.legal[self.rng.gen_range(0..ctx.legal.len())])
    }

    fn descriptor(&self) -> PolicyDescriptor {
        PolicyDescriptor::new("random", 1)
    }
}

const OWN_WEIGHT: f64 = 1.0;
const PROB_WEIGHT: f64 = 0.9;
const EXPECTED_WEIGHT: f64 = 0.4;
const NEAR_BOOK_BONUS: f64 = 1.2;

/// Immediate completion heuristic on the closed-form estimate.
#[derive(Debug, Default)]
pub struct BaselinePolicy;

impl BaselinePolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn score(view: &SeatView<'_>, rank: Rank) -> f64 {
        let own = view.own_count(rank);
        let estimate = estimate_for(view, rank);
        let near_book = if own >= 3 { NEAR_BOOK_BONUS } else { 0.0 };
        f64::from(own) * OWN_WEIGHT
            + estimate.prob_has * PROB_WEIGHT
            + estimate.expected_count * EXPECTED_WEIGHT
            + near_book
    }
}

impl Policy for BaselinePolicy {
    fn name(&self) -> &str {
        "baseline"
    }

    fn pick_move(&mut self, ctx: &PolicyContext<'_>) -> Option<Action> {
        let view = ctx.view();
        let scored: Vec<(Rank, f64)> = ctx
            .legal_ranks()
            .into_iter()
            .map(|rank| (rank, Self::score(&view, rank)))
            .collect();
        let best = argmax(&scored)?;
        action_for(ctx, scored[best].0)
    }

    fn descriptor(&self) -> PolicyDescriptor {
        PolicyDescriptor::new("baseline", 1)
            .with_param("own", OWN_WEIGHT)
            .with_param("prob", PROB_WEIGHT)
            .with_param("expected", EXPECTED_WEIGHT)
            .with_param("near_book", NEAR_BOOK_BONUS)
    }
}
