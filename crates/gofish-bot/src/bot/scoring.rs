use super::endgame::SearchReport;
use super::params::ScoringWeights;
use gofish_core::belief::{BeliefTracker, ParticleModel};
use gofish_core::estimate::binary_entropy;
use gofish_core::game::view::SeatView;
use gofish_core::model::rank::Rank;
use rand::Rng;
use serde::Serialize;

/// Per-rank score with every component kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoveScore {
    pub rank: Rank,
    pub prob_has: f64,
    pub expected_take: f64,
    pub completion: f64,
    pub near_book: f64,
    pub deny: f64,
    pub info_gain: f64,
    pub belief: f64,
    pub endgame: f64,
    pub monte_carlo: f64,
    pub total: f64,
}

pub fn near_book_bonus(own_count: u8) -> f64 {
    match own_count {
        3.. => 1.0,
        2 => 0.45,
        _ => 0.0,
    }
}

pub fn completion_progress(own_count: u8, expected_take: f64) -> f64 {
    ((f64::from(own_count) + expected_take) / 4.0).min(1.0)
}

/// Pressure from asking a rank the opponent probably needs.
pub fn deny_pressure(prob_has: f64, own_count: u8) -> f64 {
    prob_has * (f64::from(own_count) / 3.0).min(1.0)
}

pub struct ScoreInputs<'a, 'v> {
    pub view: &'a SeatView<'v>,
    pub tracker: &'a BeliefTracker,
    pub particles: &'a ParticleModel,
    pub weights: &'a ScoringWeights,
    pub rollouts: usize,
    pub search: Option<&'a SearchReport>,
}

pub fn score_move<R: Rng + ?Sized>(inputs: &ScoreInputs<'_, '_>, rank: Rank, rng: &mut R) -> MoveScore {
    let view = inputs.view;
    let own = view.own_count(rank);
    let fused = inputs.particles.fused(view, rank);
    let informed = inputs.tracker.informed_probability(view, rank);

    let completion = completion_progress(own, fused.expected_count);
    let near_book = near_book_bonus(own);
    let deny = deny_pressure(fused.prob_has, own);
    let info_gain = binary_entropy(fused.prob_has);
    let belief = inputs.tracker.combine(informed, rank);
    let endgame = inputs
        .search
        .and_then(|report| report.score(rank))
        .unwrap_or(0.0);
    let monte_carlo = if inputs.weights.monte_carlo != 0.0 {
        inputs
            .particles
            .monte_carlo_ev(rank, own, inputs.rollouts, rng)
    } else {
        0.0
    };

    let w = inputs.weights;
    let total = w.completion * completion
        + w.near_book * near_book
        + w.deny * deny
        + w.info_gain * info_gain
        + w.belief * belief
        + w.endgame * endgame
        + w.monte_carlo * monte_carlo;

    MoveScore {
        rank,
        prob_has: fused.prob_has,
        expected_take: fused.expected_count,
        completion,
        near_book,
        deny,
        info_gain,
        belief,
        endgame,
        monte_carlo,
        total,
    }
}

pub fn score_moves<R: Rng + ?Sized>(
    inputs: &ScoreInputs<'_, '_>,
    legal: &[Rank],
    rng: &mut R,
) -> Vec<MoveScore> {
    legal
        .iter()
        .map(|&rank| score_move(inputs, rank, rng))
        .collect()
}
