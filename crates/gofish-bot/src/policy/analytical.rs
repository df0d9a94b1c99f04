use super::{Policy, PolicyContext, PolicyDescriptor, PolicyError, PolicyParams, action_for};
use crate::bot::ParamError;
use gofish_core::belief::{BeliefTracker, TrackerConfig};
use gofish_core::game::state::Action;
use gofish_core::game::view::SeatView;
use gofish_core::model::rank::Rank;
use std::cmp::Ordering;

const CERTAIN: f64 = 0.99;
const UNCERTAIN_FLOOR: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
struct AnalyticalTuning {
    /// Shrink applied to probabilities that are neither certain nor ruled out.
    calibration: f64,
    /// Multiplier for ranks the opponent has asked for.
    ask_bonus: f64,
}

impl Default for AnalyticalTuning {
    fn default() -> Self {
        Self {
            calibration: 0.85,
            ask_bonus: 1.4,
        }
    }
}

fn book_weight(own_count: u8) -> f64 {
    match own_count {
        3.. => 20.0,
        2 => 5.0,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    rank: Rank,
    own: u8,
    raw: f64,
    score: f64,
}

/// Coarse event belief times book proximity, certain hits first.
pub struct AnalyticalPolicy {
    name: String,
    tuning: AnalyticalTuning,
    tracker: Option<BeliefTracker>,
}

impl AnalyticalPolicy {
    pub fn new() -> Self {
        Self {
            name: "analytical".to_string(),
            tuning: AnalyticalTuning::default(),
            tracker: None,
        }
    }

    pub fn from_params(name: &str, params: &PolicyParams) -> Result<Self, PolicyError> {
        let mut policy = Self::new();
        policy.name = name.to_string();
        for (key, &value) in params {
            let slot = match key.as_str() {
                "calibration" => &mut policy.tuning.calibration,
                "ask_bonus" => &mut policy.tuning.ask_bonus,
                _ => {
                    return Err(PolicyError::UnknownParam {
                        policy: name.to_string(),
                        key: key.clone(),
                    });
                }
            };
            if !value.is_finite() || value <= 0.0 {
                return Err(PolicyError::InvalidParam {
                    policy: name.to_string(),
                    source: ParamError::OutOfRange {
                        key: key.clone(),
                        message: "must be positive".into(),
                    },
                });
            }
            *slot = value;
        }
        Ok(policy)
    }

    fn candidate(&self, view: &SeatView<'_>, tracker: &BeliefTracker, rank: Rank) -> Candidate {
        let own = view.own_count(rank);
        let raw = tracker.informed_probability(view, rank);
        let calibrated = if raw > UNCERTAIN_FLOOR && raw < CERTAIN {
            raw * self.tuning.calibration
        } else {
            raw
        };
        let bonus = if tracker.opponent_asked(rank) {
            self.tuning.ask_bonus
        } else {
            1.0
        };
        Candidate {
            rank,
            own,
            raw,
            score: calibrated * book_weight(own) * bonus,
        }
    }
}

impl Default for AnalyticalPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn rank_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    let a_certain = a.raw >= CERTAIN;
    let b_certain = b.raw >= CERTAIN;
    b_certain
        .cmp(&a_certain)
        .then_with(|| {
            if a_certain && b_certain {
                b.own.cmp(&a.own)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| b.own.cmp(&a.own))
        .then_with(|| a.rank.cmp(&b.rank))
}

impl Policy for AnalyticalPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self, _seed: u64) {
        self.tracker = None;
    }

    fn pick_move(&mut self, ctx: &PolicyContext<'_>) -> Option<Action> {
        let view = ctx.view();
        let mut tracker = self
            .tracker
            .take()
            .unwrap_or_else(|| BeliefTracker::new(ctx.seat, TrackerConfig::default()));
        tracker.sync(&view);

        let mut candidates: Vec<Candidate> = ctx
            .legal_ranks()
            .into_iter()
            .map(|rank| self.candidate(&view, &tracker, rank))
            .collect();
        self.tracker = Some(tracker);
        candidates.sort_by(rank_candidates);
        let best = candidates.first()?;
        action_for(ctx, best.rank)
    }

    fn descriptor(&self) -> PolicyDescriptor {
        PolicyDescriptor::new("analytical", 2)
            .with_param("calibration", self.tuning.calibration)
            .with_param("ask_bonus", self.tuning.ask_bonus)
    }
}
