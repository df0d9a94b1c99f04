//! Sampled opponent hands consistent with what a seat can see.

use super::tracker::{BeliefTracker, Coarse};
use crate::estimate::{RankEstimate, estimate_for};
use crate::game::view::SeatView;
use crate::model::hand::RankCounts;
use crate::model::rank::Rank;
use rand::Rng;
use std::collections::HashMap;

/// Utility of keeping the turn after a hit.
const RETAIN_VALUE: f64 = 0.5;
/// Base utility of a miss.
const MISS_PENALTY: f64 = 0.25;
/// Scale of the penalty for leaving the opponent's strongest rank in play.
const STRONGEST_PENALTY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleConfig {
    pub count: usize,
    /// Half-width of the multiplicative jitter applied to prior weights.
    pub jitter: f64,
    /// Share of the free mass placed by the belief prior before uniform fill.
    pub prior_share: f64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 96,
            jitter: 0.35,
            prior_share: 0.5,
        }
    }
}

/// One hypothesis of the opponent's hand composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Particle(RankCounts);

impl Particle {
    pub fn counts(&self) -> &RankCounts {
        &self.0
    }

    pub fn count(&self, rank: Rank) -> u8 {
        self.0.get(rank)
    }

    pub fn total(&self) -> u32 {
        self.0.total()
    }

    pub fn strongest(&self) -> u8 {
        self.0.as_array().iter().copied().max().unwrap_or(0)
    }
}

/// Counters from the last resample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStats {
    pub particles: usize,
    pub relaxed_absent: bool,
    pub relaxed_has: bool,
    /// Mass that could not be placed under any capacity.
    pub shortfall: u32,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    floor: [u8; Rank::COUNT],
    cap: [u8; Rank::COUNT],
}

impl Bounds {
    fn floor_total(&self) -> usize {
        self.floor.iter().map(|&v| v as usize).sum()
    }

    fn cap_total(&self) -> usize {
        self.cap.iter().map(|&v| v as usize).sum()
    }
}

#[derive(Debug, Clone)]
pub struct ParticleModel {
    config: ParticleConfig,
    particles: Vec<Particle>,
    stats: SamplingStats,
}

impl ParticleModel {
    pub fn new(config: ParticleConfig) -> Self {
        Self {
            config,
            particles: Vec::with_capacity(config.count),
            stats: SamplingStats::default(),
        }
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn stats(&self) -> SamplingStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.stats = SamplingStats::default();
    }

    /// Replaces the population with fresh samples for the current view.
    pub fn resample<R: Rng + ?Sized>(
        &mut self,
        view: &SeatView<'_>,
        tracker: &BeliefTracker,
        rng: &mut R,
    ) {
        self.particles.clear();
        let target = view.opponent_hand_size;
        let (bounds, relaxed_absent, relaxed_has) = constraints(view, tracker, target);
        let mut shortfall = 0u32;
        for _ in 0..self.config.count {
            let (particle, missing) = self.sample_one(&bounds, tracker, target, rng);
            shortfall = shortfall.max(missing);
            self.particles.push(particle);
        }
        self.stats = SamplingStats {
            particles: self.particles.len(),
            relaxed_absent,
            relaxed_has,
            shortfall,
        };
    }

    fn sample_one<R: Rng + ?Sized>(
        &self,
        bounds: &Bounds,
        tracker: &BeliefTracker,
        target: usize,
        rng: &mut R,
    ) -> (Particle, u32) {
        let mut counts = bounds.floor;
        let placed: usize = counts.iter().map(|&c| c as usize).sum();
        let mut remaining = target.saturating_sub(placed);

        let prior_mass = (remaining as f64 * self.config.prior_share).round() as usize;
        let mut weights = [0.0_f64; Rank::COUNT];
        for rank in Rank::ORDERED {
            let i = rank.index();
            let jitter = if self.config.jitter > 0.0 {
                rng.gen_range(1.0 - self.config.jitter..=1.0 + self.config.jitter)
            } else {
                1.0
            };
            weights[i] = tracker.likely(rank) * f64::from(bounds.cap[i]) * jitter.max(0.0);
        }
        for _ in 0..prior_mass {
            let Some(i) = pick_weighted(&counts, &bounds.cap, &weights, rng) else {
                break;
            };
            counts[i] += 1;
            remaining -= 1;
        }

        while remaining > 0 {
            let open: Vec<usize> = (0..Rank::COUNT)
                .filter(|&i| counts[i] < bounds.cap[i])
                .collect();
            if open.is_empty() {
                break;
            }
            let i = open[rng.gen_range(0..open.len())];
            counts[i] += 1;
            remaining -= 1;
        }

        (Particle(RankCounts::from_array(counts)), remaining as u32)
    }

    /// Fraction of particles holding `rank` and the mean count.
    pub fn estimate(&self, rank: Rank) -> RankEstimate {
        if self.particles.is_empty() {
            return RankEstimate::NONE;
        }
        let n = self.particles.len() as f64;
        let holding = self.particles.iter().filter(|p| p.count(rank) > 0).count() as f64;
        let total: f64 = self.particles.iter().map(|p| f64::from(p.count(rank))).sum();
        RankEstimate {
            prob_has: holding / n,
            expected_count: total / n,
        }
    }

    /// Closed-form estimate averaged with the sampled one.
    pub fn fused(&self, view: &SeatView<'_>, rank: Rank) -> RankEstimate {
        let closed = estimate_for(view, rank);
        if self.particles.is_empty() {
            closed
        } else {
            closed.fuse(self.estimate(rank))
        }
    }

    /// Average one-step utility of asking for `rank` over random particles.
    pub fn monte_carlo_ev<R: Rng + ?Sized>(
        &self,
        rank: Rank,
        own_count: u8,
        rollouts: usize,
        rng: &mut R,
    ) -> f64 {
        if self.particles.is_empty() || rollouts == 0 {
            return 0.0;
        }
        let mut sum = 0.0;
        for _ in 0..rollouts {
            let particle = &self.particles[rng.gen_range(0..self.particles.len())];
            sum += ask_utility(particle, rank, own_count);
        }
        sum / rollouts as f64
    }

    /// Distinct hypotheses ordered by how often they were sampled, with their
    /// sample share.
    pub fn most_probable(&self, limit: usize) -> Vec<(Particle, f64)> {
        if self.particles.is_empty() {
            return Vec::new();
        }
        let mut tally: HashMap<Particle, usize> = HashMap::new();
        for particle in &self.particles {
            *tally.entry(*particle).or_insert(0) += 1;
        }
        let mut ranked: Vec<(Particle, usize)> = tally.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| b.0.counts().as_array().cmp(a.0.counts().as_array()))
        });
        let n = self.particles.len() as f64;
        ranked
            .into_iter()
            .take(limit)
            .map(|(particle, hits)| (particle, hits as f64 / n))
            .collect()
    }
}

/// Immediate utility of asking `rank` against one hypothesis.
pub fn ask_utility(particle: &Particle, rank: Rank, own_count: u8) -> f64 {
    let taken = particle.count(rank);
    if taken > 0 {
        let book = if own_count + taken >= 4 { 4.0 } else { 0.0 };
        f64::from(taken) + book + RETAIN_VALUE
    } else {
        -MISS_PENALTY - STRONGEST_PENALTY * f64::from(particle.strongest()) / 4.0
    }
}

fn constraints(view: &SeatView<'_>, tracker: &BeliefTracker, target: usize) -> (Bounds, bool, bool) {
    let mut capacity = [0u8; Rank::COUNT];
    let mut floor = [0u8; Rank::COUNT];
    let mut cap = [0u8; Rank::COUNT];
    for rank in Rank::ORDERED {
        let i = rank.index();
        capacity[i] = view.unseen_copies(rank);
        cap[i] = capacity[i];
        let belief = tracker.rank(rank);
        match belief.coarse {
            Coarse::Has if capacity[i] > 0 => floor[i] = 1,
            Coarse::Absent => {
                let limit = belief.draws_since_absent.min(u32::from(capacity[i])) as u8;
                cap[i] = limit;
            }
            _ => {}
        }
    }

    let mut bounds = Bounds { floor, cap };
    let mut relaxed_absent = false;
    let mut relaxed_has = false;
    if bounds.cap_total() < target {
        bounds.cap = capacity;
        relaxed_absent = true;
    }
    for i in 0..Rank::COUNT {
        bounds.floor[i] = bounds.floor[i].min(bounds.cap[i]);
    }
    if bounds.floor_total() > target {
        bounds.floor = [0; Rank::COUNT];
        relaxed_has = true;
    }
    (bounds, relaxed_absent, relaxed_has)
}

fn pick_weighted<R: Rng + ?Sized>(
    counts: &[u8; Rank::COUNT],
    cap: &[u8; Rank::COUNT],
    weights: &[f64; Rank::COUNT],
    rng: &mut R,
) -> Option<usize> {
    let total: f64 = (0..Rank::COUNT)
        .filter(|&i| counts[i] < cap[i])
        .map(|i| weights[i])
        .sum();
    if total <= 0.0 {
        return None;
    }
    let mut roll = rng.gen_range(0.0..total);
    let mut last = None;
    for i in 0..Rank::COUNT {
        if counts[i] >= cap[i] || weights[i] <= 0.0 {
            continue;
        }
        last = Some(i);
        if roll < weights[i] {
            return Some(i);
        }
        roll -= weights[i];
    }
    last
}
