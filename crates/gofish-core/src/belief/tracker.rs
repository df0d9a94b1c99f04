//! Per-rank beliefs about the opponent's hand, rebuilt from the event stream.

use crate::estimate::{estimate_for, prob_any};
use crate::game::event::GameEvent;
use crate::game::view::SeatView;
use crate::model::player::Seat;
use crate::model::rank::Rank;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Coarse {
    #[default]
    Unknown,
    Has,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct RankBelief {
    pub coarse: Coarse,
    /// Opponent draws since the rank was last seen leaving their hand.
    pub draws_since_absent: u32,
}

impl RankBelief {
    const HAS: RankBelief = RankBelief {
        coarse: Coarse::Has,
        draws_since_absent: 0,
    };
    const ABSENT: RankBelief = RankBelief {
        coarse: Coarse::Absent,
        draws_since_absent: 0,
    };
}

/// Tunables for the continuous likelihood signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackerConfig {
    /// Fraction of the deviation from neutral kept per applied move.
    pub decay: f64,
    /// Step toward 1.0 when the opponent shows a rank.
    pub show_step: f64,
    /// Step toward 0.0 when the opponent is seen without a rank.
    pub deny_step: f64,
    /// Step toward full confidence on any direct evidence.
    pub confidence_step: f64,
    /// Scale applied to the signed bias.
    pub bias_scale: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            decay: 0.92,
            show_step: 0.45,
            deny_step: 0.6,
            confidence_step: 0.5,
            bias_scale: 0.3,
        }
    }
}

impl TrackerConfig {
    /// `GOFISH_BELIEF_*` overrides on top of the defaults, read once per process.
    pub fn from_env() -> Self {
        static CACHED: OnceLock<TrackerConfig> = OnceLock::new();
        *CACHED.get_or_init(|| Self::from_reader(|key| std::env::var(key).ok()))
    }

    pub fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base = Self::default();
        let mut value = |key: &str, fallback: f64| {
            read(key)
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .unwrap_or(fallback)
                .clamp(0.0, 1.0)
        };
        Self {
            decay: value("GOFISH_BELIEF_DECAY", base.decay),
            show_step: value("GOFISH_BELIEF_SHOW", base.show_step),
            deny_step: value("GOFISH_BELIEF_DENY", base.deny_step),
            confidence_step: base.confidence_step,
            bias_scale: value("GOFISH_BELIEF_BIAS", base.bias_scale),
        }
    }
}

/// Incremental consumer of a game's event stream from one seat's side.
#[derive(Debug, Clone)]
pub struct BeliefTracker {
    perspective: Seat,
    config: TrackerConfig,
    ranks: [RankBelief; Rank::COUNT],
    opponent_asked: [bool; Rank::COUNT],
    likely: [f64; Rank::COUNT],
    confidence: [f64; Rank::COUNT],
    cursor: usize,
    last_ask: Option<(Seat, Rank)>,
}

impl BeliefTracker {
    pub fn new(perspective: Seat, config: TrackerConfig) -> Self {
        Self {
            perspective,
            config,
            ranks: [RankBelief::default(); Rank::COUNT],
            opponent_asked: [false; Rank::COUNT],
            likely: [0.5; Rank::COUNT],
            confidence: [0.0; Rank::COUNT],
            cursor: 0,
            last_ask: None,
        }
    }

    pub fn perspective(&self) -> Seat {
        self.perspective
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.perspective, self.config);
    }

    /// Catches up with the view. A different seat or a shorter stream than
    /// already seen means a new game.
    pub fn sync(&mut self, view: &SeatView<'_>) {
        if view.seat != self.perspective {
            *self = Self::new(view.seat, self.config);
        }
        self.observe(view.events);
    }

    pub fn observe(&mut self, events: &[GameEvent]) {
        if events.len() < self.cursor {
            self.reset();
        }
        for event in &events[self.cursor..] {
            self.apply(event);
        }
        self.cursor = events.len();
    }

    pub fn rank(&self, rank: Rank) -> RankBelief {
        self.ranks[rank.index()]
    }

    pub fn opponent_asked(&self, rank: Rank) -> bool {
        self.opponent_asked[rank.index()]
    }

    pub fn likely(&self, rank: Rank) -> f64 {
        self.likely[rank.index()]
    }

    pub fn confidence(&self, rank: Rank) -> f64 {
        self.confidence[rank.index()]
    }

    /// Signed adjustment in `[-scale, scale]`.
    pub fn bias(&self, rank: Rank) -> f64 {
        let i = rank.index();
        2.0 * (self.likely[i] - 0.5) * self.confidence[i] * self.config.bias_scale
    }

    /// Clamped addition of the bias to a probability.
    pub fn combine(&self, probability: f64, rank: Rank) -> f64 {
        (probability + self.bias(rank)).clamp(0.0, 1.0)
    }

    /// Probability the opponent holds `rank`, using coarse evidence first.
    pub fn informed_probability(&self, view: &SeatView<'_>, rank: Rank) -> f64 {
        if view.is_booked(rank) || view.opponent_hand_size == 0 {
            return 0.0;
        }
        let belief = self.rank(rank);
        match belief.coarse {
            Coarse::Has => 1.0,
            Coarse::Absent if belief.draws_since_absent == 0 => 0.0,
            Coarse::Absent => {
                let draws = (belief.draws_since_absent as usize).min(view.opponent_hand_size);
                prob_any(
                    view.unseen_copies(rank) as usize,
                    draws,
                    view.unseen_pool(),
                )
            }
            Coarse::Unknown => estimate_for(view, rank).prob_has,
        }
    }

    fn apply(&mut self, event: &GameEvent) {
        let me = self.perspective;
        let them = me.opponent();
        match *event {
            GameEvent::Ask { seat, rank } => {
                self.tick();
                self.last_ask = Some((seat, rank));
                if seat == them {
                    self.ranks[rank.index()] = RankBelief::HAS;
                    self.opponent_asked[rank.index()] = true;
                    self.nudge_up(rank);
                }
            }
            GameEvent::Give { seat, .. } => {
                if let Some((asker, rank)) = self.last_ask {
                    if asker == me && seat == them {
                        self.ranks[rank.index()] = RankBelief::ABSENT;
                        self.nudge_down(rank);
                    } else if asker == them && seat == me {
                        self.ranks[rank.index()] = RankBelief::HAS;
                        self.nudge_up(rank);
                    }
                }
            }
            GameEvent::GoFish { seat } => {
                if let Some((asker, rank)) = self.last_ask {
                    if asker == me && seat == them {
                        self.ranks[rank.index()] = RankBelief::ABSENT;
                        self.nudge_down(rank);
                    }
                }
            }
            GameEvent::Draw { seat } if seat == them => self.age_absent(1),
            GameEvent::Refill { seat, count } if seat == them => self.age_absent(count as u32),
            GameEvent::DrawMatch { seat, rank } if seat == them => {
                self.ranks[rank.index()] = RankBelief::HAS;
                self.nudge_up(rank);
            }
            GameEvent::Book { ref ranks, .. } => {
                for rank in ranks {
                    let i = rank.index();
                    self.ranks[i] = RankBelief::default();
                    self.opponent_asked[i] = false;
                    self.likely[i] = 0.5;
                    self.confidence[i] = 0.0;
                }
            }
            _ => {}
        }
    }

    fn tick(&mut self) {
        let decay = self.config.decay;
        for i in 0..Rank::COUNT {
            self.likely[i] = 0.5 + (self.likely[i] - 0.5) * decay;
            self.confidence[i] *= decay;
        }
    }

    fn nudge_up(&mut self, rank: Rank) {
        let i = rank.index();
        self.likely[i] += (1.0 - self.likely[i]) * self.config.show_step;
        self.confidence[i] += (1.0 - self.confidence[i]) * self.config.confidence_step;
    }

    fn nudge_down(&mut self, rank: Rank) {
        let i = rank.index();
        self.likely[i] -= self.likely[i] * self.config.deny_step;
        self.confidence[i] += (1.0 - self.confidence[i]) * self.config.confidence_step;
    }

    fn age_absent(&mut self, draws: u32) {
        for belief in self.ranks.iter_mut() {
            if belief.coarse == Coarse::Absent {
                belief.draws_since_absent = belief.draws_since_absent.saturating_add(draws);
            }
        }
    }
}
