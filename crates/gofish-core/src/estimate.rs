//! Closed-form estimate of what the opponent holds, from public counts only.

use crate::game::view::SeatView;
use crate::model::rank::Rank;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RankEstimate {
    /// Probability the opponent holds at least one copy.
    pub prob_has: f64,
    /// Expected number of copies in the opponent's hand.
    pub expected_count: f64,
}

impl RankEstimate {
    pub const NONE: RankEstimate = RankEstimate {
        prob_has: 0.0,
        expected_count: 0.0,
    };

    /// Simple average of two estimates.
    pub fn fuse(self, other: RankEstimate) -> RankEstimate {
        RankEstimate {
            prob_has: ((self.prob_has + other.prob_has) / 2.0).clamp(0.0, 1.0),
            expected_count: ((self.expected_count + other.expected_count) / 2.0).clamp(0.0, 4.0),
        }
    }
}

/// Hypergeometric estimate for one rank.
///
/// `own_count` copies are in the asker's hand; the remaining unseen copies are
/// spread over the deck and the opponent's hand, of which the opponent holds
/// `opponent_hand` cards.
pub fn estimate(booked: bool, own_count: u8, opponent_hand: usize, deck: usize) -> RankEstimate {
    let unseen = if booked {
        0
    } else {
        4usize.saturating_sub(own_count as usize)
    };
    let pool = deck + opponent_hand;
    if unseen == 0 || opponent_hand == 0 || pool == 0 {
        return RankEstimate::NONE;
    }

    let draws = opponent_hand.min(pool);
    RankEstimate {
        prob_has: prob_any(unseen, draws, pool),
        expected_count: (unseen as f64 * draws as f64 / pool as f64).clamp(0.0, 4.0),
    }
}

/// Same as [`estimate`], read from a seat's public view.
pub fn estimate_for(view: &SeatView<'_>, rank: Rank) -> RankEstimate {
    estimate(
        view.is_booked(rank),
        view.own_count(rank),
        view.opponent_hand_size,
        view.deck_size,
    )
}

/// Probability that at least one of `unseen` copies is among `draws` cards
/// taken without replacement from `pool`.
pub fn prob_any(unseen: usize, draws: usize, pool: usize) -> f64 {
    if unseen == 0 || draws == 0 || pool == 0 {
        return 0.0;
    }
    let draws = draws.min(pool);
    let mut prob_none = 1.0_f64;
    for i in 0..draws {
        let remaining = (pool - i) as f64;
        let without = pool as f64 - unseen as f64 - i as f64;
        prob_none *= (without / remaining).clamp(0.0, 1.0);
    }
    (1.0 - prob_none).clamp(0.0, 1.0)
}

/// Shannon entropy of a Bernoulli variable, in bits.
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 || p.is_nan() {
        return 0.0;
    }
    -(p * p.log2() + (1.0 - p) * (1.0 - p).log2())
}
