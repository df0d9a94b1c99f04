use crate::game::event::GameEvent;
use crate::game::state::{GameState, Phase};
use crate::model::hand::RankCounts;
use crate::model::player::Seat;
use crate::model::rank::Rank;

/// What one seat is allowed to see: its own hand, both book lists, the
/// opponent's hand size, the deck size and the public event record.
#[derive(Debug, Clone)]
pub struct SeatView<'a> {
    pub seat: Seat,
    pub phase: Phase,
    pub own_counts: RankCounts,
    pub own_books: &'a [Rank],
    pub opponent_books: &'a [Rank],
    pub opponent_hand_size: usize,
    pub deck_size: usize,
    pub events: &'a [GameEvent],
}

impl<'a> SeatView<'a> {
    pub fn new(state: &'a GameState, seat: Seat) -> Self {
        let own = state.player(seat);
        let opponent = state.player(seat.opponent());
        Self {
            seat,
            phase: state.phase(),
            own_counts: own.hand.rank_counts(),
            own_books: own.books(),
            opponent_books: opponent.books(),
            opponent_hand_size: opponent.hand.len(),
            deck_size: state.deck_len(),
            events: state.events(),
        }
    }

    pub fn own_count(&self, rank: Rank) -> u8 {
        self.own_counts.get(rank)
    }

    pub fn own_hand_size(&self) -> usize {
        self.own_counts.total() as usize
    }

    pub fn is_booked(&self, rank: Rank) -> bool {
        self.own_books.contains(&rank) || self.opponent_books.contains(&rank)
    }

    /// Copies of `rank` that could be in the opponent's hand.
    pub fn unseen_copies(&self, rank: Rank) -> u8 {
        if self.is_booked(rank) {
            0
        } else {
            4u8.saturating_sub(self.own_count(rank))
        }
    }

    pub fn unseen_pool(&self) -> usize {
        self.deck_size + self.opponent_hand_size
    }

    /// Ranks the seat may ask for.
    pub fn askable(&self) -> Vec<Rank> {
        self.own_counts.held().collect()
    }
}
