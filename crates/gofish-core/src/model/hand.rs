use crate::model::card::Card;
use crate::model::rank::Rank;
use serde::{Deserialize, Serialize};
use std::vec::Vec;

/// Per-rank card counts indexed by [`Rank::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RankCounts([u8; 13]);

impl RankCounts {
    pub const fn new() -> Self {
        Self([0; 13])
    }

    pub const fn from_array(counts: [u8; 13]) -> Self {
        Self(counts)
    }

    pub fn get(&self, rank: Rank) -> u8 {
        self.0[rank.index()]
    }

    pub fn set(&mut self, rank: Rank, count: u8) {
        self.0[rank.index()] = count;
    }

    pub fn add(&mut self, rank: Rank, count: u8) {
        self.0[rank.index()] = self.0[rank.index()].saturating_add(count);
    }

    /// Sets the count for `rank` to zero and returns the previous value.
    pub fn take(&mut self, rank: Rank) -> u8 {
        std::mem::take(&mut self.0[rank.index()])
    }

    pub fn total(&self) -> u32 {
        self.0.iter().map(|&c| u32::from(c)).sum()
    }

    pub fn as_array(&self) -> &[u8; 13] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rank, u8)> + '_ {
        Rank::ORDERED.iter().map(move |&rank| (rank, self.get(rank)))
    }

    pub fn held(&self) -> impl Iterator<Item = Rank> + '_ {
        self.iter().filter(|(_, c)| *c > 0).map(|(rank, _)| rank)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self { cards: Vec::new() }
    }

    pub fn with_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn add(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn extend(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }

    pub fn count_rank(&self, rank: Rank) -> u8 {
        self.cards.iter().filter(|c| c.rank == rank).count() as u8
    }

    pub fn has_rank(&self, rank: Rank) -> bool {
        self.cards.iter().any(|c| c.rank == rank)
    }

    /// Removes and returns every card of `rank`, preserving the order of the rest.
    pub fn take_rank(&mut self, rank: Rank) -> Vec<Card> {
        let (taken, keep): (Vec<Card>, Vec<Card>) =
            self.cards.iter().partition(|card| card.rank == rank);
        self.cards = keep;
        taken
    }

    pub fn rank_counts(&self) -> RankCounts {
        let mut counts = RankCounts::new();
        for card in &self.cards {
            counts.add(card.rank, 1);
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}
