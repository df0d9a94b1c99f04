use crate::model::hand::Hand;
use crate::model::rank::Rank;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Seat {
    First = 0,
    Second = 1,
}

impl Seat {
    pub const BOTH: [Seat; 2] = [Seat::First, Seat::Second];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Seat::First),
            1 => Some(Seat::Second),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn opponent(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> Self {
        seat as u8
    }
}

impl TryFrom<u8> for Seat {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Seat::from_index(value as usize).ok_or_else(|| format!("seat index {value} out of range"))
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Seat::First => "seat 0",
            Seat::Second => "seat 1",
        };
        f.write_str(label)
    }
}

/// One participant: a name, a hand and the ranks booked so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub hand: Hand,
    books: Vec<Rank>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hand: Hand::new(),
            books: Vec::new(),
        }
    }

    /// Rebuilds a player from stored parts; books are re-sorted.
    pub fn from_parts(name: impl Into<String>, hand: Hand, mut books: Vec<Rank>) -> Self {
        books.sort();
        Self {
            name: name.into(),
            hand,
            books,
        }
    }

    pub fn books(&self) -> &[Rank] {
        &self.books
    }

    pub fn has_book(&self, rank: Rank) -> bool {
        self.books.contains(&rank)
    }

    /// Moves every rank held four times from the hand into the books.
    /// Returns the newly completed ranks in canonical order.
    pub fn extract_books(&mut self) -> Vec<Rank> {
        let counts = self.hand.rank_counts();
        let mut made = Vec::new();
        for (rank, count) in counts.iter() {
            if count == 4 && !self.books.contains(&rank) {
                let _ = self.hand.take_rank(rank);
                self.books.push(rank);
                made.push(rank);
            }
        }
        self.books.sort();
        made
    }
}
