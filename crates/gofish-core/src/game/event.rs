use crate::model::player::Seat;
use crate::model::rank::Rank;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Bumped whenever an event variant changes shape.
pub const EVENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Seat(Seat),
    Tie,
}

/// One entry of the append-only game record. Seats always name the actor of
/// the line: `Give` and `GoFish` carry the seat that was asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Ask { seat: Seat, rank: Rank },
    Give { seat: Seat, count: u8 },
    GoFish { seat: Seat },
    Draw { seat: Seat },
    DrawMatch { seat: Seat, rank: Rank },
    Book { seat: Seat, ranks: Vec<Rank> },
    Refill { seat: Seat, count: u8 },
    EmptyDeck { seat: Seat },
    Skip { seat: Seat },
    GameOver { winner: Winner },
}

impl GameEvent {
    /// The seat the event is about, if any.
    pub fn seat(&self) -> Option<Seat> {
        match self {
            GameEvent::Ask { seat, .. }
            | GameEvent::Give { seat, .. }
            | GameEvent::GoFish { seat }
            | GameEvent::Draw { seat }
            | GameEvent::DrawMatch { seat, .. }
            | GameEvent::Book { seat, .. }
            | GameEvent::Refill { seat, .. }
            | GameEvent::EmptyDeck { seat }
            | GameEvent::Skip { seat } => Some(*seat),
            GameEvent::GameOver { .. } => None,
        }
    }

    /// Each applied move starts with exactly one `Ask`.
    pub fn is_move_start(&self) -> bool {
        matches!(self, GameEvent::Ask { .. })
    }

    pub fn display_with<'a>(&'a self, names: &'a [String; 2]) -> EventLine<'a> {
        EventLine { event: self, names }
    }
}

/// Human-readable log line for an event, resolved against the seat names.
pub struct EventLine<'a> {
    event: &'a GameEvent,
    names: &'a [String; 2],
}

impl EventLine<'_> {
    fn name(&self, seat: Seat) -> &str {
        &self.names[seat.index()]
    }
}

impl fmt::Display for EventLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.event {
            GameEvent::Ask { seat, rank } => write!(f, "{} asks for {}.", self.name(*seat), rank),
            GameEvent::Give { seat, count } => {
                write!(f, "{} gives {} card(s).", self.name(*seat), count)
            }
            GameEvent::GoFish { seat } => write!(f, "{} says go fish.", self.name(*seat)),
            GameEvent::Draw { seat } => write!(f, "{} draws a card.", self.name(*seat)),
            GameEvent::DrawMatch { seat, .. } => {
                write!(f, "{} drew the asked rank and goes again.", self.name(*seat))
            }
            GameEvent::Book { seat, ranks } => {
                let joined = ranks
                    .iter()
                    .map(|rank| rank.symbol())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{} books {}.", self.name(*seat), joined)
            }
            GameEvent::Refill { seat, count } => {
                write!(f, "{} refills {} card(s).", self.name(*seat), count)
            }
            GameEvent::EmptyDeck { seat } => {
                write!(f, "The deck is empty; {} passes.", self.name(*seat))
            }
            GameEvent::Skip { seat } => {
                write!(f, "{} has no cards and skips the turn.", self.name(*seat))
            }
            GameEvent::GameOver { winner } => match winner {
                Winner::Seat(seat) => write!(f, "Game over: {} wins.", self.name(*seat)),
                Winner::Tie => f.write_str("Game over: tie."),
            },
        }
    }
}
