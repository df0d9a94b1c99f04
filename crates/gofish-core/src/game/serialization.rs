use super::event::{GameEvent, Winner};
use super::state::{Action, DECK_SIZE, GameError, GameState, Phase};
use crate::model::card::Card;
use crate::model::deck::Deck;
use crate::model::player::{Player, Seat};
use crate::model::rank::Rank;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const LOG_TAIL_LEN: usize = 10;

/// Full transient state of one game, enough to rebuild it exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSnapshot {
    pub schema_version: u32,
    pub seed: u64,
    pub phase: Phase,
    pub current: Seat,
    pub refill_size: usize,
    pub deck: Vec<Card>,
    pub players: [Player; 2],
    #[serde(default)]
    pub events: Vec<GameEvent>,
    #[serde(default)]
    pub winner: Option<Winner>,
}

impl GameSnapshot {
    pub const SCHEMA_VERSION: u32 = super::event::EVENT_SCHEMA_VERSION;

    pub fn capture(state: &GameState) -> Self {
        GameSnapshot {
            schema_version: Self::SCHEMA_VERSION,
            seed: state.seed(),
            phase: state.phase(),
            current: state.current_seat(),
            refill_size: state.refill_size(),
            deck: state.deck().cards().to_vec(),
            players: state.players().clone(),
            events: state.events().to_vec(),
            winner: state.winner(),
        }
    }

    pub fn restore(self) -> Result<GameState, GameError> {
        if self.schema_version != Self::SCHEMA_VERSION {
            return Err(GameError::SnapshotVersion {
                found: self.schema_version,
                expected: Self::SCHEMA_VERSION,
            });
        }
        self.check_cards()?;
        Ok(GameState::from_parts(
            Deck::from_cards(self.deck),
            self.players,
            self.current,
            self.phase,
            self.events,
            self.winner,
            self.seed,
            self.refill_size.max(1),
        ))
    }

    pub fn to_json(state: &GameState) -> serde_json::Result<String> {
        let snapshot = Self::capture(state);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    fn check_cards(&self) -> Result<(), GameError> {
        let mut seen: HashSet<Card> = HashSet::with_capacity(DECK_SIZE);
        let mut total = 0usize;
        let mut booked: HashSet<Rank> = HashSet::new();

        let loose = self
            .deck
            .iter()
            .chain(self.players.iter().flat_map(|p| p.hand.iter()));
        for card in loose {
            total += 1;
            if !seen.insert(*card) {
                return Err(GameError::Inconsistent(format!("card {card} appears twice")));
            }
        }
        for player in &self.players {
            for rank in player.books() {
                total += 4;
                if !booked.insert(*rank) {
                    return Err(GameError::Inconsistent(format!("rank {rank} booked twice")));
                }
                if seen.iter().any(|card| card.rank == *rank) {
                    return Err(GameError::Inconsistent(format!(
                        "rank {rank} is both booked and held"
                    )));
                }
            }
        }
        if total != DECK_SIZE {
            return Err(GameError::Conservation(total));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatSummary {
    pub name: String,
    pub hand_count: usize,
    pub books: Vec<Rank>,
    /// Present only for the observing seat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_counts: Option<BTreeMap<String, u8>>,
}

/// Public projection of a game, optionally including one seat's own hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicSummary {
    pub phase: Phase,
    pub current_seat: Seat,
    pub current_name: String,
    pub deck_count: usize,
    pub players: Vec<SeatSummary>,
    pub legal_actions: Vec<Action>,
    pub log_tail: Vec<String>,
    pub winner: Option<String>,
}

impl PublicSummary {
    pub fn build(state: &GameState, observer: Option<Seat>) -> Self {
        let players = Seat::BOTH
            .iter()
            .map(|&seat| {
                let player = state.player(seat);
                let hand_counts = (observer == Some(seat)).then(|| {
                    player
                        .hand
                        .rank_counts()
                        .iter()
                        .map(|(rank, count)| (rank.symbol().to_string(), count))
                        .collect()
                });
                SeatSummary {
                    name: player.name.clone(),
                    hand_count: player.hand.len(),
                    books: player.books().to_vec(),
                    hand_counts,
                }
            })
            .collect();
        let current = state.current_seat();
        PublicSummary {
            phase: state.phase(),
            current_seat: current,
            current_name: state.player(current).name.clone(),
            deck_count: state.deck_len(),
            players,
            legal_actions: state.legal_moves(),
            log_tail: state.log_tail(LOG_TAIL_LEN),
            winner: state.winner_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GameSnapshot, LOG_TAIL_LEN};
    use crate::game::state::{GameError, GameOptions, GameState};
    use crate::model::player::Seat;

    fn played(seed: u64, moves: usize) -> GameState {
        let mut state = GameState::new(GameOptions::with_seed(seed)).unwrap();
        for _ in 0..moves {
            let Some(action) = state.legal_moves().first().copied() else {
                break;
            };
            state = state.apply(action).unwrap().state;
        }
        state
    }

    #[test]
    fn snapshot_roundtrip_restores_identical_state() {
        let state = played(17, 12);
        let json = GameSnapshot::to_json(&state).unwrap();
        let restored = GameSnapshot::from_json(&json).unwrap().restore().unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.legal_moves(), state.legal_moves());
    }

    #[test]
    fn restore_rejects_missing_cards() {
        let state = played(4, 0);
        let mut snapshot = GameSnapshot::capture(&state);
        snapshot.deck.pop();
        assert_eq!(snapshot.restore().unwrap_err(), GameError::Conservation(51));
    }

    #[test]
    fn restore_rejects_duplicates_and_unknown_versions() {
        let state = played(4, 0);
        let mut snapshot = GameSnapshot::capture(&state);
        let dup = snapshot.deck[0];
        snapshot.deck[1] = dup;
        assert!(matches!(
            snapshot.restore(),
            Err(GameError::Inconsistent(_))
        ));

        let mut snapshot = GameSnapshot::capture(&state);
        snapshot.schema_version = 99;
        assert!(matches!(
            snapshot.restore(),
            Err(GameError::SnapshotVersion { found: 99, .. })
        ));
    }

    #[test]
    fn summary_reveals_only_the_observer_hand() {
        let state = played(8, 20);
        let summary = state.summarize(Some(Seat::Second));
        assert!(summary.players[0].hand_counts.is_none());
        let counts = summary.players[1].hand_counts.as_ref().unwrap();
        let total: u32 = counts.values().map(|&c| u32::from(c)).sum();
        assert_eq!(total as usize, summary.players[1].hand_count);
        assert!(summary.log_tail.len() <= LOG_TAIL_LEN);

        let json = serde_json::to_value(state.summarize(None)).unwrap();
        assert!(json["players"][0].get("hand_counts").is_none());
        assert!(json["players"][1].get("hand_counts").is_none());
    }
}
