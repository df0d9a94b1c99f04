use crate::game::event::{GameEvent, Winner};
use crate::game::serialization::PublicSummary;
use crate::game::view::SeatView;
use crate::model::deck::Deck;
use crate::model::player::{Player, Seat};
use crate::model::rank::Rank;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HAND_SIZE: usize = 7;
pub const DEFAULT_REFILL_SIZE: usize = 5;
pub const TOTAL_BOOKS: usize = Rank::COUNT;
pub const DECK_SIZE: usize = 52;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    pub seed: u64,
    pub starting_hand_size: usize,
    pub names: [String; 2],
    pub refill_size: usize,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            starting_hand_size: DEFAULT_HAND_SIZE,
            names: ["Player 1".to_string(), "Player 2".to_string()],
            refill_size: DEFAULT_REFILL_SIZE,
        }
    }
}

impl GameOptions {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.starting_hand_size == 0 || self.starting_hand_size > DECK_SIZE / 2 {
            return Err(GameError::InvalidHandSize(self.starting_hand_size));
        }
        if self.refill_size == 0 {
            return Err(GameError::InvalidRefillSize);
        }
        for seat in Seat::BOTH {
            if self.names[seat.index()].trim().is_empty() {
                return Err(GameError::EmptyName(seat));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "play")]
    Play,
    #[serde(rename = "gameover")]
    GameOver,
}

/// Ask the opponent for every card of `ask_rank`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub ask_rank: Rank,
}

impl Action {
    pub const fn ask(rank: Rank) -> Self {
        Self { ask_rank: rank }
    }

    /// Parses a wire action. Accepts `{"ask_rank":"Q"}` and the older
    /// `{"type":"ask_rank","rank":"Q"}` shape.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, IllegalAction> {
        let object = value
            .as_object()
            .ok_or_else(|| IllegalAction::InvalidAction("action must be an object".into()))?;
        let raw = match object.get("ask_rank") {
            Some(raw) => raw,
            None => match object.get("type").and_then(|t| t.as_str()) {
                Some("ask_rank") => object
                    .get("rank")
                    .ok_or_else(|| IllegalAction::InvalidAction("missing rank".into()))?,
                _ => return Err(IllegalAction::InvalidAction("missing ask_rank".into())),
            },
        };
        let symbol = raw
            .as_str()
            .ok_or_else(|| IllegalAction::InvalidAction("rank must be a string".into()))?;
        symbol
            .parse::<Rank>()
            .map(Action::ask)
            .map_err(|err| IllegalAction::InvalidAction(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Take,
    DrawMatch,
    Pass,
    EmptyDeckPass,
    #[serde(rename = "gameover")]
    GameOver,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Take => "take",
            Outcome::DrawMatch => "draw-match",
            Outcome::Pass => "pass",
            Outcome::EmptyDeckPass => "empty-deck-pass",
            Outcome::GameOver => "gameover",
        }
    }

    /// Whether the asker moves again (before any empty-hand settling).
    pub const fn keeps_turn(self) -> bool {
        matches!(self, Outcome::Take | Outcome::DrawMatch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalAction {
    #[error("game is not in play")]
    GameNotPlay,
    #[error("malformed action: {0}")]
    InvalidAction(String),
    #[error("rank {0} is not held by the active seat")]
    IllegalRank(Rank),
}

impl IllegalAction {
    pub const fn code(&self) -> &'static str {
        match self {
            IllegalAction::GameNotPlay => "game-not-play",
            IllegalAction::InvalidAction(_) => "invalid-action",
            IllegalAction::IllegalRank(_) => "illegal-rank",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("starting hand size must be between 1 and 26, got {0}")]
    InvalidHandSize(usize),
    #[error("refill size must be positive")]
    InvalidRefillSize,
    #[error("name for {0} is empty")]
    EmptyName(Seat),
    #[error("snapshot schema version {found} is not supported (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },
    #[error("snapshot accounts for {0} cards instead of 52")]
    Conservation(usize),
    #[error("snapshot is inconsistent: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: GameState,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    deck: Deck,
    players: [Player; 2],
    current: Seat,
    phase: Phase,
    events: Vec<GameEvent>,
    winner: Option<Winner>,
    seed: u64,
    refill_size: usize,
}

impl GameState {
    pub fn new(options: GameOptions) -> Result<Self, GameError> {
        options.validate()?;
        let [first, second] = options.names;
        let mut state = Self {
            deck: Deck::shuffled_with_seed(options.seed),
            players: [Player::new(first), Player::new(second)],
            current: Seat::First,
            phase: Phase::Play,
            events: Vec::new(),
            winner: None,
            seed: options.seed,
            refill_size: options.refill_size,
        };

        for _ in 0..options.starting_hand_size {
            for seat in Seat::BOTH {
                if let Some(card) = state.deck.draw_one() {
                    state.players[seat.index()].hand.add(card);
                }
            }
        }
        for seat in Seat::BOTH {
            state.extract_books(seat);
        }
        if !state.finish_if_complete() {
            state.settle();
        }
        Ok(state)
    }

    pub(crate) fn from_parts(
        deck: Deck,
        players: [Player; 2],
        current: Seat,
        phase: Phase,
        events: Vec<GameEvent>,
        winner: Option<Winner>,
        seed: u64,
        refill_size: usize,
    ) -> Self {
        Self {
            deck,
            players,
            current,
            phase,
            events,
            winner,
            seed,
            refill_size,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn current_seat(&self) -> Seat {
        self.current
    }

    pub fn player(&self, seat: Seat) -> &Player {
        &self.players[seat.index()]
    }

    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn refill_size(&self) -> usize {
        self.refill_size
    }

    pub fn names(&self) -> [String; 2] {
        [self.players[0].name.clone(), self.players[1].name.clone()]
    }

    pub fn total_books(&self) -> usize {
        self.players.iter().map(|p| p.books().len()).sum()
    }

    /// deck + hands + 4 * books; always 52 for a well-formed state.
    pub fn card_total(&self) -> usize {
        self.deck.len()
            + self
                .players
                .iter()
                .map(|p| p.hand.len() + 4 * p.books().len())
                .sum::<usize>()
    }

    /// Number of applied moves so far.
    pub fn ply(&self) -> usize {
        self.events.iter().filter(|e| e.is_move_start()).count()
    }

    pub fn log_lines(&self) -> Vec<String> {
        let names = self.names();
        self.events
            .iter()
            .map(|event| event.display_with(&names).to_string())
            .collect()
    }

    pub fn log_tail(&self, count: usize) -> Vec<String> {
        let lines = self.log_lines();
        let start = lines.len().saturating_sub(count);
        lines[start..].to_vec()
    }

    pub fn legal_moves(&self) -> Vec<Action> {
        if self.phase != Phase::Play {
            return Vec::new();
        }
        self.player(self.current)
            .hand
            .rank_counts()
            .held()
            .map(Action::ask)
            .collect()
    }

    pub fn is_legal(&self, action: Action) -> bool {
        self.phase == Phase::Play && self.player(self.current).hand.has_rank(action.ask_rank)
    }

    /// Applies one move to a copy of the state. The receiver is never changed.
    pub fn apply(&self, action: Action) -> Result<Transition, IllegalAction> {
        if self.phase != Phase::Play {
            return Err(IllegalAction::GameNotPlay);
        }
        if !self.is_legal(action) {
            return Err(IllegalAction::IllegalRank(action.ask_rank));
        }
        let mut next = self.clone();
        let outcome = next.play_ask(action.ask_rank);
        next.settle();
        Ok(Transition {
            state: next,
            outcome,
        })
    }

    /// Applies an action still in wire form.
    pub fn apply_value(&self, value: &serde_json::Value) -> Result<Transition, IllegalAction> {
        if self.phase != Phase::Play {
            return Err(IllegalAction::GameNotPlay);
        }
        let action = Action::from_value(value)?;
        self.apply(action)
    }

    /// Records and returns the winner by book count.
    pub fn finalize_winner(&mut self) -> Winner {
        let first = self.players[0].books().len();
        let second = self.players[1].books().len();
        let winner = match first.cmp(&second) {
            std::cmp::Ordering::Greater => Winner::Seat(Seat::First),
            std::cmp::Ordering::Less => Winner::Seat(Seat::Second),
            std::cmp::Ordering::Equal => Winner::Tie,
        };
        self.winner = Some(winner);
        winner
    }

    pub fn winner_name(&self) -> Option<String> {
        self.winner.map(|winner| match winner {
            Winner::Seat(seat) => self.player(seat).name.clone(),
            Winner::Tie => "Tie".to_string(),
        })
    }

    pub fn summarize(&self, observer: Option<Seat>) -> PublicSummary {
        PublicSummary::build(self, observer)
    }

    pub fn seat_view(&self, seat: Seat) -> SeatView<'_> {
        SeatView::new(self, seat)
    }

    fn play_ask(&mut self, rank: Rank) -> Outcome {
        let asker = self.current;
        let target = asker.opponent();
        self.events.push(GameEvent::Ask { seat: asker, rank });

        let taken = self.players[target.index()].hand.take_rank(rank);
        if !taken.is_empty() {
            let count = taken.len() as u8;
            self.players[asker.index()].hand.extend(taken);
            self.events.push(GameEvent::Give {
                seat: target,
                count,
            });
            self.extract_books(asker);
            if self.finish_if_complete() {
                return Outcome::GameOver;
            }
            self.refill_if_empty(asker);
            if self.finish_if_complete() {
                return Outcome::GameOver;
            }
            return Outcome::Take;
        }

        self.events.push(GameEvent::GoFish { seat: target });
        let Some(card) = self.deck.draw_one() else {
            self.events.push(GameEvent::EmptyDeck { seat: asker });
            self.current = target;
            return Outcome::EmptyDeckPass;
        };
        self.players[asker.index()].hand.add(card);
        self.events.push(GameEvent::Draw { seat: asker });
        self.extract_books(asker);
        if self.finish_if_complete() {
            return Outcome::GameOver;
        }

        if card.rank == rank {
            self.events.push(GameEvent::DrawMatch { seat: asker, rank });
            self.refill_if_empty(asker);
            if self.finish_if_complete() {
                return Outcome::GameOver;
            }
            return Outcome::DrawMatch;
        }

        self.current = target;
        Outcome::Pass
    }

    /// Resolves empty hands at the start of a turn so that a seat in play
    /// always has a legal move.
    fn settle(&mut self) {
        while self.phase == Phase::Play && self.player(self.current).hand.is_empty() {
            let seat = self.current;
            if !self.deck.is_empty() {
                self.refill_if_empty(seat);
                self.finish_if_complete();
            } else if self.player(seat.opponent()).hand.is_empty() {
                self.finish();
            } else {
                self.events.push(GameEvent::Skip { seat });
                self.current = seat.opponent();
            }
        }
    }

    fn extract_books(&mut self, seat: Seat) {
        let made = self.players[seat.index()].extract_books();
        if !made.is_empty() {
            self.events.push(GameEvent::Book { seat, ranks: made });
        }
    }

    fn refill_if_empty(&mut self, seat: Seat) {
        let player = &self.players[seat.index()];
        if !player.hand.is_empty() || self.deck.is_empty() {
            return;
        }
        let drawn = self.deck.draw(self.refill_size);
        let count = drawn.len() as u8;
        self.players[seat.index()].hand.extend(drawn);
        self.events.push(GameEvent::Refill { seat, count });
        self.extract_books(seat);
    }

    fn finish_if_complete(&mut self) -> bool {
        if self.total_books() >= TOTAL_BOOKS {
            self.finish();
            true
        } else {
            false
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::GameOver;
        let winner = self.finalize_winner();
        self.events.push(GameEvent::GameOver { winner });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::Card;
    use crate::model::hand::Hand;
    use crate::model::suit::Suit;

    fn all_of(rank: Rank) -> Vec<Card> {
        Suit::ALL.iter().map(|&suit| Card::new(rank, suit)).collect()
    }

    fn cards(specs: &[(Rank, Suit)]) -> Vec<Card> {
        specs.iter().map(|&(r, s)| Card::new(r, s)).collect()
    }

    /// Builds a state from explicit parts without any consistency checks.
    fn layout(first: Vec<Card>, second: Vec<Card>, deck: Vec<Card>, books: [Vec<Rank>; 2]) -> GameState {
        let [books_a, books_b] = books;
        GameState::from_parts(
            Deck::from_cards(deck),
            [
                Player::from_parts("A", Hand::with_cards(first), books_a),
                Player::from_parts("B", Hand::with_cards(second), books_b),
            ],
            Seat::First,
            Phase::Play,
            Vec::new(),
            None,
            0,
            DEFAULT_REFILL_SIZE,
        )
    }

    /// Puts every unplaced card at the bottom of the deck.
    fn complete(mut state: GameState) -> GameState {
        let mut placed: Vec<Card> = state.deck.cards().to_vec();
        for player in &state.players {
            placed.extend(player.hand.iter().copied());
            for rank in player.books() {
                placed.extend(all_of(*rank));
            }
        }
        let mut rest: Vec<Card> = Rank::ORDERED
            .iter()
            .flat_map(|&rank| all_of(rank))
            .filter(|card| !placed.contains(card))
            .collect();
        rest.extend(state.deck.cards().iter().copied());
        state.deck = Deck::from_cards(rest);
        assert_eq!(state.card_total(), DECK_SIZE);
        state
    }

    /// Deck empty. A: 2H 3S. B: 2S 2D 2C 3H 3D 3C. Remaining ranks booked.
    fn endgame_state() -> GameState {
        let state = layout(
            cards(&[(Rank::Two, Suit::Hearts), (Rank::Three, Suit::Spades)]),
            cards(&[
                (Rank::Two, Suit::Spades),
                (Rank::Two, Suit::Diamonds),
                (Rank::Two, Suit::Clubs),
                (Rank::Three, Suit::Hearts),
                (Rank::Three, Suit::Diamonds),
                (Rank::Three, Suit::Clubs),
            ]),
            Vec::new(),
            [
                vec![Rank::Four, Rank::Five, Rank::Six, Rank::Seven, Rank::Eight],
                vec![
                    Rank::Ace,
                    Rank::Nine,
                    Rank::Ten,
                    Rank::Jack,
                    Rank::Queen,
                    Rank::King,
                ],
            ],
        );
        assert_eq!(state.card_total(), DECK_SIZE);
        state
    }

    #[test]
    fn new_game_deals_and_conserves_cards() {
        let state = GameState::new(GameOptions::with_seed(9)).unwrap();
        assert_eq!(state.card_total(), DECK_SIZE);
        assert_eq!(state.phase(), Phase::Play);
        assert_eq!(state.current_seat(), Seat::First);
        assert!(!state.legal_moves().is_empty());
    }

    #[test]
    fn rejects_bad_options() {
        let mut options = GameOptions::with_seed(1);
        options.starting_hand_size = 0;
        assert_eq!(
            GameState::new(options.clone()).unwrap_err(),
            GameError::InvalidHandSize(0)
        );
        options.starting_hand_size = 27;
        assert!(GameState::new(options.clone()).is_err());
        options.starting_hand_size = 7;
        options.names[1] = "  ".into();
        assert_eq!(
            GameState::new(options).unwrap_err(),
            GameError::EmptyName(Seat::Second)
        );
    }

    #[test]
    fn take_keeps_the_turn_and_leaves_receiver_untouched() {
        let state = complete(layout(
            cards(&[(Rank::Ace, Suit::Spades), (Rank::Two, Suit::Hearts)]),
            cards(&[
                (Rank::Ace, Suit::Hearts),
                (Rank::Ace, Suit::Clubs),
                (Rank::Three, Suit::Clubs),
            ]),
            Vec::new(),
            [vec![], vec![]],
        ));
        let transition = state.apply(Action::ask(Rank::Ace)).unwrap();
        assert_eq!(transition.outcome, Outcome::Take);
        let next = &transition.state;
        assert_eq!(next.current_seat(), Seat::First);
        assert_eq!(next.player(Seat::First).hand.count_rank(Rank::Ace), 3);
        assert!(!next.player(Seat::Second).hand.has_rank(Rank::Ace));
        assert_eq!(
            next.events()[1],
            GameEvent::Give {
                seat: Seat::Second,
                count: 2
            }
        );
        assert_eq!(state.player(Seat::First).hand.len(), 2);
        assert!(state.events().is_empty());
    }

    #[test]
    fn take_completing_a_book_moves_it_out_of_hand() {
        let state = complete(layout(
            cards(&[
                (Rank::King, Suit::Spades),
                (Rank::King, Suit::Hearts),
                (Rank::Two, Suit::Hearts),
            ]),
            cards(&[(Rank::King, Suit::Diamonds), (Rank::King, Suit::Clubs)]),
            Vec::new(),
            [vec![], vec![]],
        ));
        let next = state.apply(Action::ask(Rank::King)).unwrap().state;
        let first = next.player(Seat::First);
        assert!(first.has_book(Rank::King));
        assert!(!first.hand.has_rank(Rank::King));
        assert_eq!(next.card_total(), DECK_SIZE);
        assert!(next.log_lines().contains(&"A books K.".to_string()));
    }

    #[test]
    fn unmatched_draw_passes_and_matched_draw_retains() {
        let base = |top: Card| {
            complete(layout(
                cards(&[(Rank::Four, Suit::Spades)]),
                cards(&[(Rank::Nine, Suit::Spades)]),
                vec![top],
                [vec![], vec![]],
            ))
        };

        let miss = base(Card::new(Rank::Jack, Suit::Hearts));
        let transition = miss.apply(Action::ask(Rank::Four)).unwrap();
        assert_eq!(transition.outcome, Outcome::Pass);
        assert_eq!(transition.state.current_seat(), Seat::Second);
        assert_eq!(transition.state.deck_len(), miss.deck_len() - 1);

        let hit = base(Card::new(Rank::Four, Suit::Hearts));
        let transition = hit.apply(Action::ask(Rank::Four)).unwrap();
        assert_eq!(transition.outcome, Outcome::DrawMatch);
        assert_eq!(transition.state.current_seat(), Seat::First);
        assert_eq!(
            transition.state.log_tail(1),
            vec!["A drew the asked rank and goes again.".to_string()]
        );
    }

    #[test]
    fn final_book_ends_the_game() {
        let state = endgame_state();
        let first = state.apply(Action::ask(Rank::Two)).unwrap();
        assert_eq!(first.outcome, Outcome::Take);
        assert_eq!(first.state.total_books(), 12);

        let last = first.state.apply(Action::ask(Rank::Three)).unwrap();
        assert_eq!(last.outcome, Outcome::GameOver);
        let done = last.state;
        assert!(done.is_over());
        assert!(done.legal_moves().is_empty());
        assert_eq!(done.total_books(), TOTAL_BOOKS);
        assert_eq!(done.winner(), Some(Winner::Seat(Seat::First)));
        assert_eq!(done.card_total(), DECK_SIZE);
        assert_eq!(
            done.apply(Action::ask(Rank::Two)).unwrap_err(),
            IllegalAction::GameNotPlay
        );
    }

    #[test]
    fn denial_against_an_empty_deck_passes_the_turn() {
        let state = layout(
            cards(&[(Rank::Two, Suit::Hearts)]),
            cards(&[(Rank::Three, Suit::Hearts)]),
            Vec::new(),
            [vec![], vec![]],
        );
        let transition = state.apply(Action::ask(Rank::Two)).unwrap();
        assert_eq!(transition.outcome, Outcome::EmptyDeckPass);
        assert_eq!(transition.state.current_seat(), Seat::Second);
        assert!(
            transition
                .state
                .events()
                .iter()
                .any(|e| matches!(e, GameEvent::EmptyDeck { seat: Seat::First }))
        );
    }

    #[test]
    fn empty_handed_seat_is_skipped_when_the_deck_is_out() {
        let state = layout(
            cards(&[
                (Rank::Two, Suit::Hearts),
                (Rank::Two, Suit::Spades),
                (Rank::Two, Suit::Diamonds),
            ]),
            cards(&[(Rank::Two, Suit::Clubs), (Rank::Three, Suit::Hearts)]),
            Vec::new(),
            [vec![], vec![]],
        );
        let transition = state.apply(Action::ask(Rank::Two)).unwrap();
        assert_eq!(transition.outcome, Outcome::Take);
        let next = transition.state;
        assert_eq!(next.current_seat(), Seat::Second);
        assert!(matches!(
            next.events().last(),
            Some(GameEvent::Skip { seat: Seat::First })
        ));
        assert_eq!(next.legal_moves(), vec![Action::ask(Rank::Three)]);
    }

    #[test]
    fn both_hands_empty_ends_the_game() {
        let state = layout(
            cards(&[
                (Rank::Two, Suit::Hearts),
                (Rank::Two, Suit::Spades),
                (Rank::Two, Suit::Diamonds),
            ]),
            cards(&[(Rank::Two, Suit::Clubs)]),
            Vec::new(),
            [vec![], vec![]],
        );
        let next = state.apply(Action::ask(Rank::Two)).unwrap().state;
        assert!(next.is_over());
        assert_eq!(next.winner(), Some(Winner::Seat(Seat::First)));
    }

    #[test]
    fn emptied_hand_refills_at_turn_start() {
        let mut state = complete(layout(
            cards(&[(Rank::Nine, Suit::Diamonds)]),
            cards(&[
                (Rank::Nine, Suit::Spades),
                (Rank::Five, Suit::Clubs),
            ]),
            vec![Card::new(Rank::Jack, Suit::Hearts)],
            [vec![], vec![]],
        ));
        state.current = Seat::Second;

        let after_take = state.apply(Action::ask(Rank::Nine)).unwrap().state;
        assert!(after_take.player(Seat::First).hand.is_empty());
        assert_eq!(after_take.current_seat(), Seat::Second);

        let after_miss = after_take.apply(Action::ask(Rank::Five)).unwrap();
        assert_eq!(after_miss.outcome, Outcome::Pass);
        let next = after_miss.state;
        assert_eq!(next.current_seat(), Seat::First);
        assert!(
            next.events()
                .iter()
                .any(|e| matches!(e, GameEvent::Refill { seat: Seat::First, count: 5 }))
        );
        assert!(!next.legal_moves().is_empty());
        assert_eq!(next.card_total(), DECK_SIZE);
    }

    #[test]
    fn illegal_moves_are_rejected_with_codes() {
        let state = GameState::new(GameOptions::with_seed(3)).unwrap();
        let held = state.legal_moves();
        let missing = Rank::ORDERED
            .iter()
            .copied()
            .find(|r| !held.contains(&Action::ask(*r)))
            .unwrap();
        assert!(!state.is_legal(Action::ask(missing)));
        let err = state.apply(Action::ask(missing)).unwrap_err();
        assert_eq!(err.code(), "illegal-rank");
        for rank in Rank::ORDERED {
            let action = Action::ask(rank);
            assert_eq!(state.is_legal(action), held.contains(&action), "{rank}");
        }

        let err = state
            .apply_value(&serde_json::json!({"ask_rank": "Z"}))
            .unwrap_err();
        assert_eq!(err.code(), "invalid-action");
        let err = state.apply_value(&serde_json::json!("Q")).unwrap_err();
        assert_eq!(err.code(), "invalid-action");
    }

    #[test]
    fn wire_actions_accept_both_shapes() {
        let modern = Action::from_value(&serde_json::json!({"ask_rank": "q"})).unwrap();
        let legacy =
            Action::from_value(&serde_json::json!({"type": "ask_rank", "rank": "Q"})).unwrap();
        assert_eq!(modern, Action::ask(Rank::Queen));
        assert_eq!(legacy, modern);
    }

    #[test]
    fn ties_are_declared_on_equal_books() {
        let mut state = layout(
            Vec::new(),
            Vec::new(),
            Vec::new(),
            [vec![Rank::Ace], vec![Rank::King]],
        );
        assert_eq!(state.finalize_winner(), Winner::Tie);
        assert_eq!(state.winner_name().as_deref(), Some("Tie"));
    }
}
