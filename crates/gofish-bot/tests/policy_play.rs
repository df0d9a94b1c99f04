use gofish_bot::{
    PolicyContext, PolicyParams, PolicyRegistry, ProfileParams, StrategyPlanner, StrategyProfile,
};
use gofish_core::belief::TrackerConfig;
use gofish_core::game::event::GameEvent;
use gofish_core::game::serialization::GameSnapshot;
use gofish_core::game::state::{Action, GameOptions, GameState, Outcome, Phase};
use gofish_core::model::card::Card;
use gofish_core::model::hand::Hand;
use gofish_core::model::player::{Player, Seat};
use gofish_core::model::rank::Rank;
use gofish_core::model::suit::Suit;

const PLY_CEILING: usize = 10_000;

fn play(first: &str, second: &str, seed: u64) -> GameState {
    let registry = PolicyRegistry::with_builtin();
    let mut policies = [
        registry.build(first, &PolicyParams::new()).unwrap(),
        registry.build(second, &PolicyParams::new()).unwrap(),
    ];
    for policy in policies.iter_mut() {
        policy.reset(seed);
    }
    let mut state = GameState::new(GameOptions::with_seed(seed)).unwrap();
    for _ in 0..PLY_CEILING {
        let legal = state.legal_moves();
        if legal.is_empty() {
            break;
        }
        let seat = state.current_seat();
        let ctx = PolicyContext::new(&state, &legal, seat);
        let action = policies[seat.index()].pick_move(&ctx).unwrap();
        assert!(legal.contains(&action), "{} chose an illegal move", policies[seat.index()].name());
        let next = state.apply(action).unwrap().state;
        state = next;
    }
    state
}

#[test]
fn every_pairing_finishes_with_legal_moves() {
    let names = ["random", "baseline", "analytical", "casual", "scout", "greedy", "denial"];
    for (i, first) in names.iter().enumerate() {
        let second = names[(i + 3) % names.len()];
        let end = play(first, second, 100 + i as u64);
        assert_eq!(end.phase(), Phase::GameOver, "{first} vs {second} did not finish");
        assert!(end.winner().is_some());
    }
}

#[test]
fn seeded_policy_games_replay_exactly() {
    let a = play("greedy", "analytical", 7);
    let b = play("greedy", "analytical", 7);
    assert_eq!(a.events(), b.events());
}

fn cards(rank: Rank, suits: &[Suit]) -> Vec<Card> {
    suits.iter().map(|&suit| Card::new(rank, suit)).collect()
}

/// Deck empty, three ranks left: we hold K x3, Q x1, J x2.
fn empty_deck_endgame() -> GameState {
    let mut ours = cards(Rank::King, &[Suit::Spades, Suit::Hearts, Suit::Diamonds]);
    ours.extend(cards(Rank::Queen, &[Suit::Spades]));
    ours.extend(cards(Rank::Jack, &[Suit::Spades, Suit::Hearts]));
    let mut theirs = cards(Rank::King, &[Suit::Clubs]);
    theirs.extend(cards(Rank::Queen, &[Suit::Hearts, Suit::Diamonds, Suit::Clubs]));
    theirs.extend(cards(Rank::Jack, &[Suit::Diamonds, Suit::Clubs]));

    let snapshot = GameSnapshot {
        schema_version: GameSnapshot::SCHEMA_VERSION,
        seed: 0,
        phase: Phase::Play,
        current: Seat::First,
        refill_size: 5,
        deck: Vec::new(),
        players: [
            Player::from_parts("Player 1", Hand::with_cards(ours), Rank::ORDERED[0..5].to_vec()),
            Player::from_parts("Player 2", Hand::with_cards(theirs), Rank::ORDERED[5..10].to_vec()),
        ],
        events: Vec::new(),
        winner: None,
    };
    snapshot.restore().unwrap()
}

#[test]
fn endgame_search_scores_every_take_with_an_empty_deck() {
    let state = empty_deck_endgame();
    let view = state.seat_view(Seat::First);
    let legal = view.askable();
    let mut planner = StrategyPlanner::new(ProfileParams::for_profile(StrategyProfile::Denial), 1)
        .with_tracker_config(TrackerConfig::default());
    let decision = planner.choose(&view, &legal).unwrap();

    let report = decision.search.expect("search runs with an empty deck");
    assert_eq!(report.scores.len(), legal.len());
    // Opponent holds every unseen copy, so every ask books and keeps the turn.
    for (rank, score) in &report.scores {
        assert!(*score >= 12.0 - 1e-9, "{rank} scored {score}");
    }
    let transition = state
        .apply(Action::ask(decision.rank))
        .unwrap();
    assert_eq!(transition.outcome, Outcome::Take);
    assert_eq!(transition.state.player(Seat::First).books().len(), 6);
}

/// Two cards left in the deck (J, Q). The opponent asked for kings earlier
/// and has just denied jacks, so they must hold the last king, two queens and
/// no jack.
fn two_card_deck_endgame() -> GameState {
    let mut ours = cards(Rank::King, &[Suit::Spades, Suit::Hearts, Suit::Diamonds]);
    ours.extend(cards(Rank::Jack, &[Suit::Spades, Suit::Hearts, Suit::Diamonds]));
    ours.extend(cards(Rank::Queen, &[Suit::Spades]));
    let mut theirs = cards(Rank::King, &[Suit::Clubs]);
    theirs.extend(cards(Rank::Queen, &[Suit::Diamonds, Suit::Clubs]));

    let snapshot = GameSnapshot {
        schema_version: GameSnapshot::SCHEMA_VERSION,
        seed: 0,
        phase: Phase::Play,
        current: Seat::First,
        refill_size: 5,
        deck: vec![Card::new(Rank::Jack, Suit::Clubs), Card::new(Rank::Queen, Suit::Hearts)],
        players: [
            Player::from_parts("Player 1", Hand::with_cards(ours), Rank::ORDERED[0..5].to_vec()),
            Player::from_parts("Player 2", Hand::with_cards(theirs), Rank::ORDERED[5..10].to_vec()),
        ],
        events: vec![
            GameEvent::Ask { seat: Seat::Second, rank: Rank::King },
            GameEvent::GoFish { seat: Seat::First },
            GameEvent::Draw { seat: Seat::Second },
            GameEvent::Ask { seat: Seat::First, rank: Rank::Jack },
            GameEvent::GoFish { seat: Seat::Second },
            GameEvent::DrawMatch { seat: Seat::First, rank: Rank::Jack },
        ],
        winner: None,
    };
    snapshot.restore().unwrap()
}

/// Denial with every component but the one-ply endgame search switched off.
fn search_only_planner() -> StrategyPlanner {
    let mut overrides = PolicyParams::new();
    for key in [
        "weights.completion",
        "weights.near_book",
        "weights.deny",
        "weights.info_gain",
        "weights.belief",
        "weights.monte_carlo",
    ] {
        overrides.insert(key.to_string(), 0.0);
    }
    overrides.insert("weights.endgame".to_string(), 1.0);
    overrides.insert("search_depth".to_string(), 1.0);
    overrides.insert("determinizations".to_string(), 4.0);
    let params = ProfileParams::for_profile(StrategyProfile::Denial)
        .with_overrides(&overrides)
        .unwrap();
    StrategyPlanner::new(params, 3).with_tracker_config(TrackerConfig::default())
}

#[test]
fn endgame_search_separates_book_take_and_miss() {
    let state = two_card_deck_endgame();
    let view = state.seat_view(Seat::First);
    let legal = view.askable();
    assert_eq!(legal.len(), 3);

    let decision = search_only_planner().choose(&view, &legal).unwrap();
    let report = decision.search.expect("search runs with two cards left");
    let king = report.score(Rank::King).unwrap();
    let queen = report.score(Rank::Queen).unwrap();
    let jack = report.score(Rank::Jack).unwrap();
    assert!(king > queen && queen > jack, "K {king}, Q {queen}, J {jack}");
    assert_eq!(report.best(), Some(Rank::King));
    assert_eq!(decision.rank, Rank::King);

    let transition = state.apply(Action::ask(Rank::King)).unwrap();
    assert_eq!(transition.outcome, Outcome::Take);
    assert_eq!(transition.state.player(Seat::First).books().len(), 6);
}

#[test]
fn endgame_search_prefers_a_sure_take_over_a_sure_miss() {
    let state = two_card_deck_endgame();
    let view = state.seat_view(Seat::First);
    let legal = [Rank::Jack, Rank::Queen];

    let decision = search_only_planner().choose(&view, &legal).unwrap();
    assert_eq!(decision.rank, Rank::Queen);
    let transition = state.apply(Action::ask(Rank::Queen)).unwrap();
    assert_eq!(transition.outcome, Outcome::Take);
}
