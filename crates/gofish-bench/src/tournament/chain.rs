use gofish_bot::{Policy, PolicyContext};
use gofish_core::game::state::Action;
use serde::Serialize;
use tracing::{Level, event};

use super::feed::{FeedError, MoveFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Feed,
    Policy,
    FirstLegal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTrigger {
    Missing,
    Illegal,
}

/// How often each source was skipped, and why.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FallbackCounts {
    pub feed_missing: u32,
    pub feed_illegal: u32,
    pub policy_missing: u32,
    pub policy_illegal: u32,
}

impl FallbackCounts {
    pub fn record(&mut self, source: DecisionSource, trigger: FallbackTrigger) {
        let slot = match (source, trigger) {
            (DecisionSource::Feed, FallbackTrigger::Missing) => &mut self.feed_missing,
            (DecisionSource::Feed, FallbackTrigger::Illegal) => &mut self.feed_illegal,
            (_, FallbackTrigger::Missing) => &mut self.policy_missing,
            (_, FallbackTrigger::Illegal) => &mut self.policy_illegal,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.feed_missing + self.feed_illegal + self.policy_missing + self.policy_illegal
    }

    pub fn merge(&mut self, other: &FallbackCounts) {
        self.feed_missing += other.feed_missing;
        self.feed_illegal += other.feed_illegal;
        self.policy_missing += other.policy_missing;
        self.policy_illegal += other.policy_illegal;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decided {
    pub action: Action,
    pub source: DecisionSource,
}

/// Where the run currently is, for feed error messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainPosition {
    pub game: usize,
    pub ply: usize,
}

/// Ordered decision sources; each is skipped when it yields nothing or an
/// illegal move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionChain {
    sources: Vec<DecisionSource>,
}

impl DecisionChain {
    pub fn new(sources: Vec<DecisionSource>) -> Self {
        Self { sources }
    }

    /// feed → policy → first legal, or policy → first legal without a feed.
    pub fn standard(with_feed: bool) -> Self {
        let mut sources = Vec::with_capacity(3);
        if with_feed {
            sources.push(DecisionSource::Feed);
        }
        sources.push(DecisionSource::Policy);
        sources.push(DecisionSource::FirstLegal);
        Self::new(sources)
    }

    pub fn sources(&self) -> &[DecisionSource] {
        &self.sources
    }

    pub fn decide(
        &self,
        ctx: &PolicyContext<'_>,
        policy: &mut dyn Policy,
        mut feed: Option<&mut MoveFeed>,
        position: ChainPosition,
        counts: &mut FallbackCounts,
    ) -> Result<Option<Decided>, FeedError> {
        for &source in &self.sources {
            let candidate = match source {
                DecisionSource::Feed => {
                    let Some(feed) = feed.as_deref_mut() else {
                        continue;
                    };
                    match feed_candidate(ctx, feed, position)? {
                        Ok(action) => action,
                        Err(trigger) => {
                            counts.record(source, trigger);
                            event!(
                                target: "gofish_bench::feed",
                                Level::WARN,
                                game = position.game,
                                ply = position.ply,
                                trigger = ?trigger,
                                "feed entry skipped"
                            );
                            continue;
                        }
                    }
                }
                DecisionSource::Policy => match policy.pick_move(ctx) {
                    Some(action) if ctx.legal.contains(&action) => action,
                    Some(_) => {
                        counts.record(source, FallbackTrigger::Illegal);
                        continue;
                    }
                    None => {
                        counts.record(source, FallbackTrigger::Missing);
                        continue;
                    }
                },
                DecisionSource::FirstLegal => match ctx.legal.first() {
                    Some(action) => *action,
                    None => continue,
                },
            };
            return Ok(Some(Decided {
                action: candidate,
                source,
            }));
        }
        Ok(None)
    }
}

/// Next feed move, a fallback trigger, or a hard error in strict mode.
fn feed_candidate(
    ctx: &PolicyContext<'_>,
    feed: &mut MoveFeed,
    position: ChainPosition,
) -> Result<Result<Action, FallbackTrigger>, FeedError> {
    let Some(entry) = feed.next_entry() else {
        if feed.is_strict() {
            return Err(FeedError::Exhausted {
                consumed: feed.consumed(),
                game: position.game,
                ply: position.ply,
            });
        }
        return Ok(Err(FallbackTrigger::Missing));
    };
    match entry.action {
        Some(action) if ctx.legal.contains(&action) => Ok(Ok(action)),
        _ if feed.is_strict() => Err(FeedError::Illegal {
            line: entry.line,
            text: entry.text,
            game: position.game,
            ply: position.ply,
        }),
        _ => Ok(Err(FallbackTrigger::Illegal)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gofish_bot::PolicyDescriptor;
    use gofish_core::game::state::{GameOptions, GameState};
    use gofish_core::model::rank::Rank;

    struct Scripted(Option<Action>);

    impl Policy for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn pick_move(&mut self, _ctx: &PolicyContext<'_>) -> Option<Action> {
            self.0
        }

        fn descriptor(&self) -> PolicyDescriptor {
            PolicyDescriptor::new("scripted", 1)
        }
    }

    fn unheld(state: &GameState) -> Rank {
        let hand = &state.player(state.current_seat()).hand;
        Rank::ORDERED
            .iter()
            .copied()
            .find(|r| !hand.has_rank(*r))
            .unwrap()
    }

    #[test]
    fn standard_chain_order() {
        assert_eq!(
            DecisionChain::standard(true).sources(),
            [DecisionSource::Feed, DecisionSource::Policy, DecisionSource::FirstLegal]
        );
        assert_eq!(
            DecisionChain::standard(false).sources(),
            [DecisionSource::Policy, DecisionSource::FirstLegal]
        );
    }

    #[test]
    fn chain_without_first_legal_can_come_up_empty() {
        let state = GameState::new(GameOptions::with_seed(4)).unwrap();
        let legal = state.legal_moves();
        let ctx = PolicyContext::new(&state, &legal, state.current_seat());
        let chain = DecisionChain::new(vec![DecisionSource::Policy]);
        let mut counts = FallbackCounts::default();
        let decided = chain
            .decide(&ctx, &mut Scripted(None), None, ChainPosition::default(), &mut counts)
            .unwrap();
        assert!(decided.is_none());
        assert_eq!(counts.policy_missing, 1);
    }

    #[test]
    fn policy_failures_fall_back_to_first_legal() {
        let state = GameState::new(GameOptions::with_seed(4)).unwrap();
        let legal = state.legal_moves();
        let ctx = PolicyContext::new(&state, &legal, state.current_seat());
        let chain = DecisionChain::standard(false);
        let mut counts = FallbackCounts::default();

        let mut silent = Scripted(None);
        let decided = chain
            .decide(&ctx, &mut silent, None, ChainPosition::default(), &mut counts)
            .unwrap()
            .unwrap();
        assert_eq!(decided.source, DecisionSource::FirstLegal);
        assert_eq!(decided.action, legal[0]);

        let mut cheat = Scripted(Some(Action::ask(unheld(&state))));
        chain
            .decide(&ctx, &mut cheat, None, ChainPosition::default(), &mut counts)
            .unwrap();
        assert_eq!(counts.policy_missing, 1);
        assert_eq!(counts.policy_illegal, 1);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn feed_comes_first_and_strict_mode_aborts() {
        let state = GameState::new(GameOptions::with_seed(4)).unwrap();
        let legal = state.legal_moves();
        let ctx = PolicyContext::new(&state, &legal, state.current_seat());
        let chain = DecisionChain::standard(true);
        let mut counts = FallbackCounts::default();
        let mut policy = Scripted(Some(legal[legal.len() - 1]));

        let wanted = legal[0].ask_rank;
        let mut feed = MoveFeed::parse(&wanted.to_string(), true);
        let decided = chain
            .decide(&ctx, &mut policy, Some(&mut feed), ChainPosition::default(), &mut counts)
            .unwrap()
            .unwrap();
        assert_eq!(decided.source, DecisionSource::Feed);
        assert_eq!(decided.action.ask_rank, wanted);

        let err = chain
            .decide(&ctx, &mut policy, Some(&mut feed), ChainPosition::default(), &mut counts)
            .unwrap_err();
        assert!(matches!(err, FeedError::Exhausted { consumed: 1, .. }));

        let mut illegal = MoveFeed::parse(&unheld(&state).to_string(), true);
        let err = chain
            .decide(&ctx, &mut policy, Some(&mut illegal), ChainPosition::default(), &mut counts)
            .unwrap_err();
        assert!(matches!(err, FeedError::Illegal { line: 1, .. }));
    }

    #[test]
    fn lenient_feed_falls_through_to_policy() {
        let state = GameState::new(GameOptions::with_seed(4)).unwrap();
        let legal = state.legal_moves();
        let ctx = PolicyContext::new(&state, &legal, state.current_seat());
        let chain = DecisionChain::standard(true);
        let mut counts = FallbackCounts::default();
        let mut policy = Scripted(Some(legal[0]));
        let mut feed = MoveFeed::parse("garbage\n", false);

        let first = chain
            .decide(&ctx, &mut policy, Some(&mut feed), ChainPosition::default(), &mut counts)
            .unwrap()
            .unwrap();
        assert_eq!(first.source, DecisionSource::Policy);
        let second = chain
            .decide(&ctx, &mut policy, Some(&mut feed), ChainPosition::default(), &mut counts)
            .unwrap()
            .unwrap();
        assert_eq!(second.source, DecisionSource::Policy);
        assert_eq!(counts.feed_illegal, 1);
        assert_eq!(counts.feed_missing, 1);
    }
}
