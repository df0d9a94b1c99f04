// Endgame search
//
// Depth-limited minimax with alpha-beta pruning over an abstracted position:
// per-rank counts for both sides, book counts, cards of unknown rank, and the
// deck size. The opponent's holdings are determinized from the most probable
// particles and root scores are averaged by particle share.
//
// Move rules in the abstraction:
// - take: every copy moves to the mover, a completed rank becomes a book, the
//   mover keeps the turn
// - miss: one deck card becomes an unranked card for the mover (nothing if the
//   deck is empty), the turn passes
//
// Two engine rules are not modelled: a mover left empty-handed after a take
// does not refill from the deck, and a drawn card matching the asked rank does
// not keep the turn (the draw stays unranked).

use gofish_core::belief::Particle;
use gofish_core::game::view::SeatView;
use gofish_core::model::rank::Rank;

const BOOK_WEIGHT: f64 = 4.0;
const CARD_WEIGHT: f64 = 0.15;

// ============================================================================
// Abstract position
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The seat the search is run for.
    Us,
    Them,
}

impl Side {
    fn other(self) -> Side {
        match self {
            Side::Us => Side::Them,
            Side::Them => Side::Us,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbstractState {
    pub ours: [u8; Rank::COUNT],
    pub theirs: [u8; Rank::COUNT],
    pub our_books: u8,
    pub their_books: u8,
    pub our_unranked: u8,
    pub their_unranked: u8,
    pub deck: u8,
    pub to_move: Side,
}

impl AbstractState {
    /// Position seen from `view` with the opponent's hand taken from `particle`.
    pub fn from_view(view: &SeatView<'_>, particle: &Particle) -> Self {
        let theirs = *particle.counts().as_array();
        let placed = particle.total() as usize;
        Self {
            ours: *view.own_counts.as_array(),
            theirs,
            our_books: view.own_books.len() as u8,
            their_books: view.opponent_books.len() as u8,
            our_unranked: 0,
            their_unranked: view.opponent_hand_size.saturating_sub(placed) as u8,
            deck: view.deck_size.min(u8::MAX as usize) as u8,
            to_move: Side::Us,
        }
    }

    fn mover_counts(&self) -> &[u8; Rank::COUNT] {
        match self.to_move {
            Side::Us => &self.ours,
            Side::Them => &self.theirs,
        }
    }

    fn moves(&self) -> Vec<usize> {
        let mover = self.mover_counts();
        let defender = match self.to_move {
            Side::Us => &self.theirs,
            Side::Them => &self.ours,
        };
        let mut moves: Vec<usize> = (0..Rank::COUNT).filter(|&i| mover[i] > 0).collect();
        // Takes first, then the ranks closest to a book.
        moves.sort_by(|&a, &b| {
            (defender[b] > 0)
                .cmp(&(defender[a] > 0))
                .then_with(|| mover[b].cmp(&mover[a]))
                .then_with(|| a.cmp(&b))
        });
        moves
    }

    fn play(&self, rank: usize) -> AbstractState {
        let mut next = *self;
        let (mover, defender, books, unranked) = match self.to_move {
            Side::Us => (
                &mut next.ours,
                &mut next.theirs,
                &mut next.our_books,
                &mut next.our_unranked,
            ),
            Side::Them => (
                &mut next.theirs,
                &mut next.ours,
                &mut next.their_books,
                &mut next.their_unranked,
            ),
        };
        if defender[rank] > 0 {
            mover[rank] += defender[rank];
            defender[rank] = 0;
            if mover[rank] >= 4 {
                mover[rank] = 0;
                *books += 1;
            }
        } else {
            if next.deck > 0 {
                next.deck -= 1;
                *unranked += 1;
            }
            next.to_move = self.to_move.other();
        }
        next
    }

    fn card_total(counts: &[u8; Rank::COUNT], unranked: u8) -> f64 {
        counts.iter().map(|&c| f64::from(c)).sum::<f64>() + f64::from(unranked)
    }

    /// Static value from our side.
    pub fn evaluate(&self) -> f64 {
        let books = f64::from(self.our_books) - f64::from(self.their_books);
        let cards = Self::card_total(&self.ours, self.our_unranked)
            - Self::card_total(&self.theirs, self.their_unranked);
        BOOK_WEIGHT * books + CARD_WEIGHT * cards
    }
}

// ============================================================================
// Search
// ============================================================================

/// Whether the search should run for this view.
pub fn endgame_active(view: &SeatView<'_>, deck_threshold: usize, hand_threshold: usize) -> bool {
    view.deck_size <= deck_threshold || view.opponent_hand_size <= hand_threshold
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchReport {
    /// Averaged root value per legal rank.
    pub scores: Vec<(Rank, f64)>,
    pub nodes: usize,
    pub determinizations: usize,
    pub truncated: bool,
}

impl SearchReport {
    pub fn score(&self, rank: Rank) -> Option<f64> {
        self.scores
            .iter()
            .find(|(r, _)| *r == rank)
            .map(|(_, score)| *score)
    }

    pub fn best(&self) -> Option<Rank> {
        let mut best: Option<(Rank, f64)> = None;
        for &(rank, score) in &self.scores {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((rank, score)),
            }
        }
        best.map(|(rank, _)| rank)
    }
}

pub struct EndgameSearch {
    depth: u8,
    node_budget: usize,
    nodes: usize,
}

impl EndgameSearch {
    pub fn new(depth: u8, node_budget: usize) -> Self {
        Self {
            depth,
            node_budget,
            nodes: 0,
        }
    }

    fn exhausted(&self) -> bool {
        self.node_budget > 0 && self.nodes >= self.node_budget
    }

    /// Root value of each of `legal` against a single determinized position.
    pub fn score_root(&mut self, root: &AbstractState, legal: &[Rank]) -> Vec<(Rank, f64)> {
        legal
            .iter()
            .map(|&rank| {
                let child = root.play(rank.index());
                let value = self.minimax(
                    &child,
                    self.depth.saturating_sub(1),
                    f64::NEG_INFINITY,
                    f64::INFINITY,
                );
                (rank, value)
            })
            .collect()
    }

    /// Scores `legal` over the given hypotheses, weighting each by its share.
    pub fn run(
        &mut self,
        view: &SeatView<'_>,
        hypotheses: &[(Particle, f64)],
        legal: &[Rank],
    ) -> SearchReport {
        self.nodes = 0;
        let mut totals = vec![0.0_f64; legal.len()];
        let mut mass = 0.0;
        for (particle, share) in hypotheses {
            let root = AbstractState::from_view(view, particle);
            for (slot, (_, value)) in self.score_root(&root, legal).into_iter().enumerate() {
                totals[slot] += share * value;
            }
            mass += share;
        }
        let scores = if mass > 0.0 {
            legal
                .iter()
                .zip(totals)
                .map(|(&rank, total)| (rank, total / mass))
                .collect()
        } else {
            Vec::new()
        };
        SearchReport {
            scores,
            nodes: self.nodes,
            determinizations: hypotheses.len(),
            truncated: self.exhausted(),
        }
    }

    fn minimax(&mut self, state: &AbstractState, depth: u8, mut alpha: f64, mut beta: f64) -> f64 {
        self.nodes += 1;
        if depth == 0 || self.exhausted() {
            return state.evaluate();
        }
        let mut state = *state;
        let mut moves = state.moves();
        if moves.is_empty() {
            state.to_move = state.to_move.other();
            moves = state.moves();
            if moves.is_empty() {
                return state.evaluate();
            }
        }

        let maximizing = state.to_move == Side::Us;
        let mut best = if maximizing {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        for rank in moves {
            let child = state.play(rank);
            let value = self.minimax(&child, depth - 1, alpha, beta);
            if maximizing {
                best = best.max(value);
                alpha = alpha.max(best);
            } else {
                best = best.min(value);
                beta = beta.min(best);
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }
}
