use gofish_core::model::rank::Rank;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Highest score, lowest rank on ties.
    Argmax,
    /// Softmax over the candidates within tolerance of the best score.
    Softmax,
}

impl SelectionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            SelectionMode::Argmax => "argmax",
            SelectionMode::Softmax => "softmax",
        }
    }
}

/// Index of the best score. Ties keep the canonically lowest rank.
pub fn argmax(scored: &[(Rank, f64)]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, (rank, score)) in scored.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(b) => {
                let (best_rank, best_score) = scored[b];
                if *score > best_score || (*score == best_score && *rank < best_rank) {
                    best = Some(i);
                }
            }
        }
    }
    best
}

/// Picks an index from `scored`.
///
/// A temperature of zero, or a single candidate inside `tolerance`, returns the
/// argmax. Otherwise candidates within `tolerance` of the best are weighted by
/// `exp((score - best) / temperature)`.
pub fn select<R: Rng + ?Sized>(
    scored: &[(Rank, f64)],
    temperature: f64,
    tolerance: f64,
    rng: &mut R,
) -> Option<(usize, SelectionMode)> {
    let best = argmax(scored)?;
    if temperature <= 0.0 {
        return Some((best, SelectionMode::Argmax));
    }
    let top = scored[best].1;
    let candidates: Vec<usize> = (0..scored.len())
        .filter(|&i| top - scored[i].1 <= tolerance)
        .collect();
    if candidates.len() < 2 {
        return Some((best, SelectionMode::Argmax));
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|&i| ((scored[i].1 - top) / temperature).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Some((best, SelectionMode::Argmax));
    }
    let mut roll = rng.gen_range(0.0..total);
    for (slot, weight) in candidates.iter().zip(&weights) {
        if roll < *weight {
            return Some((*slot, SelectionMode::Softmax));
        }
        roll -= weight;
    }
    candidates
        .last()
        .map(|&last| (last, SelectionMode::Softmax))
}
