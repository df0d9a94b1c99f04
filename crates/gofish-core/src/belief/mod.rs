//! Opponent modelling from a single seat's point of view.
//!
//! - `tracker`: coarse per-rank evidence plus a decaying likelihood signal,
//!   rebuilt incrementally from the game's event stream.
//! - `particles`: sampled opponent hands constrained by the tracker, used for
//!   ensemble estimates and cheap Monte Carlo rollouts.

pub mod particles;
pub mod tracker;

pub use particles::{Particle, ParticleConfig, ParticleModel, SamplingStats, ask_utility};
pub use tracker::{BeliefTracker, Coarse, RankBelief, TrackerConfig};
