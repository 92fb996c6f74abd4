//! # Growth control
//!
//! Everything that decides *how much* a tree grows at a given point,
//! independent of what the nodes mean: the branching-energy controller and
//! the seeded random stream that every probabilistic decision draws from.

pub mod energy;

pub use energy::{BranchingEnergy, BranchingEnergyConfig};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The one random stream of a build. Seeded once, passed by `&mut` to every
/// decision that needs randomness; nothing reads ambient entropy after that.
pub type BuildRng = ChaCha8Rng;

pub fn seeded_rng(seed: u64) -> BuildRng {
    ChaCha8Rng::seed_from_u64(seed)
}
