//! Per-process seeding.
//!
//! Every process of a multi-process run derives its own seed from one base
//! seed, so ranks never share a random stream.

/// Distance between the seeds of neighbouring ranks.
pub const RANK_SEED_STRIDE: u64 = 1000;

#[must_use]
pub fn rank_seed(base: u64, rank: u32) -> u64 {
    base.wrapping_add(RANK_SEED_STRIDE.wrapping_mul(u64::from(rank)))
}

/// Resolves the session seed: `base + 1000 * rank` when a base is given,
/// otherwise a fresh random seed.
#[must_use]
pub fn resolve_seed(base: Option<u64>, rank: u32) -> u64 {
    match base {
        Some(base) => rank_seed(base, rank),
        None => fastrand::u64(..),
    }
}
