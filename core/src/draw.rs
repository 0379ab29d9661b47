//! Deterministic winner selection.
//!
//! Fisher–Yates selection without replacement over the entrant sequence. Each
//! round hashes `seed ‖ round ‖ remaining` with SHA-256 and reduces the first
//! eight digest bytes (big-endian) modulo the live pool size. The selected
//! candidate is swapped with the last live candidate and the pool shrinks by
//! one.
//!
//! The outcome is fully reproducible from the public seed and the entrant
//! order, which makes a draw auditable. It is only as unpredictable as the
//! seed: a seed chosen by someone who has already seen the entrant list gives
//! procedural fairness, not cryptographic fairness.

use crate::types::Seed;
use sha2::{Digest, Sha256};

/// Derives the pool index for one round, in `[0, remaining)`.
///
/// `remaining` must be non-zero.
#[must_use]
pub fn draw_index(seed: &Seed, round: u64, remaining: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(round.to_be_bytes());
    hasher.update(remaining.to_be_bytes());
    let digest = hasher.finalize();

    let mut word = [0_u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(word) % remaining
}

/// Selects `count` distinct positions out of `population` entrants.
///
/// Returns indices into the entrant sequence in selection order. `count` is
/// clamped to `population`.
#[must_use]
pub fn select_winners(seed: &Seed, population: usize, count: usize) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..population).collect();
    let mut remaining = population;
    let rounds = count.min(population);
    let mut selected = Vec::with_capacity(rounds);

    for round in 0..rounds {
        #[allow(clippy::cast_possible_truncation)] // index < remaining <= usize::MAX
        let index = draw_index(seed, round as u64, remaining as u64) as usize;
        let last = remaining - 1;

        tracing::trace!(round, remaining, index, "draw round");
        selected.push(pool[index]);
        pool.swap(index, last);
        remaining = last;
    }

    selected
}
