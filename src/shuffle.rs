//! Shuffling with optional determinism.
//!
//! `shuffle(items, Some(seed))` always yields the same permutation for the same
//! seed and input; `shuffle(items, None)` draws from the thread RNG.
//! The seeded path uses ChaCha8, whose output is fixed across `rand` releases.

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::util::fnv1a;

/// Fisher–Yates shuffle into a new vector.
pub fn shuffle<T: Clone>(items: &[T], seed: Option<&str>) -> Vec<T> {
  let mut out = items.to_vec();
  match seed {
    Some(s) => {
      let mut rng = ChaCha8Rng::seed_from_u64(fnv1a(s));
      out.shuffle(&mut rng);
    }
    None => out.shuffle(&mut rand::thread_rng()),
  }
  out
}

/// Seed derived from a set of ids, independent of their order.
pub fn seed_from_ids<S: AsRef<str>>(ids: &[S]) -> String {
  let mut sorted: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
  sorted.sort_unstable();
  sorted.join(",")
}
