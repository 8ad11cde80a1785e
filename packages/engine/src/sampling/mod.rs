//! Random selection helpers shared by the session engines
//!
//! - `FrequencyMap`: per-pair integer weights with a cumulative table, drawn by
//!   binary search instead of expanding each pair `weight` times into a list
//! - `distinct_sample`: draws values without repeats, for quiz distractors
//! - `session_rng`: seeded or entropy-backed ChaCha RNG

use std::collections::HashSet;
use std::hash::Hash;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Smallest weight a pair can have
pub const MIN_WEIGHT: u32 = 1;

pub fn session_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Weights indexed by pair position, all `>= MIN_WEIGHT`
#[derive(Debug, Clone)]
pub struct FrequencyMap {
    weights: Vec<u32>,
    /// `cumulative[i]` = sum of weights[0..=i]; rebuilt lazily
    cumulative: Vec<u64>,
    dirty: bool,
}

impl FrequencyMap {
    pub fn new(len: usize) -> Self {
        Self {
            weights: vec![MIN_WEIGHT; len],
            cumulative: Vec::with_capacity(len),
            dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight(&self, index: usize) -> u32 {
        self.weights.get(index).copied().unwrap_or(MIN_WEIGHT)
    }

    pub fn set_weight(&mut self, index: usize, weight: u32) {
        if let Some(slot) = self.weights.get_mut(index) {
            *slot = weight.max(MIN_WEIGHT);
            self.dirty = true;
        }
    }

    /// Adds `by` to a weight, saturating at `cap`. Returns the new weight.
    pub fn boost(&mut self, index: usize, by: u32, cap: u32) -> u32 {
        let cap = cap.max(MIN_WEIGHT);
        let next = self.weight(index).saturating_add(by).min(cap);
        self.set_weight(index, next);
        self.weight(index)
    }

    pub fn total(&mut self) -> u64 {
        self.rebuild();
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Draws an index with probability `weight / total`
    pub fn sample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let target = rng.gen_range(0..total);
        // First slot whose running total exceeds the target
        Some(self.cumulative.partition_point(|&c| c <= target))
    }

    fn rebuild(&mut self) {
        if !self.dirty {
            return;
        }
        self.cumulative.clear();
        let mut running = 0u64;
        for &w in &self.weights {
            running += w as u64;
            self.cumulative.push(running);
        }
        self.dirty = false;
    }
}

/// Up to `count` distinct values from `candidates`, skipping `exclude`.
///
/// Candidates are shuffled first so every distinct value has the same chance.
pub fn distinct_sample<T, R>(
    candidates: impl IntoIterator<Item = T>,
    exclude: &HashSet<T>,
    count: usize,
    rng: &mut R,
) -> Vec<T>
where
    T: Eq + Hash + Clone,
    R: Rng + ?Sized,
{
    let mut seen: HashSet<T> = HashSet::new();
    let mut unique: Vec<T> = candidates
        .into_iter()
        .filter(|value| !exclude.contains(value) && seen.insert(value.clone()))
        .collect();
    unique.shuffle(rng);
    unique.truncate(count);
    unique
}

// ==================== Unit Tests ====================
