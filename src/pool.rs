//! # Pool — Base Numbers and Canonical Combinations
//!
//! `NumberPool` is the sorted, de-duplicated set of base numbers a system is
//! built from. Internally the optimizer works with *pool indices* (`u16`
//! positions into the sorted pool) rather than values: because the pool is
//! sorted, an ascending index vector maps to an ascending value vector and
//! lexicographic order is preserved in both directions.
//!
//! `Combination` is the canonical (ascending) form of a ticket.

use serde::{Deserialize, Serialize};

use crate::error::OptimizerError;

/// Sorted, duplicate-free set of positive base numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberPool {
    numbers: Vec<u32>,
}

impl NumberPool {
    /// Build a pool from raw caller input. Duplicates are collapsed; values
    /// outside `1..=max_number` are rejected.
    pub fn new(raw: &[i64], max_number: u32) -> Result<Self, OptimizerError> {
        if raw.is_empty() {
            return Err(OptimizerError::InvalidPool("no numbers supplied".into()));
        }
        let mut numbers = Vec::with_capacity(raw.len());
        for &v in raw {
            if v < 1 || v > max_number as i64 {
                return Err(OptimizerError::InvalidPool(format!(
                    "{} is outside the allowed range 1..={}",
                    v, max_number
                )));
            }
            numbers.push(v as u32);
        }
        numbers.sort_unstable();
        numbers.dedup();
        Ok(NumberPool { numbers })
    }

    /// Pool of `1..=n`.
    pub fn range(n: u32) -> Self {
        NumberPool {
            numbers: (1..=n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn numbers(&self) -> &[u32] {
        &self.numbers
    }

    pub fn contains(&self, value: u32) -> bool {
        self.numbers.binary_search(&value).is_ok()
    }

    pub fn index_of(&self, value: u32) -> Option<usize> {
        self.numbers.binary_search(&value).ok()
    }

    /// Value at a pool index. Panics on an out-of-range index.
    pub fn value(&self, index: usize) -> u32 {
        self.numbers[index]
    }

    /// Map ascending pool indices to their values.
    pub fn values_of(&self, indices: &[u16]) -> Vec<u32> {
        indices.iter().map(|&i| self.numbers[i as usize]).collect()
    }

    pub fn combination_of(&self, indices: &[u16]) -> Combination {
        Combination {
            numbers: self.values_of(indices),
        }
    }
}

/// A ticket: distinct numbers in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combination {
    numbers: Vec<u32>,
}

impl Combination {
    /// Canonicalize: sort ascending and drop duplicates.
    pub fn new(mut numbers: Vec<u32>) -> Self {
        numbers.sort_unstable();
        numbers.dedup();
        Combination { numbers }
    }

    pub fn numbers(&self) -> &[u32] {
        &self.numbers
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn contains(&self, value: u32) -> bool {
        self.numbers.binary_search(&value).is_ok()
    }
}

impl From<Combination> for Vec<u32> {
    fn from(c: Combination) -> Self {
        c.numbers
    }
}

/// Longest run of consecutive integers in an ascending slice.
pub fn longest_run(sorted: &[u32]) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    let mut best = 1;
    let mut run = 1;
    for w in sorted.windows(2) {
        if w[1] == w[0] + 1 {
            run += 1;
            best = best.max(run);
        } else {
            run = 1;
        }
    }
    best
}
