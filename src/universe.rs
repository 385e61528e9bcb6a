//! # Universe — k-Subset Enumeration and Ranking
//!
//! The coverage universe of a pool is the set of all its k-subsets (k = 3 for
//! triplets). It is never materialized inside the optimizer: a k-subset of
//! pool indices `c₀ < c₁ < … < c_{k-1}` is identified by its colexicographic
//! rank
//!
//! ```text
//! rank = C(c₀, 1) + C(c₁, 2) + … + C(c_{k-1}, k)
//! ```
//!
//! which is a bijection onto `0..C(n, k)` (combinatorial number system). A
//! coverage set is then a bitset over ranks.
//!
//! `IndexCombinations` yields index subsets in ascending lexicographic order
//! and backs both the universe listing (`build_universe`) and candidate
//! enumeration.

use crate::error::OptimizerError;
use crate::pool::{Combination, NumberPool};

/// Lexicographic iterator over the k-subsets of `0..n`.
#[derive(Debug, Clone)]
pub struct IndexCombinations {
    n: usize,
    k: usize,
    current: Vec<usize>,
    done: bool,
}

impl IndexCombinations {
    pub fn new(n: usize, k: usize) -> Self {
        IndexCombinations {
            n,
            k,
            current: (0..k).collect(),
            done: k > n,
        }
    }
}

impl Iterator for IndexCombinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let out = self.current.clone();

        // Advance: bump the rightmost slot that still has room, reset the tail.
        let (n, k) = (self.n, self.k);
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.current[i] < n - k + i {
                self.current[i] += 1;
                for j in i + 1..k {
                    self.current[j] = self.current[j - 1] + 1;
                }
                break;
            }
        }
        Some(out)
    }
}

/// Ranking context for the k-subsets of an n-element pool.
#[derive(Debug, Clone)]
pub struct Universe {
    n: usize,
    k: usize,
    len: usize,
    /// Row-major `(n + 1) × (k + 1)` table of binomial coefficients.
    binom: Vec<usize>,
}

impl Universe {
    pub fn new(n: usize, k: usize) -> Result<Self, OptimizerError> {
        if k == 0 {
            return Err(OptimizerError::InvalidPool(
                "subset size must be at least 1".into(),
            ));
        }
        if n < k {
            return Err(OptimizerError::InvalidPool(format!(
                "pool of {} numbers cannot form {}-number subsets",
                n, k
            )));
        }
        let width = k + 1;
        let mut binom = vec![0usize; (n + 1) * width];
        for i in 0..=n {
            binom[i * width] = 1;
            for j in 1..=k.min(i) {
                let above = if j <= i - 1 { binom[(i - 1) * width + j] } else { 0 };
                binom[i * width + j] = binom[(i - 1) * width + j - 1] + above;
            }
        }
        let len = binom[n * width + k];
        Ok(Universe { n, k, len, binom })
    }

    /// Number of k-subsets, `C(n, k)`.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Subset size k.
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    fn choose(&self, i: usize, j: usize) -> usize {
        self.binom[i * (self.k + 1) + j]
    }

    /// Colex rank of an ascending k-subset of pool indices.
    #[inline]
    pub fn rank(&self, subset: &[u16]) -> usize {
        debug_assert_eq!(subset.len(), self.k);
        subset
            .iter()
            .enumerate()
            .map(|(i, &c)| self.choose(c as usize, i + 1))
            .sum()
    }

    /// Rank of the subset picked out of `indices` by the positions in `pattern`.
    #[inline]
    pub(crate) fn rank_pattern(&self, indices: &[u16], pattern: &[u8]) -> usize {
        pattern
            .iter()
            .enumerate()
            .map(|(i, &p)| self.choose(indices[p as usize] as usize, i + 1))
            .sum()
    }

    /// All k-subsets of pool indices, lexicographic.
    pub fn iter(&self) -> IndexCombinations {
        IndexCombinations::new(self.n, self.k)
    }
}

/// Every k-subset of the pool as canonical combinations, ascending
/// lexicographic by value.
pub fn build_universe(pool: &NumberPool, k: usize) -> Result<Vec<Combination>, OptimizerError> {
    let universe = Universe::new(pool.len(), k)?;
    Ok(universe
        .iter()
        .map(|idx| Combination::new(idx.into_iter().map(|i| pool.value(i)).collect()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binomial;

    #[test]
    fn index_combinations_lexicographic() {
        let all: Vec<Vec<usize>> = IndexCombinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
    }

    #[test]
    fn index_combinations_edge_sizes() {
        assert_eq!(IndexCombinations::new(3, 4).count(), 0);
        assert_eq!(IndexCombinations::new(5, 5).count(), 1);
        assert_eq!(IndexCombinations::new(3, 0).count(), 1);
        assert_eq!(IndexCombinations::new(10, 3).count(), 120);
    }

    #[test]
    fn universe_size_matches_binomial() {
        for n in 3..=30 {
            let u = Universe::new(n, 3).unwrap();
            assert_eq!(u.len() as u64, binomial(n as u64, 3), "n={}", n);
        }
    }

    #[test]
    fn rank_is_bijection() {
        let u = Universe::new(9, 3).unwrap();
        let mut seen = vec![false; u.len()];
        for idx in u.iter() {
            let sub: Vec<u16> = idx.iter().map(|&i| i as u16).collect();
            let r = u.rank(&sub);
            assert!(r < u.len());
            assert!(!seen[r], "rank {} produced twice", r);
            seen[r] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn rank_pattern_matches_rank() {
        let u = Universe::new(12, 3).unwrap();
        let ticket: [u16; 5] = [1, 4, 5, 9, 11];
        let pattern: [u8; 3] = [0, 2, 4];
        assert_eq!(u.rank_pattern(&ticket, &pattern), u.rank(&[1, 5, 11]));
    }

    #[test]
    fn rejects_invalid_sizes() {
        assert!(matches!(
            Universe::new(2, 3),
            Err(OptimizerError::InvalidPool(_))
        ));
        assert!(matches!(
            Universe::new(5, 0),
            Err(OptimizerError::InvalidPool(_))
        ));
    }

    #[test]
    fn build_universe_lists_values_in_order() {
        let pool = NumberPool::new(&[7, 3, 11, 5], 99).unwrap();
        let u = build_universe(&pool, 3).unwrap();
        let as_vecs: Vec<Vec<u32>> = u.into_iter().map(Vec::from).collect();
        assert_eq!(
            as_vecs,
            vec![
                vec![3, 5, 7],
                vec![3, 5, 11],
                vec![3, 7, 11],
                vec![5, 7, 11]
            ]
        );
    }
}
