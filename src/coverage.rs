//! # Coverage — Covered-Subset Bookkeeping and Marginal Gain
//!
//! A `CoverageSet` is a bitset over universe ranks plus a running count. The
//! optimizer owns one per pass; evaluation functions only read it.
//!
//! `CoverageEvaluator` precomputes, for the configured draw width `w` and
//! subset size `k`, the `C(w, k)` position patterns that pick each k-subset
//! out of a ticket, so the marginal gain of a ticket is `C(w, k)` rank
//! computations and bit probes (10 for 5-number tickets and triplets).
//!
//! Combinations supplied by callers may contain numbers outside the pool;
//! subsets touching such numbers are not part of the universe and are ignored.

use crate::pool::{Combination, NumberPool};
use crate::universe::{IndexCombinations, Universe};

/// Set of covered universe ranks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageSet {
    bits: Vec<u64>,
    covered: usize,
    total: usize,
}

impl CoverageSet {
    pub fn new(total: usize) -> Self {
        CoverageSet {
            bits: vec![0; total.div_ceil(64)],
            covered: 0,
            total,
        }
    }

    #[inline]
    pub fn contains(&self, rank: usize) -> bool {
        self.bits[rank / 64] & (1u64 << (rank % 64)) != 0
    }

    /// Mark a rank covered; returns true if it was newly covered.
    #[inline]
    pub fn insert(&mut self, rank: usize) -> bool {
        let word = &mut self.bits[rank / 64];
        let mask = 1u64 << (rank % 64);
        if *word & mask != 0 {
            return false;
        }
        *word |= mask;
        self.covered += 1;
        true
    }

    pub fn covered(&self) -> usize {
        self.covered
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.covered == self.total
    }

    /// Covered fraction in `[0, 1]`; an empty universe counts as 0.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.covered as f64 / self.total as f64
    }

    /// Ranks not yet covered, ascending.
    pub fn uncovered(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.total).filter(move |&r| !self.contains(r))
    }
}

/// Ticket-level coverage arithmetic for one pool, draw width and subset size.
#[derive(Debug, Clone)]
pub struct CoverageEvaluator {
    universe: Universe,
    width: usize,
    /// Flattened `C(width, k)` position patterns, `k` entries each.
    patterns: Vec<u8>,
}

impl CoverageEvaluator {
    pub fn new(universe: Universe, width: usize) -> Self {
        let k = universe.k();
        let patterns = IndexCombinations::new(width, k)
            .flat_map(|p| p.into_iter().map(|i| i as u8))
            .collect();
        CoverageEvaluator {
            universe,
            width,
            patterns,
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// k-subsets contained in one full-width ticket.
    pub fn subsets_per_ticket(&self) -> usize {
        self.patterns.len() / self.universe.k()
    }

    pub fn empty_set(&self) -> CoverageSet {
        CoverageSet::new(self.universe.len())
    }

    /// Universe ranks of the k-subsets of a full-width ticket.
    #[inline]
    pub fn ranks<'a>(&'a self, ticket: &'a [u16]) -> impl Iterator<Item = usize> + 'a {
        debug_assert_eq!(ticket.len(), self.width);
        self.patterns
            .chunks_exact(self.universe.k())
            .map(move |p| self.universe.rank_pattern(ticket, p))
    }

    /// New subsets a full-width ticket (pool indices) would add.
    #[inline]
    pub fn gain(&self, ticket: &[u16], covered: &CoverageSet) -> usize {
        self.ranks(ticket).filter(|&r| !covered.contains(r)).count()
    }

    /// Add a ticket's subsets to `covered`; returns how many were new.
    pub fn apply(&self, ticket: &[u16], covered: &mut CoverageSet) -> usize {
        let mut added = 0;
        for r in self.ranks(ticket) {
            if covered.insert(r) {
                added += 1;
            }
        }
        added
    }

    /// Sum of per-subset weights over a ticket's subsets.
    pub fn weight(&self, ticket: &[u16], weights: &[u32]) -> u64 {
        self.ranks(ticket).map(|r| weights[r] as u64).sum()
    }

    /// Marginal gain of an arbitrary combination against `covered`.
    pub fn marginal_gain(
        &self,
        pool: &NumberPool,
        candidate: &Combination,
        covered: &CoverageSet,
    ) -> usize {
        marginal_gain(candidate, covered, pool, &self.universe)
    }

    /// Coverage ratio of a system of combinations.
    pub fn coverage(&self, pool: &NumberPool, system: &[Combination]) -> f64 {
        coverage(system, pool, &self.universe)
    }

    /// Coverage set of whole tickets given as pool indices.
    pub fn covered_by(&self, system: &[Vec<u16>]) -> CoverageSet {
        let mut covered = self.empty_set();
        for ticket in system {
            self.apply(ticket, &mut covered);
        }
        covered
    }
}

/// Universe ranks of every k-subset of a combination that lies inside the pool.
pub fn subset_ranks(candidate: &Combination, pool: &NumberPool, universe: &Universe) -> Vec<usize> {
    let inside: Vec<u16> = candidate
        .numbers()
        .iter()
        .filter_map(|&v| pool.index_of(v))
        .map(|i| i as u16)
        .collect();
    IndexCombinations::new(inside.len(), universe.k())
        .map(|pick| {
            let sub: Vec<u16> = pick.into_iter().map(|p| inside[p]).collect();
            universe.rank(&sub)
        })
        .collect()
}

/// How many *new* subsets `candidate` would add to `covered`.
pub fn marginal_gain(
    candidate: &Combination,
    covered: &CoverageSet,
    pool: &NumberPool,
    universe: &Universe,
) -> usize {
    subset_ranks(candidate, pool, universe)
        .into_iter()
        .filter(|&r| !covered.contains(r))
        .count()
}

/// Fraction of the universe covered by `system`; 0 for an empty system or universe.
pub fn coverage(system: &[Combination], pool: &NumberPool, universe: &Universe) -> f64 {
    let mut covered = CoverageSet::new(universe.len());
    for c in system {
        for r in subset_ranks(c, pool, universe) {
            covered.insert(r);
        }
    }
    covered.ratio()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator(n: usize) -> CoverageEvaluator {
        CoverageEvaluator::new(Universe::new(n, 3).unwrap(), 5)
    }

    #[test]
    fn empty_system_has_zero_coverage() {
        let pool = NumberPool::range(8);
        let u = Universe::new(8, 3).unwrap();
        assert_eq!(coverage(&[], &pool, &u), 0.0);
    }

    #[test]
    fn empty_universe_ratio_is_zero_not_nan() {
        let s = CoverageSet::new(0);
        assert_eq!(s.ratio(), 0.0);
        assert!(s.is_complete());
    }

    #[test]
    fn single_ticket_covers_ten_triplets() {
        let pool = NumberPool::range(6);
        let ev = evaluator(6);
        let c = Combination::new(vec![1, 2, 3, 4, 5]);
        let ratio = ev.coverage(&pool, &[c]);
        assert!((ratio - 10.0 / 20.0).abs() < 1e-12);
        assert_eq!(ev.subsets_per_ticket(), 10);
    }

    #[test]
    fn gain_drops_after_apply() {
        let ev = evaluator(10);
        let mut covered = ev.empty_set();
        let a: [u16; 5] = [0, 1, 2, 3, 4];
        let b: [u16; 5] = [0, 1, 2, 5, 6];
        assert_eq!(ev.gain(&a, &covered), 10);
        assert_eq!(ev.apply(&a, &mut covered), 10);
        assert_eq!(ev.gain(&a, &covered), 0);
        // b shares the triplet {0,1,2} with a
        assert_eq!(ev.gain(&b, &covered), 9);
    }

    #[test]
    fn marginal_gain_matches_fast_path() {
        let pool = NumberPool::range(10);
        let ev = evaluator(10);
        let mut covered = ev.empty_set();
        ev.apply(&[0, 1, 2, 3, 4], &mut covered);
        let c = Combination::new(vec![1, 2, 3, 6, 7]);
        assert_eq!(ev.marginal_gain(&pool, &c, &covered), ev.gain(&[0, 1, 2, 5, 6], &covered));
    }

    #[test]
    fn numbers_outside_pool_are_ignored() {
        let pool = NumberPool::new(&[1, 2, 3, 4, 5, 6], 99).unwrap();
        let u = Universe::new(6, 3).unwrap();
        // Only {1,2,3} lies fully inside the pool.
        let c = Combination::new(vec![1, 2, 3, 50, 60]);
        assert_eq!(subset_ranks(&c, &pool, &u).len(), 1);
        assert!((coverage(&[c], &pool, &u) - 1.0 / 20.0).abs() < 1e-12);
    }

    #[test]
    fn uncovered_lists_missing_ranks() {
        let mut s = CoverageSet::new(5);
        s.insert(1);
        s.insert(3);
        assert!(!s.insert(3));
        assert_eq!(s.uncovered().collect::<Vec<_>>(), vec![0, 2, 4]);
        assert_eq!(s.covered(), 2);
    }

    #[test]
    fn weight_sums_subset_weights() {
        let ev = evaluator(6);
        let weights = vec![1u32; 20];
        assert_eq!(ev.weight(&[0, 1, 2, 3, 4], &weights), 10);
    }
}
