//! Historical-draw triplet frequencies.
//!
//! Past draws give every k-subset of the pool a weight: the number of draws
//! that contained it. The optimizer uses the summed weight of a ticket's
//! subsets to break ties between equal-gain candidates, and the budget top-up
//! orders filler tickets by it.

use crate::pool::NumberPool;
use crate::universe::{IndexCombinations, Universe};

/// Per-rank draw counts over one pool's universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripletHistory {
    weights: Vec<u32>,
    draws: usize,
}

impl TripletHistory {
    /// Count each universe subset across `draws`. Numbers outside the pool
    /// are skipped; duplicates within a draw count once.
    pub fn from_draws(draws: &[Vec<u32>], pool: &NumberPool, universe: &Universe) -> Self {
        let mut weights = vec![0u32; universe.len()];
        let k = universe.k();
        for draw in draws {
            let mut inside: Vec<u16> = draw
                .iter()
                .filter_map(|&v| pool.index_of(v))
                .map(|i| i as u16)
                .collect();
            inside.sort_unstable();
            inside.dedup();
            for pick in IndexCombinations::new(inside.len(), k) {
                let sub: Vec<u16> = pick.into_iter().map(|p| inside[p]).collect();
                let w = &mut weights[universe.rank(&sub)];
                *w = w.saturating_add(1);
            }
        }
        TripletHistory {
            weights,
            draws: draws.len(),
        }
    }

    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    pub fn draws(&self) -> usize {
        self.draws
    }

    /// Largest single-subset count.
    pub fn max_weight(&self) -> u32 {
        self.weights.iter().copied().max().unwrap_or(0)
    }
}
