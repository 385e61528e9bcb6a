//! # Candidates — The Ticket Space an Optimizer Chooses From
//!
//! Candidates are the draw-width subsets of the pool that pass the validator.
//!
//! A [`TicketLattice`] counts, walks and samples the ascending tickets that
//! satisfy the positional rules (fixed positions, global or per-ball ranges),
//! contain every forced number and respect the group limits. Its table holds
//! `ways(i, j, g)`: the number of ways to fill positions `j..w` from pool
//! indices `i..n` given group counts `g`. Only the sequential rule is left to
//! the validator, so the count is exact up to that rule and narrow rule sets
//! on large pools stay small.
//!
//! Spaces of at most `max_candidates` tickets are enumerated once into a
//! flat `u16` buffer (one ticket per `draw_width` entries), in lexicographic
//! order. Larger spaces are sampled uniformly from the lattice and validated
//! on the fly.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::ops::ControlFlow;
use tracing::debug;

use crate::constraints::{ConstraintViolation, Validator};
use crate::error::OptimizerError;
use crate::pool::NumberPool;

/// Draws attempted per requested ticket before a sampled space gives up.
const SAMPLE_TRIES_PER_TICKET: usize = 20;

/// Draws spent proving a sampled space holds at least one valid ticket.
const PROBE_DRAWS: usize = 20_000;

/// Table size above which group counts are left to the validator.
const MAX_LATTICE_STATES: usize = 1 << 22;

/// Pool indices of the validator's forced numbers, ascending.
fn forced_indices(pool: &NumberPool, validator: &Validator) -> Vec<u16> {
    let mut forced: Vec<u16> = validator
        .forced()
        .iter()
        .filter_map(|&v| pool.index_of(v))
        .map(|i| i as u16)
        .collect();
    forced.sort_unstable();
    forced
}

/// Counting table over the tickets that satisfy every rule but the
/// sequential one.
#[derive(Debug, Clone)]
pub struct TicketLattice {
    n: usize,
    width: usize,
    /// `allowed[j * n + i]`: pool index `i` may sit at position `j`.
    allowed: Vec<bool>,
    forced: Vec<bool>,
    /// `forced_from[i]`: some forced index is `>= i`.
    forced_from: Vec<bool>,
    /// Tracked group slot of each pool index.
    group: Vec<Option<usize>>,
    limits: [usize; 3],
    strides: [usize; 3],
    states: usize,
    ways: Vec<u64>,
}

impl TicketLattice {
    pub fn new(pool: &NumberPool, validator: &Validator) -> Self {
        let n = pool.len();
        let width = validator.draw_width();

        let mut allowed = vec![false; width * n];
        for j in 0..width {
            for i in 0..n {
                allowed[j * n + i] = validator.allows_at(j, pool.value(i));
            }
        }

        let mut forced = vec![false; n];
        for i in forced_indices(pool, validator) {
            forced[i as usize] = true;
        }
        let mut forced_from = vec![false; n + 1];
        for i in (0..n).rev() {
            forced_from[i] = forced[i] || forced_from[i + 1];
        }

        let mut group = vec![None; n];
        let mut limits = [0usize; 3];
        let mut tracked = [false; 3];
        for (i, slot) in group.iter_mut().enumerate() {
            if let Some((label, limit)) = validator.limited_group(pool.value(i)) {
                let s = label.slot();
                *slot = Some(s);
                limits[s] = limit.min(width);
                tracked[s] = true;
            }
        }
        let mut strides = [0usize; 3];
        let mut states = 1usize;
        for s in 0..3 {
            if tracked[s] {
                strides[s] = states;
                states *= limits[s] + 1;
            }
        }
        if (n + 1) * (width + 1) * states > MAX_LATTICE_STATES {
            // Too many group states: count without quotas.
            group = vec![None; n];
            states = 1;
        }

        let mut lattice = TicketLattice {
            n,
            width,
            allowed,
            forced,
            forced_from,
            group,
            limits,
            strides,
            states,
            ways: vec![0; (n + 1) * (width + 1) * states],
        };
        lattice.fill();
        lattice
    }

    fn at(&self, i: usize, j: usize, g: usize) -> usize {
        (i * (self.width + 1) + j) * self.states + g
    }

    fn ways(&self, i: usize, j: usize, g: usize) -> u64 {
        self.ways[self.at(i, j, g)]
    }

    /// Group state after placing pool index `i` at position `j`, if allowed.
    fn step(&self, i: usize, j: usize, g: usize) -> Option<usize> {
        if !self.allowed[j * self.n + i] {
            return None;
        }
        match self.group[i] {
            Some(s) => {
                let count = (g / self.strides[s]) % (self.limits[s] + 1);
                (count < self.limits[s]).then(|| g + self.strides[s])
            }
            None => Some(g),
        }
    }

    fn fill(&mut self) {
        for i in (0..=self.n).rev() {
            for j in (0..=self.width).rev() {
                for g in 0..self.states {
                    let ways = if j == self.width {
                        u64::from(!self.forced_from[i])
                    } else if i == self.n {
                        0
                    } else {
                        let take = self.step(i, j, g).map_or(0, |next| self.ways(i + 1, j + 1, next));
                        let skip = if self.forced[i] { 0 } else { self.ways(i + 1, j, g) };
                        take.saturating_add(skip)
                    };
                    let at = self.at(i, j, g);
                    self.ways[at] = ways;
                }
            }
        }
    }

    /// Tickets in the lattice, saturating at `u64::MAX`.
    pub fn count(&self) -> u64 {
        self.ways(0, 0, 0)
    }

    /// Visit every ticket in lexicographic order until `visit` breaks.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&[u16]) -> ControlFlow<()>,
    {
        let mut ticket = Vec::with_capacity(self.width);
        let _ = self.walk(0, 0, 0, &mut ticket, &mut visit);
    }

    fn walk<F>(&self, start: usize, j: usize, g: usize, ticket: &mut Vec<u16>, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&[u16]) -> ControlFlow<()>,
    {
        if j == self.width {
            return visit(ticket.as_slice());
        }
        for i in start..self.n {
            if let Some(next) = self.step(i, j, g) {
                if self.ways(i + 1, j + 1, next) > 0 {
                    ticket.push(i as u16);
                    self.walk(i + 1, j + 1, next, ticket, visit)?;
                    ticket.pop();
                }
            }
            // A forced index cannot be skipped.
            if self.forced[i] {
                break;
            }
        }
        ControlFlow::Continue(())
    }

    /// One ticket drawn uniformly from the lattice; `None` when it is empty.
    pub fn sample(&self, rng: &mut StdRng) -> Option<Vec<u16>> {
        let mut ticket = Vec::with_capacity(self.width);
        let (mut j, mut g) = (0, 0);
        for i in 0..self.n {
            if j == self.width {
                break;
            }
            let next = self.step(i, j, g);
            let take = next.map_or(0, |ng| self.ways(i + 1, j + 1, ng));
            let skip = if self.forced[i] { 0 } else { self.ways(i + 1, j, g) };
            let total = take.saturating_add(skip);
            if total == 0 {
                return None;
            }
            if let Some(ng) = next.filter(|_| rng.random_range(0..total) < take) {
                ticket.push(i as u16);
                j += 1;
                g = ng;
            }
        }
        (ticket.len() == self.width).then_some(ticket)
    }
}

/// Tickets the enumeration rejected, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateStats {
    pub scanned: u64,
    pub rejected: u64,
    pub sequential_rejected: u64,
}

#[derive(Debug, Clone)]
enum Space {
    Enumerated { flat: Vec<u16> },
    Sampled { lattice: TicketLattice },
}

/// Valid tickets for one pool and rule set.
#[derive(Debug, Clone)]
pub struct CandidateSpace {
    pool: NumberPool,
    validator: Validator,
    width: usize,
    /// Lattice count: tickets passing every rule but the sequential one.
    estimate: u64,
    space: Space,
    stats: CandidateStats,
}

impl CandidateSpace {
    /// Enumerate the space when it holds at most `max_candidates` tickets,
    /// otherwise prepare to sample it.
    pub fn build(
        pool: &NumberPool,
        validator: &Validator,
        max_candidates: u64,
    ) -> Result<Self, OptimizerError> {
        let width = validator.draw_width();
        if pool.len() < width {
            return Err(OptimizerError::InsufficientPool {
                pool: pool.len(),
                draw_width: width,
            });
        }
        let lattice = TicketLattice::new(pool, validator);
        let estimate = lattice.count();
        if estimate == 0 {
            return Err(OptimizerError::ConstraintUnsatisfiable(
                "no ticket satisfies the position, range, forced-number and group rules together".into(),
            ));
        }

        let mut stats = CandidateStats::default();
        let space = if estimate <= max_candidates {
            let mut flat = Vec::new();
            lattice.for_each(|ticket| {
                stats.scanned += 1;
                match validator.check(&pool.values_of(ticket)) {
                    Ok(()) => flat.extend_from_slice(ticket),
                    Err(ConstraintViolation::Sequential { .. }) => {
                        stats.rejected += 1;
                        stats.sequential_rejected += 1;
                    }
                    Err(_) => stats.rejected += 1,
                }
                ControlFlow::Continue(())
            });
            if flat.is_empty() {
                return Err(OptimizerError::ConstraintUnsatisfiable(format!(
                    "none of the {} possible tickets satisfies the constraints",
                    stats.scanned
                )));
            }
            Space::Enumerated { flat }
        } else {
            Space::Sampled { lattice }
        };

        let built = CandidateSpace {
            pool: pool.clone(),
            validator: validator.clone(),
            width,
            estimate,
            space,
            stats,
        };

        if !built.is_enumerated() {
            let mut rng = StdRng::seed_from_u64(estimate);
            let found = (0..PROBE_DRAWS).any(|_| built.draw_one(&mut rng).is_some());
            if !found {
                return Err(OptimizerError::ConstraintUnsatisfiable(format!(
                    "no valid ticket found in {} random draws",
                    PROBE_DRAWS
                )));
            }
        }

        debug!(
            kind = built.kind_name(),
            estimate,
            valid = ?built.len(),
            rejected = stats.rejected,
            "candidate space ready"
        );
        Ok(built)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    pub fn stats(&self) -> CandidateStats {
        self.stats
    }

    pub fn is_enumerated(&self) -> bool {
        matches!(self.space, Space::Enumerated { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self.space {
            Space::Enumerated { .. } => "enumerated",
            Space::Sampled { .. } => "sampled",
        }
    }

    /// Valid tickets in an enumerated space; `None` when sampled.
    pub fn len(&self) -> Option<usize> {
        match &self.space {
            Space::Enumerated { flat } => Some(flat.len() / self.width),
            Space::Sampled { .. } => None,
        }
    }

    /// Ticket `i` of an enumerated space, in lexicographic order.
    pub fn get(&self, i: usize) -> Option<&[u16]> {
        match &self.space {
            Space::Enumerated { flat } => flat.get(i * self.width..(i + 1) * self.width),
            Space::Sampled { .. } => None,
        }
    }

    /// All tickets of an enumerated space, lexicographic; empty when sampled.
    pub fn tickets(&self) -> std::slice::ChunksExact<'_, u16> {
        match &self.space {
            Space::Enumerated { flat } => flat.chunks_exact(self.width),
            Space::Sampled { .. } => {
                let empty: &'static [u16] = &[];
                empty.chunks_exact(self.width)
            }
        }
    }

    /// One uniformly drawn valid ticket, or `None` if the draw failed validation.
    pub fn draw_one(&self, rng: &mut StdRng) -> Option<Vec<u16>> {
        match &self.space {
            Space::Enumerated { flat } => {
                let n = flat.len() / self.width;
                let i = rng.random_range(0..n);
                Some(flat[i * self.width..(i + 1) * self.width].to_vec())
            }
            Space::Sampled { lattice } => {
                let ticket = lattice.sample(rng)?;
                self.validator
                    .check(&self.pool.values_of(&ticket))
                    .is_ok()
                    .then_some(ticket)
            }
        }
    }

    /// Up to `count` valid tickets, appended flat to `out`. An enumerated space
    /// yields distinct tickets; a sampled one may repeat. Returns how many were
    /// drawn.
    pub fn sample_into(&self, rng: &mut StdRng, count: usize, out: &mut Vec<u16>) -> usize {
        out.clear();
        match &self.space {
            Space::Enumerated { flat } => {
                let n = flat.len() / self.width;
                let take = count.min(n);
                for i in index::sample(rng, n, take) {
                    out.extend_from_slice(&flat[i * self.width..(i + 1) * self.width]);
                }
                take
            }
            Space::Sampled { .. } => {
                let mut drawn = 0;
                let mut tries = 0;
                let max_tries = count.saturating_mul(SAMPLE_TRIES_PER_TICKET);
                while drawn < count && tries < max_tries {
                    tries += 1;
                    if let Some(t) = self.draw_one(rng) {
                        out.extend_from_slice(&t);
                        drawn += 1;
                    }
                }
                drawn
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{Constraints, GroupLabel, SequentialPolicy, ValueRange};

    fn space(pool: &NumberPool, c: &Constraints, max: u64) -> Result<CandidateSpace, OptimizerError> {
        let (v, _) = Validator::new(c, pool, 5)?;
        CandidateSpace::build(pool, &v, max)
    }

    fn lattice(pool: &NumberPool, c: &Constraints) -> TicketLattice {
        let (v, _) = Validator::new(c, pool, 5).unwrap();
        TicketLattice::new(pool, &v)
    }

    #[test]
    fn lattice_walk_with_forced_is_lexicographic() {
        let pool = NumberPool::range(6);
        let c = Constraints {
            forced_numbers: [1, 3].into_iter().collect(),
            ..Default::default()
        };
        let l = lattice(&pool, &c);
        assert_eq!(l.count(), 4);
        let mut all = Vec::new();
        l.for_each(|t| {
            all.push(t.to_vec());
            ControlFlow::Continue(())
        });
        assert_eq!(all.len(), 4);
        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);
        assert!(all.iter().all(|t| t.contains(&0) && t.contains(&2) && t.len() == 5));
    }

    #[test]
    fn lattice_walk_stops_on_break() {
        let l = lattice(&NumberPool::range(10), &Constraints::default());
        let mut seen = 0;
        l.for_each(|_| {
            seen += 1;
            if seen == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(seen, 3);
    }

    #[test]
    fn lattice_counts_group_quotas() {
        let pool = NumberPool::range(10);
        let mut c = Constraints::default();
        c.groups.insert(GroupLabel::A, (1..=5).collect());
        c.group_limits.insert(GroupLabel::A, 1);
        // One of 1..=5 with four of 6..=10, or none of 1..=5.
        assert_eq!(lattice(&pool, &c).count(), 5 * 5 + 1);
    }

    #[test]
    fn lattice_samples_stay_inside_the_rules() {
        let pool = NumberPool::range(60);
        let mut c = Constraints {
            forced_numbers: [30].into_iter().collect(),
            ..Default::default()
        };
        c.fixed_positions.insert(4, [55, 58].into_iter().collect());
        let (v, _) = Validator::new(&c, &pool, 5).unwrap();
        let l = TicketLattice::new(&pool, &v);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let t = l.sample(&mut rng).unwrap();
            assert!(v.check(&pool.values_of(&t)).is_ok(), "{:?}", t);
        }
    }

    #[test]
    fn narrow_range_on_a_large_pool_is_enumerated() {
        let pool = NumberPool::range(99);
        let c = Constraints {
            global_range: ValueRange {
                min: Some(90),
                max: None,
            },
            ..Default::default()
        };
        let s = space(&pool, &c, 100_000).unwrap();
        assert!(s.is_enumerated());
        assert_eq!(s.estimate(), 252);
        assert_eq!(s.len(), Some(252));
        assert!(s.tickets().all(|t| t.iter().all(|&i| pool.value(i as usize) >= 90)));
    }

    #[test]
    fn fixed_first_position_on_a_large_pool_is_enumerated() {
        let pool = NumberPool::range(99);
        let mut c = Constraints::default();
        c.fixed_positions.insert(0, [90].into_iter().collect());
        let s = space(&pool, &c, 100_000).unwrap();
        assert!(s.is_enumerated());
        // 90 first, four of 91..=99 after it.
        assert_eq!(s.len(), Some(126));
        assert!(s.tickets().all(|t| pool.value(t[0] as usize) == 90));
    }

    #[test]
    fn narrow_space_above_the_cap_is_sampled_not_rejected() {
        let pool = NumberPool::range(99);
        let c = Constraints {
            global_range: ValueRange {
                min: Some(90),
                max: None,
            },
            ..Default::default()
        };
        let s = space(&pool, &c, 100).unwrap();
        assert!(!s.is_enumerated());
        let mut rng = StdRng::seed_from_u64(11);
        let t = s.draw_one(&mut rng).unwrap();
        assert!(t.iter().all(|&i| pool.value(i as usize) >= 90));
    }

    #[test]
    fn enumerates_every_ticket_without_constraints() {
        let pool = NumberPool::range(8);
        let s = space(&pool, &Constraints::default(), 1_000_000).unwrap();
        assert!(s.is_enumerated());
        assert_eq!(s.len(), Some(56));
        assert_eq!(s.get(0), Some(&[0u16, 1, 2, 3, 4][..]));
        assert_eq!(s.tickets().count(), 56);
    }

    #[test]
    fn sequential_rejections_are_counted() {
        let pool = NumberPool::range(7);
        let c = Constraints {
            sequential: SequentialPolicy::Reject,
            ..Default::default()
        };
        let s = space(&pool, &c, 1_000_000).unwrap();
        // 1-5, 2-6 and 3-7 are fully consecutive.
        assert_eq!(s.stats().sequential_rejected, 3);
        assert_eq!(s.len(), Some(21 - 3));
    }

    #[test]
    fn empty_enumeration_is_unsatisfiable() {
        let pool = NumberPool::range(5);
        let c = Constraints {
            sequential: SequentialPolicy::Reject,
            ..Default::default()
        };
        assert!(matches!(
            space(&pool, &c, 1_000_000),
            Err(OptimizerError::ConstraintUnsatisfiable(_))
        ));
    }

    #[test]
    fn large_space_is_sampled_and_draws_are_valid() {
        let pool = NumberPool::range(40);
        let c = Constraints {
            forced_numbers: [7].into_iter().collect(),
            ..Default::default()
        };
        let s = space(&pool, &c, 1000).unwrap();
        assert!(!s.is_enumerated());
        assert_eq!(s.len(), None);
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = Vec::new();
        let n = s.sample_into(&mut rng, 50, &mut out);
        assert_eq!(n, 50);
        for t in out.chunks_exact(5) {
            assert!(t.windows(2).all(|w| w[0] < w[1]));
            assert!(t.contains(&6), "forced 7 sits at pool index 6");
        }
    }

    #[test]
    fn enumerated_sample_is_distinct_and_capped() {
        let pool = NumberPool::range(6);
        let s = space(&pool, &Constraints::default(), 1_000_000).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let mut out = Vec::new();
        assert_eq!(s.sample_into(&mut rng, 100, &mut out), 6);
        let mut tickets: Vec<&[u16]> = out.chunks_exact(5).collect();
        tickets.sort();
        tickets.dedup();
        assert_eq!(tickets.len(), 6);
    }

    #[test]
    fn small_pool_is_insufficient() {
        let pool = NumberPool::range(4);
        assert!(matches!(
            space(&pool, &Constraints::default(), 10),
            Err(OptimizerError::InsufficientPool {
                pool: 4,
                draw_width: 5
            })
        ));
    }
}
