//! # Greedy — Coverage Optimizer
//!
//! Builds a system of tickets one ticket at a time, each step taking the
//! candidate that adds the most uncovered subsets. Three strategies:
//!
//! - **classic**: every valid candidate is considered at every step. Marginal
//!   gains only ever shrink as coverage grows, so a max-heap of stale gains is
//!   an upper bound on the true ones; popping until the top entry's recomputed
//!   gain equals its key selects exactly what an exhaustive scan would, with
//!   ties going to the higher history weight and then the lexicographically
//!   smallest ticket.
//! - **fast**: each step scores a fresh random sample of candidates. A
//!   zero-gain sample is retried a few times; after that an enumerated space
//!   is scanned in full, while a sampled space gives up.
//! - **hybrid**: independent fast passes run in parallel on the rayon pool,
//!   each with its own seed; the best system (most subsets covered, then
//!   fewest tickets, then lowest attempt) is kept and redundant tickets are
//!   pruned from it.
//!
//! Every run stops at full coverage, when no candidate adds anything (or,
//! for a sampled space, when no sample does), or at the ticket cap, whichever
//! comes first. Budget runs may then top the system up to the cap with
//! unused valid tickets.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;
use tracing::{debug, info};

use crate::binomial;
use crate::candidates::{CandidateSpace, TicketLattice};
use crate::config::OptimizerConfig;
use crate::constraints::{Constraints, SequentialPolicy, Validator};
use crate::coverage::{CoverageEvaluator, CoverageSet};
use crate::error::OptimizerError;
use crate::history::TripletHistory;
use crate::pool::{Combination, NumberPool};
use crate::universe::Universe;

/// Golden-ratio stride between hybrid attempt seeds.
pub const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Largest universe a run will allocate coverage state for.
const MAX_UNIVERSE: u64 = 50_000_000;

/// Filler draws per missing ticket when topping up a sampled space.
const FILL_TRIES_PER_TICKET: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Classic,
    Fast,
    Hybrid,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Classic => "classic",
            Strategy::Fast => "fast",
            Strategy::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    FullCoverage,
    NoImprovement,
    SizeLimit,
    /// Random samples of a space too large to enumerate kept adding nothing;
    /// improving tickets may still exist.
    SampleExhausted,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::FullCoverage => "full_coverage",
            StopReason::NoImprovement => "no_improvement",
            StopReason::SizeLimit => "size_limit",
            StopReason::SampleExhausted => "sample_exhausted",
        }
    }
}

/// Strategy used when the caller names none: classic when the candidate
/// space left by the rules is small enough to enumerate, fast otherwise.
/// Rule sets that fail validation get classic; the run reports the error.
pub fn default_strategy(pool: &NumberPool, constraints: &Constraints, limits: &OptimizerConfig) -> Strategy {
    let Ok((validator, _)) = Validator::new(constraints, pool, limits.draw_width) else {
        return Strategy::Classic;
    };
    if TicketLattice::new(pool, &validator).count() <= limits.max_candidates {
        Strategy::Classic
    } else {
        Strategy::Fast
    }
}

/// Seed of hybrid attempt `attempt`.
pub fn attempt_seed(seed: u64, attempt: usize) -> u64 {
    seed.wrapping_add((attempt as u64).wrapping_mul(SEED_STRIDE))
}

/// Knobs for one optimizer run.
#[derive(Debug, Clone, PartialEq)]
pub struct GreedyParams {
    pub strategy: Strategy,
    pub attempts: usize,
    pub sample_size: usize,
    /// Random seed; drawn fresh (and reported) when absent.
    pub seed: Option<u64>,
    /// Hard cap on system size; `max_system_size` when absent.
    pub max_tickets: Option<usize>,
    /// Top the system up to `max_tickets` once greedy selection stops.
    pub fill: bool,
    /// Past draws for tie-breaking; ignored below `history_min_draws` rows.
    pub history: Vec<Vec<u32>>,
}

impl GreedyParams {
    pub fn new(strategy: Strategy, limits: &OptimizerConfig) -> Self {
        GreedyParams {
            strategy,
            attempts: limits.default_attempts,
            sample_size: limits.default_sample_size,
            seed: None,
            max_tickets: None,
            fill: false,
            history: Vec::new(),
        }
    }
}

/// Outcome of one run. `coverage` is the exact covered fraction in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageResult {
    pub system: Vec<Combination>,
    pub coverage: f64,
    pub covered: usize,
    pub total: usize,
    /// Uncovered subsets, lexicographic, capped at `uncovered_report_limit`.
    pub uncovered: Vec<Combination>,
    /// Strategy that actually ran.
    pub strategy: Strategy,
    pub attempts: usize,
    pub sample_size: usize,
    pub seed: u64,
    pub stop_reason: StopReason,
    pub candidate_space: &'static str,
    pub filled: usize,
    pub pruned: usize,
    pub warnings: Vec<String>,
}

struct Pass {
    tickets: Vec<Vec<u16>>,
    covered: CoverageSet,
    stop: StopReason,
}

/// Read-only state shared by every pass of a run.
struct Search<'a> {
    ev: &'a CoverageEvaluator,
    space: &'a CandidateSpace,
    weights: Option<&'a [u32]>,
    cap: usize,
}

impl Search<'_> {
    fn weight(&self, ticket: &[u16]) -> u64 {
        self.weights.map_or(0, |w| self.ev.weight(ticket, w))
    }

    fn stop_reason(&self, covered: &CoverageSet, size: usize) -> StopReason {
        if covered.is_complete() {
            StopReason::FullCoverage
        } else if size >= self.cap {
            StopReason::SizeLimit
        } else {
            StopReason::NoImprovement
        }
    }

    fn classic(&self) -> Pass {
        let full = self.ev.subsets_per_ticket();
        let mut heap: BinaryHeap<(usize, u64, Reverse<u32>)> = self
            .space
            .tickets()
            .enumerate()
            .map(|(i, t)| (full, self.weight(t), Reverse(i as u32)))
            .collect();

        let mut covered = self.ev.empty_set();
        let mut tickets = Vec::new();
        while tickets.len() < self.cap && !covered.is_complete() {
            let Some((bound, weight, Reverse(i))) = heap.pop() else {
                break;
            };
            let Some(ticket) = self.space.get(i as usize) else {
                continue;
            };
            let gain = self.ev.gain(ticket, &covered);
            if gain == 0 {
                continue;
            }
            if gain < bound {
                heap.push((gain, weight, Reverse(i)));
                continue;
            }
            self.ev.apply(ticket, &mut covered);
            tickets.push(ticket.to_vec());
        }
        let stop = self.stop_reason(&covered, tickets.len());
        Pass {
            tickets,
            covered,
            stop,
        }
    }

    /// Highest-gain ticket among `candidates`, ties to the heavier history
    /// weight and then the smaller ticket. `None` when nothing adds coverage.
    fn best_of<'t>(
        &self,
        candidates: impl Iterator<Item = &'t [u16]>,
        covered: &CoverageSet,
    ) -> Option<&'t [u16]> {
        let mut best: Option<(usize, u64, &[u16])> = None;
        for t in candidates {
            let gain = self.ev.gain(t, covered);
            if gain == 0 {
                continue;
            }
            let weight = self.weight(t);
            let better = match best {
                None => true,
                Some((bg, bw, bt)) => {
                    (gain, weight).cmp(&(bg, bw)).then_with(|| bt.cmp(t)) == Ordering::Greater
                }
            };
            if better {
                best = Some((gain, weight, t));
            }
        }
        best.map(|(_, _, t)| t)
    }

    /// Sampled greedy. Once `stall_retries` samples in a row add nothing, an
    /// enumerated space is scanned in full for the next ticket; a sampled
    /// space ends the pass with `SampleExhausted`.
    fn fast(&self, rng: &mut StdRng, sample_size: usize, stall_retries: usize) -> Pass {
        let mut covered = self.ev.empty_set();
        let mut tickets: Vec<Vec<u16>> = Vec::new();
        let mut sample = Vec::new();
        let mut stalls = 0;
        let mut exhausted = false;
        while tickets.len() < self.cap && !covered.is_complete() {
            self.space.sample_into(rng, sample_size, &mut sample);
            let mut pick = self.best_of(sample.chunks_exact(self.space.width()), &covered);
            if pick.is_none() {
                stalls += 1;
                if stalls <= stall_retries {
                    continue;
                }
                if !self.space.is_enumerated() {
                    exhausted = true;
                    break;
                }
                pick = self.best_of(self.space.tickets(), &covered);
                if pick.is_none() {
                    break;
                }
            }
            if let Some(t) = pick {
                stalls = 0;
                self.ev.apply(t, &mut covered);
                tickets.push(t.to_vec());
            }
        }
        let stop = match self.stop_reason(&covered, tickets.len()) {
            StopReason::NoImprovement if exhausted => StopReason::SampleExhausted,
            stop => stop,
        };
        Pass {
            tickets,
            covered,
            stop,
        }
    }

    fn hybrid(&self, seed: u64, attempts: usize, sample_size: usize, stall_retries: usize) -> Pass {
        let passes: Vec<(usize, Pass)> = (0..attempts)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(attempt_seed(seed, i));
                (i, self.fast(&mut rng, sample_size, stall_retries))
            })
            .collect();
        for (i, p) in &passes {
            debug!(
                attempt = i,
                covered = p.covered.covered(),
                size = p.tickets.len(),
                "hybrid attempt finished"
            );
        }
        passes
            .into_iter()
            .min_by(|(ia, a), (ib, b)| {
                b.covered
                    .covered()
                    .cmp(&a.covered.covered())
                    .then(a.tickets.len().cmp(&b.tickets.len()))
                    .then(ia.cmp(ib))
            })
            .map(|(_, p)| p)
            .unwrap_or_else(|| Pass {
                tickets: Vec::new(),
                covered: self.ev.empty_set(),
                stop: StopReason::NoImprovement,
            })
    }

    /// Fill up to the cap with unused valid tickets, heaviest history weight
    /// first, then lexicographic. Returns how many were added.
    fn top_up(&self, tickets: &mut Vec<Vec<u16>>, covered: &mut CoverageSet, rng: &mut StdRng) -> usize {
        let need = self.cap.saturating_sub(tickets.len());
        if need == 0 {
            return 0;
        }
        let mut used: HashSet<Vec<u16>> = tickets.iter().cloned().collect();
        let before = tickets.len();
        if self.space.is_enumerated() {
            let mut order: Vec<(u64, usize)> = self
                .space
                .tickets()
                .enumerate()
                .filter(|(_, t)| !used.contains(*t))
                .map(|(i, t)| (self.weight(t), i))
                .collect();
            order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
            for (_, i) in order.into_iter().take(need) {
                if let Some(t) = self.space.get(i) {
                    self.ev.apply(t, covered);
                    tickets.push(t.to_vec());
                }
            }
        } else {
            let mut tries = need.saturating_mul(FILL_TRIES_PER_TICKET);
            while tickets.len() < self.cap && tries > 0 {
                tries -= 1;
                if let Some(t) = self.space.draw_one(rng) {
                    if used.insert(t.clone()) {
                        self.ev.apply(&t, covered);
                        tickets.push(t);
                    }
                }
            }
        }
        tickets.len() - before
    }
}

/// Remove tickets whose every subset is also covered by another ticket,
/// newest first. Coverage is unchanged. Returns how many were removed.
pub fn prune_redundant(evaluator: &CoverageEvaluator, system: &mut Vec<Vec<u16>>) -> usize {
    let mut counts = vec![0u32; evaluator.universe().len()];
    for t in system.iter() {
        for r in evaluator.ranks(t) {
            counts[r] += 1;
        }
    }
    let mut keep = vec![true; system.len()];
    for i in (0..system.len()).rev() {
        if evaluator.ranks(&system[i]).all(|r| counts[r] >= 2) {
            for r in evaluator.ranks(&system[i]) {
                counts[r] -= 1;
            }
            keep[i] = false;
        }
    }
    let before = system.len();
    let mut flags = keep.into_iter();
    system.retain(|_| flags.next().unwrap_or(true));
    before - system.len()
}

fn uncovered_subsets(
    ev: &CoverageEvaluator,
    covered: &CoverageSet,
    pool: &NumberPool,
    limit: usize,
) -> Vec<Combination> {
    if covered.is_complete() || limit == 0 {
        return Vec::new();
    }
    let universe = ev.universe();
    universe
        .iter()
        .map(|idx| idx.into_iter().map(|i| i as u16).collect::<Vec<u16>>())
        .filter(|sub| !covered.contains(universe.rank(sub)))
        .take(limit)
        .map(|sub| pool.combination_of(&sub))
        .collect()
}

/// Run the optimizer over `pool` under `constraints`.
///
/// Input problems (pool too small, rules that admit no ticket, a cap of
/// zero) fail before any search work. A run either returns a complete result
/// or an error, never a partial system.
pub fn run_greedy(
    pool: &NumberPool,
    constraints: &Constraints,
    params: &GreedyParams,
    limits: &OptimizerConfig,
) -> Result<CoverageResult, OptimizerError> {
    let started = Instant::now();
    let width = limits.draw_width;
    if pool.len() < width {
        return Err(OptimizerError::InsufficientPool {
            pool: pool.len(),
            draw_width: width,
        });
    }
    match params.max_tickets {
        Some(0) => {
            return Err(OptimizerError::InvalidTicketCount(
                "ticket count must be at least 1".into(),
            ))
        }
        Some(n) if n > limits.max_system_size => {
            return Err(OptimizerError::InvalidTicketCount(format!(
                "ticket count {} exceeds the limit of {}",
                n, limits.max_system_size
            )))
        }
        _ => {}
    }

    let mut warnings = Vec::new();
    let (validator, rule_warnings) = Validator::new(constraints, pool, width)?;
    warnings.extend(rule_warnings.iter().map(ToString::to_string));

    let universe_len = binomial(pool.len() as u64, limits.subset_size as u64);
    if universe_len > MAX_UNIVERSE {
        return Err(OptimizerError::Internal(format!(
            "coverage universe of {} subsets is too large",
            universe_len
        )));
    }
    let ev = CoverageEvaluator::new(Universe::new(pool.len(), limits.subset_size)?, width);

    let history = if params.history.is_empty() {
        None
    } else if params.history.len() < limits.history_min_draws {
        warnings.push(format!(
            "history ignored: {} draws given, at least {} needed",
            params.history.len(),
            limits.history_min_draws
        ));
        None
    } else {
        let history = TripletHistory::from_draws(&params.history, pool, ev.universe());
        debug!(
            draws = history.draws(),
            max_weight = history.max_weight(),
            "draw history loaded"
        );
        Some(history)
    };

    let attempts = params.attempts.clamp(1, limits.max_attempts);
    if attempts != params.attempts {
        warnings.push(format!(
            "attempts clamped from {} to {}",
            params.attempts, attempts
        ));
    }
    let sample_size = params.sample_size.clamp(1, limits.max_sample_size);
    if sample_size != params.sample_size {
        warnings.push(format!(
            "sample_size clamped from {} to {}",
            params.sample_size, sample_size
        ));
    }
    let seed = params.seed.unwrap_or_else(|| rand::rng().random());
    let cap = params.max_tickets.unwrap_or(limits.max_system_size);

    let space = CandidateSpace::build(pool, &validator, limits.max_candidates)?;
    let sequential_excluded = space.stats().sequential_rejected;
    if sequential_excluded > 0 {
        warnings.push(format!(
            "{} highly sequential combinations were excluded",
            sequential_excluded
        ));
    }

    let small_pool = pool.len() <= limits.fast_min_pool && space.is_enumerated();
    let mut strategy = params.strategy;
    if strategy == Strategy::Fast && small_pool {
        strategy = Strategy::Classic;
        warnings.push(format!(
            "pool of {} numbers is small enough for classic mode; fast mode ran as classic",
            pool.len()
        ));
    }
    if strategy == Strategy::Classic && !space.is_enumerated() {
        return Err(OptimizerError::Internal(format!(
            "classic mode needs an enumerable candidate space, but {} tickets exceed the limit of {}; use fast or hybrid mode",
            space.estimate(),
            limits.max_candidates
        )));
    }

    info!(
        pool = pool.len(),
        strategy = %strategy,
        space = space.kind_name(),
        candidates = ?space.len(),
        cap,
        seed,
        "optimizer run started"
    );

    let search = Search {
        ev: &ev,
        space: &space,
        weights: history.as_ref().map(|h| h.weights()),
        cap,
    };
    let (mut pass, attempts_used) = match strategy {
        Strategy::Classic => (search.classic(), 1),
        Strategy::Fast => {
            let mut rng = StdRng::seed_from_u64(seed);
            (search.fast(&mut rng, sample_size, limits.fast_stall_retries), 1)
        }
        Strategy::Hybrid if small_pool => (search.classic(), 1),
        Strategy::Hybrid => (
            search.hybrid(seed, attempts, sample_size, limits.fast_stall_retries),
            attempts,
        ),
    };

    let pruned = if strategy == Strategy::Hybrid {
        prune_redundant(&ev, &mut pass.tickets)
    } else {
        0
    };

    let filled = if params.fill {
        let mut rng = StdRng::seed_from_u64(seed.rotate_left(17));
        search.top_up(&mut pass.tickets, &mut pass.covered, &mut rng)
    } else {
        0
    };
    if filled > 0 {
        warnings.push(format!(
            "{} tickets were added to reach the ticket count after greedy selection stopped",
            filled
        ));
    }

    if validator.sequential_policy() == SequentialPolicy::Warn {
        let sequential = pass
            .tickets
            .iter()
            .filter(|t| validator.is_sequential(&pool.values_of(t)))
            .count();
        if sequential > 0 {
            warnings.push(format!(
                "{} tickets in the system are highly sequential",
                sequential
            ));
        }
    }

    let system: Vec<Combination> = pass.tickets.iter().map(|t| pool.combination_of(t)).collect();
    let result = CoverageResult {
        coverage: pass.covered.ratio(),
        covered: pass.covered.covered(),
        total: pass.covered.total(),
        uncovered: uncovered_subsets(&ev, &pass.covered, pool, limits.uncovered_report_limit),
        system,
        strategy,
        attempts: attempts_used,
        sample_size,
        seed,
        stop_reason: pass.stop,
        candidate_space: space.kind_name(),
        filled,
        pruned,
        warnings,
    };

    info!(
        size = result.system.len(),
        coverage = result.coverage,
        stop_reason = result.stop_reason.as_str(),
        pruned,
        filled,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "optimizer run finished"
    );
    Ok(result)
}
