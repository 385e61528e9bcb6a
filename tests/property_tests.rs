//! Property-based tests for lottocover's combinatorial primitives.
//!
//! These tests use the `proptest` framework to check invariants across
//! randomly generated pools, tickets and budgets.
//!
//! # How to run
//!
//! ```bash
//! # Run all property tests:
//! cargo test --test property_tests
//!
//! # Increase case count for thorough testing (default is 256):
//! PROPTEST_CASES=2000 cargo test --test property_tests
//! ```
//!
//! # Testing strategy
//!
//! Properties are organized by module:
//! - **Universe**: size and ordering of the k-subset universe
//! - **Coverage**: ratio bounds, monotonicity, marginal gain consistency
//! - **Budget**: ticket count derivation from money amounts
//! - **Greedy / constraints**: every returned ticket honors the rules
//!
//! Each property is named `prop_<function>_<invariant>`.

use lottocover::budget::derive_ticket_count;
use lottocover::config::OptimizerConfig;
use lottocover::constraints::{is_valid, Constraints, GroupLabel};
use lottocover::coverage::{coverage, marginal_gain, CoverageSet, subset_ranks};
use lottocover::greedy::{run_greedy, GreedyParams, Strategy as SearchStrategy};
use lottocover::pool::{Combination, NumberPool};
use lottocover::universe::{build_universe, Universe};
use lottocover::{binomial, DRAW_WIDTH, SUBSET_SIZE};
use proptest::prelude::*;

/// A pool `1..=n` together with a handful of 5-number tickets drawn from it.
fn pool_and_tickets() -> impl Strategy<Value = (u32, Vec<Combination>)> {
    (6u32..=14).prop_flat_map(|n| {
        let ticket = prop::sample::subsequence((1..=n).collect::<Vec<u32>>(), DRAW_WIDTH)
            .prop_map(Combination::new);
        (Just(n), prop::collection::vec(ticket, 0..6))
    })
}

// == Universe =================================================================

proptest! {
    #[test]
    fn prop_universe_len_matches_binomial(n in 3usize..=40) {
        let u = Universe::new(n, SUBSET_SIZE).unwrap();
        prop_assert_eq!(u.len() as u64, binomial(n as u64, SUBSET_SIZE as u64));
    }

    #[test]
    fn prop_build_universe_sorted_and_distinct(n in 3u32..=15) {
        let pool = NumberPool::range(n);
        let all = build_universe(&pool, SUBSET_SIZE).unwrap();
        for pair in all.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        prop_assert!(all.iter().all(|c| c.len() == SUBSET_SIZE));
    }
}

// == Coverage =================================================================

proptest! {
    #[test]
    fn prop_coverage_within_unit_interval((n, system) in pool_and_tickets()) {
        let pool = NumberPool::range(n);
        let u = Universe::new(pool.len(), SUBSET_SIZE).unwrap();
        let c = coverage(&system, &pool, &u);
        prop_assert!((0.0..=1.0).contains(&c));
        if system.is_empty() {
            prop_assert_eq!(c, 0.0);
        }
    }

    #[test]
    fn prop_coverage_monotone_in_system((n, system) in pool_and_tickets()) {
        let pool = NumberPool::range(n);
        let u = Universe::new(pool.len(), SUBSET_SIZE).unwrap();
        let mut previous = 0.0;
        for end in 0..=system.len() {
            let c = coverage(&system[..end], &pool, &u);
            prop_assert!(c >= previous);
            previous = c;
        }
    }

    #[test]
    fn prop_marginal_gain_matches_coverage_delta((n, system) in pool_and_tickets()) {
        prop_assume!(!system.is_empty());
        let pool = NumberPool::range(n);
        let u = Universe::new(pool.len(), SUBSET_SIZE).unwrap();
        let (last, head) = system.split_last().unwrap();
        let mut covered = CoverageSet::new(u.len());
        for t in head {
            for r in subset_ranks(t, &pool, &u) {
                covered.insert(r);
            }
        }
        let before = covered.covered();
        let gain = marginal_gain(last, &covered, &pool, &u);
        for r in subset_ranks(last, &pool, &u) {
            covered.insert(r);
        }
        prop_assert_eq!(covered.covered() - before, gain);
        prop_assert!(gain <= binomial(DRAW_WIDTH as u64, SUBSET_SIZE as u64) as usize);
    }
}

// == Budget ===================================================================

proptest! {
    #[test]
    fn prop_derive_ticket_count_is_floor(budget in 1u64..1_000_000, cost in 1u64..10_000) {
        prop_assume!(budget >= cost);
        let count = derive_ticket_count(budget as f64, cost as f64).unwrap();
        prop_assert!(count >= 1);
        prop_assert_eq!(count as u64, budget / cost);
    }

    #[test]
    fn prop_derive_ticket_count_rejects_short_budget(cost_cents in 2u64..10_000, short in 1u64..100) {
        prop_assume!(short < cost_cents);
        let r = derive_ticket_count(short as f64 / 100.0, cost_cents as f64 / 100.0);
        prop_assert!(r.is_err());
    }
}

// == Greedy and constraints ===================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_run_greedy_tickets_honor_rules(
        n in 6u32..=11,
        forced in 1u32..=6,
        cap in 1usize..=6,
        seed in any::<u64>(),
    ) {
        let limits = OptimizerConfig::default();
        let pool = NumberPool::range(n);
        let constraints = Constraints {
            forced_numbers: [forced].into_iter().collect(),
            ..Default::default()
        };
        let params = GreedyParams {
            seed: Some(seed),
            max_tickets: Some(cap),
            ..GreedyParams::new(SearchStrategy::Classic, &limits)
        };
        let r = run_greedy(&pool, &constraints, &params, &limits).unwrap();
        prop_assert!(!r.system.is_empty());
        prop_assert!(r.system.len() <= cap);
        let mut distinct = r.system.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(distinct.len(), r.system.len());
        for t in &r.system {
            prop_assert_eq!(t.len(), DRAW_WIDTH);
            prop_assert!(t.contains(forced));
            prop_assert!(is_valid(t, &constraints, &pool, DRAW_WIDTH));
        }
        prop_assert!(r.covered <= r.total);
    }

    #[test]
    fn prop_is_valid_enforces_group_limit(
        ticket in prop::sample::subsequence((1..=12).collect::<Vec<u32>>(), DRAW_WIDTH),
        limit in 0usize..=3,
    ) {
        let pool = NumberPool::range(12);
        let mut constraints = Constraints::default();
        constraints.groups.insert(GroupLabel::A, (1..=6).collect());
        constraints.group_limits.insert(GroupLabel::A, limit);
        let in_group = ticket.iter().filter(|&&v| v <= 6).count();
        let candidate = Combination::new(ticket);
        prop_assert_eq!(
            is_valid(&candidate, &constraints, &pool, DRAW_WIDTH),
            in_group <= limit
        );
    }
}

// == Strategy comparison ======================================================

#[test]
fn classic_coverage_not_below_fast_on_average() {
    let limits = OptimizerConfig::default();
    let pool = NumberPool::range(16);
    let constraints = Constraints::default();
    let cap = 10;
    let classic = run_greedy(
        &pool,
        &constraints,
        &GreedyParams {
            max_tickets: Some(cap),
            ..GreedyParams::new(SearchStrategy::Classic, &limits)
        },
        &limits,
    )
    .unwrap();

    let seeds = 0..8u64;
    let runs = seeds.clone().count() as f64;
    let fast_mean: f64 = seeds
        .map(|seed| {
            let params = GreedyParams {
                seed: Some(seed),
                sample_size: 50,
                max_tickets: Some(cap),
                ..GreedyParams::new(SearchStrategy::Fast, &limits)
            };
            run_greedy(&pool, &constraints, &params, &limits)
                .unwrap()
                .coverage
        })
        .sum::<f64>()
        / runs;
    assert!(
        classic.coverage >= fast_mean,
        "classic {} < fast mean {}",
        classic.coverage,
        fast_mean
    );
}
