pub mod api;
pub mod budget;
pub mod candidates;
pub mod config;
pub mod constraints;
pub mod coverage;
pub mod error;
pub mod generator;
pub mod greedy;
pub mod history;
pub mod pool;
pub mod prom_metrics;
pub mod server;
pub mod universe;

/// Main balls per ticket in the default game.
pub const DRAW_WIDTH: usize = 5;

/// Coverage is measured over triplets.
pub const SUBSET_SIZE: usize = 3;

/// Largest ball number accepted in a pool.
pub const MAX_NUMBER: u32 = 99;

/// Binomial coefficient C(n, k), saturating at `u64::MAX`.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // Exact at every step: acc * (n - i) is divisible by (i + 1).
        acc = acc * (n - i) as u128 / (i + 1) as u128;
        if acc > u64::MAX as u128 {
            return u64::MAX;
        }
    }
    acc as u64
}

/// Round to two decimals, as coverage percentages are displayed.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
