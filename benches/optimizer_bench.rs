use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lottocover::config::OptimizerConfig;
use lottocover::constraints::Constraints;
use lottocover::coverage::CoverageEvaluator;
use lottocover::greedy::{run_greedy, GreedyParams, Strategy};
use lottocover::pool::NumberPool;
use lottocover::universe::Universe;

fn bench_universe_rank_table(c: &mut Criterion) {
    c.bench_function("Universe::new(49, 3)", |b| {
        b.iter(|| Universe::new(black_box(49), black_box(3)).unwrap());
    });
}

fn bench_ticket_gain(c: &mut Criterion) {
    let evaluator = CoverageEvaluator::new(Universe::new(40, 3).unwrap(), 5);
    let covered = evaluator.empty_set();
    let ticket: Vec<u16> = vec![3, 9, 17, 28, 35];
    c.bench_function("gain(5 of 40)", |b| {
        b.iter(|| evaluator.gain(black_box(&ticket), black_box(&covered)));
    });
}

fn bench_classic_small_pool(c: &mut Criterion) {
    let limits = OptimizerConfig::default();
    let pool = NumberPool::range(12);
    let params = GreedyParams {
        seed: Some(1),
        ..GreedyParams::new(Strategy::Classic, &limits)
    };
    c.bench_function("classic(pool=12)", |b| {
        b.iter(|| run_greedy(&pool, &Constraints::default(), &params, &limits).unwrap());
    });
}

fn bench_fast_medium_pool(c: &mut Criterion) {
    let limits = OptimizerConfig::default();
    let pool = NumberPool::range(25);
    let params = GreedyParams {
        seed: Some(1),
        max_tickets: Some(40),
        ..GreedyParams::new(Strategy::Fast, &limits)
    };
    c.bench_function("fast(pool=25, cap=40)", |b| {
        b.iter(|| run_greedy(&pool, &Constraints::default(), &params, &limits).unwrap());
    });
}

fn bench_hybrid_small_pool(c: &mut Criterion) {
    let limits = OptimizerConfig::default();
    let pool = NumberPool::range(10);
    let params = GreedyParams {
        seed: Some(1),
        attempts: 4,
        ..GreedyParams::new(Strategy::Hybrid, &limits)
    };
    c.bench_function("hybrid(pool=10, attempts=4)", |b| {
        b.iter(|| run_greedy(&pool, &Constraints::default(), &params, &limits).unwrap());
    });
}

criterion_group!(
    benches,
    bench_universe_rank_table,
    bench_ticket_gain,
    bench_classic_small_pool,
    bench_fast_medium_pool,
    bench_hybrid_small_pool
);
criterion_main!(benches);
