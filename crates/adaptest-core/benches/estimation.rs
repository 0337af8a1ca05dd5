use criterion::{black_box, criterion_group, criterion_main, Criterion};

use adaptest_core::estimator::{estimate_ability, EstimatorConfig};
use adaptest_core::model::{AbilityEstimate, ItemParameter};

fn make_history(n: usize) -> Vec<(ItemParameter, bool)> {
    (0..n)
        .map(|i| {
            let difficulty = -2.0 + 4.0 * i as f64 / n.max(2) as f64;
            (ItemParameter::with_difficulty(difficulty), i % 3 != 0)
        })
        .collect()
}

fn bench_estimate_ability(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_ability");
    let config = EstimatorConfig::default();
    let prior = AbilityEstimate::prior();

    for n in [5usize, 25, 100] {
        let history = make_history(n);
        group.bench_function(format!("mixed_n={n}"), |b| {
            b.iter(|| estimate_ability(black_box(&history), black_box(&prior), black_box(&config)))
        });
    }

    let degenerate: Vec<_> = make_history(25)
        .into_iter()
        .map(|(p, _)| (p, true))
        .collect();
    group.bench_function("all_correct_n=25", |b| {
        b.iter(|| estimate_ability(black_box(&degenerate), black_box(&prior), black_box(&config)))
    });

    group.finish();
}

criterion_group!(benches, bench_estimate_ability);
criterion_main!(benches);
