use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use kanren_clp::prelude::*;

fn n_queens(n: u32) -> Model {
    let max_value = 2 * n;
    let mut model = Model::new(max_value);
    let columns = model.new_variables(n as usize, Domain::range(1, n, max_value));

    let ups: Vec<_> = (0..n)
        .map(|i| {
            let d = model.new_variable(Domain::full(max_value));
            model
                .add_constraint(ConstraintKind::Arithmetic {
                    dst: d,
                    src: columns[i as usize],
                    k: i as i64,
                })
                .unwrap();
            d
        })
        .collect();
    let downs: Vec<_> = (0..n)
        .map(|i| {
            let d = model.new_variable(Domain::full(max_value));
            model
                .add_constraint(ConstraintKind::Arithmetic {
                    dst: d,
                    src: columns[i as usize],
                    k: n as i64 - i as i64,
                })
                .unwrap();
            d
        })
        .collect();

    model.add_constraint(ConstraintKind::AllDifferent { vars: columns }).unwrap();
    model.add_constraint(ConstraintKind::AllDifferent { vars: ups }).unwrap();
    model.add_constraint(ConstraintKind::AllDifferent { vars: downs }).unwrap();

    model
}

fn n_queens_labeling_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("N-Queens Labeling Strategies");
    let n = 8;

    for strategy in [
        LabelingStrategy::FirstFail,
        LabelingStrategy::DomainSize,
        LabelingStrategy::Degree,
        LabelingStrategy::Lexicographic,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", strategy)),
            &strategy,
            |b, strategy| {
                b.iter(|| {
                    let model = n_queens(n);
                    let config = SearchConfig {
                        strategy: strategy.clone(),
                        ..SearchConfig::default()
                    };
                    let solutions = solve(black_box(&model), black_box(&config)).unwrap();
                    assert_eq!(solutions.len(), 92);
                })
            },
        );
    }
    group.finish();
}

fn n_queens_board_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("N-Queens Board Size");
    for n in [6, 8, 10].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            b.iter(|| {
                let model = n_queens(n);
                let config = SearchConfig {
                    strategy: LabelingStrategy::FirstFail,
                    ..SearchConfig::default()
                };
                let solutions = solve(black_box(&model), black_box(&config)).unwrap();
                assert!(!solutions.is_empty());
            })
        });
    }
    group.finish();
}

fn n_queens_parallel_worker_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("N-Queens Parallel Workers");
    let n = 8;
    for workers in [1, 2, 4].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, &workers| {
            b.iter(|| {
                let model = n_queens(n);
                let config = SearchConfig {
                    strategy: LabelingStrategy::FirstFail,
                    ..SearchConfig::default()
                };
                let parallel_config = ParallelConfig { worker_count: workers };
                let solutions =
                    solve_parallel(black_box(&model), black_box(&config), black_box(&parallel_config)).unwrap();
                assert_eq!(solutions.len(), 92);
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    n_queens_labeling_strategies,
    n_queens_board_size,
    n_queens_parallel_worker_counts
);
criterion_main!(benches);
