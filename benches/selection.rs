use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use online_cluster_nsga3::cluster::{AgglomerativeClusterer, ObjectiveClusterer};
use online_cluster_nsga3::pareto::hypervolume;
use online_cluster_nsga3::prelude::*;
use online_cluster_nsga3::reference::ReferenceDirections;
use online_cluster_nsga3::selection::environmental_selection;

/// Random objective vectors drawn from a fixed seed.
fn pool(n: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut rng = fastrand::Rng::with_seed(7);
    (0..n).map(|_| (0..dim).map(|_| rng.f64()).collect()).collect()
}

fn bench_environmental_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("environmental_selection");
    group.sample_size(20);

    for dim in [3, 5, 8] {
        let directions = ReferenceDirections::reduced(dim, 92).unwrap();
        let objectives = pool(184, dim);
        let violations = vec![0.0; objectives.len()];
        group.bench_with_input(BenchmarkId::new("dim", dim), &objectives, |b, objectives| {
            b.iter(|| environmental_selection(objectives, &violations, &directions, 92));
        });
    }
    group.finish();
}

fn bench_agglomerative(c: &mut Criterion) {
    let mut group = c.benchmark_group("agglomerative_reduce");

    for dim in [5, 10, 20] {
        let objectives = pool(92, dim);
        let clusterer = AgglomerativeClusterer::default();
        group.bench_with_input(BenchmarkId::new("dim", dim), &objectives, |b, objectives| {
            b.iter(|| clusterer.reduce(objectives, 2).unwrap());
        });
    }
    group.finish();
}

fn bench_hypervolume(c: &mut Criterion) {
    let mut group = c.benchmark_group("hypervolume");
    group.sample_size(20);

    for dim in [3, 5] {
        let reference = vec![1.1; dim];
        // Points on the unit sphere octant are mutually non-dominated.
        let front: Vec<Vec<f64>> = pool(92, dim)
            .into_iter()
            .map(|p| {
                let norm = p.iter().map(|v| v * v).sum::<f64>().sqrt().max(1e-12);
                p.iter().map(|v| v / norm).collect()
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("dim", dim), &front, |b, front| {
            b.iter(|| hypervolume(front, &reference));
        });
    }
    group.finish();
}

fn bench_generations(c: &mut Criterion) {
    let mut group = c.benchmark_group("experiment_10_generations");
    group.sample_size(10);

    for (label, interval) in [("baseline", 0), ("clustered", 2)] {
        group.bench_function(label, |b| {
            b.iter(|| {
                Experiment::builder(Dtlz2::new(5))
                    .pop_size(92)
                    .n_partitions(6)
                    .number_of_clusters(2)
                    .interval_of_aggregations(interval)
                    .termination(Termination::MaxGenerations(10))
                    .build()
                    .unwrap()
                    .run()
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_environmental_selection,
    bench_agglomerative,
    bench_hypervolume,
    bench_generations
);
criterion_main!(benches);
