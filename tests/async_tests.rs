//! Tests for concurrent experiment execution.

#![cfg(feature = "async")]

use online_cluster_nsga3::prelude::*;

fn experiment(n_runs: usize) -> Experiment {
    Experiment::builder(Dtlz2::new(4))
        .pop_size(12)
        .n_partitions(3)
        .number_of_clusters(2)
        .interval_of_aggregations(1)
        .number_of_executions(n_runs)
        .termination(Termination::MaxGenerations(5))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_matches_sequential() {
    let sequential = experiment(4).run().unwrap();
    let parallel = experiment(4).run_parallel(3).await.unwrap();

    assert_eq!(parallel.seeds(), sequential.seeds());
    assert_eq!(parallel.hypervolume, sequential.hypervolume);
    assert_eq!(parallel.igd, sequential.igd);
    for (p, s) in parallel.runs.iter().zip(&sequential.runs) {
        assert_eq!(p.index, s.index);
        assert_eq!(p.population, s.population);
        assert_eq!(p.reductions, s.reductions);
    }
}

#[tokio::test]
async fn single_slot_runs_everything() {
    let e = experiment(3);
    let result = e.run_parallel(1).await.unwrap();
    assert_eq!(result.runs.len(), 3);
    assert_eq!(e.completed_runs().len(), 3);
    assert!(e.result().is_some());
}

#[tokio::test]
async fn zero_concurrency_is_rejected() {
    let err = experiment(1).run_parallel(0).await;
    assert!(matches!(err, Err(Error::InvalidConfiguration { .. })));
}
