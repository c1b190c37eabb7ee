//! Integration tests for saving, reloading and resuming experiments.

use std::path::PathBuf;

use online_cluster_nsga3::metrics::Metric;
use online_cluster_nsga3::prelude::*;

fn temp_dir() -> PathBuf {
    use core::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    std::env::temp_dir().join(format!(
        "ocnsga3_persistence_test_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ))
}

fn saved(dir: &PathBuf, n_runs: usize) -> ExperimentBuilder {
    Experiment::builder(Dtlz2::new(4))
        .pop_size(12)
        .n_partitions(3)
        .number_of_clusters(2)
        .interval_of_aggregations(2)
        .number_of_executions(n_runs)
        .termination(Termination::MaxGenerations(4))
        .save_data(true)
        .save_dir(dir)
}

#[test]
fn saved_experiment_writes_layout() {
    let dir = temp_dir();
    let experiment = saved(&dir, 2).build().unwrap();
    let root = experiment.save_dir().unwrap().to_path_buf();
    assert_eq!(root, dir.join("OnlineClusterNSGA3_DTLZ2_4_2_2"));

    experiment.run().unwrap();

    for file in ["experiment.json", "runs.jsonl", "hv_convergence.txt", "igd_convergence.txt"] {
        assert!(root.join(file).is_file(), "missing {file}");
    }
    for run in 0..2 {
        let run_dir = root.join(format!("run_{run}"));
        let seed = std::fs::read_to_string(run_dir.join("seed.txt")).unwrap();
        assert_eq!(seed.trim(), (run + 1).to_string());
        let hv = std::fs::read_to_string(run_dir.join("hv_convergence.txt")).unwrap();
        assert_eq!(hv.lines().count(), 4);
        assert!(hv.starts_with("0 "));
        let csv = std::fs::read_to_string(run_dir.join("population.csv")).unwrap();
        assert!(csv.starts_with("x0,"));
        assert!(csv.lines().count() > 1);
    }

    let aggregate = std::fs::read_to_string(root.join("hv_convergence.txt")).unwrap();
    assert_eq!(aggregate.lines().count(), 4);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn baseline_directory_name() {
    let dir = temp_dir();
    let experiment = Experiment::builder(Dtlz2::new(3))
        .save_data(true)
        .save_dir(&dir)
        .build()
        .unwrap();
    assert_eq!(experiment.save_dir(), Some(dir.join("NSGA3_DTLZ2_3").as_path()));

    let unsaved = Experiment::builder(Dtlz2::new(3)).build().unwrap();
    assert!(unsaved.save_dir().is_none());
}

#[test]
fn load_rebuilds_result() {
    let dir = temp_dir();
    let experiment = saved(&dir, 2).build().unwrap();
    let result = experiment.run().unwrap();

    let loaded = Experiment::load(experiment.save_dir().unwrap()).unwrap();
    assert_eq!(loaded.problem, "DTLZ2");
    assert_eq!(loaded.n_obj, 4);
    assert_eq!(loaded.seeds(), result.seeds());
    assert_eq!(loaded.hypervolume, result.hypervolume);
    assert_eq!(loaded.igd, result.igd);
    for (a, b) in loaded.runs.iter().zip(&result.runs) {
        assert_eq!(a.convergence, b.convergence);
        assert_eq!(a.reductions, b.reductions);
        assert_eq!(a.population.len(), b.population.len());
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn load_of_missing_directory_fails() {
    let err = Experiment::load(temp_dir());
    assert!(matches!(err, Err(Error::Persistence { run: None, .. })));
}

#[test]
fn resume_reuses_journal_runs() {
    let dir = temp_dir();
    let first = saved(&dir, 2).build().unwrap().run().unwrap();

    let resumed = saved(&dir, 3).resume(true).build().unwrap();
    let second = resumed.run().unwrap();

    assert_eq!(second.runs.len(), 3);
    // Reused runs keep their recorded duration instead of running again.
    assert_eq!(second.runs[0].duration, first.runs[0].duration);
    assert_eq!(second.runs[1].duration, first.runs[1].duration);
    assert_eq!(second.runs[1].convergence, first.runs[1].convergence);
    assert_eq!(second.runs[2].seed, 3);

    let loaded = Experiment::load(resumed.save_dir().unwrap()).unwrap();
    assert_eq!(loaded.runs.len(), 3);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn resume_ignores_runs_with_other_seeds() {
    let dir = temp_dir();
    saved(&dir, 1).build().unwrap().run().unwrap();

    let rerun = saved(&dir, 1).base_seed(9).resume(true).build().unwrap().run().unwrap();
    assert_eq!(rerun.runs[0].seed, 9);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn resume_after_configuration_change_recomputes() {
    let dir = temp_dir();
    saved(&dir, 1).pop_size(40).build().unwrap().run().unwrap();

    let resumed = saved(&dir, 2).resume(true).build().unwrap();
    let result = resumed.run().unwrap();
    assert_eq!(result.runs.len(), 2);
    assert!(result.runs.iter().all(|r| r.population.len() <= 12));

    let loaded = Experiment::load(resumed.save_dir().unwrap()).unwrap();
    assert_eq!(loaded.hypervolume, result.hypervolume);
    assert!(loaded.runs.iter().all(|r| r.population.len() <= 12));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn load_ignores_runs_of_earlier_executions() {
    let dir = temp_dir();
    saved(&dir, 3).build().unwrap().run().unwrap();

    let experiment = saved(&dir, 2).build().unwrap();
    let result = experiment.run().unwrap();
    let root = experiment.save_dir().unwrap();

    let journal = std::fs::read_to_string(root.join("runs.jsonl")).unwrap();
    assert_eq!(journal.lines().count(), 2);

    let loaded = Experiment::load(root).unwrap();
    assert_eq!(loaded.runs.len(), 2);
    assert_eq!(loaded.seeds(), result.seeds());
    assert_eq!(loaded.hypervolume, result.hypervolume);
    assert_eq!(loaded.igd, result.igd);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn resume_with_fewer_runs_loads_only_those() {
    let dir = temp_dir();
    saved(&dir, 3).build().unwrap().run().unwrap();

    let resumed = saved(&dir, 2).resume(true).build().unwrap();
    let result = resumed.run().unwrap();
    let loaded = Experiment::load(resumed.save_dir().unwrap()).unwrap();
    assert_eq!(loaded.runs.len(), 2);
    assert_eq!(loaded.hypervolume, result.hypervolume);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn unwritable_save_dir_is_persistence_error() {
    let blocker = temp_dir();
    std::fs::write(&blocker, "not a directory").unwrap();

    let experiment = Experiment::builder(Dtlz2::new(3))
        .pop_size(8)
        .n_partitions(3)
        .termination(Termination::MaxGenerations(2))
        .save_data(true)
        .save_dir(&blocker)
        .build()
        .unwrap();
    assert!(matches!(experiment.run(), Err(Error::Persistence { .. })));

    std::fs::remove_file(&blocker).ok();
}

#[test]
fn views_write_reports_when_saving() {
    let dir = temp_dir();
    let experiment = saved(&dir, 2).build().unwrap();
    experiment.run().unwrap();
    let root = experiment.save_dir().unwrap().to_path_buf();

    std::fs::remove_file(root.join("igd_convergence.txt")).unwrap();
    let igd = experiment.show_mean_convergence(Metric::Igd).unwrap();
    assert_eq!(igd.len(), 4);
    assert!(root.join("igd_convergence.txt").is_file());

    let map = experiment.show_heat_map().unwrap();
    assert!(!map.is_empty());
    let html = std::fs::read_to_string(root.join("heat_map.html")).unwrap();
    assert!(html.contains("Plotly.newPlot"));

    let report = experiment.export_html(None).unwrap();
    assert_eq!(report, root.join("convergence.html"));
    assert!(std::fs::read_to_string(report).unwrap().contains("mean_hv"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn settings_round_trip_through_json() {
    let dir = temp_dir();
    let experiment = saved(&dir, 1).build().unwrap();
    experiment.run().unwrap();

    let path = experiment.save_dir().unwrap().join("experiment.json");
    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let settings: ExperimentSettings = serde_json::from_value(value["settings"].clone()).unwrap();
    assert_eq!(&settings, experiment.settings());

    std::fs::write(&path, serde_json::to_string(&value["settings"]).unwrap()).unwrap();
    assert_eq!(&ExperimentSettings::from_json_file(&path).unwrap(), experiment.settings());

    std::fs::remove_dir_all(&dir).ok();
}
