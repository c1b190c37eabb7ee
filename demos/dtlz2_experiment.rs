//! Clustered NSGA-III on 5-objective DTLZ2, compared with the baseline.
//!
//! Three runs of each configuration are executed; results and HTML
//! reports are written below `experiment_results/`.
//!
//! Run with: `cargo run --release --example dtlz2_experiment`

use online_cluster_nsga3::metrics::Metric;
use online_cluster_nsga3::prelude::*;

fn configure(interval: i64) -> online_cluster_nsga3::Result<Experiment> {
    Experiment::builder(Dtlz2::new(5))
        .pop_size(92)
        .n_partitions(6)
        .number_of_clusters(2)
        .interval_of_aggregations(interval)
        .number_of_executions(3)
        .termination(Termination::MaxGenerations(100))
        .save_data(true)
        .build()
}

fn main() -> online_cluster_nsga3::Result<()> {
    for interval in [0, 1] {
        let experiment = configure(interval)?;
        let result = experiment.run()?;

        let hv = experiment.show_mean_convergence(Metric::Hypervolume)?;
        let last = hv.last().ok_or(Error::NoResults)?;
        println!(
            "{}: final HV {:.4} ± {:.4} over {} runs",
            experiment.save_dir().map_or_else(String::new, |d| d.display().to_string()),
            last.mean,
            last.std,
            result.runs.len(),
        );
        if let Some(igd) = result.igd.as_ref().and_then(AggregateCurve::last) {
            println!("  final IGD {:.4} ± {:.4}", igd.mean, igd.std);
        }

        let map = experiment.show_heat_map()?;
        println!("  {} reductions recorded", map.n_reductions);
        let report = experiment.export_html(None)?;
        println!("  report: {}", report.display());
    }
    Ok(())
}
