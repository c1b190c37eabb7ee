//! On-disk layout of a saved experiment.
//!
//! ```text
//! <save_dir>/<experiment name>/
//!     experiment.json        settings and problem description
//!     runs.jsonl             one complete RunResult per line
//!     hv_convergence.txt     "generation mean" per line
//!     igd_convergence.txt    (only when IGD is tracked)
//!     run_<i>/
//!         seed.txt
//!         hv_convergence.txt "generation value" per line
//!         igd_convergence.txt
//!         population.csv     decision and objective vectors
//! ```
//!
//! The journal alone is enough to rebuild an [`ExperimentResult`]; the
//! text files are for humans and plotting tools.

use core::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ExperimentResult;
use super::aggregate::AggregateCurve;
use super::builder::ExperimentSettings;
use super::journal::RunJournal;
use crate::error::{Error, Result};
use crate::metrics::Metric;
use crate::run::RunResult;

pub(crate) const SETTINGS_FILE: &str = "experiment.json";
pub(crate) const JOURNAL_FILE: &str = "runs.jsonl";
pub(crate) const HEAT_MAP_FILE: &str = "heat_map.html";
pub(crate) const REPORT_FILE: &str = "convergence.html";

/// Contents of `experiment.json`.
///
/// # Schema versioning
///
/// The `version` field enables future schema evolution without breaking
/// existing directories. The current version is `1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSnapshot {
    /// Schema version.
    pub version: u32,
    /// Problem name.
    pub problem: String,
    /// Original objective dimension.
    pub n_obj: usize,
    /// Number of decision variables.
    pub n_var: usize,
    /// The configuration the experiment ran with.
    pub settings: ExperimentSettings,
    /// Name of the objective clusterer.
    #[serde(default)]
    pub clusterer: String,
    /// Number of original reference directions.
    #[serde(default)]
    pub n_directions: usize,
}

impl ExperimentSnapshot {
    /// `true` if runs recorded under `self` are valid runs under `other`.
    #[must_use]
    pub fn same_runs_as(&self, other: &Self) -> bool {
        self.problem == other.problem
            && self.n_obj == other.n_obj
            && self.n_var == other.n_var
            && self.clusterer == other.clusterer
            && self.n_directions == other.n_directions
            && self.settings.same_run_configuration(&other.settings)
    }
}

/// Writer for one experiment directory.
pub(crate) struct ExperimentStore {
    root: PathBuf,
    journal: RunJournal,
}

impl ExperimentStore {
    /// Create the directory if needed.
    pub(crate) fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .map_err(|e| Error::persistence(None, "creating experiment directory", root, e))?;
        Ok(Self {
            root: root.to_path_buf(),
            journal: RunJournal::new(root.join(JOURNAL_FILE)),
        })
    }

    pub(crate) fn journal(&self) -> &RunJournal {
        &self.journal
    }

    /// The snapshot currently on disk, if any.
    pub(crate) fn stored_snapshot(&self) -> Result<Option<ExperimentSnapshot>> {
        if self.root.join(SETTINGS_FILE).is_file() {
            read_snapshot(&self.root).map(Some)
        } else {
            Ok(None)
        }
    }

    pub(crate) fn write_snapshot(&self, snapshot: &ExperimentSnapshot) -> Result<()> {
        let path = self.root.join(SETTINGS_FILE);
        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| Error::persistence(None, "serializing settings", &path, e))?;
        atomic_write(&path, &json).map_err(|e| Error::persistence(None, "writing settings", &path, e))
    }

    /// Write the run's directory and append it to the journal.
    pub(crate) fn persist_run(&self, run: &RunResult) -> Result<()> {
        let dir = self.root.join(format!("run_{}", run.index));
        let err = |stage: &'static str, path: &Path, e: std::io::Error| {
            Error::persistence(Some(run.index), stage, path, e)
        };
        std::fs::create_dir_all(&dir).map_err(|e| err("creating run directory", &dir, e))?;

        let seed_path = dir.join("seed.txt");
        atomic_write(&seed_path, format!("{}\n", run.seed).as_bytes())
            .map_err(|e| err("writing seed", &seed_path, e))?;

        for metric in Metric::ALL {
            if let Some(curve) = run.curve(metric) {
                let path = dir.join(metric.file_name());
                atomic_write(&path, format_pairs(curve).as_bytes())
                    .map_err(|e| err("writing convergence curve", &path, e))?;
            }
        }

        let pop_path = dir.join("population.csv");
        atomic_write(&pop_path, population_csv(run).as_bytes())
            .map_err(|e| err("writing final population", &pop_path, e))?;

        self.journal.append(run)?;
        trace_info!(run = run.index, dir = %dir.display(), "run persisted");
        Ok(())
    }

    /// Write the aggregate mean curves.
    pub(crate) fn persist_aggregates(&self, result: &ExperimentResult) -> Result<()> {
        self.write_curve(&result.hypervolume)?;
        if let Some(igd) = &result.igd {
            self.write_curve(igd)?;
        }
        Ok(())
    }

    pub(crate) fn write_curve(&self, curve: &AggregateCurve) -> Result<()> {
        let path = self.root.join(curve.metric.file_name());
        let pairs = curve.points.iter().map(|p| (p.generation, p.mean));
        atomic_write(&path, format_pairs(pairs).as_bytes())
            .map_err(|e| Error::persistence(None, "writing aggregate curve", &path, e))
    }

    pub(crate) fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root.join(name);
        atomic_write(&path, contents.as_bytes())
            .map_err(|e| Error::persistence(None, "writing report", &path, e))?;
        Ok(path)
    }
}

/// Read `experiment.json` from an experiment directory.
pub(crate) fn read_snapshot(root: &Path) -> Result<ExperimentSnapshot> {
    let path = root.join(SETTINGS_FILE);
    let text = std::fs::read_to_string(&path)
        .map_err(|e| Error::persistence(None, "reading settings", &path, e))?;
    serde_json::from_str(&text).map_err(|e| Error::persistence(None, "parsing settings", &path, e))
}

/// Atomic write: write to a temp file in the same directory, then rename.
fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)
}

fn format_pairs(pairs: impl IntoIterator<Item = (usize, f64)>) -> String {
    let mut out = String::new();
    for (generation, value) in pairs {
        let _ = writeln!(out, "{generation} {value}");
    }
    out
}

fn population_csv(run: &RunResult) -> String {
    let mut out = String::new();
    let (n_var, n_obj) = run
        .population
        .first()
        .map_or((0, 0), |ind| (ind.decision.len(), ind.objectives.len()));
    let header: Vec<String> = (0..n_var)
        .map(|i| format!("x{i}"))
        .chain((0..n_obj).map(|i| format!("f{i}")))
        .chain(["rank".to_string(), "niche".to_string()])
        .collect();
    let _ = writeln!(out, "{}", header.join(","));
    for ind in &run.population {
        let row: Vec<String> = ind
            .decision
            .iter()
            .chain(&ind.objectives)
            .map(f64::to_string)
            .chain([
                ind.rank.map_or_else(String::new, |r| r.to_string()),
                ind.niche.map_or_else(String::new, |n| n.to_string()),
            ])
            .collect();
        let _ = writeln!(out, "{}", row.join(","));
    }
    out
}
