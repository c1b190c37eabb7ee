//! JSONL journal of finished runs.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::run::RunResult;

/// Appends finished runs as JSON lines to a file.
///
/// Writes take an exclusive file lock and reads a shared one, so several
/// processes may share a journal. Every line holds one complete
/// [`RunResult`], which makes the journal a lossless record of the
/// experiment.
pub(crate) struct RunJournal {
    path: PathBuf,
    /// Serialise in-process writes so we only hold the file lock briefly.
    write_lock: Mutex<()>,
}

impl RunJournal {
    pub(crate) fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Append one run.
    pub(crate) fn append(&self, run: &RunResult) -> Result<()> {
        let err = |e: &dyn core::fmt::Display| {
            Error::persistence(Some(run.index), "appending to run journal", &self.path, e)
        };
        let _guard = self.write_lock.lock();

        let line = serde_json::to_string(run).map_err(|e| err(&e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| err(&e))?;

        file.lock_exclusive().map_err(|e| err(&e))?;
        writeln!(file, "{line}").map_err(|e| err(&e))?;
        file.flush().map_err(|e| err(&e))?;
        file.unlock().map_err(|e| err(&e))?;
        Ok(())
    }

    /// Drop every stored run. A missing file stays missing.
    pub(crate) fn clear(&self) -> Result<()> {
        let err = |e: &dyn core::fmt::Display| {
            Error::persistence(None, "clearing run journal", &self.path, e)
        };
        let _guard = self.write_lock.lock();

        let file = match OpenOptions::new().write(true).open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(err(&e)),
        };
        file.lock_exclusive().map_err(|e| err(&e))?;
        file.set_len(0).map_err(|e| err(&e))?;
        file.unlock().map_err(|e| err(&e))?;
        Ok(())
    }

    /// Read every stored run, in file order. A missing file is empty.
    pub(crate) fn load(&self) -> Result<Vec<RunResult>> {
        let err = |e: &dyn core::fmt::Display| {
            Error::persistence(None, "reading run journal", &self.path, e)
        };
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(err(&e)),
        };

        file.lock_shared().map_err(|e| err(&e))?;

        let mut runs = Vec::new();
        for line in BufReader::new(&file).lines() {
            let line = line.map_err(|e| err(&e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            runs.push(serde_json::from_str(line).map_err(|e| err(&e))?);
        }

        file.unlock().map_err(|e| err(&e))?;
        Ok(runs)
    }

    /// Latest stored entry of every run index, ordered by index.
    pub(crate) fn load_latest(&self) -> Result<Vec<RunResult>> {
        let mut latest = std::collections::BTreeMap::new();
        for run in self.load()? {
            latest.insert(run.index, run);
        }
        Ok(latest.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU64, Ordering};
    use core::time::Duration;

    use super::*;

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("ocnsga3_journal_{}_{n}.jsonl", std::process::id()))
    }

    fn run(index: usize, seed: u64) -> RunResult {
        RunResult {
            index,
            seed,
            population: Vec::new(),
            history: None,
            convergence: Vec::new(),
            reductions: Vec::new(),
            n_evals: 0,
            n_invalid: 0,
            duration: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_clear_drops_runs() {
        let path = temp_path();
        let journal = RunJournal::new(&path);
        journal.clear().unwrap();
        assert!(!path.exists());

        journal.append(&run(0, 1)).unwrap();
        journal.append(&run(1, 2)).unwrap();
        journal.clear().unwrap();
        assert!(journal.load().unwrap().is_empty());

        journal.append(&run(0, 3)).unwrap();
        assert_eq!(journal.load_latest().unwrap()[0].seed, 3);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_empty() {
        let journal = RunJournal::new(temp_path());
        assert!(journal.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_load_latest() {
        let path = temp_path();
        let journal = RunJournal::new(&path);
        journal.append(&run(1, 2)).unwrap();
        journal.append(&run(0, 1)).unwrap();
        journal.append(&run(1, 7)).unwrap();

        assert_eq!(journal.load().unwrap().len(), 3);
        let latest = journal.load_latest().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].index, 0);
        assert_eq!(latest[1].seed, 7);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_corrupt_line_is_persistence_error() {
        let path = temp_path();
        std::fs::write(&path, "{not json}\n").unwrap();
        let err = RunJournal::new(&path).load();
        assert!(matches!(err, Err(Error::Persistence { run: None, .. })));
        std::fs::remove_file(path).ok();
    }
}
