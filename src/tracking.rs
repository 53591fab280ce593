use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{EvalError, Result};
use crate::params::ParamValue;

/// Everything recorded during one tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: uuid::Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_digest: Option<String>,
    pub metrics: IndexMap<String, f64>,
    pub params: IndexMap<String, ParamValue>,
}

impl RunRecord {
    fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            started_at: Utc::now(),
            model_digest: None,
            metrics: IndexMap::new(),
            params: IndexMap::new(),
        }
    }
}

/// Destination for finished runs.
pub trait TrackingBackend {
    fn write_run(&mut self, run: &RunRecord) -> Result<()>;
}

/// Scoped tracking session. The run is flushed to the backend by
/// [`TrackingSession::finish`], or on drop if the scope is left early.
pub struct TrackingSession<'a> {
    backend: &'a mut dyn TrackingBackend,
    record: RunRecord,
    finished: bool,
}

impl<'a> TrackingSession<'a> {
    pub fn open(backend: &'a mut dyn TrackingBackend) -> Self {
        let record = RunRecord::new();
        debug!(run_id = %record.run_id, "Tracking session opened");
        Self {
            backend,
            record,
            finished: false,
        }
    }

    pub fn run_id(&self) -> uuid::Uuid {
        self.record.run_id
    }

    pub fn set_model_digest(&mut self, digest: impl Into<String>) {
        self.record.model_digest = Some(digest.into());
    }

    pub fn log_metric(&mut self, name: impl Into<String>, value: f64) {
        self.record.metrics.insert(name.into(), value);
    }

    pub fn log_param(&mut self, name: impl Into<String>, value: ParamValue) {
        self.record.params.insert(name.into(), value);
    }

    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.backend.write_run(&self.record)?;
        debug!(
            run_id = %self.record.run_id,
            metrics = self.record.metrics.len(),
            params = self.record.params.len(),
            "Tracking session closed"
        );
        Ok(())
    }
}

impl Drop for TrackingSession<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(run_id = %self.record.run_id, "Failed to flush tracking session: {}", e);
        }
    }
}

/// Live-logger directory layout: latest `metrics.json` and `params.yaml`,
/// plus one JSON line per run in `runs.jsonl`.
pub struct LiveDir {
    dir: PathBuf,
}

impl LiveDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> EvalError {
    let path = path.to_path_buf();
    move |source| EvalError::Io {
        path: path.clone(),
        source,
    }
}

impl TrackingBackend for LiveDir {
    fn write_run(&mut self, run: &RunRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let metrics_path = self.dir.join("metrics.json");
        let metrics = serde_json::to_vec_pretty(&run.metrics)
            .map_err(|e| EvalError::Serialization(e.to_string()))?;
        std::fs::write(&metrics_path, metrics).map_err(io_err(&metrics_path))?;

        let params_path = self.dir.join("params.yaml");
        let params = serde_yaml::to_string(&run.params)
            .map_err(|e| EvalError::Serialization(e.to_string()))?;
        std::fs::write(&params_path, params).map_err(io_err(&params_path))?;

        let runs_path = self.dir.join("runs.jsonl");
        let mut line =
            serde_json::to_vec(run).map_err(|e| EvalError::Serialization(e.to_string()))?;
        line.push(b'\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&runs_path)
            .and_then(|mut f| f.write_all(&line))
            .map_err(io_err(&runs_path))?;
        Ok(())
    }
}

/// Keeps finished runs in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryBackend {
    pub runs: Vec<RunRecord>,
    pub fail_writes: bool,
}

#[cfg(test)]
impl TrackingBackend for MemoryBackend {
    fn write_run(&mut self, run: &RunRecord) -> Result<()> {
        if self.fail_writes {
            return Err(EvalError::Unexpected("tracking store unavailable".into()));
        }
        self.runs.push(run.clone());
        Ok(())
    }
}
