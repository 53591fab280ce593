use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LoadModel,
    LoadData,
    LoadParams,
    Evaluate,
    SaveMetrics,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::LoadModel,
        Stage::LoadData,
        Stage::LoadParams,
        Stage::Evaluate,
        Stage::SaveMetrics,
    ];

    /// Debug line emitted once the stage succeeds.
    fn done_message(self) -> &'static str {
        match self {
            Stage::LoadModel => "Saved model loaded successfully",
            Stage::LoadData => "Test data loaded successfully",
            Stage::LoadParams => "Parameters loaded successfully",
            Stage::Evaluate => "Model evaluation metrics computed successfully",
            Stage::SaveMetrics => "Metrics JSON written successfully",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadModel => "load_model",
            Stage::LoadData => "load_data",
            Stage::LoadParams => "load_params",
            Stage::Evaluate => "evaluate",
            Stage::SaveMetrics => "save_metrics",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub succeeded: bool,
    pub elapsed_ms: u64,
}

/// Per-run bookkeeping of which stages ran and how long they took.
pub struct EvaluationProgress {
    started_at: Instant,
    records: Vec<StageRecord>,
}

impl EvaluationProgress {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            records: Vec::new(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    #[cfg(test)]
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn completed_stages(&self) -> usize {
        self.records.iter().filter(|r| r.succeeded).count()
    }

    pub fn progress_percent(&self) -> f64 {
        (self.completed_stages() as f64 / Stage::ALL.len() as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        self.records.iter().find(|r| !r.succeeded).map(|r| r.stage)
    }

    /// Run one stage, recording its outcome and timing.
    pub fn run_stage<T, E>(
        &mut self,
        stage: Stage,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        debug!(stage = %stage, "Beginning pipeline stage");
        let start = Instant::now();
        let result = f();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => debug!(stage = %stage, elapsed_ms, "{}", stage.done_message()),
            Err(_) => debug!(stage = %stage, elapsed_ms, "Pipeline stage failed"),
        }
        self.records.push(StageRecord {
            stage,
            succeeded: result.is_ok(),
            elapsed_ms,
        });
        result
    }

    /// The failing stage has already been logged as an error, so an aborted
    /// run is summarized at `info` to keep `errors.log` at one line per failure.
    pub fn summarize(&self) {
        match self.failed_stage() {
            None => info!(
                elapsed_ms = self.elapsed_ms(),
                stages_completed = self.completed_stages(),
                progress_percent = self.progress_percent(),
                "Evaluation pipeline completed"
            ),
            Some(stage) => info!(
                elapsed_ms = self.elapsed_ms(),
                stages_completed = self.completed_stages(),
                progress_percent = self.progress_percent(),
                failed_stage = %stage,
                "Evaluation pipeline aborted"
            ),
        }
    }
}

impl Default for EvaluationProgress {
    fn default() -> Self {
        Self::new()
    }
}
