use anyhow::{Context, Result};
use tracing::info;

use super::evaluator::Evaluator;
use super::progress::{EvaluationProgress, Stage};
use crate::config::Config;
use crate::metrics::{save_metrics, MetricsResult};
use crate::tracking::LiveDir;
use crate::{dataset, model, params};

/// Load model and data, evaluate, record, and write the metrics summary.
pub struct EvaluationPipeline {
    config: Config,
}

impl EvaluationPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<MetricsResult> {
        let mut progress = EvaluationProgress::new();
        let result = self.run_stages(&mut progress);
        progress.summarize();
        result
    }

    fn run_stages(&self, progress: &mut EvaluationProgress) -> Result<MetricsResult> {
        let cfg = &self.config;

        let loaded = progress
            .run_stage(Stage::LoadModel, || model::load_model(&cfg.model_path))
            .context("Failed to load model")?;

        let table = progress
            .run_stage(Stage::LoadData, || dataset::load_data(&cfg.data_dir))
            .context("Failed to load test data")?;
        let (x_test, y_test) = table
            .split_label()
            .context("Failed to split test data into features and labels")?;

        let hyperparams = progress
            .run_stage(Stage::LoadParams, || params::load_params(&cfg.params_path))
            .context("Failed to load parameters")?;

        let mut tracker = LiveDir::new(&cfg.tracking_dir);
        let metrics = progress
            .run_stage(Stage::Evaluate, || {
                Evaluator::new(&hyperparams)
                    .with_model_digest(loaded.digest.as_str())
                    .evaluate(
                        loaded.classifier.as_ref(),
                        x_test.view(),
                        y_test.view(),
                        &mut tracker,
                    )
            })
            .context("Failed to evaluate model")?;

        progress
            .run_stage(Stage::SaveMetrics, || save_metrics(&metrics, &cfg.metrics_path))
            .context("Failed to save metrics")?;

        info!(
            path = %cfg.metrics_path.display(),
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            auc = metrics.auc,
            "Metrics saved"
        );
        Ok(metrics)
    }
}
