use ndarray::{ArrayView1, ArrayView2};
use tracing::{error, info};

use crate::error::{EvalError, Result};
use crate::metrics::{compute_metrics, MetricsResult};
use crate::model::Classifier;
use crate::params::Params;
use crate::tracking::{TrackingBackend, TrackingSession};

const POSITIVE_CLASS_COLUMN: usize = 1;

/// Runs a classifier over a test split and records the outcome.
pub struct Evaluator<'a> {
    params: &'a Params,
    model_digest: Option<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self {
            params,
            model_digest: None,
        }
    }

    pub fn with_model_digest(mut self, digest: impl Into<String>) -> Self {
        self.model_digest = Some(digest.into());
        self
    }

    pub fn evaluate(
        &self,
        model: &dyn Classifier,
        x_test: ArrayView2<'_, f64>,
        y_test: ArrayView1<'_, f64>,
        tracker: &mut dyn TrackingBackend,
    ) -> Result<MetricsResult> {
        let result = self.run(model, x_test, y_test, tracker);
        match result {
            Ok(metrics) => Ok(metrics),
            Err(e @ EvalError::IncompatibleModel(_)) => {
                error!("Error: Model does not have the required methods. Details: {}", e);
                Err(e)
            }
            Err(e @ EvalError::MetricComputation(_)) => {
                error!(
                    "Error: Value error in predictions or metrics calculation. Details: {}",
                    e
                );
                Err(e)
            }
            Err(e) => {
                error!("An unexpected error occurred while evaluating the model: {}", e);
                Err(EvalError::Unexpected(e.to_string()))
            }
        }
    }

    fn run(
        &self,
        model: &dyn Classifier,
        x_test: ArrayView2<'_, f64>,
        y_test: ArrayView1<'_, f64>,
        tracker: &mut dyn TrackingBackend,
    ) -> Result<MetricsResult> {
        let y_pred = model.predict(x_test)?;
        let proba = model.predict_proba(x_test)?;
        if proba.ncols() <= POSITIVE_CLASS_COLUMN {
            return Err(EvalError::incompatible(format!(
                "{} returned {} probability column(s), expected [negative, positive]",
                model.name(),
                proba.ncols()
            )));
        }
        let y_score = proba.column(POSITIVE_CLASS_COLUMN);

        let metrics = compute_metrics(y_test, y_pred.view(), y_score)?;

        let mut session = TrackingSession::open(tracker);
        if let Some(digest) = &self.model_digest {
            session.set_model_digest(digest.clone());
        }
        for (name, value) in metrics.named() {
            session.log_metric(name, value);
        }
        for (name, value) in self.params.flatten() {
            session.log_param(name, value);
        }
        let run_id = session.run_id();
        session.finish()?;

        info!(
            run_id = %run_id,
            model = model.name(),
            samples = y_test.len(),
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            auc = metrics.auc,
            "Model evaluated"
        );
        Ok(metrics)
    }
}
