pub mod dummy;
pub mod gradient_boosting;
pub mod logistic;
pub mod naive_bayes;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, error};

use crate::error::{EvalError, Result};

pub use dummy::DummyClassifier;
pub use gradient_boosting::GradientBoosting;
pub use logistic::LogisticRegression;
pub use naive_bayes::MultinomialNb;

/// A trained binary classifier over dense feature rows.
///
/// Probability rows are ordered `[negative, positive]`. Implementations only
/// need one of the two methods for `predict` to work, since the default
/// `predict` takes the argmax of `predict_proba`.
pub trait Classifier {
    fn name(&self) -> &str;

    fn predict_proba(&self, _x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        Err(EvalError::incompatible(format!(
            "{} does not provide predict_proba",
            self.name()
        )))
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x).map_err(|e| match e {
            EvalError::IncompatibleModel(_) => EvalError::incompatible(format!(
                "{} provides neither predict nor predict_proba",
                self.name()
            )),
            other => other,
        })?;
        Ok(proba.map_axis(Axis(1), |row| argmax(row.iter().copied()) as f64))
    }
}

/// Index of the largest value, first one wins on ties.
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, v) in values.enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best.0
}

pub(crate) fn check_feature_count(model: &str, expected: usize, x: &ArrayView2<'_, f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(EvalError::incompatible(format!(
            "{} was trained on {} features but the test data has {}",
            model,
            expected,
            x.ncols()
        )));
    }
    Ok(())
}

/// On-disk model artifact, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    GradientBoosting(GradientBoosting),
    LogisticRegression(LogisticRegression),
    MultinomialNb(MultinomialNb),
    Dummy(DummyClassifier),
}

impl ModelArtifact {
    pub fn into_classifier(self) -> Box<dyn Classifier> {
        match self {
            ModelArtifact::GradientBoosting(m) => Box::new(m),
            ModelArtifact::LogisticRegression(m) => Box::new(m),
            ModelArtifact::MultinomialNb(m) => Box::new(m),
            ModelArtifact::Dummy(m) => Box::new(m),
        }
    }
}

pub struct LoadedModel {
    pub classifier: Box<dyn Classifier>,
    /// Hex SHA-256 of the artifact bytes.
    pub digest: String,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("classifier", &self.classifier.name())
            .field("digest", &self.digest)
            .finish()
    }
}

pub fn decode_model(path: &Path, bytes: &[u8]) -> Result<LoadedModel> {
    let artifact: ModelArtifact =
        serde_json::from_slice(bytes).map_err(|e| EvalError::Deserialization {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(LoadedModel {
        classifier: artifact.into_classifier(),
        digest: hex::encode(Sha256::digest(bytes)),
    })
}

pub fn load_model(path: &Path) -> Result<LoadedModel> {
    let result = std::fs::read(path)
        .map_err(|e| EvalError::from_read("model artifact", path, e))
        .and_then(|bytes| decode_model(path, &bytes));

    match &result {
        Ok(model) => debug!(
            path = %path.display(),
            model = model.classifier.name(),
            sha256 = %model.digest,
            "Model artifact loaded"
        ),
        Err(e @ EvalError::NotFound { .. }) => error!("Error: {}", e),
        Err(e @ EvalError::Deserialization { .. }) => error!(
            "Error: The file could not be deserialized. It may not be a valid model artifact. {}",
            e
        ),
        Err(e) => error!("An unexpected error occurred while loading the model: {}", e),
    }
    result
}
