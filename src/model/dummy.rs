use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{argmax, Classifier};
use crate::error::{EvalError, Result};

/// Baseline that ignores the features.
///
/// With `constant` set it always predicts that label; otherwise it predicts
/// the most frequent training class and reports `class_prior` for every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyClassifier {
    #[serde(default = "uniform_prior")]
    pub class_prior: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<u8>,
}

fn uniform_prior() -> [f64; 2] {
    [0.5, 0.5]
}

impl DummyClassifier {
    #[cfg(test)]
    pub fn constant(label: u8) -> Self {
        Self {
            class_prior: uniform_prior(),
            constant: Some(label),
        }
    }

    fn constant_label(&self) -> Result<Option<usize>> {
        match self.constant {
            None => Ok(None),
            Some(label @ (0 | 1)) => Ok(Some(label as usize)),
            Some(other) => Err(EvalError::incompatible(format!(
                "{} constant label must be 0 or 1, got {}",
                self.name(),
                other
            ))),
        }
    }
}

impl Classifier for DummyClassifier {
    fn name(&self) -> &str {
        "dummy"
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let label = match self.constant_label()? {
            Some(label) => label,
            None => argmax(self.class_prior.iter().copied()),
        };
        Ok(Array1::from_elem(x.nrows(), label as f64))
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let row = match self.constant_label()? {
            Some(label) => {
                let mut one_hot = [0.0; 2];
                one_hot[label] = 1.0;
                one_hot
            }
            None => self.class_prior,
        };
        Ok(Array2::from_shape_fn((x.nrows(), 2), |(_, j)| row[j]))
    }
}
