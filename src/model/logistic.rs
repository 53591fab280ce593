use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{check_feature_count, Classifier};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        check_feature_count(self.name(), self.coefficients.len(), &x)?;
        let weights = Array1::from(self.coefficients.clone());
        Ok(x.dot(&weights) + self.intercept)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        Ok(self
            .decision_function(x)?
            .mapv(|z| if z > 0.0 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let decision = self.decision_function(x)?;
        let mut proba = Array2::zeros((decision.len(), 2));
        for (mut row, z) in proba.rows_mut().into_iter().zip(decision.iter()) {
            let p = sigmoid(*z);
            row[0] = 1.0 - p;
            row[1] = p;
        }
        Ok(proba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use ndarray::array;

    fn model() -> LogisticRegression {
        LogisticRegression {
            coefficients: vec![2.0, -1.0],
            intercept: -0.5,
        }
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let proba = model().predict_proba(array![[1.0, 0.0], [0.0, 3.0]].view()).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert!((proba[[0, 1]] - sigmoid(1.5)).abs() < 1e-12);
    }

    #[test]
    fn test_predict_uses_decision_sign() {
        let labels = model().predict(array![[1.0, 0.0], [0.0, 3.0], [0.25, 0.0]].view()).unwrap();
        assert_eq!(labels.to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let err = model().predict(array![[1.0, 0.0, 4.0]].view()).unwrap_err();
        assert!(matches!(err, EvalError::IncompatibleModel(_)));
    }
}
