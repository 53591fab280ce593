use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{check_feature_count, Classifier};
use crate::error::{EvalError, Result};

/// Multinomial naive Bayes over token counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultinomialNb {
    pub class_log_prior: [f64; 2],
    /// Per-class log P(feature | class), one row per class.
    pub feature_log_prob: [Vec<f64>; 2],
}

impl MultinomialNb {
    fn joint_log_likelihood(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let n_features = self.feature_log_prob[0].len();
        if self.feature_log_prob[1].len() != n_features {
            return Err(EvalError::incompatible(format!(
                "{} has {} and {} feature log-probabilities per class",
                self.name(),
                n_features,
                self.feature_log_prob[1].len()
            )));
        }
        check_feature_count(self.name(), n_features, &x)?;

        let mut jll = Array2::zeros((x.nrows(), 2));
        for (class, log_prob) in self.feature_log_prob.iter().enumerate() {
            let log_prob = Array1::from(log_prob.clone());
            let scores = x.dot(&log_prob) + self.class_log_prior[class];
            jll.column_mut(class).assign(&scores);
        }
        Ok(jll)
    }
}

impl Classifier for MultinomialNb {
    fn name(&self) -> &str {
        "multinomial_nb"
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut jll = self.joint_log_likelihood(x)?;
        for mut row in jll.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            let log_norm = max + row.mapv(|v| (v - max).exp()).sum().ln();
            row.mapv_inplace(|v| (v - log_norm).exp());
        }
        Ok(jll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn spam_model() -> MultinomialNb {
        // features: ["free", "meeting"]
        MultinomialNb {
            class_log_prior: [0.6f64.ln(), 0.4f64.ln()],
            feature_log_prob: [vec![0.2f64.ln(), 0.8f64.ln()], vec![0.9f64.ln(), 0.1f64.ln()]],
        }
    }

    #[test]
    fn test_predict_proba_matches_bayes_rule() {
        let proba = spam_model().predict_proba(array![[1.0, 0.0]].view()).unwrap();
        let ham = 0.6 * 0.2;
        let spam = 0.4 * 0.9;
        assert!((proba[[0, 1]] - spam / (ham + spam)).abs() < 1e-12);
        assert!((proba[[0, 0]] + proba[[0, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_predict() {
        let labels = spam_model()
            .predict(array![[3.0, 0.0], [0.0, 2.0]].view())
            .unwrap();
        assert_eq!(labels.to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_large_counts_stay_finite() {
        let proba = spam_model().predict_proba(array![[900.0, 0.0]].view()).unwrap();
        assert!(proba.iter().all(|p| p.is_finite()));
        assert!((proba[[0, 1]] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_class_rows() {
        let mut model = spam_model();
        model.feature_log_prob[1].push(0.0);
        let err = model.predict_proba(array![[1.0, 0.0]].view()).unwrap_err();
        assert!(matches!(err, EvalError::IncompatibleModel(_)));
    }
}
