use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{check_feature_count, Classifier};
use crate::error::{EvalError, Result};

/// One node of a regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Rows with `x[feature] <= threshold` go to `left`, the rest to `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn leaf_value(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        let mut index = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = row.get(*feature).ok_or_else(|| {
                        EvalError::incompatible(format!(
                            "tree splits on feature {} but rows have {}",
                            feature,
                            row.len()
                        ))
                    })?;
                    index = if *x <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }
        Err(EvalError::incompatible(format!(
            "malformed regression tree: no leaf reached from node {}",
            index
        )))
    }
}

/// Binary gradient-boosted trees on the log-odds scale:
/// `P(1) = sigmoid(init + learning_rate * sum(tree(x)))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub n_features: usize,
    pub init: f64,
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    fn raw_score(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.leaf_value(row)?;
        }
        Ok(self.init + self.learning_rate * sum)
    }
}

impl Classifier for GradientBoosting {
    fn name(&self) -> &str {
        "gradient_boosting"
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        check_feature_count(self.name(), self.n_features, &x)?;
        let mut proba = Array2::zeros((x.nrows(), 2));
        for (mut out, row) in proba.rows_mut().into_iter().zip(x.rows()) {
            let p = 1.0 / (1.0 + (-self.raw_score(row)?).exp());
            out[0] = 1.0 - p;
            out[1] = p;
        }
        Ok(proba)
    }
}
