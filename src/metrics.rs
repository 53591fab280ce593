use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, warn};

use crate::error::{EvalError, Result};

const POSITIVE: f64 = 1.0;
const NEGATIVE: f64 = 0.0;

/// The four headline metrics of one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub auc: f64,
}

impl MetricsResult {
    /// Names used when recording to a tracking session.
    pub fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("roc_auc", self.auc),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

fn check_binary(name: &str, values: ArrayView1<'_, f64>) -> Result<()> {
    if let Some(bad) = values.iter().find(|v| **v != POSITIVE && **v != NEGATIVE) {
        return Err(EvalError::metric(format!(
            "{} must contain only 0/1 labels, found {}",
            name, bad
        )));
    }
    Ok(())
}

fn check_lengths(y_true: ArrayView1<'_, f64>, other: ArrayView1<'_, f64>, what: &str) -> Result<()> {
    if y_true.len() != other.len() {
        return Err(EvalError::metric(format!(
            "found input variables with inconsistent numbers of samples: {} labels vs {} {}",
            y_true.len(),
            other.len(),
            what
        )));
    }
    if y_true.is_empty() {
        return Err(EvalError::metric("cannot compute metrics on zero samples"));
    }
    Ok(())
}

pub fn confusion_counts(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> Result<ConfusionCounts> {
    check_lengths(y_true, y_pred, "predictions")?;
    check_binary("y_true", y_true)?;
    check_binary("y_pred", y_pred)?;

    let mut counts = ConfusionCounts::default();
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t == POSITIVE, *p == POSITIVE) {
            (true, true) => counts.tp += 1,
            (false, false) => counts.tn += 1,
            (false, true) => counts.fp += 1,
            (true, false) => counts.fn_ += 1,
        }
    }
    Ok(counts)
}

pub fn accuracy(counts: &ConfusionCounts) -> f64 {
    (counts.tp + counts.tn) as f64 / counts.total() as f64
}

/// Positive-class precision. Zero predicted positives yields 0.0.
pub fn precision(counts: &ConfusionCounts) -> f64 {
    let predicted = counts.tp + counts.fp;
    if predicted == 0 {
        warn!("Precision is ill-defined with no predicted positive samples, using 0.0");
        return 0.0;
    }
    counts.tp as f64 / predicted as f64
}

/// Positive-class recall. Zero actual positives yields 0.0.
pub fn recall(counts: &ConfusionCounts) -> f64 {
    let actual = counts.tp + counts.fn_;
    if actual == 0 {
        warn!("Recall is ill-defined with no true positive samples, using 0.0");
        return 0.0;
    }
    counts.tp as f64 / actual as f64
}

/// Area under the ROC curve via the rank statistic, averaging ranks of tied
/// scores so the result equals the trapezoidal ROC area.
pub fn roc_auc(y_true: ArrayView1<'_, f64>, scores: ArrayView1<'_, f64>) -> Result<f64> {
    check_lengths(y_true, scores, "scores")?;
    check_binary("y_true", y_true)?;
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(EvalError::metric(format!(
            "probability scores must be finite, found {}",
            bad
        )));
    }

    let n_pos = y_true.iter().filter(|v| **v == POSITIVE).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(EvalError::metric(
            "only one class present in y_true, ROC AUC score is not defined in that case",
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; a tie group shares the mean of its ranks
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            if y_true[idx] == POSITIVE {
                positive_rank_sum += rank;
            }
        }
        start = end + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

pub fn compute_metrics(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
    y_score: ArrayView1<'_, f64>,
) -> Result<MetricsResult> {
    let counts = confusion_counts(y_true, y_pred)?;
    Ok(MetricsResult {
        accuracy: accuracy(&counts),
        precision: precision(&counts),
        recall: recall(&counts),
        auc: roc_auc(y_true, y_score)?,
    })
}

pub fn to_pretty_json(metrics: &MetricsResult) -> Result<Vec<u8>> {
    if let Some((name, value)) = metrics.named().into_iter().find(|(_, v)| !v.is_finite()) {
        return Err(EvalError::Serialization(format!(
            "{} is not a finite number ({})",
            name, value
        )));
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    metrics
        .serialize(&mut ser)
        .map_err(|e| EvalError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source: std::io::Error| EvalError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

pub fn save_metrics(metrics: &MetricsResult, path: &Path) -> Result<()> {
    let result = to_pretty_json(metrics).and_then(|bytes| write_atomic(path, &bytes));

    match &result {
        Ok(()) => debug!(path = %path.display(), "Metrics written"),
        Err(e @ EvalError::Io { .. }) => {
            error!("Error: An I/O error occurred while saving the metrics: {}", e)
        }
        Err(e @ EvalError::Serialization(_)) => {
            error!("Error: Type error in metrics dictionary. Details: {}", e)
        }
        Err(e) => error!("An unexpected error occurred while saving metrics: {}", e),
    }
    result
}

#[cfg(test)]
pub fn load_metrics(path: &Path) -> Result<MetricsResult> {
    let content =
        std::fs::read_to_string(path).map_err(|e| EvalError::from_read("metrics file", path, e))?;
    serde_json::from_str(&content).map_err(|e| EvalError::parse(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_all_positive_predictor() {
        let y_true = array![1.0, 1.0, 0.0, 1.0];
        let y_pred = array![1.0, 1.0, 1.0, 1.0];
        let y_score = array![0.9, 0.9, 0.9, 0.9];

        let m = compute_metrics(y_true.view(), y_pred.view(), y_score.view()).unwrap();
        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.precision, 0.75);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.auc, 0.5);
    }

    #[test]
    fn test_perfect_predictions() {
        let y = array![0.0, 1.0, 1.0, 0.0, 1.0];
        let score = array![0.1, 0.8, 0.7, 0.3, 0.95];
        let m = compute_metrics(y.view(), y.view(), score.view()).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.auc, 1.0);
    }

    #[test]
    fn test_accuracy_below_one_on_any_mismatch() {
        let y = array![0.0, 1.0, 1.0, 0.0];
        let pred = array![0.0, 1.0, 0.0, 0.0];
        let counts = confusion_counts(y.view(), pred.view()).unwrap();
        assert!(accuracy(&counts) < 1.0);
        assert_eq!(
            counts,
            ConfusionCounts {
                tp: 1,
                tn: 2,
                fp: 0,
                fn_: 1
            }
        );
    }

    #[test]
    fn test_zero_division_yields_zero() {
        let y = array![0.0, 0.0, 1.0];
        let pred = array![0.0, 0.0, 0.0];
        let counts = confusion_counts(y.view(), pred.view()).unwrap();
        assert_eq!(precision(&counts), 0.0);

        let y = array![0.0, 0.0];
        let counts = confusion_counts(y.view(), pred.slice(ndarray::s![..2])).unwrap();
        assert_eq!(recall(&counts), 0.0);
    }

    #[test]
    fn test_roc_auc_known_value() {
        // sklearn: roc_auc_score([0, 0, 1, 1], [0.1, 0.4, 0.35, 0.8]) == 0.75
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(y.view(), s.view()).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_partial_ties() {
        // one positive tied with one negative contributes half a pair
        let y = array![0.0, 1.0, 0.0, 1.0];
        let s = array![0.2, 0.5, 0.5, 0.9];
        assert!((roc_auc(y.view(), s.view()).unwrap() - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class() {
        let y = array![1.0, 1.0];
        let s = array![0.2, 0.4];
        assert!(matches!(
            roc_auc(y.view(), s.view()),
            Err(EvalError::MetricComputation(_))
        ));
    }

    #[test]
    fn test_roc_auc_rejects_nan_scores() {
        let y = array![0.0, 1.0];
        let s = array![0.2, f64::NAN];
        assert!(roc_auc(y.view(), s.view()).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let y = array![0.0, 1.0, 1.0];
        let pred = array![0.0, 1.0];
        assert!(matches!(
            confusion_counts(y.view(), pred.view()),
            Err(EvalError::MetricComputation(_))
        ));
    }

    #[test]
    fn test_non_binary_labels() {
        let y = array![0.0, 1.0, 2.0];
        let pred = array![0.0, 1.0, 1.0];
        let err = confusion_counts(y.view(), pred.view()).unwrap_err();
        assert!(err.to_string().contains("0/1"));
    }

    #[test]
    fn test_metrics_stay_in_unit_interval() {
        let y = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let pred = array![0.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        let score = array![0.3, 0.6, 0.9, 0.6, 0.1, 0.2];
        let m = compute_metrics(y.view(), pred.view(), score.view()).unwrap();
        for (_, v) in m.named() {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_pretty_json_layout() {
        let m = MetricsResult {
            accuracy: 0.75,
            precision: 0.75,
            recall: 1.0,
            auc: 0.5,
        };
        let json = String::from_utf8(to_pretty_json(&m).unwrap()).unwrap();
        assert_eq!(
            json,
            "{\n    \"accuracy\": 0.75,\n    \"precision\": 0.75,\n    \"recall\": 1.0,\n    \"auc\": 0.5\n}"
        );
    }

    #[test]
    fn test_non_finite_is_serialization_error() {
        let m = MetricsResult {
            accuracy: f64::NAN,
            precision: 0.0,
            recall: 0.0,
            auc: 0.0,
        };
        assert!(matches!(to_pretty_json(&m), Err(EvalError::Serialization(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reports").join("metrics.json");
        let m = MetricsResult {
            accuracy: 0.9375,
            precision: 0.875,
            recall: 1.0,
            auc: 0.96875,
        };

        save_metrics(&m, &path).unwrap();
        assert_eq!(load_metrics(&path).unwrap(), m);
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("metrics.json");
        std::fs::write(&path, "stale content that is longer than the new payload ".repeat(10)).unwrap();

        let m = MetricsResult {
            accuracy: 1.0,
            precision: 1.0,
            recall: 1.0,
            auc: 1.0,
        };
        save_metrics(&m, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert_eq!(load_metrics(&path).unwrap(), m);
    }
}
