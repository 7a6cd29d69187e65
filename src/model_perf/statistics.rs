//! Classification statistics over label slices. Slices must be of equal length, checked entry
//! points return `DataVectorLengthMismatch` otherwise. Ratios with a zero denominator are 0.

use crate::config::{TopK, LOG_LOSS_EPS};
use crate::data_handler::{sorted_union, Label};
use crate::errors::MetricError;
use crate::zip_iters;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[inline]
pub(crate) fn ratio(num: f64, denom: f64) -> f64 {
    if denom == 0_f64 {
        0_f64
    } else {
        num / denom
    }
}

/// 2PR / (P + R), 0 when both are 0.
#[inline]
pub fn f1_from(precision: f64, recall: f64) -> f64 {
    ratio(2_f64 * precision * recall, precision + recall)
}

pub(crate) fn check_lengths<A, B>(a: &[A], b: &[B]) -> Result<(), MetricError> {
    if a.len() != b.len() {
        return Err(MetricError::DataVectorLengthMismatch);
    }
    Ok(())
}

/// Fraction of exact matches.
pub fn accuracy(y_true: &[Label], y_pred: &[Label]) -> Result<f64, MetricError> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Err(MetricError::EmptyDataset("target".into()));
    }
    let correct = zip_iters!(y_true, y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// TP / TP + FP with `label` as the positive class.
pub fn precision_for_label(y_true: &[Label], y_pred: &[Label], label: &Label) -> f64 {
    let mut tp = 0_f64;
    let mut predicted = 0_f64;
    for (t, p) in zip_iters!(y_true, y_pred) {
        if p == label {
            predicted += 1_f64;
            if t == label {
                tp += 1_f64;
            }
        }
    }
    ratio(tp, predicted)
}

/// TP / TP + FN with `label` as the positive class.
pub fn recall_for_label(y_true: &[Label], y_pred: &[Label], label: &Label) -> f64 {
    let mut tp = 0_f64;
    let mut actual = 0_f64;
    for (t, p) in zip_iters!(y_true, y_pred) {
        if t == label {
            actual += 1_f64;
            if p == label {
                tp += 1_f64;
            }
        }
    }
    ratio(tp, actual)
}

/// Unweighted mean of per-class precision, recall and F1 over every observed label.
pub fn macro_scores(y_true: &[Label], y_pred: &[Label]) -> Result<(f64, f64, f64), MetricError> {
    check_lengths(y_true, y_pred)?;
    let labels = sorted_union(y_true, y_pred);
    if labels.is_empty() {
        return Err(MetricError::EmptyDataset("target".into()));
    }
    let n = labels.len() as f64;
    let (mut p_sum, mut r_sum, mut f_sum) = (0_f64, 0_f64, 0_f64);
    for label in labels.iter() {
        let p = precision_for_label(y_true, y_pred, label);
        let r = recall_for_label(y_true, y_pred, label);
        p_sum += p;
        r_sum += r;
        f_sum += f1_from(p, r);
    }
    Ok((p_sum / n, r_sum / n, f_sum / n))
}

/// One-hot encodes `target` against `labels`; a target outside `labels` yields a zero row.
pub fn binarize_target(target: &[Label], labels: &[Label]) -> Vec<Vec<f64>> {
    target
        .iter()
        .map(|t| {
            labels
                .iter()
                .map(|l| if l == t { 1_f64 } else { 0_f64 })
                .collect()
        })
        .collect()
}

/// Mean negative log-likelihood of one-hot rows under row-normalised, clipped probabilities.
pub fn log_loss(y_onehot: &[Vec<f64>], probas: &[Vec<f64>]) -> Result<f64, MetricError> {
    check_lengths(y_onehot, probas)?;
    if probas.is_empty() {
        return Err(MetricError::EmptyDataset("prediction probabilities".into()));
    }
    let mut total = 0_f64;
    for (y_row, p_row) in zip_iters!(y_onehot, probas) {
        check_lengths(y_row, p_row)?;
        let row_sum: f64 = p_row.iter().sum();
        for (y, p) in zip_iters!(y_row, p_row) {
            let p = if row_sum > 0_f64 { p / row_sum } else { *p };
            let p = p.clamp(LOG_LOSS_EPS, 1_f64 - LOG_LOSS_EPS);
            total -= y * p.ln();
        }
    }
    Ok(total / probas.len() as f64)
}

/// Area under the ROC curve by the rank statistic, ties sharing their mean rank. `None` when
/// only one class is present.
pub fn roc_auc_score(y_true: &[bool], scores: &[f64]) -> Option<f64> {
    if y_true.len() != scores.len() {
        return None;
    }
    let n_pos = y_true.iter().filter(|t| **t).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| scores[*a].total_cmp(&scores[*b]));

    let mut pos_rank_sum = 0_f64;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based, ties share the mean rank of the group
        let mean_rank = (start + end) as f64 / 2_f64 + 1_f64;
        for idx in order[start..=end].iter() {
            if y_true[*idx] {
                pos_rank_sum += mean_rank;
            }
        }
        start = end + 1;
    }

    let n_pos_f = n_pos as f64;
    Some((pos_rank_sum - n_pos_f * (n_pos_f + 1_f64) / 2_f64) / (n_pos_f * n_neg as f64))
}

/// Macro one-vs-rest ROC AUC over probability columns. Columns whose binarized target is
/// constant are skipped.
pub fn macro_roc_auc(y_onehot: &[Vec<f64>], probas: &[Vec<f64>]) -> Option<f64> {
    let n_cols = probas.first().map(|r| r.len())?;
    let mut scores: Vec<f64> = Vec::with_capacity(n_cols);
    for col in 0..n_cols {
        let truth: Vec<bool> = y_onehot.iter().map(|r| r[col] > 0.5_f64).collect();
        let col_scores: Vec<f64> = probas.iter().map(|r| r[col]).collect();
        if let Some(auc) = roc_auc_score(&truth, &col_scores) {
            scores.push(auc);
        }
    }
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Probability cut-off that marks the top-k scored rows as positive.
pub fn k_probability_threshold(pos_probas: &[f64], k: TopK) -> Result<f64, MetricError> {
    if pos_probas.is_empty() {
        return Err(MetricError::EmptyDataset("prediction probabilities".into()));
    }
    let mut sorted = pos_probas.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let n = sorted.len();

    let index = match k {
        TopK::Fraction(f) => {
            if !(0_f64..=1_f64).contains(&f) {
                return Err(MetricError::InvalidTopK(k.to_string()));
            }
            ((n as f64 * f).ceil() as usize).saturating_sub(1)
        }
        TopK::Count(c) => {
            if c == 0 || c > n {
                return Err(MetricError::InvalidTopK(k.to_string()));
            }
            c - 1
        }
    };
    Ok(sorted[index.min(n - 1)])
}

/// Positive label where the positive probability reaches `threshold`, negative otherwise.
pub fn threshold_probability_labels(
    pos_probas: &[f64],
    pos_label: &Label,
    neg_label: &Label,
    threshold: f64,
) -> Vec<Label> {
    pos_probas
        .iter()
        .map(|p| {
            if *p >= threshold {
                pos_label.clone()
            } else {
                neg_label.clone()
            }
        })
        .collect()
}

/// Precision, recall and F1 of one class. `support` is absent for entries rebuilt from
/// corrected scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub support: Option<usize>,
}

/// Per-class report keyed by the label's display form, followed by `accuracy`, `macro avg` and
/// `weighted avg` when computed. Serialises as a flat map in that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsMatrix {
    pub classes: Vec<(String, ClassMetrics)>,
    pub accuracy: Option<f64>,
    pub macro_avg: Option<ClassMetrics>,
    pub weighted_avg: Option<ClassMetrics>,
}

impl MetricsMatrix {
    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, m)| m)
    }
}

impl Serialize for MetricsMatrix {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let extra = self.accuracy.is_some() as usize
            + self.macro_avg.is_some() as usize
            + self.weighted_avg.is_some() as usize;
        let mut map = serializer.serialize_map(Some(self.classes.len() + extra))?;
        for (name, metrics) in self.classes.iter() {
            map.serialize_entry(name, metrics)?;
        }
        if let Some(acc) = self.accuracy {
            map.serialize_entry("accuracy", &acc)?;
        }
        if let Some(avg) = &self.macro_avg {
            map.serialize_entry("macro avg", avg)?;
        }
        if let Some(avg) = &self.weighted_avg {
            map.serialize_entry("weighted avg", avg)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetricsMatrix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MatrixVisitor;

        impl<'de> Visitor<'de> for MatrixVisitor {
            type Value = MetricsMatrix;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a classification report map")
            }

            fn visit_map<A>(self, mut access: A) -> Result<MetricsMatrix, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut matrix = MetricsMatrix::default();
                while let Some(key) = access.next_key::<String>()? {
                    match key.as_str() {
                        "accuracy" => matrix.accuracy = Some(access.next_value()?),
                        "macro avg" => matrix.macro_avg = Some(access.next_value()?),
                        "weighted avg" => matrix.weighted_avg = Some(access.next_value()?),
                        _ => {
                            let metrics: ClassMetrics = access.next_value()?;
                            matrix.classes.push((key, metrics));
                        }
                    }
                }
                Ok(matrix)
            }
        }

        deserializer.deserialize_map(MatrixVisitor)
    }
}

/// Per-class precision, recall, F1 and support over the sorted observed labels, with accuracy
/// and macro / support-weighted averages.
pub fn classification_report(
    y_true: &[Label],
    y_pred: &[Label],
) -> Result<MetricsMatrix, MetricError> {
    let acc = accuracy(y_true, y_pred)?;
    let labels = sorted_union(y_true, y_pred);

    let mut classes: Vec<(String, ClassMetrics)> = Vec::with_capacity(labels.len());
    let (mut p_sum, mut r_sum, mut f_sum) = (0_f64, 0_f64, 0_f64);
    let (mut p_w, mut r_w, mut f_w) = (0_f64, 0_f64, 0_f64);
    let total = y_true.len();

    for label in labels.iter() {
        let precision = precision_for_label(y_true, y_pred, label);
        let recall = recall_for_label(y_true, y_pred, label);
        let f1_score = f1_from(precision, recall);
        let support = y_true.iter().filter(|t| *t == label).count();

        p_sum += precision;
        r_sum += recall;
        f_sum += f1_score;
        let w = support as f64;
        p_w += precision * w;
        r_w += recall * w;
        f_w += f1_score * w;

        classes.push((
            label.to_string(),
            ClassMetrics {
                precision,
                recall,
                f1_score,
                support: Some(support),
            },
        ));
    }

    let n = labels.len() as f64;
    let total_f = total as f64;
    Ok(MetricsMatrix {
        classes,
        accuracy: Some(acc),
        macro_avg: Some(ClassMetrics {
            precision: p_sum / n,
            recall: r_sum / n,
            f1_score: f_sum / n,
            support: Some(total),
        }),
        weighted_avg: Some(ClassMetrics {
            precision: ratio(p_w, total_f),
            recall: ratio(r_w, total_f),
            f1_score: ratio(f_w, total_f),
            support: Some(total),
        }),
    })
}
