pub mod statistics;

use crate::config::{ClassificationThreshold, ColumnMapping, PredictionColumns, DEFAULT_DECISION_THRESHOLD};
use crate::data_handler::{sorted_union, unique_labels, ColumnData, Dataset, DatasetKind, Label};
use crate::errors::MetricError;
use crate::metrics::QualityMetric;
use crate::{require_column, zip_iters};
use serde::{Deserialize, Serialize};
use statistics::{
    accuracy, binarize_target, check_lengths, f1_from, k_probability_threshold, log_loss,
    macro_roc_auc, macro_scores, precision_for_label, ratio, recall_for_label,
    threshold_probability_labels,
};
use tracing::{debug, warn};

/// Rows are actual labels, columns predicted labels, both in `labels` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<Label>,
    pub values: Vec<Vec<usize>>,
}

/// One-vs-rest counts for a single class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tn: usize,
}

impl ClassCounts {
    pub fn tpr(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fn_) as f64)
    }

    pub fn tnr(&self) -> f64 {
        ratio(self.tn as f64, (self.tn + self.fp) as f64)
    }

    pub fn fpr(&self) -> f64 {
        ratio(self.fp as f64, (self.fp + self.tn) as f64)
    }

    pub fn fnr(&self) -> f64 {
        ratio(self.fn_ as f64, (self.fn_ + self.tp) as f64)
    }
}

impl ConfusionMatrix {
    fn total(&self) -> usize {
        self.values.iter().map(|row| row.iter().sum::<usize>()).sum()
    }

    pub fn class_counts(&self, label: &Label) -> Option<ClassCounts> {
        let idx = self.labels.iter().position(|l| l == label)?;
        let tp = self.values[idx][idx];
        let row_sum: usize = self.values[idx].iter().sum();
        let col_sum: usize = self.values.iter().map(|row| row[idx]).sum();
        let fn_ = row_sum - tp;
        let fp = col_sum - tp;
        Some(ClassCounts {
            tp,
            fp,
            fn_,
            tn: self.total() - tp - fp - fn_,
        })
    }

    pub fn confusion_by_classes(&self) -> Vec<(Label, ClassCounts)> {
        self.labels
            .iter()
            .filter_map(|l| self.class_counts(l).map(|c| (l.clone(), c)))
            .collect()
    }
}

/// Cross tabulates `target` against `predictions`. Pairs with a label outside `labels` are not
/// counted.
pub fn calculate_matrix(
    target: &[Label],
    predictions: &[Label],
    labels: &[Label],
) -> Result<ConfusionMatrix, MetricError> {
    check_lengths(target, predictions)?;
    let n = labels.len();
    let mut values = vec![vec![0_usize; n]; n];
    let index_of = |label: &Label| labels.iter().position(|l| l == label);
    for (t, p) in zip_iters!(target, predictions) {
        if let (Some(i), Some(j)) = (index_of(t), index_of(p)) {
            values[i][j] += 1;
        }
    }
    Ok(ConfusionMatrix {
        labels: labels.to_vec(),
        values,
    })
}

/// Class probabilities, one row per record and one column per label in `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTable {
    pub columns: Vec<Label>,
    pub rows: Vec<Vec<f64>>,
}

impl ProbabilityTable {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[idx]).collect()
    }

    /// Same shape, every cell `1 / n_columns`.
    pub fn uniform(&self) -> Vec<Vec<f64>> {
        let (n_rows, n_cols) = self.shape();
        vec![vec![1_f64 / n_cols as f64; n_cols]; n_rows]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionData {
    pub predictions: Vec<Label>,
    pub prediction_probas: Option<ProbabilityTable>,
    pub labels: Vec<Label>,
}

/// Scalar quality of one set of predictions. The rates are only filled for binary problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetClassificationQuality {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: Option<f64>,
    pub log_loss: Option<f64>,
    pub tpr: Option<f64>,
    pub tnr: Option<f64>,
    pub fpr: Option<f64>,
    pub fnr: Option<f64>,
}

impl DatasetClassificationQuality {
    pub fn value(&self, metric: QualityMetric) -> Option<f64> {
        match metric {
            QualityMetric::Accuracy => Some(self.accuracy),
            QualityMetric::Precision => Some(self.precision),
            QualityMetric::Recall => Some(self.recall),
            QualityMetric::F1 => Some(self.f1),
            QualityMetric::RocAuc => self.roc_auc,
            QualityMetric::LogLoss => self.log_loss,
            QualityMetric::TruePositiveRate => self.tpr,
            QualityMetric::TrueNegativeRate => self.tnr,
            QualityMetric::FalsePositiveRate => self.fpr,
            QualityMetric::FalseNegativeRate => self.fnr,
        }
    }
}

/// A probability column name or configured label as a label of the same kind as `target`. String
/// targets keep digit-like names as strings, integer targets parse them.
fn label_like_target(value: &Label, target: &[Label]) -> Label {
    match (target.first(), value) {
        (Some(Label::Str(_)), Label::Int(i)) => Label::Str(i.to_string()),
        (Some(Label::Int(_)), Label::Str(s)) => Label::parse(s),
        _ => value.clone(),
    }
}

fn column_label(name: &str, target: &[Label]) -> Label {
    match target.first() {
        Some(Label::Str(_)) => Label::Str(name.to_string()),
        _ => Label::parse(name),
    }
}

/// The configured positive label when it is one of `labels`, else the first label.
pub(crate) fn positive_label<'a>(pos_label: &Label, labels: &'a [Label]) -> Option<&'a Label> {
    match labels.iter().find(|l| *l == pos_label) {
        Some(l) => Some(l),
        None => {
            let fallback = labels.first()?;
            warn!(
                pos_label = %pos_label,
                fallback = %fallback,
                "positive label not among observed labels"
            );
            Some(fallback)
        }
    }
}

pub fn calculate_metrics(
    column_mapping: &ColumnMapping,
    confusion_matrix: &ConfusionMatrix,
    target: &[Label],
    prediction: &PredictionData,
) -> Result<DatasetClassificationQuality, MetricError> {
    let y_pred = &prediction.predictions;
    check_lengths(target, y_pred)?;
    let acc = accuracy(target, y_pred)?;

    let (precision, recall, f1, rates) = match prediction.labels.len() {
        2 => {
            let pos_label = label_like_target(&column_mapping.pos_label, target);
            let Some(pos) = positive_label(&pos_label, &prediction.labels) else {
                return Err(MetricError::UndefinedPosLabel(column_mapping.pos_label.to_string()));
            };
            let p = precision_for_label(target, y_pred, pos);
            let r = recall_for_label(target, y_pred, pos);
            (p, r, f1_from(p, r), confusion_matrix.class_counts(pos))
        }
        _ => {
            let (p, r, f) = macro_scores(target, y_pred)?;
            (p, r, f, None)
        }
    };

    let (roc_auc, log_loss_value) = match &prediction.prediction_probas {
        Some(table) => {
            check_lengths(target, &table.rows)?;
            let onehot = binarize_target(target, &table.columns);
            (
                macro_roc_auc(&onehot, &table.rows),
                Some(log_loss(&onehot, &table.rows)?),
            )
        }
        None => (None, None),
    };

    Ok(DatasetClassificationQuality {
        accuracy: acc,
        precision,
        recall,
        f1,
        roc_auc,
        log_loss: log_loss_value,
        tpr: rates.map(|c| c.tpr()),
        tnr: rates.map(|c| c.tnr()),
        fpr: rates.map(|c| c.fpr()),
        fnr: rates.map(|c| c.fnr()),
    })
}

/// Explicit probability first, then the top-k cut-off over `pos_probas`, else 0.5.
pub fn decision_threshold(
    threshold: &ClassificationThreshold,
    pos_probas: &[f64],
) -> Result<f64, MetricError> {
    let resolved = match threshold {
        ClassificationThreshold::Probability(t) if !(0_f64..=1_f64).contains(t) => {
            return Err(MetricError::InvalidThreshold(*t));
        }
        ClassificationThreshold::Probability(t) => *t,
        ClassificationThreshold::TopK(k) => k_probability_threshold(pos_probas, *k)?,
        ClassificationThreshold::Default => DEFAULT_DECISION_THRESHOLD,
    };
    debug!(threshold = resolved, "resolved decision threshold");
    Ok(resolved)
}

fn binary_prediction(
    pos_label: Label,
    neg_label: Label,
    pos_probas: Vec<f64>,
    threshold: &ClassificationThreshold,
) -> Result<PredictionData, MetricError> {
    let cutoff = decision_threshold(threshold, &pos_probas)?;
    let predictions = threshold_probability_labels(&pos_probas, &pos_label, &neg_label, cutoff);
    let rows = pos_probas.iter().map(|p| vec![*p, 1_f64 - p]).collect();
    let labels = vec![pos_label, neg_label];
    Ok(PredictionData {
        predictions,
        prediction_probas: Some(ProbabilityTable {
            columns: labels.clone(),
            rows,
        }),
        labels,
    })
}

fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in row.iter().enumerate() {
        if *value > row[best] {
            best = idx;
        }
    }
    best
}

/// Reads the target and turns the prediction role into labels, applying the decision threshold
/// when the model emits binary probabilities.
pub fn get_target_prediction_data(
    dataset: &Dataset,
    kind: DatasetKind,
    column_mapping: &ColumnMapping,
    threshold: &ClassificationThreshold,
) -> Result<(Vec<Label>, PredictionData), MetricError> {
    let target_name = require_column!(
        column_mapping.target.as_ref(),
        "The column 'target' should present"
    );
    let prediction_role = require_column!(
        column_mapping.prediction.as_ref(),
        "The column 'prediction' should present"
    );
    let target = dataset.require(target_name, kind)?.labels(target_name)?;

    let prediction = match prediction_role {
        PredictionColumns::Probas(names) if names.len() > 2 => {
            let mut columns: Vec<Vec<f64>> = Vec::with_capacity(names.len());
            for name in names.iter() {
                columns.push(dataset.require(name, kind)?.floats(name)?);
            }
            let labels: Vec<Label> = names.iter().map(|n| column_label(n, &target)).collect();
            let rows: Vec<Vec<f64>> = (0..dataset.n_rows())
                .map(|i| columns.iter().map(|c| c[i]).collect())
                .collect();
            let predictions = rows.iter().map(|r| labels[argmax(r)].clone()).collect();
            PredictionData {
                predictions,
                prediction_probas: Some(ProbabilityTable {
                    columns: labels.clone(),
                    rows,
                }),
                labels,
            }
        }
        PredictionColumns::Probas(names) if names.len() == 2 => {
            let labels: Vec<Label> = names.iter().map(|n| column_label(n, &target)).collect();
            let pos_label = label_like_target(&column_mapping.pos_label, &target);
            let Some(pos_idx) = labels.iter().position(|l| *l == pos_label) else {
                return Err(MetricError::UndefinedPosLabel(
                    column_mapping.pos_label.to_string(),
                ));
            };
            let pos_name = &names[pos_idx];
            let pos_probas = dataset.require(pos_name, kind)?.floats(pos_name)?;
            binary_prediction(
                labels[pos_idx].clone(),
                labels[1 - pos_idx].clone(),
                pos_probas,
                threshold,
            )?
        }
        PredictionColumns::Probas(names) => {
            let name = require_column!(names.first(), "The column 'prediction' should present");
            positive_probability_prediction(dataset, kind, column_mapping, threshold, &target, name)?
        }
        PredictionColumns::Single(name) => match dataset.require(name, kind)? {
            ColumnData::Float(_) => positive_probability_prediction(
                dataset,
                kind,
                column_mapping,
                threshold,
                &target,
                name,
            )?,
            column => {
                let predictions = column.labels(name)?;
                let labels = sorted_union(&target, &predictions);
                PredictionData {
                    predictions,
                    prediction_probas: None,
                    labels,
                }
            }
        },
    };

    debug!(
        dataset = %kind,
        labels = prediction.labels.len(),
        probabilistic = prediction.prediction_probas.is_some(),
        "extracted target and prediction"
    );
    Ok((target, prediction))
}

/// A single column holding the probability of `pos_label`; the negative label is the first other
/// label seen in the target.
fn positive_probability_prediction(
    dataset: &Dataset,
    kind: DatasetKind,
    column_mapping: &ColumnMapping,
    threshold: &ClassificationThreshold,
    target: &[Label],
    name: &str,
) -> Result<PredictionData, MetricError> {
    let pos_probas = dataset.require(name, kind)?.floats(name)?;
    let pos_label = label_like_target(&column_mapping.pos_label, target);
    let Some(neg_label) = unique_labels(target).into_iter().find(|l| *l != pos_label) else {
        return Err(MetricError::UndefinedNegativeLabel);
    };
    binary_prediction(pos_label, neg_label, pos_probas, threshold)
}
