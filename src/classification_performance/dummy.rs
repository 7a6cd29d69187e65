use super::quality::{ClassificationQualityMetric, ClassificationQualityMetricResult};
use super::TARGET_REQUIRED;
use crate::config::{
    ClassificationThreshold, ColumnMapping, CURRENT_DUMMY_SEED, REFERENCE_DUMMY_SEED,
    UNINFORMATIVE_ROC_AUC,
};
use crate::data_handler::{
    label_frequencies, sample_by_frequency, unique_labels, DatasetKind, InputData, Label,
};
use crate::errors::MetricError;
use crate::metrics::{Metric, QualityMetric};
use crate::model_perf::statistics::{
    binarize_target, classification_report, log_loss, precision_for_label, recall_for_label,
    ClassMetrics, MetricsMatrix,
};
use crate::model_perf::{
    calculate_matrix, calculate_metrics, decision_threshold, get_target_prediction_data,
    DatasetClassificationQuality, PredictionData,
};
use crate::renderers::html_widgets::{header_text, round_display, table_data, BaseWidgetInfo, TableCell};
use crate::renderers::Renderable;
use crate::require_column;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Scale factors for the precision and recall of a random classifier when the decision threshold
/// is moved away from 0.5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdCoefficients {
    pub precision: f64,
    pub recall: f64,
}

impl ThresholdCoefficients {
    /// Coefficients for the positive label. At `threshold == 1` precision is left untouched.
    pub fn for_positive_label(threshold: f64) -> ThresholdCoefficients {
        let precision = if threshold == 1_f64 {
            1_f64
        } else {
            (0.5 / (1_f64 - threshold)).min(1_f64)
        };
        ThresholdCoefficients {
            precision,
            recall: ((1_f64 - threshold) / 0.5).min(1_f64),
        }
    }

    /// The negative label swaps the two factors.
    pub fn for_negative_label(threshold: f64) -> ThresholdCoefficients {
        let positive = Self::for_positive_label(threshold);
        ThresholdCoefficients {
            precision: positive.recall,
            recall: positive.precision,
        }
    }
}

/// F1 of corrected scores. Both scores at zero give 0.
fn corrected_f1(precision: f64, recall: f64) -> f64 {
    let denom = precision + recall;
    if denom == 0_f64 {
        warn!("corrected precision and recall are both zero, f1 set to 0");
        return 0_f64;
    }
    2_f64 * precision * recall / denom
}

/// Rescales a dummy quality record for `threshold`. ROC AUC becomes uninformative and log loss is
/// cleared; accuracy is kept.
pub fn correction_for_threshold(
    dummy: &DatasetClassificationQuality,
    threshold: f64,
) -> DatasetClassificationQuality {
    let coeff = ThresholdCoefficients::for_positive_label(threshold);
    let precision = dummy.precision * coeff.precision;
    let recall = dummy.recall * coeff.recall;

    let (tpr, tnr, fpr, fnr) = match (dummy.tpr, dummy.tnr, dummy.fpr, dummy.fnr) {
        (Some(tpr), Some(tnr), Some(fpr), Some(fnr)) => (
            Some(tpr * coeff.recall),
            Some(tnr * coeff.precision),
            Some(fpr * coeff.recall),
            Some(fnr * coeff.precision),
        ),
        _ => (None, None, None, None),
    };

    DatasetClassificationQuality {
        accuracy: dummy.accuracy,
        precision,
        recall,
        f1: corrected_f1(precision, recall),
        roc_auc: Some(UNINFORMATIVE_ROC_AUC),
        log_loss: None,
        tpr,
        tnr,
        fpr,
        fnr,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationDummyMetricResults {
    pub dummy: DatasetClassificationQuality,
    pub by_reference_dummy: Option<DatasetClassificationQuality>,
    pub model_quality: Option<DatasetClassificationQuality>,
    pub metrics_matrix: MetricsMatrix,
}

/// Quality of a classifier that guesses labels at their observed frequencies, as a floor for the
/// model's quality.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassificationDummyMetric {
    pub threshold: ClassificationThreshold,
}

impl Metric for ClassificationDummyMetric {
    type Result = ClassificationDummyMetricResults;
    const NAME: &'static str = "ClassificationDummyMetric";
}

/// Inputs shared by the current and the reference baseline.
struct DummyContext<'a> {
    mapping: &'a ColumnMapping,
    target: &'a [Label],
    labels: &'a [Label],
    correction_threshold: Option<f64>,
    uniform_log_loss: Option<f64>,
}

impl DummyContext<'_> {
    fn quality(&self, dummy_preds: &[Label]) -> Result<DatasetClassificationQuality, MetricError> {
        let matrix = calculate_matrix(self.target, dummy_preds, self.labels)?;
        let prediction = PredictionData {
            predictions: dummy_preds.to_vec(),
            prediction_probas: None,
            labels: self.labels.to_vec(),
        };
        let quality = calculate_metrics(self.mapping, &matrix, self.target, &prediction)?;
        let mut quality = match self.correction_threshold {
            Some(t) => correction_for_threshold(&quality, t),
            None => quality,
        };
        if let Some(value) = self.uniform_log_loss {
            quality.log_loss = Some(value);
            quality.roc_auc = Some(UNINFORMATIVE_ROC_AUC);
        }
        Ok(quality)
    }

    /// Per-class report of the corrected binary baseline. The positive entry mirrors the
    /// corrected record, the negative entry rescales its own scores with swapped coefficients.
    fn corrected_matrix(
        &self,
        dummy: &DatasetClassificationQuality,
        dummy_preds: &[Label],
        threshold: f64,
    ) -> MetricsMatrix {
        let coeff = ThresholdCoefficients::for_negative_label(threshold);
        let neg_label = &self.labels[1];
        let precision = precision_for_label(self.target, dummy_preds, neg_label) * coeff.precision;
        let recall = recall_for_label(self.target, dummy_preds, neg_label) * coeff.recall;
        MetricsMatrix {
            classes: vec![
                (
                    self.labels[0].to_string(),
                    ClassMetrics {
                        precision: dummy.precision,
                        recall: dummy.recall,
                        f1_score: dummy.f1,
                        support: None,
                    },
                ),
                (
                    neg_label.to_string(),
                    ClassMetrics {
                        precision,
                        recall,
                        f1_score: corrected_f1(precision, recall),
                        support: None,
                    },
                ),
            ],
            ..MetricsMatrix::default()
        }
    }
}

impl ClassificationDummyMetric {
    pub fn new(threshold: ClassificationThreshold) -> ClassificationDummyMetric {
        ClassificationDummyMetric { threshold }
    }

    /// The dependency supplying model quality, always at the default threshold.
    pub fn quality_metric(&self) -> ClassificationQualityMetric {
        ClassificationQualityMetric::default()
    }

    /// `model_quality` is the result of [`Self::quality_metric`]; it is required whenever a
    /// prediction column resolves.
    #[instrument(skip_all, fields(metric = "ClassificationDummyMetric", rows = data.current_data.n_rows()))]
    pub fn calculate(
        &self,
        data: &InputData,
        model_quality: Option<&ClassificationQualityMetricResult>,
    ) -> Result<ClassificationDummyMetricResults, MetricError> {
        let mapping = &data.column_mapping;
        let columns = mapping.resolve(&data.current_data)?;
        let target_name = require_column!(columns.target, TARGET_REQUIRED);

        let model_quality = match (&columns.prediction, model_quality) {
            (None, _) => None,
            (Some(_), Some(result)) => Some(result.current.clone()),
            (Some(_), None) => {
                return Err(MetricError::MissingDependency(format!(
                    "Dependency {} result was not provided",
                    ClassificationQualityMetric::NAME
                )))
            }
        };

        let (target, prediction) = match columns.prediction {
            Some(_) => {
                let (target, prediction) = get_target_prediction_data(
                    &data.current_data,
                    DatasetKind::Current,
                    mapping,
                    &self.threshold,
                )?;
                (target, Some(prediction))
            }
            None => {
                let target = data
                    .current_data
                    .require(&target_name, DatasetKind::Current)?
                    .labels(&target_name)?;
                (target, None)
            }
        };
        let labels = match &prediction {
            Some(p) => p.labels.clone(),
            None => unique_labels(&target),
        };
        let n_rows = data.current_data.n_rows();

        let probas = prediction.as_ref().and_then(|p| p.prediction_probas.as_ref());
        let correction_threshold = match probas {
            Some(table) if labels.len() == 2 => {
                Some(decision_threshold(&self.threshold, &table.column(0))?)
            }
            _ => None,
        };
        let uniform_log_loss = match probas {
            Some(table) => Some(log_loss(&binarize_target(&target, &labels), &table.uniform())?),
            None => None,
        };
        debug!(
            labels = labels.len(),
            threshold = correction_threshold,
            "dummy baseline configured"
        );

        let ctx = DummyContext {
            mapping,
            target: &target,
            labels: &labels,
            correction_threshold,
            uniform_log_loss,
        };

        let current_preds =
            sample_by_frequency(&label_frequencies(&target), n_rows, CURRENT_DUMMY_SEED)?;
        let dummy = ctx.quality(&current_preds)?;
        let metrics_matrix = match correction_threshold {
            Some(t) => ctx.corrected_matrix(&dummy, &current_preds, t),
            None => classification_report(&target, &current_preds)?,
        };

        // reference frequencies, sized and scored against current data
        let by_reference_dummy = match &data.reference_data {
            Some(reference) => {
                let reference_target = reference
                    .require(&target_name, DatasetKind::Reference)?
                    .labels(&target_name)?;
                let preds = sample_by_frequency(
                    &label_frequencies(&reference_target),
                    n_rows,
                    REFERENCE_DUMMY_SEED,
                )?;
                Some(ctx.quality(&preds)?)
            }
            None => None,
        };

        Ok(ClassificationDummyMetricResults {
            dummy,
            by_reference_dummy,
            model_quality,
            metrics_matrix,
        })
    }

    /// Computes the quality dependency when a prediction column exists, then this metric.
    pub fn evaluate(&self, data: &InputData) -> Result<ClassificationDummyMetricResults, MetricError> {
        let columns = data.column_mapping.resolve(&data.current_data)?;
        let quality = match (columns.target, columns.prediction) {
            (Some(_), Some(_)) => Some(self.quality_metric().evaluate(data)?),
            _ => None,
        };
        self.calculate(data, quality.as_ref())
    }
}

impl Renderable for ClassificationDummyMetricResults {
    fn render_html(&self) -> Vec<BaseWidgetInfo> {
        let mut columns: Vec<(&str, &DatasetClassificationQuality)> = Vec::with_capacity(3);
        if let Some(by_reference) = &self.by_reference_dummy {
            columns.push(("Dummy (by reference)", by_reference));
            columns.push(("Dummy (by current)", &self.dummy));
        } else {
            columns.push(("Dummy", &self.dummy));
        }
        if let Some(model) = &self.model_quality {
            columns.push(("Model", model));
        }

        let mut column_names = vec!["Metric".to_string()];
        column_names.extend(columns.iter().map(|(name, _)| name.to_string()));

        let rows: [(QualityMetric, fn(&DatasetClassificationQuality) -> f64); 4] = [
            (QualityMetric::Accuracy, |q| q.accuracy),
            (QualityMetric::Precision, |q| q.precision),
            (QualityMetric::Recall, |q| q.recall),
            (QualityMetric::F1, |q| q.f1),
        ];
        let data = rows
            .iter()
            .map(|(metric, field)| {
                let mut row = vec![TableCell::from(metric.key())];
                row.extend(
                    columns
                        .iter()
                        .map(|(_, quality)| TableCell::from(round_display(field(quality)))),
                );
                row
            })
            .collect();

        vec![
            header_text("Dummy Classification Quality"),
            table_data("", column_names, data),
        ]
    }
}
