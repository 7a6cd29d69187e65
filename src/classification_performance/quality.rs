use super::confusion_matrix::{ClassificationConfusionMatrix, ClassificationConfusionMatrixResult};
use super::require_target_and_prediction;
use crate::config::ClassificationThreshold;
use crate::data_handler::{DatasetKind, InputData};
use crate::errors::MetricError;
use crate::metrics::{Metric, CORE_QUALITY_METRICS, PROBABILISTIC_QUALITY_METRICS};
use crate::model_perf::{calculate_metrics, get_target_prediction_data, DatasetClassificationQuality};
use crate::renderers::html_widgets::{counter, header_text, BaseWidgetInfo, CounterData};
use crate::renderers::Renderable;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationQualityMetricResult {
    pub current: DatasetClassificationQuality,
    pub reference: Option<DatasetClassificationQuality>,
    pub target_name: String,
}

/// Model quality from the confusion matrices computed by [`ClassificationConfusionMatrix`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassificationQualityMetric {
    pub threshold: ClassificationThreshold,
}

impl Metric for ClassificationQualityMetric {
    type Result = ClassificationQualityMetricResult;
    const NAME: &'static str = "ClassificationQualityMetric";
}

impl ClassificationQualityMetric {
    pub fn new(threshold: ClassificationThreshold) -> ClassificationQualityMetric {
        ClassificationQualityMetric { threshold }
    }

    /// The dependency, configured with the same threshold.
    pub fn confusion_matrix_metric(&self) -> ClassificationConfusionMatrix {
        ClassificationConfusionMatrix::new(self.threshold)
    }

    #[instrument(skip_all, fields(metric = "ClassificationQualityMetric", rows = data.current_data.n_rows()))]
    pub fn calculate(
        &self,
        data: &InputData,
        confusion: &ClassificationConfusionMatrixResult,
    ) -> Result<ClassificationQualityMetricResult, MetricError> {
        let (target_name, _) = require_target_and_prediction(data)?;
        let mapping = &data.column_mapping;

        let (target, prediction) = get_target_prediction_data(
            &data.current_data,
            DatasetKind::Current,
            mapping,
            &self.threshold,
        )?;
        let current = calculate_metrics(mapping, &confusion.current_matrix, &target, &prediction)?;

        let reference = match &data.reference_data {
            Some(reference_data) => {
                let Some(ref_matrix) = &confusion.reference_matrix else {
                    return Err(MetricError::MissingDependency(format!(
                        "Dependency {} should have reference data",
                        ClassificationConfusionMatrix::NAME
                    )));
                };
                let (target, prediction) = get_target_prediction_data(
                    reference_data,
                    DatasetKind::Reference,
                    mapping,
                    &self.threshold,
                )?;
                Some(calculate_metrics(mapping, ref_matrix, &target, &prediction)?)
            }
            None => None,
        };

        Ok(ClassificationQualityMetricResult {
            current,
            reference,
            target_name,
        })
    }

    /// Computes the confusion matrix dependency, then this metric.
    pub fn evaluate(&self, data: &InputData) -> Result<ClassificationQualityMetricResult, MetricError> {
        let confusion = self.confusion_matrix_metric().calculate(data)?;
        self.calculate(data, &confusion)
    }
}

fn quality_counters(quality: &DatasetClassificationQuality) -> Vec<CounterData> {
    let mut counters: Vec<CounterData> = CORE_QUALITY_METRICS
        .iter()
        .filter_map(|m| quality.value(*m).map(|v| CounterData::float(&m.to_string(), v)))
        .collect();
    if let (Some(_), Some(_)) = (quality.roc_auc, quality.log_loss) {
        counters.extend(
            PROBABILISTIC_QUALITY_METRICS
                .iter()
                .filter_map(|m| quality.value(*m).map(|v| CounterData::float(&m.to_string(), v))),
        );
    }
    counters
}

impl Renderable for ClassificationQualityMetricResult {
    fn render_html(&self) -> Vec<BaseWidgetInfo> {
        let mut widgets = vec![
            header_text(&format!(
                "Classification Model Performance. Target: '{}'",
                self.target_name
            )),
            counter("Current: Model Quality Metrics", quality_counters(&self.current)),
        ];
        if let Some(reference) = &self.reference {
            widgets.push(counter(
                "Reference: Model Quality Metrics",
                quality_counters(reference),
            ));
        }
        widgets
    }
}
