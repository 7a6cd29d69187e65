use super::require_target_and_prediction;
use crate::config::ClassificationThreshold;
use crate::data_handler::{DatasetKind, InputData};
use crate::errors::MetricError;
use crate::metrics::Metric;
use crate::model_perf::{calculate_matrix, get_target_prediction_data, ConfusionMatrix};
use crate::renderers::html_widgets::{header_text, table_data, BaseWidgetInfo, TableCell};
use crate::renderers::Renderable;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Confusion matrices of the model on current and, when given, reference data.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassificationConfusionMatrix {
    pub threshold: ClassificationThreshold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfusionMatrixResult {
    pub current_matrix: ConfusionMatrix,
    pub reference_matrix: Option<ConfusionMatrix>,
    pub target_names: Option<Vec<String>>,
}

impl Metric for ClassificationConfusionMatrix {
    type Result = ClassificationConfusionMatrixResult;
    const NAME: &'static str = "ClassificationConfusionMatrix";
}

impl ClassificationConfusionMatrix {
    pub fn new(threshold: ClassificationThreshold) -> ClassificationConfusionMatrix {
        ClassificationConfusionMatrix { threshold }
    }

    #[instrument(skip_all, fields(metric = "ClassificationConfusionMatrix", rows = data.current_data.n_rows()))]
    pub fn calculate(
        &self,
        data: &InputData,
    ) -> Result<ClassificationConfusionMatrixResult, MetricError> {
        require_target_and_prediction(data)?;
        let mapping = &data.column_mapping;

        let (target, prediction) = get_target_prediction_data(
            &data.current_data,
            DatasetKind::Current,
            mapping,
            &self.threshold,
        )?;
        let current_matrix = calculate_matrix(&target, &prediction.predictions, &prediction.labels)?;

        let reference_matrix = match &data.reference_data {
            Some(reference) => {
                let (target, prediction) = get_target_prediction_data(
                    reference,
                    DatasetKind::Reference,
                    mapping,
                    &self.threshold,
                )?;
                Some(calculate_matrix(
                    &target,
                    &prediction.predictions,
                    &prediction.labels,
                )?)
            }
            None => None,
        };

        Ok(ClassificationConfusionMatrixResult {
            current_matrix,
            reference_matrix,
            target_names: mapping.target_names.clone(),
        })
    }
}

fn matrix_table(title: &str, matrix: &ConfusionMatrix) -> BaseWidgetInfo {
    let mut column_names = vec!["Actual \\ Predicted".to_string()];
    column_names.extend(matrix.labels.iter().map(|l| l.to_string()));
    let data = matrix
        .labels
        .iter()
        .zip(matrix.values.iter())
        .map(|(label, row)| {
            let mut cells = vec![TableCell::from(label.to_string())];
            cells.extend(row.iter().map(|v| TableCell::from(*v as f64)));
            cells
        })
        .collect();
    table_data(title, column_names, data)
}

impl Renderable for ClassificationConfusionMatrixResult {
    fn render_html(&self) -> Vec<BaseWidgetInfo> {
        let mut widgets = vec![
            header_text("Classification Confusion Matrix"),
            matrix_table("Current: Confusion Matrix", &self.current_matrix),
        ];
        if let Some(reference) = &self.reference_matrix {
            widgets.push(matrix_table("Reference: Confusion Matrix", reference));
        }
        widgets
    }
}
