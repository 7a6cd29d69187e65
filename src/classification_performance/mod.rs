pub mod confusion_matrix;
pub mod dummy;
pub mod quality;

pub use confusion_matrix::{ClassificationConfusionMatrix, ClassificationConfusionMatrixResult};
pub use dummy::{
    correction_for_threshold, ClassificationDummyMetric, ClassificationDummyMetricResults,
    ThresholdCoefficients,
};
pub use quality::{ClassificationQualityMetric, ClassificationQualityMetricResult};

use crate::config::PredictionColumns;
use crate::data_handler::InputData;
use crate::errors::MetricError;

pub(crate) const TARGET_AND_PREDICTION_REQUIRED: &str =
    "The columns 'target' and 'prediction' columns should be present";
pub(crate) const TARGET_REQUIRED: &str = "The column 'target' should present";

/// Both roles must resolve against current data.
pub(crate) fn require_target_and_prediction(
    data: &InputData,
) -> Result<(String, PredictionColumns), MetricError> {
    let columns = data.column_mapping.resolve(&data.current_data)?;
    match (columns.target, columns.prediction) {
        (Some(target), Some(prediction)) => Ok((target, prediction)),
        _ => Err(MetricError::MissingColumn(
            TARGET_AND_PREDICTION_REQUIRED.into(),
        )),
    }
}

#[cfg(feature = "python")]
pub(crate) mod py_api {
    use super::{ClassificationDummyMetric, ClassificationQualityMetric};
    use crate::config::{ClassificationThreshold, ColumnMapping, PredictionColumns, TopK};
    use crate::data_handler::py_types_handler::{dataset_from_py, json_to_py, label_from_py};
    use crate::data_handler::InputData;
    use crate::renderers::Renderable;
    use pyo3::{
        prelude::*,
        types::{PyDict, PyInt},
    };

    fn build_input(
        py: Python<'_>,
        current: &Bound<'_, PyDict>,
        reference: Option<&Bound<'_, PyDict>>,
        target: Option<String>,
        prediction: Option<Vec<String>>,
        pos_label: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<InputData> {
        let current_data = dataset_from_py(py, current)?;
        let reference_data = match reference {
            Some(r) => Some(dataset_from_py(py, r)?),
            None => None,
        };

        let mut mapping = ColumnMapping::default();
        if let Some(target) = target {
            mapping = mapping.with_target(target);
        }
        if let Some(mut names) = prediction {
            let role = if names.len() == 1 {
                PredictionColumns::Single(names.remove(0))
            } else {
                PredictionColumns::Probas(names)
            };
            mapping = mapping.with_prediction(role);
        }
        if let Some(label) = pos_label {
            mapping = mapping.with_pos_label(label_from_py(label)?);
        }
        Ok(InputData::new(current_data, reference_data, mapping))
    }

    /// An explicit probability wins over `k`; an integer `k` counts rows, a float is a fraction.
    fn build_threshold(
        threshold: Option<f64>,
        k: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<ClassificationThreshold> {
        if let Some(t) = threshold {
            return Ok(ClassificationThreshold::probability(t)?);
        }
        match k {
            Some(k) if k.is_instance_of::<PyInt>() => Ok(ClassificationThreshold::top_k(
                TopK::Count(k.extract::<usize>()?),
            )),
            Some(k) => Ok(ClassificationThreshold::top_k(TopK::Fraction(
                k.extract::<f64>()?,
            ))),
            None => Ok(ClassificationThreshold::Default),
        }
    }

    #[pyfunction]
    #[pyo3(signature = (current, reference=None, target=None, prediction=None, pos_label=None, threshold=None, k=None))]
    pub fn py_classification_quality<'py>(
        py: Python<'py>,
        current: &Bound<'py, PyDict>,
        reference: Option<&Bound<'py, PyDict>>,
        target: Option<String>,
        prediction: Option<Vec<String>>,
        pos_label: Option<&Bound<'py, PyAny>>,
        threshold: Option<f64>,
        k: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<Bound<'py, PyAny>> {
        let data = build_input(py, current, reference, target, prediction, pos_label)?;
        let metric = ClassificationQualityMetric::new(build_threshold(threshold, k)?);
        let result = metric.evaluate(&data)?;
        json_to_py(py, &result.render_json()?)
    }

    #[pyfunction]
    #[pyo3(signature = (current, reference=None, target=None, prediction=None, pos_label=None, threshold=None, k=None))]
    pub fn py_classification_dummy<'py>(
        py: Python<'py>,
        current: &Bound<'py, PyDict>,
        reference: Option<&Bound<'py, PyDict>>,
        target: Option<String>,
        prediction: Option<Vec<String>>,
        pos_label: Option<&Bound<'py, PyAny>>,
        threshold: Option<f64>,
        k: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<Bound<'py, PyAny>> {
        let data = build_input(py, current, reference, target, prediction, pos_label)?;
        let metric = ClassificationDummyMetric::new(build_threshold(threshold, k)?);
        let result = metric.evaluate(&data)?;
        json_to_py(py, &result.render_json()?)
    }
}

#[cfg(test)]
mod column_check_tests {
    use super::*;
    use crate::config::ColumnMapping;
    use crate::data_handler::{ColumnData, Dataset};

    #[test]
    fn test_require_target_and_prediction() {
        let ds = Dataset::new()
            .with_column("target", ColumnData::Int(vec![1]))
            .unwrap()
            .with_column("prediction", ColumnData::Int(vec![1]))
            .unwrap();
        let data = InputData::new(ds, None, ColumnMapping::default());
        let (target, prediction) = require_target_and_prediction(&data).unwrap();
        assert_eq!(target, "target");
        assert_eq!(prediction, PredictionColumns::Single("prediction".into()));

        let data = InputData::new(
            data.current_data,
            None,
            ColumnMapping::default().without_prediction(),
        );
        assert!(require_target_and_prediction(&data).is_err());
    }
}
