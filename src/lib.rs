#[cfg(feature = "python")]
use pyo3::prelude::*;

pub mod classification_performance;
pub mod config;
pub mod data_handler;
pub mod errors;
mod macros;
pub mod metrics;
pub mod model_perf;
pub mod renderers;
pub mod reporting;

pub use classification_performance::{
    ClassificationConfusionMatrix, ClassificationConfusionMatrixResult, ClassificationDummyMetric,
    ClassificationDummyMetricResults, ClassificationQualityMetric,
    ClassificationQualityMetricResult,
};
pub use config::{ClassificationThreshold, ColumnMapping, PredictionColumns, TopK};
pub use data_handler::{ColumnData, Dataset, InputData, Label};
pub use errors::MetricError;
pub use metrics::Metric;
pub use model_perf::DatasetClassificationQuality;
pub use renderers::Renderable;

#[cfg(feature = "python")]
#[pymodule]
#[pyo3(name = "_baseline_perf_ml")]
fn baseline_perf_ml(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    use classification_performance::py_api::{py_classification_dummy, py_classification_quality};
    m.add_function(wrap_pyfunction!(py_classification_quality, m)?)?;
    m.add_function(wrap_pyfunction!(py_classification_dummy, m)?)?;
    Ok(())
}
