use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("{0}")]
    MissingColumn(String),
    #[error("Column '{column}' was not found in {dataset} data.")]
    ColumnNotFound { column: String, dataset: String },
    #[error("Column '{column}' must hold {expected} values")]
    UnsupportedColumnType { column: String, expected: String },
    #[error("{0}")]
    MissingDependency(String),
    #[error("Undefined pos_label: {0}")]
    UndefinedPosLabel(String),
    #[error("Unable to infer the negative label from the target values")]
    UndefinedNegativeLabel,
    #[error("K has unexpected value {0}")]
    InvalidTopK(String),
    #[error("Threshold {0} is outside of [0, 1]")]
    InvalidThreshold(f64),
    #[error("Dataset '{0}' must be non empty")]
    EmptyDataset(String),
    #[error("Data vectors must be equal length")]
    DataVectorLengthMismatch,
    #[error("Unable to serialize metric result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MetricError {
    pub(crate) fn column_not_found(column: &str, dataset: &str) -> MetricError {
        MetricError::ColumnNotFound {
            column: column.to_string(),
            dataset: dataset.to_string(),
        }
    }
}

#[cfg(feature = "python")]
pub(crate) mod py_errors {
    use super::*;
    use pyo3::{exceptions, PyErr};

    impl From<MetricError> for PyErr {
        fn from(err: MetricError) -> PyErr {
            let err_msg = err.to_string();
            match err {
                MetricError::Serialization(_) => exceptions::PySystemError::new_err(err_msg),
                _ => exceptions::PyValueError::new_err(err_msg),
            }
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_column_not_found_message_names_dataset() {
        let err = MetricError::column_not_found("feature", "reference");
        assert_eq!(err.to_string(), "Column 'feature' was not found in reference data.");
    }

    #[test]
    fn test_missing_column_message_is_verbatim() {
        let err = MetricError::MissingColumn("The column 'target' should present".into());
        assert_eq!(err.to_string(), "The column 'target' should present");
    }
}
