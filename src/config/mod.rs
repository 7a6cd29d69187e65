//! Column mapping and decision threshold configuration, plus the constants the classification
//! metrics share.

use crate::data_handler::{Dataset, Label};
use crate::errors::MetricError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;
pub const CURRENT_DUMMY_SEED: u64 = 0;
pub const REFERENCE_DUMMY_SEED: u64 = 1;
pub const UNINFORMATIVE_ROC_AUC: f64 = 0.5;
/// Decimals kept by html widgets. JSON output is never rounded.
pub const DISPLAY_DECIMALS: i32 = 3;
/// Probabilities are clipped to `[eps, 1 - eps]` before taking logs.
pub const LOG_LOSS_EPS: f64 = f64::EPSILON;

pub(crate) const DEFAULT_TARGET_COLUMN: &str = "target";
pub(crate) const DEFAULT_PREDICTION_COLUMN: &str = "prediction";

/// Where model output lives in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionColumns {
    /// A label column, or the positive-class probability for binary problems.
    Single(String),
    /// One probability column per class, named by the class label.
    Probas(Vec<String>),
}

/// Identifies the column roles of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub target: Option<String>,
    pub prediction: Option<PredictionColumns>,
    pub pos_label: Label,
    pub target_names: Option<Vec<String>>,
}

impl Default for ColumnMapping {
    fn default() -> ColumnMapping {
        ColumnMapping {
            target: Some(DEFAULT_TARGET_COLUMN.to_string()),
            prediction: Some(PredictionColumns::Single(
                DEFAULT_PREDICTION_COLUMN.to_string(),
            )),
            pos_label: Label::Int(1),
            target_names: None,
        }
    }
}

/// Column roles that actually exist in a given dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetColumns {
    pub target: Option<String>,
    pub prediction: Option<PredictionColumns>,
}

impl ColumnMapping {
    pub fn with_target<S: Into<String>>(mut self, target: S) -> ColumnMapping {
        self.target = Some(target.into());
        self
    }

    pub fn with_prediction(mut self, prediction: PredictionColumns) -> ColumnMapping {
        self.prediction = Some(prediction);
        self
    }

    pub fn without_prediction(mut self) -> ColumnMapping {
        self.prediction = None;
        self
    }

    pub fn with_pos_label<L: Into<Label>>(mut self, pos_label: L) -> ColumnMapping {
        self.pos_label = pos_label.into();
        self
    }

    /// Resolves the declared roles against the columns present in `dataset`. A role whose
    /// column is missing resolves to `None`; a probability list that is only partly present is
    /// an error.
    pub fn resolve(&self, dataset: &Dataset) -> Result<DatasetColumns, MetricError> {
        let target = self
            .target
            .as_ref()
            .filter(|name| dataset.has_column(name))
            .cloned();

        let prediction = match &self.prediction {
            None => None,
            Some(PredictionColumns::Single(name)) => {
                if dataset.has_column(name) {
                    Some(PredictionColumns::Single(name.clone()))
                } else {
                    None
                }
            }
            Some(PredictionColumns::Probas(names)) => {
                let present = names.iter().filter(|n| dataset.has_column(n)).count();
                if present == 0 {
                    None
                } else if present == names.len() {
                    Some(PredictionColumns::Probas(names.clone()))
                } else {
                    let missing = names
                        .iter()
                        .find(|n| !dataset.has_column(n))
                        .cloned()
                        .unwrap_or_default();
                    return Err(MetricError::column_not_found(&missing, "current"));
                }
            }
        };

        Ok(DatasetColumns { target, prediction })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TopK {
    /// The `k` highest scored rows are positive.
    Count(usize),
    /// The top fraction of rows (in `[0, 1]`) is positive.
    Fraction(f64),
}

impl std::fmt::Display for TopK {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Count(k) => write!(f, "{}", k),
            Self::Fraction(k) => write!(f, "{}", k),
        }
    }
}

/// How probabilities are turned into binary decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum ClassificationThreshold {
    #[default]
    Default,
    Probability(f64),
    TopK(TopK),
}

impl ClassificationThreshold {
    pub fn probability(threshold: f64) -> Result<ClassificationThreshold, MetricError> {
        if !(0_f64..=1_f64).contains(&threshold) {
            return Err(MetricError::InvalidThreshold(threshold));
        }
        Ok(ClassificationThreshold::Probability(threshold))
    }

    pub fn top_k(k: TopK) -> ClassificationThreshold {
        ClassificationThreshold::TopK(k)
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use crate::data_handler::ColumnData;

    #[test]
    fn test_default_mapping_roles() {
        let mapping = ColumnMapping::default();
        assert_eq!(mapping.target.as_deref(), Some("target"));
        assert_eq!(
            mapping.prediction,
            Some(PredictionColumns::Single("prediction".into()))
        );
        assert_eq!(mapping.pos_label, Label::Int(1));
    }

    #[test]
    fn test_resolve_drops_absent_roles() {
        let ds = Dataset::new()
            .with_column("target", ColumnData::Int(vec![1, 0]))
            .unwrap();
        let cols = ColumnMapping::default().resolve(&ds).unwrap();
        assert_eq!(cols.target.as_deref(), Some("target"));
        assert!(cols.prediction.is_none());
    }

    #[test]
    fn test_resolve_partial_probas_errors() {
        let ds = Dataset::new()
            .with_column("a", ColumnData::Float(vec![0.1]))
            .unwrap();
        let mapping = ColumnMapping::default()
            .with_prediction(PredictionColumns::Probas(vec!["a".into(), "b".into()]));
        let err = mapping.resolve(&ds).unwrap_err();
        assert_eq!(err.to_string(), "Column 'b' was not found in current data.");
    }

    #[test]
    fn test_threshold_validation() {
        assert!(ClassificationThreshold::probability(0.7).is_ok());
        assert!(ClassificationThreshold::probability(1.0).is_ok());
        assert!(ClassificationThreshold::probability(1.5).is_err());
        assert!(ClassificationThreshold::default().is_default());
    }

    #[test]
    fn test_mapping_deserializes_prediction_list() {
        let raw = r#"{"target":"y","prediction":["a","b","c"],"pos_label":"a","target_names":null}"#;
        let mapping: ColumnMapping = serde_json::from_str(raw).unwrap();
        assert_eq!(
            mapping.prediction,
            Some(PredictionColumns::Probas(vec![
                "a".into(),
                "b".into(),
                "c".into()
            ]))
        );
        assert_eq!(mapping.pos_label, Label::from("a"));
    }
}
