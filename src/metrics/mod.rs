use crate::renderers::Renderable;
use serde::{Deserialize, Serialize};

/// A metric computed within a report run. `NAME` keys the rendered result in report output.
pub trait Metric {
    type Result: Renderable;
    const NAME: &'static str;

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// Scalar quality metrics shown on dashboards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Hash, Eq)]
pub enum QualityMetric {
    Accuracy,
    Precision,
    Recall,
    F1,
    RocAuc,
    LogLoss,
    TruePositiveRate,
    TrueNegativeRate,
    FalsePositiveRate,
    FalseNegativeRate,
}

/// Metrics every quality record carries, in display order.
pub const CORE_QUALITY_METRICS: [QualityMetric; 4] = [
    QualityMetric::Accuracy,
    QualityMetric::Precision,
    QualityMetric::Recall,
    QualityMetric::F1,
];

/// Probability based metrics, only shown when both are present.
pub const PROBABILISTIC_QUALITY_METRICS: [QualityMetric; 2] =
    [QualityMetric::RocAuc, QualityMetric::LogLoss];

impl QualityMetric {
    /// Lower case key used for table rows.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Precision => "precision",
            Self::Recall => "recall",
            Self::F1 => "f1",
            Self::RocAuc => "roc_auc",
            Self::LogLoss => "log_loss",
            Self::TruePositiveRate => "tpr",
            Self::TrueNegativeRate => "tnr",
            Self::FalsePositiveRate => "fpr",
            Self::FalseNegativeRate => "fnr",
        }
    }
}

impl TryFrom<&str> for QualityMetric {
    type Error = String;
    fn try_from(val: &str) -> Result<Self, Self::Error> {
        match val {
            "accuracy" => Ok(Self::Accuracy),
            "precision" => Ok(Self::Precision),
            "recall" => Ok(Self::Recall),
            "f1" => Ok(Self::F1),
            "roc_auc" => Ok(Self::RocAuc),
            "log_loss" => Ok(Self::LogLoss),
            "tpr" => Ok(Self::TruePositiveRate),
            "tnr" => Ok(Self::TrueNegativeRate),
            "fpr" => Ok(Self::FalsePositiveRate),
            "fnr" => Ok(Self::FalseNegativeRate),
            _ => Err(format!("Invalid metric name passed: {}", val)),
        }
    }
}

impl std::fmt::Display for QualityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Accuracy => write!(f, "Accuracy"),
            Self::Precision => write!(f, "Precision"),
            Self::Recall => write!(f, "Recall"),
            Self::F1 => write!(f, "F1"),
            Self::RocAuc => write!(f, "ROC AUC"),
            Self::LogLoss => write!(f, "LogLoss"),
            Self::TruePositiveRate => write!(f, "TPR"),
            Self::TrueNegativeRate => write!(f, "TNR"),
            Self::FalsePositiveRate => write!(f, "FPR"),
            Self::FalseNegativeRate => write!(f, "FNR"),
        }
    }
}
