use crate::errors::MetricError;
use crate::metrics::Metric;
use crate::renderers::Renderable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rendered JSON of one metric's result, keyed by the metric name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub metric: String,
    pub result: serde_json::Value,
}

impl MetricReport {
    pub fn new<M: Metric>(metric: &M, result: &M::Result) -> Result<MetricReport, MetricError> {
        Ok(MetricReport {
            metric: metric.name().to_string(),
            result: result.render_json()?,
        })
    }
}

/// Collection of metric reports from a single run. The caller decides which metrics are computed
/// and in what order; this type only records their output. Implements `serde::Serialize` and
/// `serde::Deserialize` so snapshots can be stored or shipped to a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub timestamp: DateTime<Utc>,
    pub metrics: Vec<MetricReport>,
}

impl Default for ReportSnapshot {
    fn default() -> ReportSnapshot {
        ReportSnapshot::new()
    }
}

impl ReportSnapshot {
    pub fn new() -> ReportSnapshot {
        ReportSnapshot {
            timestamp: Utc::now(),
            metrics: Vec::new(),
        }
    }

    pub fn push<M: Metric>(&mut self, metric: &M, result: &M::Result) -> Result<(), MetricError> {
        self.metrics.push(MetricReport::new(metric, result)?);
        Ok(())
    }

    pub fn get(&self, metric_name: &str) -> Option<&MetricReport> {
        self.metrics.iter().find(|m| m.metric == metric_name)
    }

    pub fn to_json(&self) -> Result<String, MetricError> {
        Ok(serde_json::to_string(self)?)
    }
}
