pub mod html_widgets;

use crate::errors::MetricError;
use html_widgets::BaseWidgetInfo;
use serde::Serialize;

/// Presentation of a metric result. Rendering reads the result and never changes it.
pub trait Renderable: Serialize {
    /// Full serde projection of the result. Values are never rounded here.
    fn render_json(&self) -> Result<serde_json::Value, MetricError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Ordered widgets for the dashboard; optional parts of the result that are absent are
    /// left out.
    fn render_html(&self) -> Vec<BaseWidgetInfo>;
}
