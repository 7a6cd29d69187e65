use crate::config::DISPLAY_DECIMALS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetSize {
    Half,
    #[default]
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterData {
    pub label: String,
    pub value: String,
}

impl CounterData {
    /// Counter showing `value` rounded for display.
    pub fn float(label: &str, value: f64) -> CounterData {
        CounterData {
            label: label.to_string(),
            value: format_display(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableCell {
    Number(f64),
    Text(String),
}

impl From<&str> for TableCell {
    fn from(value: &str) -> TableCell {
        TableCell::Text(value.to_string())
    }
}

impl From<String> for TableCell {
    fn from(value: String) -> TableCell {
        TableCell::Text(value)
    }
}

impl From<f64> for TableCell {
    fn from(value: f64) -> TableCell {
        TableCell::Number(value)
    }
}

/// Display widget descriptors, consumed by the dashboard front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BaseWidgetInfo {
    Header {
        label: String,
    },
    Counter {
        title: String,
        size: WidgetSize,
        counters: Vec<CounterData>,
    },
    Table {
        title: String,
        size: WidgetSize,
        column_names: Vec<String>,
        data: Vec<Vec<TableCell>>,
    },
}

pub fn header_text(label: &str) -> BaseWidgetInfo {
    BaseWidgetInfo::Header {
        label: label.to_string(),
    }
}

pub fn counter(title: &str, counters: Vec<CounterData>) -> BaseWidgetInfo {
    BaseWidgetInfo::Counter {
        title: title.to_string(),
        size: WidgetSize::Full,
        counters,
    }
}

pub fn table_data(title: &str, column_names: Vec<String>, data: Vec<Vec<TableCell>>) -> BaseWidgetInfo {
    BaseWidgetInfo::Table {
        title: title.to_string(),
        size: WidgetSize::Full,
        column_names,
        data,
    }
}

pub fn round_display(value: f64) -> f64 {
    let factor = 10_f64.powi(DISPLAY_DECIMALS);
    (value * factor).round() / factor
}

/// Rounded value in its shortest form, whole numbers keep one decimal (`1.0`).
pub fn format_display(value: f64) -> String {
    format!("{:?}", round_display(value))
}
