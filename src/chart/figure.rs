//! Renderable figure specifications. They are plain data, the renderer decides how they look.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use crate::core::pivot::HourColumn;

#[derive(Clone, Debug, Serialize)]
pub struct Figure {
    /// File stem of the rendered figure.
    pub name: &'static str,

    pub title: String,
    pub panels: Vec<Panel>,
}

/// Subplot, the panels of a figure are stacked vertically.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    Line(LinePanel),
    Heatmap(HeatmapPanel),
    StackedBar(StackedBarPanel),
}

#[derive(Clone, Debug, Serialize)]
pub struct LinePanel {
    pub title: String,
    pub y_label: String,
    pub traces: Vec<Trace>,

    /// Dashed horizontal line, the mean of the first trace.
    pub reference: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Trace {
    pub name: String,

    /// Missing values break the line.
    pub points: Vec<LinePoint>,
}

#[derive(Copy, Clone, Debug, Serialize)]
pub struct LinePoint {
    pub timestamp: DateTime<Tz>,
    pub value: Option<f64>,
}

/// Date × hour-of-day matrix.
#[derive(Clone, Debug, Serialize)]
pub struct HeatmapPanel {
    pub title: String,
    pub color_label: String,
    pub dates: Vec<NaiveDate>,

    /// One column per date.
    pub values: Vec<HourColumn>,

    /// Drawn in white on top, the higher the value the more opaque.
    pub overlay: Option<Vec<HourColumn>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StackedBarPanel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub stacks: Vec<Stack>,
}

/// One layer of the bars, with a value per category.
#[derive(Clone, Debug, Serialize)]
pub struct Stack {
    pub name: String,
    pub values: Vec<f64>,
}
