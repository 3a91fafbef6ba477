//! Rendering port. The controller only talks to `ChartRenderer`; the chart
//! library behind it is an implementation detail of each renderer.

pub mod html;

use crate::error::RenderError;
use crate::model::AggregatedTable;

pub use html::HtmlRenderer;

#[derive(Debug, Clone, PartialEq)]
pub struct LegendOptions {
    pub display: bool,
    pub position: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisOptions {
    pub stacked: bool,
    pub max: Option<f64>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub title: String,
    pub horizontal: bool,
    pub legend: LegendOptions,
    pub x_axis: AxisOptions,
    pub y_axis: AxisOptions,
    pub font_size: Option<u32>,
    /// Unit appended to tooltip values: `%` (values scaled by 100) or `ms`.
    pub tooltip_unit: String,
}

pub trait ChartRenderer {
    /// Draw a new chart under `id`.
    fn render(
        &mut self,
        id: &str,
        table: &AggregatedTable,
        options: &ChartOptions,
    ) -> Result<(), RenderError>;

    /// Redraw an existing chart after its table or options changed.
    fn update(
        &mut self,
        id: &str,
        table: &AggregatedTable,
        options: &ChartOptions,
    ) -> Result<(), RenderError>;

    /// Hand over the view that `id` is not showing, for renderers that let
    /// the reader switch views themselves. Called after `render` and before
    /// every `update`.
    fn stage_alternate(
        &mut self,
        _id: &str,
        _table: &AggregatedTable,
        _options: &ChartOptions,
    ) -> Result<(), RenderError> {
        Ok(())
    }
}
