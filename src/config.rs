//! Chart configuration (charts.json).
//!
//! JSON shape (every field optional):
//! {
//!   "raw_axis_max": 2500,
//!   "normalized_axis_max": 1.0,
//!   "palette": ["#a1455d", "#e27d8f"],
//!   "show_totals": true,
//!   "initial_view": "normalized",
//!   "legend_position": "bottom",
//!   "font_size": 14,
//!   "events": [{ "name": "keypress", "title": "Key press latency" }]
//! }

use crate::error::ConfigError;
use crate::model::Palette;
use serde::Deserialize;
use std::path::Path;

/// Which table a chart displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataView {
    #[default]
    Normalized,
    Raw,
}

impl DataView {
    pub fn flipped(self) -> Self {
        match self {
            Self::Normalized => Self::Raw,
            Self::Raw => Self::Normalized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventSpec {
    pub name: String,

    /// Chart title. Defaults to the event name.
    #[serde(default)]
    pub title: Option<String>,
}

impl EventSpec {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// X axis maximum in milliseconds for the raw view. Default: 2500.
    #[serde(default = "default_raw_axis_max")]
    pub raw_axis_max: f64,

    /// X axis maximum for the normalized view. Default: 1.0.
    #[serde(default = "default_normalized_axis_max")]
    pub normalized_axis_max: f64,

    /// Row colors, assigned by row position and cycled.
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    /// Fold per-label totals into the column names.
    #[serde(default)]
    pub show_totals: bool,

    #[serde(default)]
    pub initial_view: DataView,

    #[serde(default = "default_legend_position")]
    pub legend_position: String,

    #[serde(default)]
    pub font_size: Option<u32>,

    #[serde(default)]
    pub events: Vec<EventSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_axis_max: default_raw_axis_max(),
            normalized_axis_max: default_normalized_axis_max(),
            palette: default_palette(),
            show_totals: false,
            initial_view: DataView::default(),
            legend_position: default_legend_position(),
            font_size: None,
            events: Vec::new(),
        }
    }
}

fn default_raw_axis_max() -> f64 {
    2500.0
}

fn default_normalized_axis_max() -> f64 {
    1.0
}

fn default_palette() -> Vec<String> {
    Palette::default().colors().to_vec()
}

fn default_legend_position() -> String {
    "bottom".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: Config = serde_json::from_str(&data).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.palette.is_empty() {
            return Err(ConfigError::Invalid("palette must not be empty".into()));
        }
        if !(self.raw_axis_max > 0.0) {
            return Err(ConfigError::Invalid("raw_axis_max must be positive".into()));
        }
        if !(self.normalized_axis_max > 0.0) {
            return Err(ConfigError::Invalid(
                "normalized_axis_max must be positive".into(),
            ));
        }
        if let Some(dup) = self
            .events
            .iter()
            .enumerate()
            .find(|(i, e)| self.events[..*i].iter().any(|p| p.name == e.name))
        {
            return Err(ConfigError::Invalid(format!(
                "event {:?} listed twice",
                dup.1.name
            )));
        }
        Ok(())
    }

    pub fn palette(&self) -> Result<Palette, ConfigError> {
        Palette::new(self.palette.clone())
            .ok_or_else(|| ConfigError::Invalid("palette must not be empty".into()))
    }

    pub fn axis_max(&self, view: DataView) -> f64 {
        match view {
            DataView::Normalized => self.normalized_axis_max,
            DataView::Raw => self.raw_axis_max,
        }
    }
}
