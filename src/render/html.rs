use crate::error::RenderError;
use crate::model::AggregatedTable;
use crate::render::{ChartOptions, ChartRenderer};
use indexmap::IndexMap;
use serde_json::{Value, json};

/// Collects charts and writes them as one self-contained HTML page drawn by
/// Chart.js (v2 `horizontalBar`).
#[derive(Debug, Default)]
pub struct HtmlRenderer {
    charts: IndexMap<String, ChartEntry>,
}

#[derive(Debug, Clone)]
struct ChartEntry {
    config: Value,
    tooltip_unit: String,
    /// The view not shown, as `(config, tooltip unit)`.
    alternate: Option<(Value, String)>,
    revision: u32,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chart_ids(&self) -> impl Iterator<Item = &str> {
        self.charts.keys().map(String::as_str)
    }

    /// Chart.js config currently held for `id`.
    #[cfg(test)]
    pub fn config(&self, id: &str) -> Option<&Value> {
        self.charts.get(id).map(|c| &c.config)
    }

    /// How many times `id` was redrawn since it was first rendered.
    #[cfg(test)]
    pub fn revision(&self, id: &str) -> Option<u32> {
        self.charts.get(id).map(|c| c.revision)
    }

    /// Render the page (charts embedded as JSON).
    ///
    /// Each chart carries its shown view first and, when staged, the other
    /// view second; the page's data button swaps between them.
    ///
    /// Important: we avoid `format!()` because the page is mostly JS with its
    /// own `{}`.
    pub fn to_html(&self) -> Result<String, RenderError> {
        let charts: Vec<Value> = self
            .charts
            .iter()
            .map(|(id, c)| {
                let mut views = vec![json!({ "unit": c.tooltip_unit, "config": c.config })];
                if let Some((config, unit)) = &c.alternate {
                    views.push(json!({ "unit": unit, "config": config }));
                }
                json!({ "id": id, "views": views })
            })
            .collect();
        let json = serde_json::to_string(&charts).map_err(|e| RenderError::Serialize {
            id: "<page>".into(),
            message: e.to_string(),
        })?;
        // Keep keys like "</script>" from closing the script element.
        let json = json.replace("</", "<\\/");

        const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Latency breakdown</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js@2.9.4/dist/Chart.min.js"></script>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 16px; }
  .chart { max-width: 1100px; margin-bottom: 32px; border-bottom: 1px solid #ddd; padding-bottom: 12px; }
  .chart button { padding: 6px 10px; margin-right: 8px; }
</style>
</head>
<body>
<script>
const CHARTS = __CHARTS__;

function formatValue(unit, v) {
  if (v === null || v === undefined) return "n/a";
  if (unit === "%") return (v * 100).toFixed(1) + "%";
  return v.toFixed(1) + " " + unit;
}

for (const c of CHARTS) {
  const div = document.createElement("div");
  div.className = "chart";
  div.id = c.id;

  const canvas = document.createElement("canvas");
  div.appendChild(canvas);
  document.body.appendChild(div);

  let shown = 0;
  const config = c.views[shown].config;
  config.options.tooltips = {
    callbacks: {
      label: (item, data) =>
        data.datasets[item.datasetIndex].label + ": " +
        formatValue(c.views[shown].unit, item.xLabel)
    }
  };
  const chart = new Chart(canvas.getContext("2d"), config);

  const legend = document.createElement("button");
  legend.textContent = "Toggle Legend";
  legend.onclick = () => {
    chart.options.legend.display = !chart.options.legend.display;
    chart.update();
  };
  div.appendChild(legend);

  if (c.views.length > 1) {
    const dataLabel = (view) => view.unit === "%" ? "Normalized Data" : "Raw Data";
    const data = document.createElement("button");
    data.textContent = dataLabel(c.views[1]);
    data.onclick = () => {
      shown = 1 - shown;
      const next = c.views[shown].config;
      const axis = chart.options.scales.xAxes[0];
      const nextAxis = next.options.scales.xAxes[0];
      chart.config.data = next.data;
      axis.ticks.max = nextAxis.ticks.max;
      axis.scaleLabel.labelString = nextAxis.scaleLabel.labelString;
      data.textContent = dataLabel(c.views[1 - shown]);
      chart.update();
    };
    div.appendChild(data);
  }
}
</script>
</body>
</html>
"#;

        Ok(TEMPLATE.replace("__CHARTS__", &json))
    }
}

/// Build the Chart.js v2 config for one chart from the table's wire shape
/// (`{ labels, rows: [{ key, values, color }] }`).
fn chart_config(
    id: &str,
    table: &AggregatedTable,
    options: &ChartOptions,
) -> Result<Value, RenderError> {
    let wire = serde_json::to_value(table).map_err(|e| RenderError::Serialize {
        id: id.to_string(),
        message: e.to_string(),
    })?;
    let datasets: Vec<Value> = wire["rows"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    json!({
                        "label": row["key"],
                        "data": row["values"],
                        "backgroundColor": row["color"],
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let mut ticks = json!({});
    if let Some(max) = options.x_axis.max {
        ticks["max"] = json!(max);
    }
    let mut title = json!({ "display": true, "text": options.title });
    if let Some(size) = options.font_size {
        title["fontSize"] = json!(size);
    }

    let kind = if options.horizontal {
        "horizontalBar"
    } else {
        "bar"
    };

    Ok(json!({
        "type": kind,
        "data": {
            "labels": wire["labels"],
            "datasets": datasets,
        },
        "options": {
            "title": title,
            "legend": {
                "display": options.legend.display,
                "position": options.legend.position,
            },
            "scales": {
                "yAxes": [{ "stacked": options.y_axis.stacked }],
                "xAxes": [{
                    "stacked": options.x_axis.stacked,
                    "ticks": ticks,
                    "scaleLabel": {
                        "display": options.x_axis.label.is_some(),
                        "labelString": options.x_axis.label.clone().unwrap_or_default(),
                    },
                }],
            },
        },
    }))
}

impl ChartRenderer for HtmlRenderer {
    fn render(
        &mut self,
        id: &str,
        table: &AggregatedTable,
        options: &ChartOptions,
    ) -> Result<(), RenderError> {
        self.charts.insert(
            id.to_string(),
            ChartEntry {
                config: chart_config(id, table, options)?,
                tooltip_unit: options.tooltip_unit.clone(),
                alternate: None,
                revision: 0,
            },
        );
        Ok(())
    }

    fn update(
        &mut self,
        id: &str,
        table: &AggregatedTable,
        options: &ChartOptions,
    ) -> Result<(), RenderError> {
        let entry = self
            .charts
            .get_mut(id)
            .ok_or_else(|| RenderError::UnknownChart(id.to_string()))?;
        entry.config = chart_config(id, table, options)?;
        entry.tooltip_unit = options.tooltip_unit.clone();
        entry.revision += 1;
        Ok(())
    }

    fn stage_alternate(
        &mut self,
        id: &str,
        table: &AggregatedTable,
        options: &ChartOptions,
    ) -> Result<(), RenderError> {
        let config = chart_config(id, table, options)?;
        let entry = self
            .charts
            .get_mut(id)
            .ok_or_else(|| RenderError::UnknownChart(id.to_string()))?;
        entry.alternate = Some((config, options.tooltip_unit.clone()));
        Ok(())
    }
}
