//! Event graph orchestration: fetch the three payloads of an event, build its
//! raw and normalized tables, keep them, and drive the renderer.

use crate::config::{Config, DataView};
use crate::error::{ConfigError, Error};
use crate::model::{AggregatedTable, Label, Palette, Summary};
use crate::render::{AxisOptions, ChartOptions, ChartRenderer, LegendOptions};
use crate::series::{ParseMode, normalize, parse_series};
use crate::source::Source;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// Both tables of one event plus the raw column totals.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTables {
    pub raw: AggregatedTable,
    pub normalized: AggregatedTable,
    pub summary: Summary,
}

impl EventTables {
    pub fn table(&self, view: DataView) -> &AggregatedTable {
        match view {
            DataView::Raw => &self.raw,
            DataView::Normalized => &self.normalized,
        }
    }
}

/// Tables by event name, kept for the controller's lifetime.
#[derive(Debug, Default)]
pub struct EventGraphStore {
    events: IndexMap<String, EventTables>,
}

impl EventGraphStore {
    pub fn get(&self, event: &str) -> Option<&EventTables> {
        self.events.get(event)
    }

    pub fn put(&mut self, event: impl Into<String>, tables: EventTables) {
        self.events.insert(event.into(), tables);
    }

    pub fn for_each(&self, mut f: impl FnMut(&str, &EventTables)) {
        for (event, tables) in &self.events {
            f(event, tables);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Display state of one rendered chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub view: DataView,
    pub options: ChartOptions,
}

pub struct EventGraphController<S, R> {
    source: S,
    renderer: R,
    config: Config,
    palette: Palette,
    mode: ParseMode,
    store: EventGraphStore,
    charts: IndexMap<String, Chart>,
}

impl<S: Source, R: ChartRenderer> EventGraphController<S, R> {
    pub fn new(source: S, renderer: R, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let palette = config.palette()?;
        Ok(Self {
            source,
            renderer,
            config,
            palette,
            mode: ParseMode::default(),
            store: EventGraphStore::default(),
            charts: IndexMap::new(),
        })
    }

    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn store(&self) -> &EventGraphStore {
        &self.store
    }

    #[cfg(test)]
    pub fn chart(&self, event: &str) -> Option<&Chart> {
        self.charts.get(event)
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Build, store and render the chart for `event`.
    ///
    /// Payloads are fetched in column order (all, queue, handle). Any fetch or
    /// parse failure aborts the event before anything is stored.
    pub fn generate_graph(&mut self, event: &str, title: &str) -> Result<(), Error> {
        let tables = self.build_tables(event)?;

        let view = self.config.initial_view;
        let chart = Chart {
            view,
            options: self.chart_options(title, view),
        };
        self.renderer
            .render(event, tables.table(view), &chart.options)?;
        let alternate = self.alternate_options(&chart);
        self.renderer
            .stage_alternate(event, tables.table(view.flipped()), &alternate)?;

        info!(
            event,
            rows = tables.raw.len(),
            all_ms = tables.summary.total(Label::All),
            "generated graph"
        );
        self.store.put(event, tables);
        self.charts.insert(event.to_string(), chart);
        Ok(())
    }

    fn build_tables(&self, event: &str) -> Result<EventTables, Error> {
        let mut raw = AggregatedTable::new();
        let mut normalized = AggregatedTable::new();

        for label in Label::ALL {
            let name = format!("{}_{}.csv", event, label.as_str());
            let text = self.source.fetch(&name)?;
            let series = parse_series(&text, self.mode).map_err(|source| Error::Parse {
                name: name.clone(),
                source,
            })?;
            debug!(event, label = label.as_str(), keys = series.len(), "parsed payload");

            if series.sum() == 0.0 {
                warn!(
                    event,
                    label = label.as_str(),
                    "payload sums to zero; normalized values are NaN"
                );
            }
            raw.merge(&series, label, &self.palette);
            normalized.merge(&normalize(&series), label, &self.palette);
        }

        let summary = Summary::from_raw(&raw);
        if self.config.show_totals {
            let labels = summary.decorated_labels();
            raw.labels = labels.clone();
            normalized.labels = labels;
        }

        Ok(EventTables {
            raw,
            normalized,
            summary,
        })
    }

    fn chart_options(&self, title: &str, view: DataView) -> ChartOptions {
        let mut options = ChartOptions {
            title: title.to_string(),
            horizontal: true,
            legend: LegendOptions {
                display: false,
                position: self.config.legend_position.clone(),
            },
            x_axis: AxisOptions {
                stacked: true,
                max: None,
                label: None,
            },
            y_axis: AxisOptions {
                stacked: true,
                max: None,
                label: None,
            },
            font_size: self.config.font_size,
            tooltip_unit: String::new(),
        };
        self.apply_view(&mut options, view);
        options
    }

    fn apply_view(&self, options: &mut ChartOptions, view: DataView) {
        let (label, unit) = match view {
            DataView::Normalized => ("duration (%)", "%"),
            DataView::Raw => ("duration (ms)", "ms"),
        };
        options.x_axis.max = Some(self.config.axis_max(view));
        options.x_axis.label = Some(label.to_string());
        options.tooltip_unit = unit.to_string();
    }

    /// Show or hide the legend of one chart.
    pub fn toggle_legend(&mut self, event: &str) -> Result<(), Error> {
        let chart = self
            .charts
            .get_mut(event)
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))?;
        chart.options.legend.display = !chart.options.legend.display;
        self.redraw(event)
    }

    /// Swap one chart between its raw and normalized table.
    pub fn toggle_data_type(&mut self, event: &str) -> Result<(), Error> {
        let mut chart = self
            .charts
            .get(event)
            .cloned()
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))?;
        chart.view = chart.view.flipped();
        self.apply_view(&mut chart.options, chart.view);
        self.charts.insert(event.to_string(), chart);
        self.redraw(event)
    }

    pub fn toggle_legend_all(&mut self) -> Result<(), Error> {
        let events: Vec<String> = self.charts.keys().cloned().collect();
        for event in events {
            self.toggle_legend(&event)?;
        }
        Ok(())
    }

    pub fn toggle_data_type_all(&mut self) -> Result<(), Error> {
        let events: Vec<String> = self.charts.keys().cloned().collect();
        for event in events {
            self.toggle_data_type(&event)?;
        }
        Ok(())
    }

    fn redraw(&mut self, event: &str) -> Result<(), Error> {
        let chart = self
            .charts
            .get(event)
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))?;
        let tables = self
            .store
            .get(event)
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))?;
        let alternate = self.alternate_options(chart);
        self.renderer
            .stage_alternate(event, tables.table(chart.view.flipped()), &alternate)?;
        self.renderer
            .update(event, tables.table(chart.view), &chart.options)?;
        Ok(())
    }

    /// Options the chart would have after a data-type toggle.
    fn alternate_options(&self, chart: &Chart) -> ChartOptions {
        let mut options = chart.options.clone();
        self.apply_view(&mut options, chart.view.flipped());
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, ParseError, RenderError};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemSource(HashMap<String, String>);

    impl MemSource {
        fn with(mut self, name: &str, text: &str) -> Self {
            self.0.insert(name.to_string(), text.to_string());
            self
        }
    }

    impl Source for MemSource {
        fn fetch(&self, name: &str) -> Result<String, FetchError> {
            self.0.get(name).cloned().ok_or_else(|| FetchError::Io {
                path: name.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, &'static str, AggregatedTable, ChartOptions)>,
    }

    impl ChartRenderer for Recorder {
        fn render(
            &mut self,
            id: &str,
            table: &AggregatedTable,
            options: &ChartOptions,
        ) -> Result<(), RenderError> {
            self.calls
                .push((id.to_string(), "render", table.clone(), options.clone()));
            Ok(())
        }

        fn update(
            &mut self,
            id: &str,
            table: &AggregatedTable,
            options: &ChartOptions,
        ) -> Result<(), RenderError> {
            self.calls
                .push((id.to_string(), "update", table.clone(), options.clone()));
            Ok(())
        }

        fn stage_alternate(
            &mut self,
            id: &str,
            table: &AggregatedTable,
            options: &ChartOptions,
        ) -> Result<(), RenderError> {
            self.calls
                .push((id.to_string(), "alternate", table.clone(), options.clone()));
            Ok(())
        }
    }

    fn login_source() -> MemSource {
        MemSource::default()
            .with("login_all.csv", "login,100\nlogout,50")
            .with("login_queue.csv", "login,10\nlogout,5")
            .with("login_handle.csv", "login,90\nlogout,45")
    }

    fn controller(source: MemSource, config: Config) -> EventGraphController<MemSource, Recorder> {
        EventGraphController::new(source, Recorder::default(), config).unwrap()
    }

    #[test]
    fn login_scenario_builds_both_tables() {
        let mut c = controller(login_source(), Config::default());
        c.generate_graph("login", "Login").unwrap();

        let tables = c.store().get("login").unwrap();
        assert_eq!(tables.raw.row("login").unwrap().values, [100.0, 10.0, 90.0]);
        assert_eq!(tables.raw.row("logout").unwrap().values, [50.0, 5.0, 45.0]);

        let norm = &tables.normalized;
        assert!((norm.row("login").unwrap().value(Label::All) - 0.667).abs() < 1e-3);
        assert!((norm.row("logout").unwrap().value(Label::All) - 0.333).abs() < 1e-3);
        for label in Label::ALL {
            assert!((norm.column_total(label) - 1.0).abs() < 1e-9);
        }
        assert_eq!(tables.summary.totals, [150.0, 15.0, 135.0]);
    }

    #[test]
    fn first_render_shows_normalized_view() {
        let mut c = controller(login_source(), Config::default());
        c.generate_graph("login", "Login").unwrap();

        let (id, kind, table, options) = &c.renderer().calls[0];
        assert_eq!(id, "login");
        assert_eq!(*kind, "render");
        assert_eq!(table, &c.store().get("login").unwrap().normalized);
        assert_eq!(options.title, "Login");
        assert_eq!(options.x_axis.max, Some(1.0));
        assert_eq!(options.x_axis.label.as_deref(), Some("duration (%)"));
        assert!(options.x_axis.stacked && options.y_axis.stacked && options.horizontal);
        assert!(!options.legend.display);
    }

    #[test]
    fn toggle_data_type_swaps_table_and_axis() {
        let config = Config {
            raw_axis_max: 1400.0,
            ..Default::default()
        };
        let mut c = controller(login_source(), config);
        c.generate_graph("login", "Login").unwrap();

        c.toggle_data_type("login").unwrap();
        let (_, kind, table, options) = c.renderer().calls.last().unwrap();
        assert_eq!(*kind, "update");
        assert_eq!(table, &c.store().get("login").unwrap().raw);
        assert_eq!(options.x_axis.max, Some(1400.0));
        assert_eq!(options.x_axis.label.as_deref(), Some("duration (ms)"));
        assert_eq!(options.tooltip_unit, "ms");
        assert_eq!(c.chart("login").unwrap().view, DataView::Raw);

        c.toggle_data_type("login").unwrap();
        let (_, _, table, options) = c.renderer().calls.last().unwrap();
        assert_eq!(table, &c.store().get("login").unwrap().normalized);
        assert_eq!(options.x_axis.max, Some(1.0));
    }

    #[test]
    fn alternate_view_is_staged_with_its_own_axis() {
        let config = Config {
            raw_axis_max: 700.0,
            ..Default::default()
        };
        let mut c = controller(login_source(), config);
        c.generate_graph("login", "Login").unwrap();

        let (id, kind, table, options) = &c.renderer().calls[1];
        assert_eq!(id, "login");
        assert_eq!(*kind, "alternate");
        assert_eq!(table, &c.store().get("login").unwrap().raw);
        assert_eq!(options.x_axis.max, Some(700.0));
        assert_eq!(options.x_axis.label.as_deref(), Some("duration (ms)"));
        assert_eq!(options.tooltip_unit, "ms");

        c.toggle_data_type("login").unwrap();
        let calls = &c.renderer().calls;
        let (_, kind, table, options) = &calls[calls.len() - 2];
        assert_eq!(*kind, "alternate");
        assert_eq!(table, &c.store().get("login").unwrap().normalized);
        assert_eq!(options.x_axis.max, Some(1.0));
    }

    #[test]
    fn toggle_legend_flips_display() {
        let mut c = controller(login_source(), Config::default());
        c.generate_graph("login", "Login").unwrap();
        c.toggle_legend("login").unwrap();
        assert!(c.chart("login").unwrap().options.legend.display);
        c.toggle_legend("login").unwrap();
        assert!(!c.chart("login").unwrap().options.legend.display);
        let kinds: Vec<_> = c.renderer().calls.iter().map(|call| call.1).collect();
        assert_eq!(
            kinds,
            vec!["render", "alternate", "alternate", "update", "alternate", "update"]
        );
    }

    #[test]
    fn toggles_fan_out_to_every_chart() {
        let source = login_source()
            .with("tap_all.csv", "a,1")
            .with("tap_queue.csv", "a,1")
            .with("tap_handle.csv", "a,1");
        let mut c = controller(source, Config::default());
        c.generate_graph("login", "Login").unwrap();
        c.generate_graph("tap", "Tap").unwrap();

        c.toggle_legend_all().unwrap();
        c.toggle_data_type_all().unwrap();
        for event in ["login", "tap"] {
            let chart = c.chart(event).unwrap();
            assert!(chart.options.legend.display);
            assert_eq!(chart.view, DataView::Raw);
        }
        let updates: Vec<_> = c
            .renderer()
            .calls
            .iter()
            .filter(|call| call.1 == "update")
            .map(|call| call.0.as_str())
            .collect();
        assert_eq!(updates, vec!["login", "tap", "login", "tap"]);
    }

    #[test]
    fn toggle_of_unknown_event_fails() {
        let mut c = controller(login_source(), Config::default());
        assert!(matches!(
            c.toggle_legend("nope"),
            Err(Error::UnknownEvent(e)) if e == "nope"
        ));
        assert!(c.toggle_data_type("nope").is_err());
    }

    #[test]
    fn fetch_failure_stores_nothing() {
        let source = MemSource::default()
            .with("x_all.csv", "a,1")
            .with("x_handle.csv", "a,1");
        let mut c = controller(source, Config::default());
        let err = c.generate_graph("x", "X").unwrap_err();
        assert!(matches!(err, Error::Fetch(FetchError::Io { ref path, .. }) if path == "x_queue.csv"));
        assert!(c.store().is_empty());
        assert!(c.chart("x").is_none());
        assert!(c.renderer().calls.is_empty());
    }

    #[test]
    fn strict_mode_surfaces_parse_error() {
        let source = login_source().with("login_queue.csv", "login,10\nlogout");
        let mut c = controller(source, Config::default()).with_parse_mode(ParseMode::Strict);
        match c.generate_graph("login", "Login").unwrap_err() {
            Error::Parse { name, source } => {
                assert_eq!(name, "login_queue.csv");
                assert!(matches!(source, ParseError::Malformed { line: 2, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_queue_payload_yields_nan_queue_entries() {
        let source = login_source().with("login_queue.csv", "");
        let mut c = controller(source, Config::default());
        c.generate_graph("login", "Login").unwrap();

        let tables = c.store().get("login").unwrap();
        assert_eq!(tables.raw.row("login").unwrap().value(Label::Queue), 0.0);
        assert_eq!(tables.raw.row("logout").unwrap().value(Label::Queue), 0.0);
        assert!(tables.normalized.row("").unwrap().value(Label::Queue).is_nan());
    }

    #[test]
    fn totals_are_folded_into_labels() {
        let config = Config {
            show_totals: true,
            ..Default::default()
        };
        let mut c = controller(login_source(), config);
        c.generate_graph("login", "Login").unwrap();
        let tables = c.store().get("login").unwrap();
        assert_eq!(tables.raw.labels[0], "all (150.0 ms)");
        assert_eq!(tables.normalized.labels[1], "queue (15.0 ms, 10.0%)");
        assert_eq!(tables.raw.labels[2], "handle (135.0 ms, 90.0%)");
    }

    #[test]
    fn store_for_each_visits_in_generation_order() {
        let source = login_source()
            .with("tap_all.csv", "a,1")
            .with("tap_queue.csv", "a,1")
            .with("tap_handle.csv", "a,1");
        let mut c = controller(source, Config::default());
        c.generate_graph("tap", "Tap").unwrap();
        c.generate_graph("login", "Login").unwrap();

        let mut seen = Vec::new();
        c.store().for_each(|event, tables| seen.push((event.to_string(), tables.raw.len())));
        assert_eq!(seen, vec![("tap".to_string(), 1), ("login".to_string(), 2)]);
    }
}
