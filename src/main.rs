use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod controller;
mod error;
mod model;
mod render;
mod series;
mod source;
mod trace;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "latency-charts")]
#[command(about = "Stacked latency breakdown charts from per-event CSV data", long_about = None)]
struct Cli {
    /// Log filter (tracing EnvFilter syntax).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one chart per event into a self-contained HTML page.
    Report {
        /// Directory or http(s) base URL holding `<event>_{all,queue,handle}.csv`.
        #[arg(long, default_value = "data")]
        data: String,

        /// Chart configuration (JSON).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Event to chart, as `name` or `name=title`. Adds to the config's events.
        #[arg(long = "event")]
        events: Vec<String>,

        #[arg(short = 'o', long)]
        out: PathBuf,

        /// Start every chart on the raw (ms) view.
        #[arg(long)]
        raw: bool,

        /// Start every chart with the legend shown.
        #[arg(long)]
        legend: bool,

        /// Reject CSV lines that do not carry a number.
        #[arg(long)]
        strict: bool,
    },

    /// Turn a JSON-lines trace dump into per-event chart CSVs.
    Process {
        #[arg(long)]
        input: String,

        /// Event name used as the output file prefix.
        #[arg(long)]
        event: String,

        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.cmd {
        Commands::Report {
            data,
            config: config_path,
            events,
            out,
            raw,
            legend,
            strict,
        } => {
            // 1) Config + event list.
            let mut cfg = match &config_path {
                Some(path) => config::Config::load(path)?,
                None => config::Config::default(),
            };
            for arg in &events {
                let (name, title) = match arg.split_once('=') {
                    Some((name, title)) => (name, Some(title.to_string())),
                    None => (arg.as_str(), None),
                };
                cfg.events.push(config::EventSpec {
                    name: name.to_string(),
                    title,
                });
            }
            cfg.validate()?;
            if cfg.events.is_empty() {
                anyhow::bail!("no events to chart (use --event or the config's events list)");
            }

            // 2) Build every chart.
            let mode = if strict {
                series::ParseMode::Strict
            } else {
                series::ParseMode::Lenient
            };
            let specs = cfg.events.clone();
            let mut ctl = controller::EventGraphController::new(
                source::from_location(&data),
                render::HtmlRenderer::new(),
                cfg,
            )?
            .with_parse_mode(mode);

            for spec in &specs {
                ctl.generate_graph(&spec.name, spec.title())
                    .with_context(|| format!("generate chart for event {}", spec.name))?;
            }

            ctl.store().for_each(|event, tables| {
                info!(
                    event,
                    rows = tables.raw.len(),
                    queue_share = tables.summary.queue_share,
                    handle_share = tables.summary.handle_share,
                    "event summary"
                );
            });

            // 3) Initial display state.
            if raw {
                ctl.toggle_data_type_all()?;
            }
            if legend {
                ctl.toggle_legend_all()?;
            }

            // 4) Render HTML.
            let renderer = ctl.into_renderer();
            let html = renderer.to_html()?;
            std::fs::write(&out, html).with_context(|| format!("write {}", out.display()))?;
            info!(charts = renderer.chart_ids().count(), "report written");
            println!("Wrote {}", out.display());
        }

        Commands::Process {
            input,
            event,
            out_dir,
        } => {
            let traces = trace::load_traces(&input)?;
            let latencies = trace::latencies(&traces);
            info!(traces = traces.len(), latencies = latencies.len(), "processing traces");

            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("create {}", out_dir.display()))?;

            for perspective in trace::Perspective::ALL {
                let durations = trace::event_durations(&latencies, perspective);
                let prefix = format!("{}{}", event, perspective.suffix());

                for label in model::Label::ALL {
                    let by_name = match label {
                        model::Label::All => &durations.all,
                        model::Label::Queue => &durations.queue,
                        model::Label::Handle => &durations.handle,
                    };
                    let ranked = trace::compute_stats(by_name, latencies.len());

                    let chart = out_dir.join(format!("{}_{}.csv", prefix, label.as_str()));
                    trace::write_file(&chart, &trace::chart_csv(&ranked))?;
                    let stats = out_dir.join(format!("{}_{}_stats.csv", prefix, label.as_str()));
                    trace::write_file(&stats, &trace::stats_csv(&ranked))?;
                    println!("Wrote {}", chart.display());
                }
            }
        }
    }

    Ok(())
}
