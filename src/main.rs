mod axes;
mod chart;
mod config;
mod errors;
mod loader;
mod models;
mod peaks;
mod pipeline;
mod report;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::chart::{ChartKind, Figure};
use crate::config::AppConfig;
use crate::loader::read_upload;
use crate::pipeline::{Level, RenderOutcome, RenderRequest, Session};

#[derive(Parser)]
#[command(name = "peak-charts", about = "Chart CSV columns and annotate their peaks", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// List the columns eligible for each axis
    Columns {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Render one chart as JSON, optionally with maxima and peaks
    Plot {
        #[arg(short, long)]
        file: PathBuf,

        /// X-axis column
        #[arg(short, long)]
        x: String,

        /// Y-axis column (numeric)
        #[arg(short, long)]
        y: String,

        #[arg(short, long, value_enum, default_value_t = KindArg::Scatter)]
        kind: KindArg,

        /// Histogram bin count (default from config)
        #[arg(long)]
        bins: Option<usize>,

        /// Highlight the maximum y value(s)
        #[arg(long)]
        max: bool,

        /// Detect and annotate prominent peaks
        #[arg(long)]
        peaks: bool,

        #[arg(long, env = "PEAK_PROMINENCE_FACTOR")]
        prominence_factor: Option<f64>,

        /// Overlay moving averages (line charts only)
        #[arg(long)]
        moving_average: bool,

        /// Write the figure here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Compare entity columns as % change from their first value
    Compare {
        #[arg(short, long)]
        file: PathBuf,

        /// Shared x column, usually a date
        #[arg(short, long)]
        x: String,

        /// Comma-separated entity columns (default: every numeric column)
        #[arg(short, long, value_delimiter = ',')]
        entities: Vec<String>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Re-emit an upload as clean UTF-8 CSV (unique headers, padded rows)
    Clean {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Scatter,
    Line,
    Bar,
    Histogram,
}

impl KindArg {
    fn chart_kind(self, bins: Option<usize>) -> ChartKind {
        match self {
            KindArg::Scatter => ChartKind::Scatter,
            KindArg::Line => ChartKind::Line,
            KindArg::Bar => ChartKind::Bar,
            KindArg::Histogram => ChartKind::Histogram { bins },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "peak_charts=info,warn",
        1 => "peak_charts=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let mut session = Session::new(config);

    match cli.command {
        Command::Columns { file } => {
            let upload = read_upload(&file)?;
            let (rows, candidates) = session.columns(&upload)?;
            println!("─────────────────────────────────");
            println!("  {}", file.display());
            println!("─────────────────────────────────");
            println!("  Rows        : {}", utils::fmt_count(rows));
            println!("  Numeric     : {}", candidates.numeric.join(", "));
            println!("  Categorical : {}", candidates.categorical.join(", "));
            println!("  Date-capable: {}", candidates.date_capable.join(", "));
            println!("─────────────────────────────────");
        }

        Command::Plot {
            file,
            x,
            y,
            kind,
            bins,
            max,
            peaks,
            prominence_factor,
            moving_average,
            out,
        } => {
            let upload = read_upload(&file)?;
            let request = RenderRequest {
                x,
                y,
                kind: kind.chart_kind(bins),
                highlight_max: max,
                find_peaks: peaks,
                moving_averages: moving_average,
                prominence_factor,
            };
            let outcome = session.render(&upload, &request);
            finish(outcome, out.as_deref())?;
        }

        Command::Compare { file, x, entities, out } => {
            let upload = read_upload(&file)?;
            let outcome = session.compare(&upload, &x, &entities);
            finish(outcome, out.as_deref())?;
        }

        Command::Clean { file, out } => {
            let upload = read_upload(&file)?;
            let table = session.table(&upload)?;
            let csv = loader::to_csv(&table, b',')?;
            match out {
                Some(path) => {
                    std::fs::write(&path, csv).with_context(|| format!("Failed to write {:?}", path))?;
                    info!("{} rows written to {:?}", utils::fmt_count(table.row_count()), path);
                }
                None => print!("{}", csv),
            }
        }
    }

    Ok(())
}

/// Print messages and reports, then emit the figure.
fn finish(outcome: RenderOutcome, out: Option<&Path>) -> Result<()> {
    for m in &outcome.messages {
        let tag = match m.level {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        eprintln!("[{}] {}", tag, m.text);
    }

    if !outcome.maxima_report.is_empty() {
        eprintln!("Maximum:");
        outcome.maxima_report.iter().for_each(|l| eprintln!("  {}", l));
    }
    if !outcome.peak_report.is_empty() {
        eprintln!("Peaks:");
        outcome.peak_report.iter().for_each(|l| eprintln!("  {}", l));
    }

    if let Some(figure) = &outcome.figure {
        write_figure(figure, out)?;
    }
    if outcome.has_errors() {
        anyhow::bail!("render failed");
    }
    Ok(())
}

fn write_figure(figure: &Figure, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(figure).context("Failed to serialise figure")?;
    match out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Figure written to {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
