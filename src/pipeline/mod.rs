//! Render orchestrator: ties loader → axes → chart → peaks together.
//!
//! ## One render pass
//!
//! `Session::render()` runs synchronously per interaction:
//!   1. Parse the upload (or reuse the table parsed from identical bytes)
//!   2. Resolve the (x, y) selection, coercing a date x column if possible
//!   3. Build the base figure for the requested chart kind
//!   4. Optionally overlay moving averages, maxima and peaks
//!
//! Every error is caught here and returned as a message; a failed pass
//! leaves the session usable for the next one.

use crate::axes::{AnalysisSeries, AxisCandidates, analysis_series, eligible_columns, resolve_axes};
use crate::chart::{self, ChartKind, Figure};
use crate::config::AppConfig;
use crate::errors::{AxisError, LoadError, PipelineError};
use crate::loader;
use crate::models::{PeakRecord, Table};
use crate::peaks::{ProminenceRule, find_peaks};
use crate::report::format_records;
use crate::utils::Timer;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, info, warn};

/// Everything one render pass needs from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub x: String,
    pub y: String,
    pub kind: ChartKind,
    pub highlight_max: bool,
    pub find_peaks: bool,
    pub moving_averages: bool,
    /// Overrides `analysis.prominence_factor` for this pass.
    pub prominence_factor: Option<f64>,
}

impl RenderRequest {
    pub fn new(x: impl Into<String>, y: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            kind,
            highlight_max: false,
            find_peaks: false,
            moving_averages: false,
            prominence_factor: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    fn info(text: impl Into<String>) -> Self {
        Self { level: Level::Info, text: text.into() }
    }

    fn warning(text: impl Into<String>) -> Self {
        Self { level: Level::Warning, text: text.into() }
    }

    fn from_error(e: &PipelineError) -> Self {
        let level = match e {
            PipelineError::Axis(AxisError::NonNumericAxis { .. }) => Level::Warning,
            _ => Level::Error,
        };
        Self { level, text: e.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PeakOutcome {
    #[default]
    NotRequested,
    /// Informational: the scan ran and found nothing salient.
    NoPeaks,
    Found(Vec<PeakRecord>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutcome {
    pub figure: Option<Figure>,
    pub maxima: Vec<PeakRecord>,
    pub peaks: PeakOutcome,
    pub maxima_report: Vec<String>,
    pub peak_report: Vec<String>,
    pub messages: Vec<Message>,
}

impl RenderOutcome {
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.level == Level::Error)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub renders: usize,
    pub cache_hits: usize,
    pub errors: usize,
}

struct CachedTable {
    key: u64,
    bytes: Vec<u8>,
    table: Table,
}

/// One user's interactive session.
pub struct Session {
    config: AppConfig,
    cache: Option<CachedTable>,
    stats: SessionStats,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self { config, cache: None, stats: SessionStats::default() }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Parsed table for `upload`, fresh copy per call.
    ///
    /// The parse is reused when the bytes are identical to the previous
    /// upload; the copy keeps resolver coercions out of the cache.
    pub fn table(&mut self, upload: &[u8]) -> Result<Table, LoadError> {
        let key = upload_key(upload);
        if let Some(cached) = self
            .cache
            .as_ref()
            .filter(|c| c.key == key && c.bytes == upload)
        {
            self.stats.cache_hits += 1;
            debug!("Reusing parsed upload {:016x}", key);
            return Ok(cached.table.clone());
        }

        let table = loader::load(upload, &self.config.loader)?;
        self.cache = Some(CachedTable {
            key,
            bytes: upload.to_vec(),
            table: table.clone(),
        });
        Ok(table)
    }

    /// Row count and axis-eligible columns of an upload.
    pub fn columns(&mut self, upload: &[u8]) -> Result<(usize, AxisCandidates), PipelineError> {
        let table = self.table(upload)?;
        Ok((table.row_count(), eligible_columns(&table)))
    }

    pub fn render(&mut self, upload: &[u8], request: &RenderRequest) -> RenderOutcome {
        let _t = Timer::start("Render pass");
        self.stats.renders += 1;

        let mut outcome = RenderOutcome::default();
        if let Err(e) = self.try_render(upload, request, &mut outcome) {
            warn!("Render failed: {}", e);
            self.stats.errors += 1;
            outcome.messages.push(Message::from_error(&e));
        }
        outcome
    }

    fn try_render(
        &mut self,
        upload: &[u8],
        request: &RenderRequest,
        outcome: &mut RenderOutcome,
    ) -> Result<(), PipelineError> {
        let mut table = self.table(upload)?;
        let axes = resolve_axes(&mut table, &request.x, &request.y)?;

        let mut figure = chart::render(&table, &axes, request.kind, &self.config.chart);
        outcome
            .messages
            .extend(figure.warnings.iter().map(|w| Message::warning(w.to_string())));

        if figure.is_placeholder() {
            outcome.figure = Some(figure);
            return Ok(());
        }
        if matches!(request.kind, ChartKind::Histogram { .. }) {
            if request.highlight_max || request.find_peaks {
                outcome
                    .messages
                    .push(Message::info("maxima and peaks are not shown on a histogram"));
            }
            outcome.figure = Some(figure);
            return Ok(());
        }

        let series = analysis_series(&table, &axes)?;
        let result = self.annotate(&mut figure, &series, request, outcome);
        outcome.figure = Some(figure);
        result
    }

    fn annotate(
        &self,
        figure: &mut Figure,
        series: &AnalysisSeries,
        request: &RenderRequest,
        outcome: &mut RenderOutcome,
    ) -> Result<(), PipelineError> {
        let decimals = self.config.analysis.display_decimals;
        debug!("{} analysable points", series.present_count());

        if request.moving_averages && request.kind == ChartKind::Line {
            chart::add_moving_averages(figure, series, &self.config.chart.moving_average_windows);
        }

        if request.highlight_max {
            outcome.maxima = chart::highlight_maxima(figure, series);
            outcome.maxima_report = format_records(&outcome.maxima, decimals);
        }

        if request.find_peaks {
            let factor = request
                .prominence_factor
                .unwrap_or(self.config.analysis.prominence_factor);
            let scan = find_peaks(&series.values, &series.positions, ProminenceRule::new(factor)?)?;

            if scan.is_empty() {
                outcome.messages.push(Message::info("no peaks found"));
                outcome.peaks = PeakOutcome::NoPeaks;
            } else {
                info!("{} peaks (threshold {:?})", scan.peaks.len(), scan.threshold);
                chart::annotate_peaks(figure, &scan.peaks);
                outcome.peak_report = format_records(&scan.peaks, decimals);
                outcome.peaks = PeakOutcome::Found(scan.peaks);
            }
        }

        Ok(())
    }

    /// Normalized comparison of entity columns against a shared x column.
    pub fn compare(&mut self, upload: &[u8], x: &str, entities: &[String]) -> RenderOutcome {
        let _t = Timer::start("Comparison pass");
        self.stats.renders += 1;

        let mut outcome = RenderOutcome::default();
        let result = self
            .table(upload)
            .map_err(PipelineError::from)
            .and_then(|mut table| Ok(chart::compare_entities(&mut table, x, entities)?));

        match result {
            Ok(figure) => {
                outcome
                    .messages
                    .extend(figure.warnings.iter().map(|w| Message::warning(w.to_string())));
                outcome.figure = Some(figure);
            }
            Err(e) => {
                warn!("Comparison failed: {}", e);
                self.stats.errors += 1;
                outcome.messages.push(Message::from_error(&e));
            }
        }
        outcome
    }
}

fn upload_key(upload: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    upload.hash(&mut hasher);
    hasher.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
