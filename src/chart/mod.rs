//! Abstract figures handed to the presentation layer.
//!
//! Nothing here draws: a [`Figure`] lists traces, histogram bins and marker
//! overlays, and serializes to JSON for whatever surface displays it.

pub mod annotate;
pub mod compare;

use crate::axes::{ResolvedAxes, XAxis, XRole};
use crate::config::ChartConfig;
use crate::models::{Point, Position, Table};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub use annotate::{add_moving_averages, annotate_peaks, highlight_maxima};
pub use compare::{compare_entities, normalize, render_multi_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartKind {
    Scatter,
    /// Line with point markers.
    Line,
    /// Categorical x only.
    Bar,
    /// Distribution of y; `None` uses the configured bin count.
    Histogram { bins: Option<usize> },
    /// Several labelled series on one ordered x axis.
    MultiLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStyle {
    Markers,
    Lines,
    LinesMarkers,
    Bars,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub style: TraceStyle,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerRole {
    Maximum,
    Peak,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub x: Position,
    pub y: f64,
    pub label: String,
    pub role: MarkerRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverMode {
    Closest,
    XUnified,
}

/// Why a figure is a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ChartWarning {
    #[error("bar charts need a categorical x axis, {column:?} is not categorical")]
    BarNeedsCategoricalX { column: String },

    #[error("a multi-series chart needs one or more entity series")]
    NeedsEntities,

    #[error("no plottable rows")]
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub kind: ChartKind,
    pub x_title: String,
    pub y_title: String,
    pub x_axis: Option<XAxis>,
    pub hover: HoverMode,
    pub traces: Vec<Trace>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bins: Vec<Bin>,
    pub markers: Vec<Marker>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ChartWarning>,
}

impl Figure {
    pub fn new(kind: ChartKind, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind,
            x_title: String::new(),
            y_title: String::new(),
            x_axis: None,
            hover: HoverMode::Closest,
            traces: Vec::new(),
            bins: Vec::new(),
            markers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn with_axes(mut self, x: &str, y: &str, x_axis: Option<XAxis>) -> Self {
        self.x_title = x.to_string();
        self.y_title = y.to_string();
        self.x_axis = x_axis;
        self
    }

    fn placeholder(mut self, warning: ChartWarning) -> Self {
        warn!("{}", warning);
        self.warnings.push(warning);
        self
    }

    /// True when there is nothing to draw.
    pub fn is_placeholder(&self) -> bool {
        self.traces.is_empty() && self.bins.is_empty()
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Build the base figure for one axis selection. Deterministic; reads only.
pub fn render(table: &Table, axes: &ResolvedAxes, kind: ChartKind, config: &ChartConfig) -> Figure {
    let x = axes.x.as_str();
    let y = axes.y.as_str();

    let figure = match kind {
        ChartKind::Scatter => {
            let figure = Figure::new(kind, format!("{} vs {}", y, x)).with_axes(x, y, Some(axes.x_axis));
            with_xy_trace(figure, table, axes, TraceStyle::Markers)
        }
        ChartKind::Line => {
            let figure = Figure::new(kind, format!("{} over {}", y, x)).with_axes(x, y, Some(axes.x_axis));
            with_xy_trace(figure, table, axes, TraceStyle::LinesMarkers)
        }
        ChartKind::Bar => {
            let figure = Figure::new(kind, format!("{} by {}", y, x)).with_axes(x, y, Some(axes.x_axis));
            if axes.x_role() != XRole::Grouped {
                return figure.placeholder(ChartWarning::BarNeedsCategoricalX {
                    column: x.to_string(),
                });
            }
            with_bar_trace(figure, table, axes)
        }
        ChartKind::Histogram { bins } => {
            let figure = Figure::new(kind, format!("Distribution of {}", y)).with_axes(y, "count", None);
            let bins = bins.unwrap_or(config.histogram_bins).max(1);
            with_histogram(figure, table, y, bins)
        }
        ChartKind::MultiLine => {
            return Figure::new(kind, y).placeholder(ChartWarning::NeedsEntities);
        }
    };

    debug!(
        "Rendered {:?}: {} traces, {} bins",
        kind,
        figure.traces.len(),
        figure.bins.len()
    );
    figure
}

/// Rows where both x and y are present, in table order.
fn xy_points(table: &Table, axes: &ResolvedAxes) -> Vec<Point> {
    let (Some(xc), Some(yc)) = (table.column(&axes.x), table.column(&axes.y)) else {
        return Vec::new();
    };
    xc.cells
        .iter()
        .zip(&yc.cells)
        .filter_map(|(xv, yv)| Some(Point { x: xv.to_position()?, y: yv.as_f64()? }))
        .collect()
}

fn with_xy_trace(mut figure: Figure, table: &Table, axes: &ResolvedAxes, style: TraceStyle) -> Figure {
    let points = xy_points(table, axes);
    if points.is_empty() {
        return figure.placeholder(ChartWarning::NoData);
    }
    figure.traces.push(Trace { name: axes.y.clone(), style, points });
    figure
}

/// One bar per category, duplicates summed, first-seen order.
fn with_bar_trace(mut figure: Figure, table: &Table, axes: &ResolvedAxes) -> Figure {
    let mut bars: Vec<Point> = Vec::new();
    for p in xy_points(table, axes) {
        match bars.iter_mut().find(|b| b.x == p.x) {
            Some(bar) => bar.y += p.y,
            None => bars.push(p),
        }
    }
    if bars.is_empty() {
        return figure.placeholder(ChartWarning::NoData);
    }
    figure.traces.push(Trace { name: axes.y.clone(), style: TraceStyle::Bars, points: bars });
    figure
}

fn with_histogram(mut figure: Figure, table: &Table, y: &str, bins: usize) -> Figure {
    let values: Vec<f64> = table
        .column(y)
        .map(|c| c.cells.iter().filter_map(|v| v.as_f64()).filter(|v| v.is_finite()).collect())
        .unwrap_or_default();

    if values.is_empty() {
        return figure.placeholder(ChartWarning::NoData);
    }
    figure.bins = histogram(&values, bins);
    figure
}

/// Equal-width bins over [min, max]; the last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if values.is_empty() {
        return Vec::new();
    }
    if min == max {
        return vec![Bin { start: min, end: max, count: values.len() }];
    }

    let bins = bins.max(1);
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let i = (((v - min) / width) as usize).min(bins - 1);
        counts[i] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            start: min + width * i as f64,
            end: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axes::resolve_axes;
    use crate::config::LoaderConfig;
    use crate::loader::load;

    fn setup(csv: &str, x: &str, y: &str) -> (Table, ResolvedAxes) {
        let mut t = load(csv.as_bytes(), &LoaderConfig::default()).unwrap();
        let axes = resolve_axes(&mut t, x, y).unwrap();
        (t, axes)
    }

    #[test]
    fn test_scatter_skips_incomplete_rows() {
        let (t, axes) = setup("x,y\n1,5\n2,\n,7\n4,9\n", "x", "y");
        let fig = render(&t, &axes, ChartKind::Scatter, &ChartConfig::default());
        assert_eq!(fig.traces.len(), 1);
        assert_eq!(fig.traces[0].style, TraceStyle::Markers);
        assert_eq!(
            fig.traces[0].points,
            vec![
                Point { x: Position::Number(1.0), y: 5.0 },
                Point { x: Position::Number(4.0), y: 9.0 },
            ]
        );
        assert_eq!(fig.x_title, "x");
        assert_eq!(fig.y_title, "y");
    }

    #[test]
    fn test_render_is_deterministic_and_read_only() {
        let (t, axes) = setup("date,temp\n2024-01-02,3\n2024-01-01,4\n", "date", "temp");
        let before = t.clone();
        let a = render(&t, &axes, ChartKind::Line, &ChartConfig::default());
        let b = render(&t, &axes, ChartKind::Line, &ChartConfig::default());
        assert_eq!(a, b);
        assert_eq!(t, before);
        assert_eq!(a.traces[0].style, TraceStyle::LinesMarkers);
        assert_eq!(a.x_axis, Some(XAxis::Date));
    }

    #[test]
    fn test_bar_needs_categorical_x() {
        let (t, axes) = setup("x,y\n1,5\n2,6\n", "x", "y");
        let fig = render(&t, &axes, ChartKind::Bar, &ChartConfig::default());
        assert!(fig.is_placeholder());
        assert_eq!(fig.warnings, vec![ChartWarning::BarNeedsCategoricalX { column: "x".into() }]);
    }

    #[test]
    fn test_bar_sums_duplicate_categories() {
        let (t, axes) = setup("acid,ml\nHCl,5\nNaOH,2\nHCl,1.5\n", "acid", "ml");
        let fig = render(&t, &axes, ChartKind::Bar, &ChartConfig::default());
        assert_eq!(
            fig.traces[0].points,
            vec![
                Point { x: Position::Label("HCl".into()), y: 6.5 },
                Point { x: Position::Label("NaOH".into()), y: 2.0 },
            ]
        );
    }

    #[test]
    fn test_histogram_bins() {
        let (t, axes) = setup("x,y\n1,0\n2,1\n3,2\n4,3\n5,4\n", "x", "y");
        let fig = render(&t, &axes, ChartKind::Histogram { bins: Some(2) }, &ChartConfig::default());
        assert_eq!(
            fig.bins,
            vec![
                Bin { start: 0.0, end: 2.0, count: 2 },
                Bin { start: 2.0, end: 4.0, count: 3 },
            ]
        );
        assert!(fig.traces.is_empty());
        assert!(!fig.is_placeholder());

        let fig = render(&t, &axes, ChartKind::Histogram { bins: None }, &ChartConfig::default());
        assert_eq!(fig.bins.len(), 20);
        assert_eq!(fig.bins.iter().map(|b| b.count).sum::<usize>(), 5);
    }

    #[test]
    fn test_histogram_of_constant_values() {
        assert_eq!(histogram(&[2.0, 2.0], 10), vec![Bin { start: 2.0, end: 2.0, count: 2 }]);
        assert!(histogram(&[], 10).is_empty());
    }

    #[test]
    fn test_multi_line_via_render_is_placeholder() {
        let (t, axes) = setup("x,y\n1,5\n", "x", "y");
        let fig = render(&t, &axes, ChartKind::MultiLine, &ChartConfig::default());
        assert_eq!(fig.warnings, vec![ChartWarning::NeedsEntities]);
    }

    #[test]
    fn test_figure_serializes() {
        let (t, axes) = setup("x,y\n1,5\n2,6\n", "x", "y");
        let fig = render(&t, &axes, ChartKind::Scatter, &ChartConfig::default());
        let json = serde_json::to_value(&fig).unwrap();
        assert_eq!(json["kind"]["type"], "scatter");
        assert_eq!(json["traces"][0]["points"][1]["x"], 2.0);
        assert!(json.get("warnings").is_none());
    }
}
