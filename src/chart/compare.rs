//! Normalized multi-entity comparison: each entity's series rescaled to the
//! percentage change from its own first value.

use super::{ChartKind, ChartWarning, Figure, HoverMode, Trace, TraceStyle};
use crate::axes::{analysis_series, resolve_axes};
use crate::errors::AxisError;
use crate::models::{ColumnKind, Point, Table};
use tracing::{debug, info};

/// `(v / first − 1) × 100`; `None` when the first value is absent or zero.
pub fn normalize(values: &[Option<f64>]) -> Option<Vec<Option<f64>>> {
    let first = values.first().copied().flatten().filter(|v| *v != 0.0 && v.is_finite())?;
    Some(
        values
            .iter()
            .map(|v| v.map(|v| (v / first - 1.0) * 100.0))
            .collect(),
    )
}

/// One line per labelled series, unified hover along x.
pub fn render_multi_line(
    title: impl Into<String>,
    x_title: &str,
    y_title: &str,
    entries: Vec<(String, Vec<Point>)>,
) -> Figure {
    let mut figure = Figure::new(ChartKind::MultiLine, title).with_axes(x_title, y_title, None);
    figure.hover = HoverMode::XUnified;

    for (name, points) in entries {
        if !points.is_empty() {
            figure.traces.push(Trace { name, style: TraceStyle::Lines, points });
        }
    }
    if figure.traces.is_empty() {
        return figure.placeholder(ChartWarning::NeedsEntities);
    }
    figure
}

/// Compare entity columns of a wide table (one x column, one numeric column
/// per entity). An empty `entities` selects every numeric column but x.
/// Entities without a usable first value are left out.
pub fn compare_entities(table: &mut Table, x: &str, entities: &[String]) -> Result<Figure, AxisError> {
    let selected: Vec<String> = if entities.is_empty() {
        table
            .columns()
            .iter()
            .filter(|c| c.kind == ColumnKind::Numeric && c.name != x)
            .map(|c| c.name.clone())
            .collect()
    } else {
        entities.to_vec()
    };

    let mut x_axis = None;
    let mut entries = Vec::with_capacity(selected.len());

    for entity in &selected {
        let axes = resolve_axes(table, x, entity)?;
        x_axis = Some(axes.x_axis);
        let series = analysis_series(table, &axes)?;

        let Some(normalized) = normalize(&series.values) else {
            debug!("{}: no usable first value, excluded", entity);
            continue;
        };

        let points: Vec<Point> = series
            .positions
            .into_iter()
            .zip(normalized)
            .filter_map(|(x, y)| Some(Point { x, y: y? }))
            .collect();
        entries.push((entity.clone(), points));
    }

    info!("Comparing {} of {} entities", entries.len(), selected.len());
    let mut figure = render_multi_line("Change since first value (%)", x, "change (%)", entries);
    figure.x_axis = x_axis;
    Ok(figure)
}
