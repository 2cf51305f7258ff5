//! Column selection and axis resolution.
//!
//! The x column is resolved once per render into one of three axis kinds.
//! Text columns go through an explicit two-outcome step ([`XResolution`]):
//! either every non-missing value parses as a date-time and the column is
//! coerced in place (rows reordered ascending), or the column stays
//! categorical in its original row order. There are no partial date columns.
//! Numeric and date axes keep the table sorted ascending along x.

use crate::errors::AxisError;
use crate::loader::cleaner::parse_datetime;
use crate::models::{Cell, ColumnKind, Position, Table};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Axis-eligible columns partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AxisCandidates {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    /// Categorical columns whose values all parse as dates.
    pub date_capable: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum XAxis {
    Numeric,
    Date,
    Categorical,
}

/// How the x axis drives the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRole {
    /// Points are ordered along x (dates, numbers).
    Ordered,
    /// Rows are grouped by x value (text labels).
    Grouped,
}

/// Outcome of trying to read a text column as dates.
#[derive(Debug, Clone, PartialEq)]
pub enum XResolution {
    /// Every non-missing value parsed; carries the coerced cells.
    DateAxis(Vec<Cell>),
    CategoricalAxis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAxes {
    pub x: String,
    pub y: String,
    pub x_axis: XAxis,
}

impl ResolvedAxes {
    pub fn x_role(&self) -> XRole {
        match self.x_axis {
            XAxis::Numeric | XAxis::Date => XRole::Ordered,
            XAxis::Categorical => XRole::Grouped,
        }
    }
}

/// The y column paired with x positions, one entry per row with an x value.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSeries {
    pub positions: Vec<Position>,
    pub values: Vec<Option<f64>>,
}

impl AnalysisSeries {
    /// Rows with a present y value, in table order.
    pub fn present(&self) -> impl Iterator<Item = (&Position, f64)> + '_ {
        self.positions
            .iter()
            .zip(&self.values)
            .filter_map(|(p, v)| v.map(|v| (p, v)))
    }

    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

pub fn eligible_columns(table: &Table) -> AxisCandidates {
    let mut out = AxisCandidates::default();
    for col in table.columns() {
        match col.kind {
            ColumnKind::Numeric => out.numeric.push(col.name.clone()),
            ColumnKind::DateTime => out.date_capable.push(col.name.clone()),
            ColumnKind::Text => {
                if matches!(resolve_text_axis(&col.cells), XResolution::DateAxis(_)) {
                    out.date_capable.push(col.name.clone());
                }
                out.categorical.push(col.name.clone());
            }
        }
    }
    out
}

/// All-or-nothing date parse of a text column.
pub fn resolve_text_axis(cells: &[Cell]) -> XResolution {
    let mut seen = 0usize;
    let mut coerced = Vec::with_capacity(cells.len());

    for cell in cells {
        match cell {
            Cell::Missing => coerced.push(Cell::Missing),
            Cell::DateTime(dt) => {
                seen += 1;
                coerced.push(Cell::DateTime(*dt));
            }
            Cell::Text(s) => match parse_datetime(s) {
                Some(dt) => {
                    seen += 1;
                    coerced.push(Cell::DateTime(dt));
                }
                None => return XResolution::CategoricalAxis,
            },
            Cell::Number(_) => return XResolution::CategoricalAxis,
        }
    }

    if seen == 0 {
        XResolution::CategoricalAxis
    } else {
        XResolution::DateAxis(coerced)
    }
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// Validate an (x, y) selection and settle the x axis kind.
///
/// A successful date resolution coerces the x column in place. Numeric and
/// date axes reorder the whole table by ascending x, missing values last.
pub fn resolve_axes(table: &mut Table, x: &str, y: &str) -> Result<ResolvedAxes, AxisError> {
    let x_col = table.column(x).ok_or_else(|| AxisError::UnknownColumn(x.to_string()))?;
    let y_col = table.column(y).ok_or_else(|| AxisError::UnknownColumn(y.to_string()))?;

    if y_col.kind != ColumnKind::Numeric {
        return Err(AxisError::NonNumericAxis {
            column: y.to_string(),
            kind: y_col.kind.label(),
        });
    }

    let x_axis = match x_col.kind {
        ColumnKind::Numeric => XAxis::Numeric,
        ColumnKind::DateTime => XAxis::Date,
        ColumnKind::Text => match resolve_text_axis(&x_col.cells) {
            XResolution::DateAxis(cells) => {
                coerce_dates(table, x, cells);
                XAxis::Date
            }
            XResolution::CategoricalAxis => {
                debug!("{:?} is categorical", x);
                XAxis::Categorical
            }
        },
    };

    if x_axis != XAxis::Categorical {
        sort_rows_by(table, x);
    }

    Ok(ResolvedAxes {
        x: x.to_string(),
        y: y.to_string(),
        x_axis,
    })
}

fn coerce_dates(table: &mut Table, name: &str, cells: Vec<Cell>) {
    if let Some(col) = table.column_mut(name) {
        col.kind = ColumnKind::DateTime;
        col.cells = cells;
    }
    info!("Coerced {:?} to date-time", name);
}

/// Stable ascending reorder of every row by column `name`, missing last.
fn sort_rows_by(table: &mut Table, name: &str) {
    let Some(col) = table.column(name) else {
        return;
    };
    let mut order: Vec<usize> = (0..col.cells.len()).collect();
    order.sort_by(|&a, &b| compare_x(&col.cells[a], &col.cells[b]));

    if order.iter().enumerate().all(|(i, &row)| i == row) {
        return;
    }
    table.reorder_rows(&order);
    info!("Reordered {} rows by ascending {:?}", order.len(), name);
}

fn compare_x(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
        (Cell::DateTime(a), Cell::DateTime(b)) => a.cmp(b),
        (Cell::Missing, Cell::Missing) => Ordering::Equal,
        (Cell::Missing, _) => Ordering::Greater,
        (_, Cell::Missing) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Pair y values with x positions.
///
/// Rows without an x value have no place on the axis and are left out,
/// matching the points the chart draws.
pub fn analysis_series(table: &Table, axes: &ResolvedAxes) -> Result<AnalysisSeries, AxisError> {
    let x_col = table
        .column(&axes.x)
        .ok_or_else(|| AxisError::UnknownColumn(axes.x.clone()))?;
    let y_col = table
        .column(&axes.y)
        .ok_or_else(|| AxisError::UnknownColumn(axes.y.clone()))?;

    let (positions, values): (Vec<Position>, Vec<Option<f64>>) = x_col
        .cells
        .iter()
        .zip(&y_col.cells)
        .filter_map(|(x, y)| Some((x.to_position()?, y.as_f64())))
        .unzip();

    let dropped = table.row_count() - positions.len();
    if dropped > 0 {
        debug!("{} rows without {:?} left out of analysis", dropped, axes.x);
    }
    Ok(AnalysisSeries { positions, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::loader::load;
    use chrono::NaiveDate;

    fn table(csv: &str) -> Table {
        load(csv.as_bytes(), &LoaderConfig::default()).unwrap()
    }

    fn day(d: u32) -> Cell {
        Cell::DateTime(NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn test_date_column_is_reordered() {
        let mut t = table("date,temp\n2024-01-01,10\n2024-01-03,12\n2024-01-02,11\n");
        let axes = resolve_axes(&mut t, "date", "temp").unwrap();

        assert_eq!(axes.x_axis, XAxis::Date);
        assert_eq!(axes.x_role(), XRole::Ordered);
        assert_eq!(t.column("date").unwrap().kind, ColumnKind::DateTime);
        assert_eq!(t.column("date").unwrap().cells, vec![day(1), day(2), day(3)]);
        assert_eq!(
            t.column("temp").unwrap().cells,
            vec![Cell::Number(10.0), Cell::Number(11.0), Cell::Number(12.0)]
        );
    }

    #[test]
    fn test_date_coercion_is_all_or_nothing() {
        let csv = "when,v\n2024-01-03,1\nsoon,2\n2024-01-01,3\n";
        let mut t = table(csv);
        let before = t.clone();
        let axes = resolve_axes(&mut t, "when", "v").unwrap();

        assert_eq!(axes.x_axis, XAxis::Categorical);
        assert_eq!(axes.x_role(), XRole::Grouped);
        assert_eq!(t, before);
    }

    #[test]
    fn test_missing_dates_sort_last() {
        let mut t = table("d,v\n2024-01-02,1\n,2\n2024-01-01,3\n");
        resolve_axes(&mut t, "d", "v").unwrap();
        assert_eq!(t.column("d").unwrap().cells, vec![day(1), day(2), Cell::Missing]);
        assert_eq!(
            t.column("v").unwrap().cells,
            vec![Cell::Number(3.0), Cell::Number(1.0), Cell::Number(2.0)]
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut t = table("date,temp\n2024-01-03,12\n2024-01-01,10\n");
        resolve_axes(&mut t, "date", "temp").unwrap();
        let once = t.clone();
        let axes = resolve_axes(&mut t, "date", "temp").unwrap();
        assert_eq!(axes.x_axis, XAxis::Date);
        assert_eq!(t, once);
    }

    #[test]
    fn test_non_numeric_y() {
        let mut t = table("x,label\n1,a\n2,b\n");
        let err = resolve_axes(&mut t, "x", "label").unwrap_err();
        assert_eq!(err, AxisError::NonNumericAxis { column: "label".into(), kind: "text" });
    }

    #[test]
    fn test_unknown_column() {
        let mut t = table("x,y\n1,2\n");
        assert_eq!(
            resolve_axes(&mut t, "x", "z").unwrap_err(),
            AxisError::UnknownColumn("z".into())
        );
    }

    #[test]
    fn test_numeric_x_is_sorted_not_date_parsed() {
        let mut t = table("ml,ph\n4,1\n1,2\n,5\n3,3\n1,4\n");
        let axes = resolve_axes(&mut t, "ml", "ph").unwrap();
        assert_eq!(axes.x_axis, XAxis::Numeric);
        assert_eq!(t.column("ml").unwrap().kind, ColumnKind::Numeric);
        assert_eq!(
            t.column("ml").unwrap().cells,
            vec![Cell::Number(1.0), Cell::Number(1.0), Cell::Number(3.0), Cell::Number(4.0), Cell::Missing]
        );
        // stable: the two 1 ml rows keep their file order
        assert_eq!(
            t.column("ph").unwrap().cells,
            vec![Cell::Number(2.0), Cell::Number(4.0), Cell::Number(3.0), Cell::Number(1.0), Cell::Number(5.0)]
        );
    }

    #[test]
    fn test_categorical_x_keeps_file_order() {
        let mut t = table("name,v\nb,1\na,2\n");
        let before = t.clone();
        resolve_axes(&mut t, "name", "v").unwrap();
        assert_eq!(t, before);
    }

    #[test]
    fn test_eligible_columns() {
        let t = table("date,name,ph,volume\n2024-01-01,a,7,1\n2024-01-02,b,6.5,2\n");
        let c = eligible_columns(&t);
        assert_eq!(c.numeric, vec!["ph", "volume"]);
        assert_eq!(c.categorical, vec!["date", "name"]);
        assert_eq!(c.date_capable, vec!["date"]);
    }

    #[test]
    fn test_analysis_series_drops_nothing_but_marks_missing() {
        let mut t = table("x,y\n1,5\n2,\n3,7\n");
        let axes = resolve_axes(&mut t, "x", "y").unwrap();
        let s = analysis_series(&t, &axes).unwrap();
        assert_eq!(s.values, vec![Some(5.0), None, Some(7.0)]);
        assert_eq!(s.present_count(), 2);
        let present: Vec<_> = s.present().map(|(p, v)| (p.clone(), v)).collect();
        assert_eq!(present, vec![(Position::Number(1.0), 5.0), (Position::Number(3.0), 7.0)]);
    }

    #[test]
    fn test_analysis_series_skips_rows_without_x() {
        let mut t = table("date,v\n2024-01-01,1\n2024-01-02,9\n,3\n2024-01-04,1\n");
        let axes = resolve_axes(&mut t, "date", "v").unwrap();
        let s = analysis_series(&t, &axes).unwrap();

        let Cell::DateTime(jan4) = day(4) else { unreachable!() };
        let Cell::DateTime(jan2) = day(2) else { unreachable!() };
        assert_eq!(s.positions.len(), 3);
        assert_eq!(s.positions[1], Position::DateTime(jan2));
        assert_eq!(s.positions[2], Position::DateTime(jan4));
        assert_eq!(s.values, vec![Some(1.0), Some(9.0), Some(1.0)]);
    }
}
