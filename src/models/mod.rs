use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::fmt;

// ── Cells & columns ───────────────────────────────────────────────────────────

/// One parsed value of an uploaded table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// The cell as a point on an x axis; `None` when missing.
    pub fn to_position(&self) -> Option<Position> {
        match self {
            Cell::Missing => None,
            Cell::Number(v) if v.is_nan() => None,
            Cell::Number(v) => Some(Position::Number(*v)),
            Cell::Text(s) => Some(Position::Label(s.clone())),
            Cell::DateTime(dt) => Some(Position::DateTime(*dt)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    DateTime,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::DateTime => "date-time",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<Cell>,
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Rectangular in-memory table: equal-length columns with unique names.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Build a table from columns already checked for equal length and
    /// unique names (the loader guarantees both).
    pub fn new(columns: Vec<Column>) -> Self {
        let rows = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        debug_assert!(columns.iter().all(|c| c.cells.len() == rows));
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Permute every column so that new row `i` is old row `order[i]`.
    pub(crate) fn reorder_rows(&mut self, order: &[usize]) {
        debug_assert_eq!(order.len(), self.rows);
        for col in &mut self.columns {
            let mut old = std::mem::take(&mut col.cells);
            col.cells = order
                .iter()
                .map(|&i| std::mem::replace(&mut old[i], Cell::Missing))
                .collect();
        }
    }
}

// ── Positions, points & peaks ─────────────────────────────────────────────────

/// A location on the x axis, in the x column's own domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Position {
    Number(f64),
    DateTime(NaiveDateTime),
    Label(String),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Number(v) => write!(f, "{}", v),
            Position::DateTime(dt) => {
                if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            Position::Label(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: Position,
    pub y: f64,
}

/// A located extremum: computed per render, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakRecord {
    pub position: Position,
    pub value: f64,
}
