//! Tabular data loader: uploaded bytes → [`Table`].
//!
//! Decoding tries UTF-8 first and one configured regional encoding second.
//! Parsing is lenient about short rows (padded with missing cells) and strict
//! about long ones. Column kinds are inferred per column.

pub mod cleaner;

use crate::config::LoaderConfig;
use crate::errors::LoadError;
use crate::models::{Cell, Column, ColumnKind, Position, Table};
use anyhow::{Context, Result};
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info, warn};

use self::cleaner::{is_missing, normalise_headers, parse_number};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read an upload from disk in one blocking call.
pub fn read_upload(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))
}

/// Decode upload bytes: UTF-8, then the fallback encoding, without replacement.
pub fn decode<'a>(bytes: &'a [u8], fallback_label: &str) -> Result<Cow<'a, str>, LoadError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(Cow::Borrowed(text));
    }

    let decode_error = || LoadError::Decode { encoding: fallback_label.to_string() };
    let encoding = Encoding::for_label(fallback_label.as_bytes()).ok_or_else(|| {
        warn!("Unknown fallback encoding label {:?}", fallback_label);
        decode_error()
    })?;

    debug!("Upload is not UTF-8, retrying as {}", encoding.name());
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(decode_error)
}

/// Parse an uploaded delimited-text file.
pub fn load(bytes: &[u8], config: &LoaderConfig) -> Result<Table, LoadError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(LoadError::EmptyInput);
    }

    let text = decode(bytes, &config.fallback_encoding)?;
    let delimiter = config
        .delimiter_byte()
        .unwrap_or_else(|| detect_delimiter(&text));

    parse_table(&text, delimiter)
}

/// Parse decoded text into a table.
pub fn parse_table(text: &str, delimiter: u8) -> Result<Table, LoadError> {
    if text.trim().is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Unparseable(e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let names = normalise_headers(headers.iter());
    let width = names.len();
    let mut raw: Vec<Vec<String>> = vec![Vec::new(); width];
    let mut padded = 0usize;

    for result in reader.records() {
        let record = result.map_err(|e| LoadError::Unparseable(e.to_string()))?;

        if record.len() > width {
            return Err(LoadError::MalformedInput {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: width,
                found: record.len(),
            });
        }
        if record.len() < width {
            padded += 1;
        }

        for (i, values) in raw.iter_mut().enumerate() {
            values.push(record.get(i).unwrap_or("").to_string());
        }
    }

    let rows = raw.first().map(Vec::len).unwrap_or(0);
    if rows == 0 {
        return Err(LoadError::EmptyInput);
    }
    if padded > 0 {
        warn!("{} short rows padded with missing values", padded);
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(raw)
        .map(|(name, values)| infer_column(name, values))
        .collect();

    info!("Loaded {} rows × {} columns", rows, columns.len());
    Ok(Table::new(columns))
}

/// A column is numeric iff every non-missing value parses as a number.
fn infer_column(name: String, values: Vec<String>) -> Column {
    let numeric = values.iter().all(|s| is_missing(s) || parse_number(s).is_some());

    let cells = values
        .into_iter()
        .map(|s| {
            if is_missing(&s) {
                Cell::Missing
            } else if numeric {
                parse_number(&s).map(Cell::Number).unwrap_or(Cell::Missing)
            } else {
                Cell::Text(s)
            }
        })
        .collect();

    let kind = if numeric { ColumnKind::Numeric } else { ColumnKind::Text };
    debug!("Column {:?}: {}", name, kind.label());
    Column { name, kind, cells }
}

/// Pick the most consistent delimiter among `, ; \t |` over the first lines.
pub fn detect_delimiter(content: &str) -> u8 {
    let candidates = [b',', b';', b'\t', b'|'];
    let sample: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0.0f64;

    for &delimiter in &candidates {
        if sample.is_empty() {
            break;
        }
        let counts: Vec<f64> = sample
            .iter()
            .map(|line| line.bytes().filter(|&b| b == delimiter).count() as f64)
            .collect();

        let avg = counts.iter().sum::<f64>() / counts.len() as f64;
        let variance = counts.iter().map(|c| (c - avg).powi(2)).sum::<f64>() / counts.len() as f64;
        let score = avg / (1.0 + variance.sqrt());

        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }

    best
}

/// Re-serialize a table to delimited text (header + one line per row).
pub fn to_csv(table: &Table, delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(table.column_names())?;
    for row in 0..table.row_count() {
        writer.write_record(table.columns().iter().map(|c| field_text(&c.cells[row])))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn field_text(cell: &Cell) -> String {
    match cell {
        Cell::Missing => String::new(),
        Cell::Number(v) => v.to_string(),
        Cell::Text(s) => s.clone(),
        Cell::DateTime(dt) => Position::DateTime(*dt).to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
