//! Day normalization: raw spreadsheet/export rows into [`DayFact`]s.
//!
//! Rows with an unparseable date, or with no numeric metric cell at all, are
//! dropped without failing the batch.

use crate::error::{Result, RollupError};
use crate::facts::{merge_by_date, DayFact, MetricSums};
use crate::schema::RollupConfig;
use chrono::NaiveDate;
use futures::future::{BoxFuture, FutureExt};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

/// One row as delivered by a collaborator: header name to cell text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub cells: BTreeMap<String, String>,
}

impl RawRow {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, column: &str, value: &str) {
        self.cells.insert(column.to_string(), value.to_string());
    }

    /// Exact header match first, then a case-insensitive one.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .or_else(|| {
                self.cells
                    .iter()
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case(column))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }
}

/// Parses `M/D/YYYY` or `YYYY-MM-DD`, ignoring a trailing time component.
/// The year must have four digits. Anything else is `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Exports sometimes append a time component
    let date_part = raw.trim().split(['T', ' ']).next()?;

    let (year, month, day) = if date_part.contains('/') {
        let mut parts = date_part.splitn(3, '/');
        let month = parts.next()?;
        let day = parts.next()?;
        (parts.next()?, month, day)
    } else {
        let mut parts = date_part.splitn(3, '-');
        let year = parts.next()?;
        (year, parts.next()?, parts.next()?)
    };

    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

/// Strips `$`, `,` and `%` and parses the remainder. Blank, non-numeric,
/// non-finite and negative cells are `None`.
pub fn parse_numeric_cell(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        _ => None,
    }
}

/// Turns one raw row into a [`DayFact`], or `None` when the date does not
/// parse or no metric cell holds a number.
pub fn normalize_row(row: &RawRow, config: &RollupConfig) -> Option<DayFact> {
    let date = match row.get(&config.date_column).and_then(parse_date) {
        Some(date) => date,
        None => {
            debug!(
                "Dropping row with unparseable date: {:?}",
                row.get(&config.date_column)
            );
            return None;
        }
    };

    let mut metrics = MetricSums::default();
    let mut present = 0usize;
    for def in &config.metrics {
        match row.get(&def.column).and_then(parse_numeric_cell) {
            Some(value) => {
                metrics.add(&def.name, value);
                present += 1;
            }
            None => metrics.add(&def.name, 0.0),
        }
    }

    if present == 0 {
        debug!("Dropping row for {} with no numeric metric cells", date);
        return None;
    }

    Some(DayFact::new(date, metrics))
}

/// Normalizes a batch, summing rows that share a date into one fact.
/// The result is sorted by date with unique dates.
pub fn normalize_rows(rows: &[RawRow], config: &RollupConfig) -> Vec<DayFact> {
    let normalized: Vec<DayFact> = rows
        .iter()
        .filter_map(|row| normalize_row(row, config))
        .collect();
    let dropped = rows.len() - normalized.len();
    let facts = merge_by_date(&normalized);

    info!(
        "Normalized {} rows into {} day facts ({} dropped) for family '{}'",
        rows.len(),
        facts.len(),
        dropped,
        config.family
    );

    facts
}

/// Reads a headered CSV export into raw rows. Cells are trimmed and short
/// records are allowed.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row = RawRow::from_pairs(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string())),
        );
        rows.push(row);
    }

    Ok(rows)
}

/// Upstream supplier of raw rows (spreadsheet API, ad-platform export, file).
/// The fetch is the only await point; the engine starts once it resolves.
pub trait RowSource: Send + Sync {
    fn fetch_rows(&self) -> BoxFuture<'_, Result<Vec<RawRow>>>;
}

/// Rows already in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticRows(pub Vec<RawRow>);

impl RowSource for StaticRows {
    fn fetch_rows(&self) -> BoxFuture<'_, Result<Vec<RawRow>>> {
        futures::future::ready(Ok(self.0.clone())).boxed()
    }
}

/// A CSV export on local disk.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    pub path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RowSource for CsvFileSource {
    fn fetch_rows(&self) -> BoxFuture<'_, Result<Vec<RawRow>>> {
        async move {
            let file = std::fs::File::open(&self.path).map_err(|e| {
                RollupError::SourceError(format!("cannot open {}: {}", self.path.display(), e))
            })?;
            read_csv_rows(file)
        }
        .boxed()
    }
}
