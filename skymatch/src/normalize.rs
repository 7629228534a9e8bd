//! Coordinate normalization to canonical decimal degrees
//!
//! Raw RA/DEC columns arrive as numeric degrees, numeric hours or
//! sexagesimal strings, with no reliable way to tell from the header which
//! one. Normalization detects sexagesimal encodings by sampling, decides
//! hours-vs-degrees column-wide for numeric input, and scores candidate
//! interpretations so a catalog whose "degrees" are really mislabeled
//! hours still comes out right. Failures are row-scoped wherever possible;
//! only a column that fails wholesale is an error.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::columns::{resolve_columns, ResolvedColumns};
use crate::equatorial::Equatorial;
use crate::error::{Axis, Error, Result};
use crate::table::RawTable;

/// Sample size for sexagesimal detection.
const SEXAGESIMAL_SAMPLE: usize = 50;

/// Numeric RA columns whose maximum is at or below this are hour angles.
const HOURS_MAX: f64 = 24.5;

/// Three numeric groups separated by non-numeric delimiters, e.g.
/// "10:30:15.2" or "-16 43 12".
static SEXAGESIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?\D+\d+(?:\.\d+)?\D+\d+(?:\.\d+)?\s*$").unwrap());

/// Numeric groups inside a sexagesimal string.
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

/// A table normalized to canonical coordinates.
///
/// Original columns and cells are retained for traceability; `coords`
/// holds one entry per row, absent where the row's coordinates could not
/// be resolved.
#[derive(Debug, Clone)]
pub struct NormalizedPointSet {
    /// Source name (typically the file name)
    pub name: String,
    /// Original column names
    pub columns: Vec<String>,
    /// Original cells, row-major
    pub rows: Vec<Vec<String>>,
    /// Row identifiers (from the id column, or the row index)
    pub ids: Vec<String>,
    /// Canonical coordinates per row; `None` where unresolvable
    pub coords: Vec<Option<Equatorial>>,
}

impl NormalizedPointSet {
    /// Total number of rows, valid or not
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Whether the set has no rows at all
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Number of rows with valid coordinates
    pub fn valid_count(&self) -> usize {
        self.coords.iter().filter(|c| c.is_some()).count()
    }

    /// Rows with valid coordinates, as (row index, position) pairs
    pub fn valid_points(&self) -> impl Iterator<Item = (usize, Equatorial)> + '_ {
        self.coords
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|eq| (i, eq)))
    }
}

/// Is this cell value sexagesimal-looking?
fn looks_sexagesimal(value: &str) -> bool {
    let trimmed = value.trim();
    if SEXAGESIMAL_RE.is_match(trimmed) {
        return true;
    }
    let lower = trimmed.to_lowercase();
    lower.contains(':') || lower.contains('h') || lower.contains('m') || lower.contains('s')
}

/// Decide whether a whole column is sexagesimal by sampling.
///
/// At least `max(3, half the sample)` values must look sexagesimal; the
/// floor of 3 keeps one stray annotated cell in a short numeric column
/// from flipping the whole column. The floor is capped at the sample size
/// so a table of one or two fully sexagesimal rows still qualifies.
fn column_is_sexagesimal<'a>(values: impl Iterator<Item = &'a str>) -> bool {
    let sample: Vec<&str> = values
        .filter(|v| !v.trim().is_empty())
        .take(SEXAGESIMAL_SAMPLE)
        .collect();
    if sample.is_empty() {
        return false;
    }
    let hits = sample.iter().filter(|v| looks_sexagesimal(v)).count();
    hits >= 3.max(sample.len().div_ceil(2)).min(sample.len())
}

/// Parse one sexagesimal string into decimal units of its leading group.
///
/// "10:30:00" parses to 10.5; the caller decides whether that is hours or
/// degrees. Accepts one to three groups; sign comes from the string head.
fn parse_sexagesimal(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let negative = trimmed.starts_with('-');
    let groups: Vec<f64> = NUMBER_RE
        .find_iter(trimmed)
        .take(3)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect();
    if groups.is_empty() {
        return None;
    }
    let magnitude = groups[0]
        + groups.get(1).copied().unwrap_or(0.0) / 60.0
        + groups.get(2).copied().unwrap_or(0.0) / 3600.0;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a cell as a finite float.
fn parse_numeric(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn valid_ra(deg: f64) -> Option<f64> {
    (0.0..=360.0).contains(&deg).then_some(deg)
}

fn valid_dec(deg: f64) -> Option<f64> {
    (-90.0..=90.0).contains(&deg).then_some(deg)
}

/// Fraction of entries that are present.
fn valid_fraction(values: &[Option<f64>]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| v.is_some()).count() as f64 / values.len() as f64
}

/// Convert raw RA/DEC cells to degree values, one entry per row.
///
/// Returns per-coordinate vectors; pairing into [`Equatorial`] happens in
/// [`normalize_table`].
fn convert_columns(ra_cells: &[&str], dec_cells: &[&str]) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let ra_sexagesimal = column_is_sexagesimal(ra_cells.iter().copied());
    let dec_sexagesimal = column_is_sexagesimal(dec_cells.iter().copied());

    if ra_sexagesimal || dec_sexagesimal {
        // Sexagesimal path: RA is an hour angle, DEC is degrees. A row
        // that fails either parse becomes an absent pair.
        debug!("sexagesimal coordinate encoding detected");
        let mut ra_deg = Vec::with_capacity(ra_cells.len());
        let mut dec_deg = Vec::with_capacity(dec_cells.len());
        for (ra_cell, dec_cell) in ra_cells.iter().zip(dec_cells) {
            let ra = parse_sexagesimal(ra_cell)
                .map(|hours| hours * 15.0)
                .and_then(valid_ra);
            let dec = parse_sexagesimal(dec_cell).and_then(valid_dec);
            match (ra, dec) {
                (Some(r), Some(d)) => {
                    ra_deg.push(Some(r));
                    dec_deg.push(Some(d));
                }
                _ => {
                    ra_deg.push(None);
                    dec_deg.push(None);
                }
            }
        }
        return (ra_deg, dec_deg);
    }

    // Pure numeric path. Hours-vs-degrees is a column-wide decision:
    // mixed units within one column are not supported.
    let ra_raw: Vec<Option<f64>> = ra_cells.iter().map(|c| parse_numeric(c)).collect();
    let dec_deg: Vec<Option<f64>> = dec_cells
        .iter()
        .map(|c| parse_numeric(c).and_then(valid_dec))
        .collect();

    let ra_max = ra_raw
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let column_is_hours = ra_max.is_finite() && ra_max <= HOURS_MAX;
    if column_is_hours {
        debug!(ra_max, "treating numeric RA column as hour angles");
    }

    let ra_deg: Vec<Option<f64>> = ra_raw
        .iter()
        .map(|v| {
            v.and_then(|raw| {
                let deg = if column_is_hours { raw * 15.0 } else { raw };
                valid_ra(deg)
            })
        })
        .collect();

    // Escape hatch: a column nominally in degrees that loses most of its
    // rows is usually mislabeled hours. Score the forced-hours candidate
    // and keep it only if it actually recovers a majority.
    let direct_score = valid_fraction(&ra_deg).min(valid_fraction(&dec_deg));
    if direct_score <= 0.5 && !column_is_hours {
        let forced: Vec<Option<f64>> = ra_raw
            .iter()
            .map(|v| v.and_then(|raw| valid_ra(raw * 15.0)))
            .collect();
        if valid_fraction(&forced) > 0.5 && valid_fraction(&dec_deg) > 0.5 {
            warn!("RA column recovered by forced hours-to-degrees interpretation");
            return (forced, dec_deg);
        }
    }

    (ra_deg, dec_deg)
}

/// Normalize a raw table into a [`NormalizedPointSet`].
///
/// Resolves the coordinate columns, converts them to decimal degrees and
/// pairs them row by row. Individual unparsable rows become absent
/// coordinates; a column that yields no valid value at all is
/// [`Error::CoordinateConversion`].
pub fn normalize_table(table: RawTable, name: impl Into<String>) -> Result<NormalizedPointSet> {
    let resolved = resolve_columns(&table)?;
    normalize_resolved(table, name, resolved)
}

/// Normalization core, with the column resolution already made.
pub fn normalize_resolved(
    table: RawTable,
    name: impl Into<String>,
    resolved: ResolvedColumns,
) -> Result<NormalizedPointSet> {
    let ra_cells: Vec<&str> = table.column(resolved.ra).collect();
    let dec_cells: Vec<&str> = table.column(resolved.dec).collect();

    let (ra_deg, dec_deg) = convert_columns(&ra_cells, &dec_cells);

    if !table.is_empty() && ra_deg.iter().all(|v| v.is_none()) {
        return Err(Error::CoordinateConversion { axis: Axis::Ra });
    }
    if !table.is_empty() && dec_deg.iter().all(|v| v.is_none()) {
        return Err(Error::CoordinateConversion { axis: Axis::Dec });
    }

    let coords: Vec<Option<Equatorial>> = ra_deg
        .iter()
        .zip(&dec_deg)
        .map(|(ra, dec)| match (ra, dec) {
            (Some(r), Some(d)) => Some(Equatorial::from_degrees(*r, *d)),
            _ => None,
        })
        .collect();

    let ids: Vec<String> = match resolved.id {
        Some(idx) => table.column(idx).map(str::to_string).collect(),
        None => (0..table.len()).map(|i| i.to_string()).collect(),
    };

    let name = name.into();
    debug!(
        source = name.as_str(),
        rows = coords.len(),
        valid = coords.iter().filter(|c| c.is_some()).count(),
        "normalized point set"
    );

    Ok(NormalizedPointSet {
        name,
        columns: table.columns,
        rows: table.rows,
        ids,
        coords,
    })
}
