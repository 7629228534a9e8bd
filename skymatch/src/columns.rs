//! Column resolution: which columns hold RA and DEC?
//!
//! Catalog headers name their coordinate columns in every convention
//! imaginable (`RA`, `RAJ2000`, `alfa`, `Right Ascension (deg)`, ...), and
//! sometimes not at all. Resolution runs an ordered list of strategies,
//! each implementing the same attempt/not-found contract, so every
//! heuristic stays independently testable. The first hit wins, per axis.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Axis, Error, Result};
use crate::table::RawTable;

/// How many cells per column are sampled for value-range inference.
const VALUE_SAMPLE_SIZE: usize = 50;

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)|\[.*?\]").unwrap());

/// Exact-match aliases for RA columns, in normalized form.
const RA_ALIASES: [&str; 10] = [
    "ra",
    "radeg",
    "raj2000",
    "alpha",
    "alfa",
    "rightascension",
    "right ascension",
    "ascensionrecta",
    "ascension recta",
    "ar",
];

/// Exact-match aliases for DEC columns, in normalized form.
const DEC_ALIASES: [&str; 8] = [
    "dec",
    "decdeg",
    "decl",
    "declination",
    "delta",
    "dej2000",
    "decj2000",
    "declinacion",
];

/// Exact-match aliases for identifier columns (from common catalog usage).
const ID_ALIASES: [&str; 8] = [
    "id", "name", "star", "source", "obj", "object", "idstar", "namestar",
];

/// Columns chosen for a table, as indices into [`RawTable::columns`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    /// Right ascension column
    pub ra: usize,
    /// Declination column
    pub dec: usize,
    /// Identifier column, when one was recognized
    pub id: Option<usize>,
}

/// Normalize a column name for matching: lowercase, strip bracketed unit
/// annotations and underscores, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let stripped = BRACKETED.replace_all(&lower, "");
    let no_underscores = stripped.replace('_', "");
    no_underscores.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn aliases_for(axis: Axis) -> &'static [&'static str] {
    match axis {
        Axis::Ra => &RA_ALIASES,
        Axis::Dec => &DEC_ALIASES,
    }
}

/// One resolution heuristic. Strategies are tried in a fixed order and
/// report found/not-found; they never fail the resolution themselves.
trait ResolveStrategy {
    fn name(&self) -> &'static str;

    /// Attempt to resolve `axis`; `taken` is the column already claimed by
    /// the other axis, which value-based strategies avoid when they can.
    fn resolve(&self, table: &RawTable, axis: Axis, taken: Option<usize>) -> Option<usize>;
}

/// Tier 1: exact match against the alias table.
struct ExactAlias;

impl ResolveStrategy for ExactAlias {
    fn name(&self) -> &'static str {
        "exact-alias"
    }

    fn resolve(&self, table: &RawTable, axis: Axis, _taken: Option<usize>) -> Option<usize> {
        let aliases = aliases_for(axis);
        table
            .columns
            .iter()
            .position(|c| aliases.contains(&normalize_name(c).as_str()))
    }
}

/// Tier 2: `<alias>j2000` suffix form.
struct J2000Suffix;

impl ResolveStrategy for J2000Suffix {
    fn name(&self) -> &'static str {
        "j2000-suffix"
    }

    fn resolve(&self, table: &RawTable, axis: Axis, _taken: Option<usize>) -> Option<usize> {
        let aliases = aliases_for(axis);
        table.columns.iter().position(|c| {
            let normalized = normalize_name(c);
            normalized
                .strip_suffix("j2000")
                .map(str::trim)
                .is_some_and(|prefix| aliases.contains(&prefix))
        })
    }
}

/// Tier 3: loose substring match.
struct LooseSubstring;

impl ResolveStrategy for LooseSubstring {
    fn name(&self) -> &'static str {
        "loose-substring"
    }

    fn resolve(&self, table: &RawTable, axis: Axis, _taken: Option<usize>) -> Option<usize> {
        let needles: &[&str] = match axis {
            Axis::Ra => &["ra", "alfa", "alpha", "right asc"],
            Axis::Dec => &["dec", "delta", "decl"],
        };
        table.columns.iter().position(|c| {
            let normalized = normalize_name(c);
            needles.iter().any(|n| normalized.contains(n))
        })
    }
}

/// Tier 4: value-range inference over sampled cells.
///
/// A column qualifies for an axis when at least half its sampled values
/// parse as numbers inside the plausible range for that axis (RA also
/// accepts the 0-24.5 hour range). The first qualifying column wins,
/// skipping the column the other axis already claimed when any alternative
/// exists.
struct ValueRange;

impl ValueRange {
    fn qualifies(table: &RawTable, index: usize, axis: Axis) -> bool {
        // Non-numeric cells stay in the sample as NaN so they count
        // against the in-range fraction.
        let sample: Vec<f64> = table
            .column(index)
            .filter(|cell| !cell.trim().is_empty())
            .take(VALUE_SAMPLE_SIZE)
            .map(|cell| cell.trim().parse::<f64>().unwrap_or(f64::NAN))
            .collect();
        if sample.is_empty() {
            return false;
        }
        let fraction = |lo: f64, hi: f64| {
            sample.iter().filter(|v| **v >= lo && **v <= hi).count() as f64 / sample.len() as f64
        };
        match axis {
            Axis::Ra => fraction(0.0, 360.0) >= 0.5 || fraction(0.0, 24.5) >= 0.5,
            Axis::Dec => fraction(-90.0, 90.0) >= 0.5,
        }
    }
}

impl ResolveStrategy for ValueRange {
    fn name(&self) -> &'static str {
        "value-range"
    }

    fn resolve(&self, table: &RawTable, axis: Axis, taken: Option<usize>) -> Option<usize> {
        let candidates: Vec<usize> = (0..table.columns.len())
            .filter(|&i| Self::qualifies(table, i, axis))
            .collect();
        // Prefer a column the other axis has not claimed.
        candidates
            .iter()
            .copied()
            .find(|i| Some(*i) != taken)
            .or_else(|| candidates.first().copied())
    }
}

/// Resolve one axis through the strategy chain.
fn resolve_axis(table: &RawTable, axis: Axis, taken: Option<usize>) -> Result<usize> {
    let strategies: [&dyn ResolveStrategy; 4] =
        [&ExactAlias, &J2000Suffix, &LooseSubstring, &ValueRange];
    for strategy in strategies {
        if let Some(index) = strategy.resolve(table, axis, taken) {
            debug!(
                axis = %axis,
                column = table.columns[index].as_str(),
                strategy = strategy.name(),
                "resolved coordinate column"
            );
            return Ok(index);
        }
    }
    Err(Error::ColumnNotFound { axis })
}

/// Resolve the identifier column by exact alias, if present.
fn resolve_id(table: &RawTable) -> Option<usize> {
    table
        .columns
        .iter()
        .position(|c| ID_ALIASES.contains(&normalize_name(c).as_str()))
}

/// Identify the RA, DEC and (optional) identifier columns of a table.
pub fn resolve_columns(table: &RawTable) -> Result<ResolvedColumns> {
    let ra = resolve_axis(table, Axis::Ra, None)?;
    let dec = resolve_axis(table, Axis::Dec, Some(ra))?;
    Ok(ResolvedColumns {
        ra,
        dec,
        id: resolve_id(table),
    })
}
