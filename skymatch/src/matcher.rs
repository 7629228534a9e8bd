//! Nearest-neighbor cross-matching between a catalog and detection sets
//!
//! For every valid catalog row the matcher finds the single closest
//! detection point across all detection files, by exact great-circle
//! separation. Detection files are folded in one at a time; a later file
//! replaces a row's running best only on a strictly smaller separation,
//! which makes "first processed file wins" the documented, stable
//! tie-break rather than an iteration-order accident.

use tracing::{debug, warn};

use crate::equatorial::{angle_between, dot, Equatorial, ARCSEC_PER_RAD};
use crate::error::{Error, Result};
use crate::normalize::NormalizedPointSet;

/// A qualifying match for one catalog row.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchHit {
    /// Name of the detection file the match came from
    pub source: String,
    /// Row index within that detection file
    pub detection_row: usize,
    /// Matched detection position
    pub position: Equatorial,
    /// Angular separation in arcseconds
    pub sep_arcsec: f64,
}

/// Terminal output artifact: one per catalog row.
///
/// `position` is absent only for unresolved catalog rows, which appear
/// here only when the caller asked for them; `hit` is absent whenever no
/// detection point fell within the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    /// Catalog row identifier
    pub id: String,
    /// Catalog position, absent for unresolved rows
    pub position: Option<Equatorial>,
    /// Best qualifying match, if any
    pub hit: Option<MatchHit>,
}

/// Running best candidate for one catalog row.
///
/// Comparison happens on the unit-vector dot product (monotone in the
/// separation, larger is closer) so the reduction and the reported angle
/// cannot disagree.
#[derive(Debug, Clone)]
struct BestCandidate {
    dot: f64,
    source_index: usize,
    detection_row: usize,
    position: Equatorial,
}

/// Incremental nearest-neighbor matcher over one catalog.
///
/// Detection sets are folded in with [`add_detection_set`]; the final
/// records come from [`finish`]. The incremental shape lets the caller
/// check cancellation or a time budget between files.
///
/// [`add_detection_set`]: Matcher::add_detection_set
/// [`finish`]: Matcher::finish
pub struct Matcher<'a> {
    catalog: &'a NormalizedPointSet,
    /// Indices of catalog rows with valid coordinates
    valid_rows: Vec<usize>,
    /// Unit vectors for those rows, parallel to `valid_rows`
    vectors: Vec<[f64; 3]>,
    /// Running best per valid row, parallel to `valid_rows`
    best: Vec<Option<BestCandidate>>,
    /// Names of detection sets folded in so far, in processing order
    sources: Vec<String>,
}

impl<'a> Matcher<'a> {
    /// Create a matcher over a catalog.
    ///
    /// Fails with [`Error::EmptyPointSet`] when the catalog has no valid
    /// rows; matching against nothing is a caller bug, not a degenerate
    /// success.
    pub fn new(catalog: &'a NormalizedPointSet) -> Result<Self> {
        let valid: Vec<(usize, Equatorial)> = catalog.valid_points().collect();
        if valid.is_empty() {
            return Err(Error::EmptyPointSet {
                name: catalog.name.clone(),
            });
        }
        let valid_rows: Vec<usize> = valid.iter().map(|(i, _)| *i).collect();
        let vectors: Vec<[f64; 3]> = valid.iter().map(|(_, eq)| eq.to_unit_vector()).collect();
        let best = vec![None; valid_rows.len()];
        Ok(Self {
            catalog,
            valid_rows,
            vectors,
            best,
            sources: Vec::new(),
        })
    }

    /// Fold one detection set into the running best matches.
    ///
    /// An empty or all-invalid detection set contributes nothing and is
    /// skipped with a warning. Returns the number of catalog rows whose
    /// running best this set improved.
    pub fn add_detection_set(&mut self, detections: &NormalizedPointSet) -> usize {
        let source_index = self.sources.len();
        self.sources.push(detections.name.clone());

        let points: Vec<(usize, Equatorial, [f64; 3])> = detections
            .valid_points()
            .map(|(row, eq)| (row, eq, eq.to_unit_vector()))
            .collect();
        if points.is_empty() {
            warn!(
                source = detections.name.as_str(),
                "detection set has no valid coordinates; skipping"
            );
            return 0;
        }

        let mut improved = 0;
        for (slot, cat_vec) in self.vectors.iter().enumerate() {
            // Exact nearest neighbor in this set: maximize the dot
            // product. Ties within a set keep the earliest row.
            let mut nearest: Option<(f64, usize, Equatorial)> = None;
            for (row, eq, det_vec) in &points {
                let d = dot(cat_vec, det_vec);
                if nearest.as_ref().is_none_or(|(best_d, _, _)| d > *best_d) {
                    nearest = Some((d, *row, *eq));
                }
            }
            let (d, row, eq) = nearest.expect("points is non-empty");

            // Strictly-closer replacement: equal separations resolve to
            // the earlier-processed file.
            let replace = self.best[slot].as_ref().is_none_or(|b| d > b.dot);
            if replace {
                self.best[slot] = Some(BestCandidate {
                    dot: d,
                    source_index,
                    detection_row: row,
                    position: eq,
                });
                improved += 1;
            }
        }
        debug!(
            source = detections.name.as_str(),
            candidates = points.len(),
            improved,
            "folded detection set"
        );
        improved
    }

    /// Produce the final records, applying the separation threshold.
    ///
    /// `threshold_arcsec` is inclusive. With `include_unresolved`,
    /// catalog rows without coordinates are emitted too, with empty
    /// position and match fields.
    pub fn finish(self, threshold_arcsec: f64, include_unresolved: bool) -> Vec<MatchRecord> {
        let mut hits: Vec<Option<MatchHit>> = Vec::with_capacity(self.best.len());
        for (slot, candidate) in self.best.iter().enumerate() {
            let hit = candidate.as_ref().and_then(|b| {
                let sep_arcsec =
                    angle_between(&self.vectors[slot], &b.position.to_unit_vector()) * ARCSEC_PER_RAD;
                (sep_arcsec.is_finite() && sep_arcsec <= threshold_arcsec).then(|| MatchHit {
                    source: self.sources[b.source_index].clone(),
                    detection_row: b.detection_row,
                    position: b.position,
                    sep_arcsec,
                })
            });
            hits.push(hit);
        }

        let mut by_row: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
        for (slot, row) in self.valid_rows.iter().enumerate() {
            by_row.insert(*row, slot);
        }

        let mut records = Vec::new();
        for (row, coord) in self.catalog.coords.iter().enumerate() {
            match coord {
                Some(eq) => {
                    let slot = by_row[&row];
                    records.push(MatchRecord {
                        id: self.catalog.ids[row].clone(),
                        position: Some(*eq),
                        hit: hits[slot].take(),
                    });
                }
                None if include_unresolved => {
                    records.push(MatchRecord {
                        id: self.catalog.ids[row].clone(),
                        position: None,
                        hit: None,
                    });
                }
                None => {}
            }
        }
        records
    }
}

/// Convenience wrapper: match a catalog against detection sets in order.
pub fn match_catalog(
    catalog: &NormalizedPointSet,
    detections: &[NormalizedPointSet],
    threshold_arcsec: f64,
    include_unresolved: bool,
) -> Result<Vec<MatchRecord>> {
    let mut matcher = Matcher::new(catalog)?;
    for set in detections {
        matcher.add_detection_set(set);
    }
    Ok(matcher.finish(threshold_arcsec, include_unresolved))
}
