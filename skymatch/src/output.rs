//! CSV export of normalized catalogs and match results

use std::io::Write;

use crate::error::Result;
use crate::matcher::MatchRecord;
use crate::normalize::NormalizedPointSet;

/// Write a normalized point set as CSV: all original columns followed by
/// canonical `ra`/`dec` columns in decimal degrees (empty where the row
/// was unresolvable).
pub fn write_normalized_csv<W: Write>(writer: W, set: &NormalizedPointSet) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = set.columns.iter().map(String::as_str).collect();
    header.push("ra");
    header.push("dec");
    wtr.write_record(&header)?;

    for (row, coord) in set.rows.iter().zip(&set.coords) {
        let mut record: Vec<String> = row.clone();
        match coord {
            Some(eq) => {
                record.push(format!("{:.8}", eq.ra_degrees()));
                record.push(format!("{:.8}", eq.dec_degrees()));
            }
            None => {
                record.push(String::new());
                record.push(String::new());
            }
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write match records as CSV.
///
/// Columns: `id, ra, dec, source_file, match_ra, match_dec, sep_arcsec`.
/// Coordinates carry 8 decimal places, separations 4; the match fields
/// are empty strings when no detection fell within the threshold.
pub fn write_matches_csv<W: Write>(writer: W, records: &[MatchRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "id",
        "ra",
        "dec",
        "source_file",
        "match_ra",
        "match_dec",
        "sep_arcsec",
    ])?;

    for record in records {
        let (ra, dec) = match &record.position {
            Some(eq) => (
                format!("{:.8}", eq.ra_degrees()),
                format!("{:.8}", eq.dec_degrees()),
            ),
            None => (String::new(), String::new()),
        };
        let (source, match_ra, match_dec, sep) = match &record.hit {
            Some(hit) => (
                hit.source.clone(),
                format!("{:.8}", hit.position.ra_degrees()),
                format!("{:.8}", hit.position.dec_degrees()),
                format!("{:.4}", hit.sep_arcsec),
            ),
            None => (String::new(), String::new(), String::new(), String::new()),
        };
        wtr.write_record([&record.id, &ra, &dec, &source, &match_ra, &match_dec, &sep])?;
    }
    wtr.flush()?;
    Ok(())
}
