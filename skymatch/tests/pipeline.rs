//! End-to-end pipeline tests: files on disk through session to CSV output

use std::fs;

use approx::assert_relative_eq;
use skymatch::{
    write_matches_csv, write_normalized_csv, Delimiter, MatchConfig, MatchSession,
};
use tempfile::tempdir;

/// Fixed-width catalog with sexagesimal coordinates and aliased headers.
const CATALOG: &str = "\
STAR     ALFA          DELTA
vega     18:36:56.34   +38:47:01.3
sirius   06:45:08.92   -16:42:58.0
";

/// Headerless numeric detection dump: RA/DEC must be found by value range.
/// First row sits 0.72 arcsec north of vega; second row is nowhere near
/// either catalog star.
const DETECTIONS: &str = "\
279.23475000 38.78389444
10.00000000 50.00000000
";

fn vega_degrees() -> (f64, f64) {
    let ra = (18.0 + 36.0 / 60.0 + 56.34 / 3600.0) * 15.0;
    let dec = 38.0 + 47.0 / 60.0 + 1.3 / 3600.0;
    (ra, dec)
}

#[test]
fn test_sexagesimal_catalog_matches_headerless_detections() {
    let dir = tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.txt");
    let detections_path = dir.path().join("night1.asc");
    fs::write(&catalog_path, CATALOG).unwrap();
    fs::write(&detections_path, DETECTIONS).unwrap();

    let mut session = MatchSession::new(MatchConfig {
        threshold_arcsec: 2.0,
        ..MatchConfig::default()
    });
    let catalog = session.load_catalog_path(&catalog_path).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.valid_count(), 2);

    let (vega_ra, vega_dec) = vega_degrees();
    let vega = catalog.coords[0].unwrap();
    assert_relative_eq!(vega.ra_degrees(), vega_ra, epsilon = 1e-9);
    assert_relative_eq!(vega.dec_degrees(), vega_dec, epsilon = 1e-9);

    let valid = session.add_detections_path(&detections_path).unwrap();
    assert_eq!(valid, 2);

    let records = session.run_matching().unwrap();
    assert_eq!(records.len(), 2);

    // IDs come from the aliased STAR column.
    assert_eq!(records[0].id, "vega");
    assert_eq!(records[1].id, "sirius");

    let hit = records[0].hit.as_ref().expect("vega should match");
    assert_eq!(hit.source, "night1.asc");
    assert_eq!(hit.detection_row, 0);
    assert_relative_eq!(hit.sep_arcsec, 0.72, epsilon = 1e-3);

    // No detection within 2 arcsec of sirius.
    assert!(records[1].hit.is_none());
}

#[test]
fn test_unhelpful_detection_headers_resolved_by_value_range() {
    // "x"/"y" match no alias or substring; only the value ranges say
    // which column is which.
    let dir = tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.txt");
    let detections_path = dir.path().join("field.csv");
    fs::write(&catalog_path, CATALOG).unwrap();
    fs::write(&detections_path, "x,y\n279.23475000,38.78389444\n").unwrap();

    let mut session = MatchSession::new(MatchConfig {
        threshold_arcsec: 2.0,
        ..MatchConfig::default()
    });
    session.load_catalog_path(&catalog_path).unwrap();
    session.add_detections_path(&detections_path).unwrap();

    let records = session.run_matching().unwrap();
    let hit = records[0].hit.as_ref().expect("vega should match");
    assert_eq!(hit.source, "field.csv");
    assert_relative_eq!(hit.sep_arcsec, 0.72, epsilon = 1e-3);
}

#[test]
fn test_closer_file_wins_across_detection_files() {
    let dir = tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.csv");
    fs::write(&catalog_path, "id,ra,dec\ns1,150.0,20.0\n").unwrap();

    let far = dir.path().join("far.asc");
    let near = dir.path().join("near.asc");
    // 0.0006 deg of RA at dec 20 is about 2.0 arcsec; 0.0001 deg about 0.34.
    fs::write(&far, "150.0006 20.0\n").unwrap();
    fs::write(&near, "150.0001 20.0\n").unwrap();

    let mut session = MatchSession::new(MatchConfig {
        threshold_arcsec: 5.0,
        ..MatchConfig::default()
    });
    session.load_catalog_path(&catalog_path).unwrap();
    session.add_detections_path(&far).unwrap();
    session.add_detections_path(&near).unwrap();

    let records = session.run_matching().unwrap();
    let hit = records[0].hit.as_ref().unwrap();
    assert_eq!(hit.source, "near.asc");
    assert!(hit.sep_arcsec < 0.5);
}

#[test]
fn test_latin1_catalog_with_spanish_headers() {
    // "ascensión recta" / "declinación" in Latin-1, undecodable as UTF-8.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"ascensi\xf3n recta;declinaci\xf3n\n");
    bytes.extend_from_slice(b"150.0;20.0\n");

    let mut session = MatchSession::new(MatchConfig {
        threshold_arcsec: 1.0,
        delimiter: Some(Delimiter::Semicolon),
        ..MatchConfig::default()
    });
    let catalog = session.load_catalog("es.csv", &bytes).unwrap();
    assert_eq!(catalog.valid_count(), 1);
    let coord = catalog.coords[0].unwrap();
    assert_relative_eq!(coord.ra_degrees(), 150.0, epsilon = 1e-9);
    assert_relative_eq!(coord.dec_degrees(), 20.0, epsilon = 1e-9);
}

#[test]
fn test_csv_outputs_end_to_end() {
    let dir = tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.txt");
    let detections_path = dir.path().join("night1.asc");
    fs::write(&catalog_path, CATALOG).unwrap();
    fs::write(&detections_path, DETECTIONS).unwrap();

    let mut session = MatchSession::new(MatchConfig {
        threshold_arcsec: 2.0,
        ..MatchConfig::default()
    });
    session.load_catalog_path(&catalog_path).unwrap();
    session.add_detections_path(&detections_path).unwrap();
    let records = session.run_matching().unwrap();

    let mut matches_csv = Vec::new();
    write_matches_csv(&mut matches_csv, &records).unwrap();
    let matches_csv = String::from_utf8(matches_csv).unwrap();
    let lines: Vec<&str> = matches_csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "id,ra,dec,source_file,match_ra,match_dec,sep_arcsec");
    assert!(lines[1].starts_with("vega,"));
    assert!(lines[1].contains("night1.asc"));
    assert!(lines[2].starts_with("sirius,"));
    assert!(lines[2].ends_with(",,,,"));

    let mut normalized_csv = Vec::new();
    write_normalized_csv(&mut normalized_csv, session.catalog().unwrap()).unwrap();
    let normalized_csv = String::from_utf8(normalized_csv).unwrap();
    let lines: Vec<&str> = normalized_csv.lines().collect();
    assert_eq!(lines[0], "STAR,ALFA,DELTA,ra,dec");
    assert!(lines[1].starts_with("vega,18:36:56.34,+38:47:01.3,279.2347"));
}

#[test]
fn test_decimal_hours_catalog_agrees_with_degrees() {
    // Same sky position expressed in decimal hours and decimal degrees.
    let hours = "ra,dec\n10.0,20.0\n";
    let degrees = "ra,dec\n150.0,20.0\n";

    let mut a = MatchSession::new(MatchConfig::default());
    let mut b = MatchSession::new(MatchConfig::default());
    let ca = a.load_catalog("hours.csv", hours.as_bytes()).unwrap();
    let ra_hours = ca.coords[0].unwrap().ra_degrees();
    let cb = b.load_catalog("degrees.csv", degrees.as_bytes()).unwrap();
    let ra_degrees = cb.coords[0].unwrap().ra_degrees();
    assert_relative_eq!(ra_hours, ra_degrees, epsilon = 1e-9);
    assert_relative_eq!(ra_hours, 150.0, epsilon = 1e-9);
}
