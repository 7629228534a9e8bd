//! Raw table reading: text decoding, header discovery and separator detection
//!
//! Catalog files arrive with arbitrary encodings, separators and layouts,
//! sometimes with prose or comment blocks above the real header. The reader
//! turns raw bytes into a [`RawTable`] of string cells and nothing more;
//! interpreting the cells is the normalizer's job.

use std::borrow::Cow;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// How many leading lines are scanned for a header row.
const HEADER_SCAN_LINES: usize = 50;

/// UTF-8 byte order mark.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

static TAB_OR_MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t| {2,}").unwrap());

/// Explicit field separator, overriding auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Delimiter {
    /// Comma-separated values
    Comma,
    /// Tab-separated values
    Tab,
    /// Semicolon-separated values
    Semicolon,
    /// Any run of whitespace
    Whitespace,
}

/// An ordered, string-typed table as decoded from an uploaded file.
///
/// Ephemeral: produced by [`read_table`], consumed by column resolution and
/// coordinate normalization, then discarded.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Column names, in file order.
    pub columns: Vec<String>,
    /// Data rows; every row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, in row order
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[index].as_str())
    }
}

/// Decode raw bytes to text: UTF-8 with BOM, then UTF-8, then Latin-1.
///
/// Latin-1 maps every byte, so only empty input is undecodable.
fn decode_bytes(bytes: &[u8]) -> Result<Cow<'_, str>> {
    if bytes.is_empty() {
        return Err(Error::Decode);
    }
    if bytes.starts_with(&UTF8_BOM) {
        if let Ok(text) = std::str::from_utf8(&bytes[UTF8_BOM.len()..]) {
            return Ok(Cow::Borrowed(text));
        }
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(Cow::Borrowed(text));
    }
    Ok(Cow::Owned(encoding_rs::mem::decode_latin1(bytes).into_owned()))
}

/// True when the token looks like an RA column label.
fn ra_like_token(token: &str) -> bool {
    token.starts_with("RA") || token.starts_with("ALFA") || token.starts_with("ALPHA")
}

/// True when the token looks like a DEC column label.
fn dec_like_token(token: &str) -> bool {
    token.starts_with("DEC") || token.starts_with("DELTA") || token.starts_with("DEJ")
}

/// Does this line contain adjacent RA-like and DEC-like tokens?
///
/// Adjacency (in either order) keeps unrelated prose that merely mentions
/// both words somewhere from being mistaken for a header.
fn is_header_line(line: &str) -> bool {
    let upper = line.to_uppercase();
    let tokens: Vec<&str> = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.windows(2).any(|pair| {
        (ra_like_token(pair[0]) && dec_like_token(pair[1]))
            || (dec_like_token(pair[0]) && ra_like_token(pair[1]))
    })
}

/// Is every field of this split line a plain number?
fn all_numeric(fields: &[String]) -> bool {
    !fields.is_empty() && fields.iter().all(|f| f.trim().parse::<f64>().is_ok())
}

/// A field-splitting strategy, attempted in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Splitter {
    TabOrMultiSpace,
    Char(char),
    Whitespace,
    FixedWidth,
}

impl Splitter {
    fn name(&self) -> &'static str {
        match self {
            Splitter::TabOrMultiSpace => "tab-or-multi-space",
            Splitter::Char('\t') => "tab",
            Splitter::Char(',') => "comma",
            Splitter::Char(';') => "semicolon",
            Splitter::Char(_) => "char",
            Splitter::Whitespace => "whitespace",
            Splitter::FixedWidth => "fixed-width",
        }
    }
}

/// Detection order. The first strategy that parses wins; later ones are
/// never consulted.
const DETECTION_ORDER: [Splitter; 6] = [
    Splitter::TabOrMultiSpace,
    Splitter::Char('\t'),
    Splitter::Char(','),
    Splitter::Char(';'),
    Splitter::Whitespace,
    Splitter::FixedWidth,
];

/// Column spans derived from the header of a fixed-width table.
///
/// Each column starts where a header label starts and runs to the start of
/// the next label, so left-aligned data wider than its label still lands in
/// the right column.
fn fixed_width_spans(header: &str) -> Vec<(usize, usize)> {
    let mut starts = Vec::new();
    let mut in_run = false;
    for (i, c) in header.char_indices() {
        if c.is_whitespace() {
            in_run = false;
        } else if !in_run {
            starts.push(i);
            in_run = true;
        }
    }
    starts
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let end = starts.get(i + 1).copied().unwrap_or(header.len());
            (s, end)
        })
        .collect()
}

/// Slice a line by fixed-width spans, padding missing columns with "".
fn split_fixed_width(line: &str, spans: &[(usize, usize)]) -> Vec<String> {
    spans
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| {
            // Last span extends to end of line so trailing data survives
            let end = if i == spans.len() - 1 { line.len() } else { end.min(line.len()) };
            let start = start.min(line.len());
            line.get(start..end).unwrap_or("").trim().to_string()
        })
        .collect()
}

/// Split one line according to a strategy.
fn split_line(splitter: Splitter, line: &str, spans: &[(usize, usize)]) -> Vec<String> {
    match splitter {
        Splitter::TabOrMultiSpace => TAB_OR_MULTI_SPACE
            .split(line)
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect(),
        Splitter::Char(c) => line.split(c).map(|f| f.trim().to_string()).collect(),
        Splitter::Whitespace => line.split_whitespace().map(|f| f.to_string()).collect(),
        Splitter::FixedWidth => split_fixed_width(line, spans),
    }
}

/// Try one strategy against the header and all data lines.
///
/// Succeeds when the header yields at least 2 columns and every data line
/// splits to the same width.
fn try_splitter(splitter: Splitter, header: &str, data: &[&str]) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let spans = if splitter == Splitter::FixedWidth {
        fixed_width_spans(header)
    } else {
        Vec::new()
    };
    let columns = split_line(splitter, header, &spans);
    if columns.len() < 2 {
        return None;
    }
    let mut rows = Vec::with_capacity(data.len());
    for line in data {
        let fields = split_line(splitter, line, &spans);
        if fields.len() != columns.len() {
            return None;
        }
        rows.push(fields);
    }
    Some((columns, rows))
}

fn splitter_for(delimiter: Delimiter) -> Splitter {
    match delimiter {
        Delimiter::Comma => Splitter::Char(','),
        Delimiter::Tab => Splitter::Char('\t'),
        Delimiter::Semicolon => Splitter::Char(';'),
        Delimiter::Whitespace => Splitter::Whitespace,
    }
}

/// Read a [`RawTable`] from raw file bytes.
///
/// Decodes the text, drops comment (`#`) and blank lines, locates the
/// header and detects the field separator. A `delimiter` hint bypasses
/// separator detection but not header discovery.
///
/// A first line that fails header discovery and parses as all-numeric is
/// treated as data under synthesized column names (`col0`, `col1`, ...);
/// detection files are frequently bare coordinate dumps with no header at
/// all.
pub fn read_table(bytes: &[u8], delimiter: Option<Delimiter>) -> Result<RawTable> {
    let text = decode_bytes(bytes)?;

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();
    if lines.is_empty() {
        return Err(Error::UnreadableTable);
    }

    // Header discovery: first of the leading lines naming both coordinates.
    let header_idx = lines
        .iter()
        .take(HEADER_SCAN_LINES)
        .position(|l| is_header_line(l))
        .unwrap_or(0);
    let header = lines[header_idx];
    let data = &lines[header_idx + 1..];

    let strategies: Vec<Splitter> = match delimiter {
        Some(d) => vec![splitter_for(d)],
        None => DETECTION_ORDER.to_vec(),
    };

    for splitter in strategies {
        let Some((mut columns, mut rows)) = try_splitter(splitter, header, data) else {
            continue;
        };
        // Headerless numeric dump: keep the would-be header as a data row.
        if header_idx == 0 && all_numeric(&columns) {
            rows.insert(0, columns);
            columns = (0..rows[0].len()).map(|i| format!("col{i}")).collect();
        }
        debug!(
            strategy = splitter.name(),
            columns = columns.len(),
            rows = rows.len(),
            "parsed table"
        );
        return Ok(RawTable { columns, rows });
    }

    Err(Error::UnreadableTable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_separated() {
        let table = read_table(b"STAR,ALFA,DELTA\ns1,150.0,20.0\ns2,151.0,21.0\n", None).unwrap();
        assert_eq!(table.columns, vec!["STAR", "ALFA", "DELTA"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["s1", "150.0", "20.0"]);
    }

    #[test]
    fn test_semicolon_separated() {
        let table = read_table(b"ra;dec\n10.0;20.0\n", None).unwrap();
        assert_eq!(table.columns, vec!["ra", "dec"]);
        assert_eq!(table.rows[0], vec!["10.0", "20.0"]);
    }

    #[test]
    fn test_tab_separated() {
        let table = read_table(b"RA\tDEC\n1.0\t2.0\n", None).unwrap();
        assert_eq!(table.columns, vec!["RA", "DEC"]);
    }

    #[test]
    fn test_single_space_separated() {
        let table = read_table(b"RA DEC MAG\n10.0 20.0 5.5\n", None).unwrap();
        assert_eq!(table.columns, vec!["RA", "DEC", "MAG"]);
        assert_eq!(table.rows[0], vec!["10.0", "20.0", "5.5"]);
    }

    #[test]
    fn test_multi_space_aligned() {
        let table = read_table(b"RA       DEC      MAG\n10.0     20.0     5.5\n", None).unwrap();
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.rows[0][1], "20.0");
    }

    #[test]
    fn test_comments_and_blanks_dropped() {
        let input = b"# produced by pipeline\n\nRA,DEC\n# mid-table comment\n1.0,2.0\n\n";
        let table = read_table(input, None).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_header_below_prose() {
        let input = b"Observations of field 7\nNight of 2023-01-15\nID RA DEC\na 10.0 20.0\n";
        let table = read_table(input, None).unwrap();
        assert_eq!(table.columns, vec!["ID", "RA", "DEC"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_prose_mentioning_coordinates_not_header() {
        // "RA" and "DEC" appear but never adjacent; the real header is below.
        let input = b"The RA values and also DEC values follow below here\nRA DEC\n1.0 2.0\n";
        let table = read_table(input, None).unwrap();
        assert_eq!(table.columns, vec!["RA", "DEC"]);
    }

    #[test]
    fn test_headerless_numeric_dump() {
        let table = read_table(b"150.001 2.301\n150.002 2.302\n", None).unwrap();
        assert_eq!(table.columns, vec!["col0", "col1"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], "150.001");
    }

    #[test]
    fn test_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"ra,dec\n1.0,2.0\n");
        let table = read_table(&bytes, None).unwrap();
        assert_eq!(table.columns, vec!["ra", "dec"]);
    }

    #[test]
    fn test_latin1_fallback() {
        // "Ascensión" in Latin-1; 0xF3 is not valid UTF-8.
        let bytes = b"Ascensi\xF3n recta,DEC\n1.0,2.0\n";
        let table = read_table(bytes, None).unwrap();
        assert_eq!(table.columns[0], "Ascensión recta");
    }

    #[test]
    fn test_empty_input_is_decode_error() {
        assert!(matches!(read_table(b"", None), Err(Error::Decode)));
    }

    #[test]
    fn test_comment_only_input_unreadable() {
        assert!(matches!(
            read_table(b"# nothing here\n\n", None),
            Err(Error::UnreadableTable)
        ));
    }

    #[test]
    fn test_single_column_unreadable() {
        assert!(matches!(
            read_table(b"value\n1.0\n2.0\n", None),
            Err(Error::UnreadableTable)
        ));
    }

    #[test]
    fn test_delimiter_hint_bypasses_detection() {
        let input = b"RA,DEC\n10.0,20.0\n";
        let table = read_table(input, Some(Delimiter::Comma)).unwrap();
        assert_eq!(table.columns, vec!["RA", "DEC"]);
    }

    #[test]
    fn test_hint_that_does_not_parse_fails() {
        let input = b"RA DEC\n10.0 20.0\n";
        assert!(matches!(
            read_table(input, Some(Delimiter::Semicolon)),
            Err(Error::UnreadableTable)
        ));
    }

    #[test]
    fn test_single_space_resolved_by_whitespace_run() {
        // Earlier strategies see one wide field; the whitespace-run split
        // is the first to parse consistently.
        let input = b"ra dec\n1.0 2.0\n3.0 4.0\n";
        let table = read_table(input, None).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_fixed_width_fallback() {
        // Mixed single/multi space data defeats the splitting strategies
        // only when widths disagree; build a case where only fixed-width
        // spans line up.
        let input = b"NAME      RA        DEC\nalpha cen 219.90    -60.83\n";
        let table = read_table(input, None).unwrap();
        assert_eq!(table.columns, vec!["NAME", "RA", "DEC"]);
        assert_eq!(table.rows[0], vec!["alpha cen", "219.90", "-60.83"]);
    }

    #[test]
    fn test_zero_row_table_allowed() {
        // Detection files may carry a header and no rows at all.
        let table = read_table(b"ra,dec\n", None).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 2);
    }
}
