//! skymatch - catalog ingestion and nearest-neighbor cross-matching
//!
//! Reads delimiter-ambiguous astronomical tables, resolves which columns
//! carry right ascension and declination by name or by value range,
//! normalizes coordinates (sexagesimal, decimal hours, decimal degrees)
//! into ICRS decimal degrees, and matches a reference catalog against
//! detection files by great-circle separation.

pub mod columns;
pub mod equatorial;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod output;
pub mod session;
pub mod table;

// Re-export commonly used types for external use
pub use crate::columns::{resolve_columns, ResolvedColumns};
pub use crate::equatorial::Equatorial;
pub use crate::error::{Axis, Error, Result};
pub use crate::matcher::{match_catalog, MatchHit, MatchRecord, Matcher};
pub use crate::normalize::{normalize_table, NormalizedPointSet};
pub use crate::output::{write_matches_csv, write_normalized_csv};
pub use crate::session::{CancelToken, MatchConfig, MatchSession};
pub use crate::table::{read_table, Delimiter, RawTable};
