use thiserror::Error;

/// Coordinate axis being resolved or converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Right ascension
    Ra,
    /// Declination
    Dec,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Ra => write!(f, "RA"),
            Axis::Dec => write!(f, "DEC"),
        }
    }
}

/// Errors produced by the catalog ingestion and matching pipeline.
///
/// All variants are file-scoped: a failure loading one file never
/// invalidates files that already loaded. Row-level conversion failures
/// are not errors at all; they degrade to absent coordinate rows.
#[derive(Error, Debug)]
pub enum Error {
    /// No supported text encoding decoded the input bytes.
    #[error("no supported text encoding (UTF-8 BOM, UTF-8, Latin-1) decoded the input")]
    Decode,

    /// No separator strategy produced a parseable table.
    #[error("no separator strategy produced a table with at least 2 columns")]
    UnreadableTable,

    /// No resolution heuristic identified a coordinate column.
    #[error("could not identify a {axis} column by alias, substring or value range")]
    ColumnNotFound {
        /// Which axis could not be resolved.
        axis: Axis,
    },

    /// Every row of a coordinate column failed conversion to degrees.
    #[error("every {axis} value failed conversion to degrees")]
    CoordinateConversion {
        /// Which axis failed wholesale.
        axis: Axis,
    },

    /// Matching was requested against a point set with zero valid rows.
    #[error("point set '{name}' has no rows with valid coordinates")]
    EmptyPointSet {
        /// Name of the offending point set.
        name: String,
    },

    /// The run was cancelled through its cancellation token.
    #[error("run cancelled")]
    Cancelled,

    /// The run exceeded its wall-clock budget.
    #[error("wall-clock budget exceeded after {elapsed_ms} ms")]
    BudgetExceeded {
        /// Elapsed time when the budget check fired.
        elapsed_ms: u64,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
