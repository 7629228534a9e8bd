//! Explicit matching session owning the loaded catalog and detections
//!
//! The session replaces the hidden pipeline-wide "current catalog" state
//! of earlier incarnations of this tool with an object the caller owns
//! and passes around. Failure isolation is per file: a detection file
//! that fails to load or parse is reported and skipped, files already
//! loaded stay loaded, and nothing is retried.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::matcher::{MatchRecord, Matcher};
use crate::normalize::{normalize_table, NormalizedPointSet};
use crate::table::{read_table, Delimiter};

/// Matching run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Inclusive separation threshold in arcseconds
    pub threshold_arcsec: f64,
    /// Explicit separator, bypassing auto-detection
    pub delimiter: Option<Delimiter>,
    /// Emit unresolved catalog rows with empty fields
    pub include_unresolved: bool,
    /// Wall-clock budget for one matching run
    pub budget: Option<Duration>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold_arcsec: 1.0,
            delimiter: None,
            include_unresolved: false,
            budget: None,
        }
    }
}

/// Shared cancellation flag for a matching run.
///
/// Cloning shares the flag; cancelling from any clone stops the run at
/// the next between-files checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A loaded catalog plus detection sets, ready to match.
pub struct MatchSession {
    config: MatchConfig,
    cancel: CancelToken,
    catalog: Option<NormalizedPointSet>,
    detections: Vec<NormalizedPointSet>,
}

impl MatchSession {
    /// Create an empty session with the given configuration
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            catalog: None,
            detections: Vec::new(),
        }
    }

    /// Token for cancelling runs of this session from another handle
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The loaded catalog, if any
    pub fn catalog(&self) -> Option<&NormalizedPointSet> {
        self.catalog.as_ref()
    }

    /// Detection sets loaded so far, in processing order
    pub fn detections(&self) -> &[NormalizedPointSet] {
        &self.detections
    }

    /// Load (or replace) the catalog from raw bytes.
    pub fn load_catalog(&mut self, name: &str, bytes: &[u8]) -> Result<&NormalizedPointSet> {
        let set = self.ingest(name, bytes)?;
        info!(
            source = name,
            rows = set.len(),
            valid = set.valid_count(),
            "catalog loaded"
        );
        self.catalog = Some(set);
        Ok(self.catalog.as_ref().expect("just set"))
    }

    /// Load the catalog from a file path.
    pub fn load_catalog_path(&mut self, path: &Path) -> Result<&NormalizedPointSet> {
        let bytes = std::fs::read(path)?;
        let name = file_name(path);
        self.load_catalog(&name, &bytes)
    }

    /// Add one detection file from raw bytes. Returns the number of rows
    /// with valid coordinates.
    pub fn add_detections(&mut self, name: &str, bytes: &[u8]) -> Result<usize> {
        let set = self.ingest(name, bytes)?;
        let valid = set.valid_count();
        info!(
            source = name,
            rows = set.len(),
            valid,
            "detection file loaded"
        );
        self.detections.push(set);
        Ok(valid)
    }

    /// Add one detection file from a path.
    pub fn add_detections_path(&mut self, path: &Path) -> Result<usize> {
        let bytes = std::fs::read(path)?;
        let name = file_name(path);
        self.add_detections(&name, &bytes)
    }

    /// Shared read -> resolve -> normalize pipeline for one file.
    fn ingest(&self, name: &str, bytes: &[u8]) -> Result<NormalizedPointSet> {
        let table = read_table(bytes, self.config.delimiter)?;
        normalize_table(table, name)
    }

    /// Run the nearest-neighbor match over everything loaded.
    ///
    /// Cancellation and the wall-clock budget are checked between
    /// detection files; hitting either aborts this run and leaves the
    /// session (catalog and detections) untouched for a later retry with
    /// different settings.
    pub fn run_matching(&self) -> Result<Vec<MatchRecord>> {
        let catalog = self.catalog.as_ref().ok_or_else(|| Error::EmptyPointSet {
            name: "<no catalog loaded>".to_string(),
        })?;

        let started = Instant::now();
        let mut matcher = Matcher::new(catalog)?;
        for set in &self.detections {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(budget) = self.config.budget {
                let elapsed = started.elapsed();
                if elapsed > budget {
                    return Err(Error::BudgetExceeded {
                        elapsed_ms: elapsed.as_millis() as u64,
                    });
                }
            }
            matcher.add_detection_set(set);
        }

        let records = matcher.finish(
            self.config.threshold_arcsec,
            self.config.include_unresolved,
        );
        info!(
            catalog = catalog.name.as_str(),
            detection_files = self.detections.len(),
            matched = records.iter().filter(|r| r.hit.is_some()).count(),
            total = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "matching run complete"
        );
        Ok(records)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
