//! Cross-match a reference catalog against detection files
//!
//! Reads one catalog table plus any number of detection tables, resolves
//! RA/DEC columns in each, and reports the nearest catalog neighbor for
//! every catalog row within the separation threshold.
//!
//! Usage:
//! ```
//! cargo run --bin skymatch -- catalog.csv night1.asc night2.asc -o matches.csv
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use skymatch::{write_matches_csv, write_normalized_csv, Delimiter, MatchConfig, MatchSession};

/// Command line arguments for catalog cross-matching
#[derive(Parser, Debug)]
#[command(
    name = "skymatch",
    about = "Nearest-neighbor cross-matching of astronomical catalogs",
    long_about = None
)]
struct Args {
    /// Reference catalog table (CSV, TSV, or whitespace-delimited)
    catalog: PathBuf,

    /// Detection tables to match against the catalog
    #[arg(required = true)]
    detections: Vec<PathBuf>,

    /// Match threshold in arcseconds (inclusive)
    #[arg(long, short = 't', default_value_t = 1.0)]
    threshold: f64,

    /// Force a specific column separator instead of auto-detecting
    #[arg(long, value_enum)]
    delimiter: Option<Delimiter>,

    /// Output CSV file for match results
    #[arg(long, short = 'o', default_value = "matches.csv")]
    output: PathBuf,

    /// Also write the normalized catalog (original columns plus ra/dec)
    #[arg(long)]
    normalized_output: Option<PathBuf>,

    /// Emit catalog rows whose coordinates could not be parsed
    #[arg(long)]
    include_unresolved: bool,

    /// Abort the matching run after this many seconds
    #[arg(long)]
    budget_secs: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut session = MatchSession::new(MatchConfig {
        threshold_arcsec: args.threshold,
        delimiter: args.delimiter,
        include_unresolved: args.include_unresolved,
        budget: args.budget_secs.map(Duration::from_secs_f64),
    });

    let catalog = session
        .load_catalog_path(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
    println!(
        "Catalog: {} ({} rows, {} with valid coordinates)",
        catalog.name,
        catalog.len(),
        catalog.valid_count()
    );

    let progress = ProgressBar::new(args.detections.len() as u64).with_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")?.progress_chars("=> "),
    );
    progress.set_message("loading detections");

    let mut skipped = 0usize;
    for path in &args.detections {
        // One bad file must not sink the run.
        if let Err(e) = session.add_detections_path(path) {
            warn!(file = %path.display(), error = %e, "skipping detection file");
            skipped += 1;
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if session.detections().is_empty() {
        anyhow::bail!("no detection files could be loaded");
    }

    let records = session.run_matching()?;
    let matched = records.iter().filter(|r| r.hit.is_some()).count();

    let out = BufWriter::new(
        File::create(&args.output)
            .with_context(|| format!("creating {}", args.output.display()))?,
    );
    write_matches_csv(out, &records)?;

    if let Some(path) = &args.normalized_output {
        let catalog = session.catalog().expect("catalog loaded above");
        let out = BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        write_normalized_csv(out, catalog)?;
        println!("Wrote normalized catalog to {}", path.display());
    }

    println!(
        "Matched {}/{} catalog rows within {}\" across {} detection file(s){}",
        matched,
        records.len(),
        args.threshold,
        session.detections().len(),
        if skipped > 0 {
            format!(" ({skipped} skipped)")
        } else {
            String::new()
        }
    );
    println!("Wrote {}", args.output.display());

    Ok(())
}
