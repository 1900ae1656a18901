//! Tree comparison command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use media_fidelity::{
    CompareConfig, CompareSession, ComparisonReport, Modality, RunSummary, render_report,
    write_json,
};

/// Arguments of the `compare` subcommand.
pub struct CompareArgs {
    pub source: PathBuf,
    pub derived: PathBuf,
    pub modalities: &'static [Modality],
    pub suffix: String,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub probe_timeout: u64,
    pub measure_timeout: u64,
    pub parallel: bool,
    pub strict_keys: bool,
    pub create_missing_roots: bool,
    pub json: Option<PathBuf>,
}

pub fn run(args: CompareArgs) -> Result<()> {
    let config = CompareConfig::builder()
        .suffix(args.suffix.as_str())
        .ffmpeg(&args.ffmpeg)
        .ffprobe(&args.ffprobe)
        .probe_timeout(Duration::from_secs(args.probe_timeout))
        .measure_timeout(Duration::from_secs(args.measure_timeout))
        .parallel(args.parallel)
        .strict_keys(args.strict_keys)
        .create_missing_roots(args.create_missing_roots)
        .build()
        .with_context(|| format!("Invalid derived suffix '{}'", args.suffix))?;

    let session = CompareSession::new(config);
    let mut reports: Vec<ComparisonReport> = Vec::with_capacity(args.modalities.len());

    for &modality in args.modalities {
        let report = session
            .compare(modality, &args.source, &args.derived)
            .inspect_err(|e| tracing::error!(%modality, "run aborted: {}", e))
            .with_context(|| {
                format!(
                    "{} comparison of {} against {} aborted",
                    modality,
                    args.source.display(),
                    args.derived.display()
                )
            })?;

        println!("{}", render_report(&report));
        if !report.is_empty() {
            println!();
            println!("{}", report.summary());
        }
        println!();
        reports.push(report);
    }

    if args.modalities.len() > 1 {
        let total = reports
            .iter()
            .map(ComparisonReport::summary)
            .fold(RunSummary::default(), RunSummary::merge);
        println!("Total: {total}");
    }

    if let Some(path) = &args.json {
        write_json(&reports, path)
            .with_context(|| format!("Failed to write JSON report to {}", path.display()))?;
        eprintln!("Wrote {} reports to {}", reports.len(), path.display());
    }

    Ok(())
}
