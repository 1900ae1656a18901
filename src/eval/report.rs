//! Report types for comparison results.
//!
//! A [`ComparisonReport`] holds one row per source file, in key order. Rows
//! fold into a [`RunSummary`]. Reports serialize to JSON for archiving.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::FidelityRecord;
use crate::tree::{CorrespondenceKey, Modality};

/// Status text for a derived image that is not a raster format.
pub const NOT_AN_IMAGE: &str = "Output File is Not an Image";

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    /// Both sides were compared.
    Measured {
        /// Metrics for the pair.
        record: FidelityRecord,
    },
    /// No derivative was found.
    Missing {
        /// Status text naming what was expected.
        hint: String,
    },
    /// The derivative matched by name but is not of the source's modality.
    NotMedia,
    /// The comparison itself failed.
    Failed {
        /// Error message.
        reason: String,
    },
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Correspondence key.
    pub key: CorrespondenceKey,
    /// Source path relative to its root, `/`-separated.
    pub source_path: String,
    /// File name of the derivative, if one was found.
    pub derived_name: Option<String>,
    /// Outcome.
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

impl ReportRow {
    /// Whether metrics were produced.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, RowOutcome::Measured { .. })
    }

    /// Metrics, when measured.
    #[must_use]
    pub fn record(&self) -> Option<&FidelityRecord> {
        match &self.outcome {
            RowOutcome::Measured { record } => Some(record),
            _ => None,
        }
    }

    /// Human-readable status.
    #[must_use]
    pub fn status(&self) -> String {
        match &self.outcome {
            RowOutcome::Measured { .. } => "OK".to_string(),
            RowOutcome::Missing { hint } => hint.clone(),
            RowOutcome::NotMedia => NOT_AN_IMAGE.to_string(),
            RowOutcome::Failed { reason } => format!("Error: {reason}"),
        }
    }
}

/// Result of comparing one modality across two trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Modality compared.
    pub modality: Modality,
    /// Root of the originals.
    pub source_root: PathBuf,
    /// Root of the derivatives.
    pub derived_root: PathBuf,
    /// One row per source file, ascending by key.
    pub rows: Vec<ReportRow>,
    /// Source files skipped while indexing.
    pub skipped: usize,
    /// Derived files with no source.
    pub orphans: usize,
}

impl ComparisonReport {
    /// Whether the source tree had nothing to compare.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fold the rows into a summary.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let summary = self
            .rows
            .iter()
            .fold(RunSummary::default(), |summary, row| summary.add(row));
        RunSummary {
            orphans: self.orphans,
            ..summary
        }
    }
}

/// Write reports as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be created or serialization fails.
pub fn write_json(reports: &[ComparisonReport], path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, reports)?;
    Ok(())
}

/// Counts and averages over a report's rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Rows (source files) seen.
    pub rows: usize,
    /// Rows with metrics.
    pub ok: usize,
    /// Rows whose comparison failed, including non-media derivatives.
    pub failed: usize,
    /// Rows without a derivative.
    pub missing: usize,
    /// Derived files without a source.
    pub orphans: usize,
    psnr_sum: f64,
    ssim_sum: f64,
    ssim_count: usize,
}

impl RunSummary {
    /// Account for one row.
    #[must_use]
    pub fn add(mut self, row: &ReportRow) -> Self {
        self.rows += 1;
        match &row.outcome {
            RowOutcome::Measured { record } => {
                self.ok += 1;
                self.psnr_sum += record.psnr();
                if let Some(ssim) = record.ssim() {
                    self.ssim_sum += ssim;
                    self.ssim_count += 1;
                }
            }
            RowOutcome::Missing { .. } => self.missing += 1,
            RowOutcome::NotMedia | RowOutcome::Failed { .. } => self.failed += 1,
        }
        self
    }

    /// Combine with another summary.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            rows: self.rows + other.rows,
            ok: self.ok + other.ok,
            failed: self.failed + other.failed,
            missing: self.missing + other.missing,
            orphans: self.orphans + other.orphans,
            psnr_sum: self.psnr_sum + other.psnr_sum,
            ssim_sum: self.ssim_sum + other.ssim_sum,
            ssim_count: self.ssim_count + other.ssim_count,
        }
    }

    /// Mean PSNR over measured rows.
    #[must_use]
    pub fn mean_psnr(&self) -> Option<f64> {
        (self.ok > 0).then(|| self.psnr_sum / self.ok as f64)
    }

    /// Mean SSIM over measured rows that carry one.
    #[must_use]
    pub fn mean_ssim(&self) -> Option<f64> {
        (self.ssim_count > 0).then(|| self.ssim_sum / self.ssim_count as f64)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} compared: {} OK, {} failed, {} missing",
            self.rows, self.ok, self.failed, self.missing
        )?;
        if let Some(psnr) = self.mean_psnr() {
            write!(f, "; mean PSNR {psnr:.2} dB")?;
        }
        if let Some(ssim) = self.mean_ssim() {
            write!(f, ", mean SSIM {ssim:.4}")?;
        }
        if self.orphans > 0 {
            write!(f, " ({} derived files without a source)", self.orphans)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ImageFidelity;

    fn measured(key: &str, psnr: f64, ssim: f64) -> ReportRow {
        ReportRow {
            key: CorrespondenceKey::from(key),
            source_path: format!("{key}.png"),
            derived_name: Some(format!("{key}_optimized.png")),
            outcome: RowOutcome::Measured {
                record: FidelityRecord::Image(ImageFidelity {
                    mse: 1.0,
                    psnr,
                    ssim,
                }),
            },
        }
    }

    fn row(key: &str, outcome: RowOutcome) -> ReportRow {
        ReportRow {
            key: CorrespondenceKey::from(key),
            source_path: format!("{key}.png"),
            derived_name: None,
            outcome,
        }
    }

    fn report(rows: Vec<ReportRow>) -> ComparisonReport {
        ComparisonReport {
            modality: Modality::Image,
            source_root: PathBuf::from("input"),
            derived_root: PathBuf::from("output"),
            rows,
            skipped: 0,
            orphans: 2,
        }
    }

    #[test]
    fn test_status_text() {
        assert_eq!(measured("a", 40.0, 0.9).status(), "OK");
        assert_eq!(row("b", RowOutcome::NotMedia).status(), NOT_AN_IMAGE);
        assert_eq!(
            row(
                "c",
                RowOutcome::Failed {
                    reason: "boom".to_string()
                }
            )
            .status(),
            "Error: boom"
        );
    }

    #[test]
    fn test_summary_fold() {
        let report = report(vec![
            measured("a", 40.0, 0.9),
            measured("b", 30.0, 0.7),
            row(
                "c",
                RowOutcome::Missing {
                    hint: "Missing".to_string(),
                },
            ),
            row(
                "d",
                RowOutcome::Failed {
                    reason: "x".to_string(),
                },
            ),
        ]);

        let summary = report.summary();
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.ok, 2);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.orphans, 2);
        assert_eq!(summary.mean_psnr(), Some(35.0));
        assert!((summary.mean_ssim().unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunSummary::default();
        assert_eq!(summary.mean_psnr(), None);
        assert_eq!(summary.to_string(), "0 compared: 0 OK, 0 failed, 0 missing");
    }

    #[test]
    fn test_merge() {
        let a = report(vec![measured("a", 40.0, 0.9)]).summary();
        let b = report(vec![measured("b", 20.0, 0.5)]).summary();
        let merged = a.merge(b);
        assert_eq!(merged.ok, 2);
        assert_eq!(merged.orphans, 4);
        assert_eq!(merged.mean_psnr(), Some(30.0));
    }

    #[test]
    fn test_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json(&[report(vec![measured("a", 40.0, 0.9)])], &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["modality"], "Image");
        assert_eq!(value[0]["rows"][0]["status"], "measured");
        assert_eq!(value[0]["rows"][0]["key"], "a");
    }
}
