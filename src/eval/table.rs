//! Fixed-width text tables for comparison reports.

use std::fmt::Write as _;

use super::report::{ComparisonReport, ReportRow, RowOutcome};
use crate::metrics::FidelityRecord;
use crate::tree::Modality;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Cell content; numeric cells carry their decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    SourcePath,
    DerivedName,
    Mse(usize),
    Psnr(usize),
    Ssim(usize),
    Status,
}

#[derive(Debug, Clone, Copy)]
struct Column {
    title: &'static str,
    width: usize,
    align: Align,
    cell: Cell,
}

const fn col(title: &'static str, width: usize, align: Align, cell: Cell) -> Column {
    Column {
        title,
        width,
        align,
        cell,
    }
}

/// Column set and formatting rules for one modality.
#[derive(Debug, Clone)]
pub struct TableLayout {
    modality: Modality,
    title: &'static str,
    columns: Vec<Column>,
    /// Truncate paths that exactly fill the column as well as longer ones.
    truncate_full_width: bool,
    /// Print `-> Status:` under rows that are not OK.
    annotate_status: bool,
}

impl TableLayout {
    /// Layout for `modality`.
    #[must_use]
    pub fn for_modality(modality: Modality) -> Self {
        use Align::{Left, Right};
        match modality {
            Modality::Image => Self {
                modality,
                title: "--- Image Quality Comparison Results (MSE/PSNR/SSIM) ---",
                columns: vec![
                    col("Original Path/File", 45, Left, Cell::SourcePath),
                    col("MSE", 12, Right, Cell::Mse(4)),
                    col("PSNR (dB)", 10, Right, Cell::Psnr(2)),
                    col("SSIM", 8, Right, Cell::Ssim(4)),
                    col("Status", 35, Left, Cell::Status),
                ],
                truncate_full_width: true,
                annotate_status: true,
            },
            Modality::Audio => Self {
                modality,
                title: "--- Audio Quality Comparison Results (MSE/PSNR) ---",
                columns: vec![
                    col("Original Path", 50, Left, Cell::SourcePath),
                    col("Compressed File", 25, Left, Cell::DerivedName),
                    col("MSE", 15, Right, Cell::Mse(8)),
                    col("PSNR (dB)", 12, Right, Cell::Psnr(2)),
                ],
                truncate_full_width: true,
                annotate_status: true,
            },
            Modality::Video => Self {
                modality,
                title: "--- Video Quality Comparison Results (MSE/PSNR/SSIM) ---",
                columns: vec![
                    col("Path/Filename", 70, Left, Cell::SourcePath),
                    col("MSE", 15, Right, Cell::Mse(4)),
                    col("PSNR (dB)", 15, Right, Cell::Psnr(4)),
                    col("SSIM", 10, Right, Cell::Ssim(4)),
                    col("Status", 10, Left, Cell::Status),
                ],
                truncate_full_width: false,
                annotate_status: false,
            },
        }
    }

    /// Width of the divider: every column plus one separating space each.
    #[must_use]
    pub fn total_width(&self) -> usize {
        let widths: usize = self.columns.iter().map(|c| c.width).sum();
        widths + self.columns.len().saturating_sub(1)
    }

    fn header(&self) -> String {
        self.line(self.columns.iter().map(|c| c.title.to_string()))
    }

    fn line(&self, cells: impl Iterator<Item = String>) -> String {
        let mut out = String::new();
        for (i, (column, text)) in self.columns.iter().zip(cells).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let width = column.width;
            let _ = match column.align {
                Align::Left => write!(out, "{text:<width$}"),
                Align::Right => write!(out, "{text:>width$}"),
            };
        }
        out.trim_end().to_string()
    }

    fn cell(&self, column: &Column, row: &ReportRow) -> String {
        match column.cell {
            Cell::SourcePath => {
                truncate_left(&row.source_path, column.width, self.truncate_full_width)
            }
            Cell::DerivedName => match &row.derived_name {
                Some(name) => name.chars().take(column.width.saturating_sub(1)).collect(),
                None => NOT_AVAILABLE.to_string(),
            },
            Cell::Mse(places) => number(row, places, |r| Some(r.mse())),
            Cell::Psnr(places) => number(row, places, |r| Some(r.psnr())),
            Cell::Ssim(places) => number(row, places, FidelityRecord::ssim),
            Cell::Status => self.short_status(row),
        }
    }

    fn short_status(&self, row: &ReportRow) -> String {
        match (&row.outcome, self.modality) {
            (RowOutcome::Failed { .. }, Modality::Video) => "FAILED".to_string(),
            (RowOutcome::Failed { .. }, _) => "Error".to_string(),
            _ => row.status(),
        }
    }

    fn empty_message(&self, report: &ComparisonReport) -> String {
        match self.modality {
            Modality::Image => format!(
                "No image files found in the '{}' directory.",
                report.source_root.display()
            ),
            Modality::Audio => format!(
                "No matching audio files found between '{}' and '{}' (including subfolders).",
                report.source_root.display(),
                report.derived_root.display()
            ),
            Modality::Video => {
                "No matching video files found in both directories (including subfolders).".to_string()
            }
        }
    }
}

const NOT_AVAILABLE: &str = "N/A";

fn number(row: &ReportRow, places: usize, value: impl Fn(&FidelityRecord) -> Option<f64>) -> String {
    match &row.outcome {
        RowOutcome::Measured { record } => match value(record) {
            Some(v) => format!("{v:.places$}"),
            None => NOT_AVAILABLE.to_string(),
        },
        RowOutcome::Failed { .. } => "Error".to_string(),
        RowOutcome::Missing { .. } | RowOutcome::NotMedia => NOT_AVAILABLE.to_string(),
    }
}

/// Keep the tail of `text` so it fits in `width` characters, marked with `...`.
///
/// With `inclusive`, text that exactly fills the width is shortened too.
#[must_use]
pub fn truncate_left(text: &str, width: usize, inclusive: bool) -> String {
    let len = text.chars().count();
    let too_long = if inclusive { len >= width } else { len > width };
    if !too_long || width < 3 {
        return text.to_string();
    }
    let keep = width - 3;
    let tail: String = text.chars().skip(len - keep).collect();
    format!("...{tail}")
}

/// Render a report as a fixed-width table.
///
/// An empty report renders as a single diagnostic line instead of a table.
#[must_use]
pub fn render_report(report: &ComparisonReport) -> String {
    let layout = TableLayout::for_modality(report.modality);
    if report.is_empty() {
        return layout.empty_message(report);
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", layout.title);
    let _ = writeln!(
        out,
        "Checking directories recursively: {} vs {}",
        report.source_root.display(),
        report.derived_root.display()
    );
    if report.modality != Modality::Video && report.skipped > 0 {
        let _ = writeln!(
            out,
            "Skipped {} hidden or non-{} files",
            report.skipped,
            report.modality.to_string().to_lowercase()
        );
    }
    let _ = writeln!(out, "{}", layout.header());
    let _ = writeln!(out, "{}", "-".repeat(layout.total_width()));

    for row in &report.rows {
        let cells = layout.columns.iter().map(|c| layout.cell(c, row));
        let _ = writeln!(out, "{}", layout.line(cells));
        if layout.annotate_status && !row.is_ok() {
            let _ = writeln!(out, "   -> Status: {}", row.status());
        }
    }

    out
}
