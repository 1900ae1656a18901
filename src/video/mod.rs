//! Video fidelity through an external ffmpeg toolchain.
//!
//! Each pair costs two subprocesses: an `ffprobe` call to learn the source bit
//! depth (for the PSNR peak) and an `ffmpeg` run with the psnr and ssim filters
//! whose diagnostic stream is parsed for the averages. MSE is not reported by
//! ffmpeg and is derived back from PSNR.
//!
//! Only a missing `ffmpeg` is fatal. Probe failures fall back to 8-bit, and
//! measurement failures fail just the pair.

pub mod parse;
pub mod probe;
pub mod runner;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::metrics::{PSNR_ZERO_ERROR_CAP, VideoFidelity, mse_from_psnr};

/// Substrings of ffmpeg errors that usually mean the two streams are incompatible.
const INCOMPATIBLE_MARKERS: [&str; 2] = ["Invalid argument", "stream 0:1"];

/// Hint logged when a measurement fails on incompatible streams.
pub const INCOMPATIBLE_HINT: &str =
    "Ensure videos have matching resolution, color space, and frame count";

/// Locations and time budgets of the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoToolchain {
    /// Measuring tool.
    pub ffmpeg: PathBuf,
    /// Probing tool.
    pub ffprobe: PathBuf,
    /// Budget for one probe.
    pub probe_timeout: Duration,
    /// Budget for one measurement.
    pub measure_timeout: Duration,
}

impl Default for VideoToolchain {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            probe_timeout: Duration::from_secs(10),
            measure_timeout: Duration::from_secs(300),
        }
    }
}

/// `2^bits - 1`, the largest sample value at a bit depth.
#[must_use]
pub fn peak_value(bit_depth: u32) -> f64 {
    let bits = bit_depth.clamp(1, 32);
    ((1u64 << bits) - 1) as f64
}

/// Measure a derived video against its source.
///
/// Both files are passed as-is; resolution, pixel format and frame count must
/// already agree or ffmpeg will reject the filter graph.
///
/// # Errors
///
/// - [`Error::ToolUnavailable`] if ffmpeg cannot be started (fatal)
/// - [`Error::ToolFailed`] / [`Error::ToolTimeout`] if the measurement fails
/// - [`Error::ToolOutput`] if PSNR or SSIM is absent from the output
pub fn calculate_video_metrics(
    toolchain: &VideoToolchain,
    source: &Path,
    derived: &Path,
) -> Result<VideoFidelity> {
    let bit_depth = probe::probe_bit_depth(toolchain, source);
    let peak = peak_value(bit_depth);
    tracing::info!(bit_depth, max_sq = peak * peak, "Detected Bit Depth");

    let args: [&OsStr; 13] = [
        OsStr::new("-i"),
        source.as_os_str(),
        OsStr::new("-i"),
        derived.as_os_str(),
        OsStr::new("-map"),
        OsStr::new("0:v"),
        OsStr::new("-map"),
        OsStr::new("1:v"),
        OsStr::new("-lavfi"),
        OsStr::new("[0:v][1:v]psnr;[0:v][1:v]ssim"),
        OsStr::new("-f"),
        OsStr::new("null"),
        OsStr::new("-"),
    ];
    let output = runner::run_tool(
        "ffmpeg",
        &toolchain.ffmpeg,
        args,
        toolchain.measure_timeout,
    )
    .inspect_err(log_failure)?;

    let reading = parse::parse_diagnostics(&output.stderr).map_err(|failure| {
        tracing::warn!(path = %derived.display(), "{}", failure);
        Error::ToolOutput {
            tool: "ffmpeg".to_string(),
            reason: failure.to_string(),
        }
    })?;

    Ok(fidelity_from_reading(&reading, bit_depth))
}

/// Turn parsed figures into a record, deriving MSE from PSNR.
///
/// An infinite PSNR (identical streams) is reported as the zero-error cap
/// with an MSE of zero.
#[must_use]
pub fn fidelity_from_reading(reading: &parse::QualityReading, bit_depth: u32) -> VideoFidelity {
    let peak = peak_value(bit_depth);
    let (psnr_avg, mse_avg) = if reading.psnr_avg.is_infinite() {
        (PSNR_ZERO_ERROR_CAP, 0.0)
    } else {
        (reading.psnr_avg, mse_from_psnr(reading.psnr_avg, peak * peak))
    };

    VideoFidelity {
        mse_avg,
        psnr_avg,
        ssim_avg: reading.ssim,
        bit_depth,
    }
}

fn log_failure(error: &Error) {
    if let Error::ToolFailed { stderr, .. } = error {
        tracing::warn!("ffmpeg failed:\n{}", stderr);
        if INCOMPATIBLE_MARKERS.iter().any(|m| stderr.contains(m)) {
            tracing::warn!("{}", INCOMPATIBLE_HINT);
        }
    }
}
