//! Error types for fidelity comparison.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for media-fidelity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while indexing trees or measuring a pair.
///
/// Only [`Error::is_fatal`] errors abort a run; everything else is folded into
/// a per-row status by the session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Failed to open or decode an image file.
    #[error("Image load failed: {path}: {reason}")]
    ImageLoad {
        /// Path to the image that failed to load.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Failed to open or decode an audio file.
    #[error("Audio decode failed: {path}: {reason}")]
    AudioDecode {
        /// Path to the audio file that failed to decode.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Pixel grids of the two images differ.
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// Source dimensions (width, height).
        expected: (usize, usize),
        /// Derived dimensions (width, height).
        actual: (usize, usize),
    },

    /// The two signals share no samples after alignment.
    #[error("No overlapping samples between {path} and its counterpart")]
    EmptyOverlap {
        /// Source file of the pair.
        path: PathBuf,
    },

    /// Sample-rate conversion failed.
    #[error("Resampling failed: {0}")]
    Resample(String),

    /// Failed to calculate a quality metric.
    #[error("Metric calculation failed: {metric}: {reason}")]
    MetricCalculation {
        /// Name of the metric that failed.
        metric: String,
        /// Reason for the failure.
        reason: String,
    },

    /// A required external program could not be started.
    #[error("'{tool}' not found ({program}); make sure it is installed and on PATH")]
    ToolUnavailable {
        /// Logical tool name (ffmpeg, ffprobe).
        tool: String,
        /// Program path that was tried.
        program: PathBuf,
    },

    /// An external program exited unsuccessfully.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        /// Logical tool name.
        tool: String,
        /// Exit status description.
        status: String,
        /// Diagnostic stream of the tool.
        stderr: String,
    },

    /// An external program exceeded its wall-clock budget.
    #[error("{tool} timed out after {} seconds", timeout.as_secs())]
    ToolTimeout {
        /// Logical tool name.
        tool: String,
        /// Timeout that was exceeded.
        timeout: Duration,
    },

    /// An external program's output did not contain the expected values.
    #[error("Unrecognised {tool} output: {reason}")]
    ToolOutput {
        /// Logical tool name.
        tool: String,
        /// What was missing.
        reason: String,
    },

    /// Two files in one tree map to the same correspondence key.
    #[error("Key collision for '{key}': {first} and {second}")]
    KeyCollision {
        /// The shared key.
        key: String,
        /// Relative path indexed first.
        first: PathBuf,
        /// Relative path indexed second.
        second: PathBuf,
    },

    /// The derived-file suffix could not be turned into a pattern.
    #[error("Invalid suffix pattern '{suffix}': {reason}")]
    InvalidPattern {
        /// Configured suffix.
        suffix: String,
        /// Reason for the failure.
        reason: String,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error must abort the whole run rather than a single row.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ToolUnavailable { .. } | Self::KeyCollision { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let missing = Error::ToolUnavailable {
            tool: "ffmpeg".to_string(),
            program: PathBuf::from("ffmpeg"),
        };
        assert!(missing.is_fatal());

        let timeout = Error::ToolTimeout {
            tool: "ffmpeg".to_string(),
            timeout: Duration::from_secs(300),
        };
        assert!(!timeout.is_fatal());
        assert_eq!(timeout.to_string(), "ffmpeg timed out after 300 seconds");

        let mismatch = Error::DimensionMismatch {
            expected: (10, 10),
            actual: (20, 10),
        };
        assert!(!mismatch.is_fatal());
    }
}
