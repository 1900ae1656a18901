//! Extraction of aggregate quality figures from ffmpeg's diagnostic stream.
//!
//! The psnr and ssim filters print one summary line each at the end of a run:
//!
//! ```text
//! [Parsed_psnr_0 @ 0x...] PSNR y:41.2 u:44.0 v:44.3 average:42.123456 min:38.1 max:inf
//! [Parsed_ssim_1 @ 0x...] SSIM Y:0.981 (17.2) U:0.990 (20.1) V:0.991 (20.4) All:0.985 (18.2)
//! ```

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// The summary-line patterns, compiled together.
struct Patterns {
    psnr_average: Regex,
    ssim_all: Regex,
    ssim_average: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            psnr_average: Regex::new(r"PSNR .* average:(inf|\d+(?:\.\d+)?)")?,
            ssim_all: Regex::new(r"SSIM .* All:(\d+(?:\.\d+)?)")?,
            ssim_average: Regex::new(r"SSIM .* average:(\d+(?:\.\d+)?)")?,
        })
    }
}

static PATTERNS: LazyLock<Result<Patterns, regex::Error>> = LazyLock::new(Patterns::compile);

fn first_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)?.get(1).map(|m| m.as_str())
}

/// Where the SSIM figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsimSource {
    /// The `All:` aggregate over every plane.
    All,
    /// An `average:` figure, used when no aggregate was printed.
    Average,
}

/// Figures read from one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityReading {
    /// Average PSNR in dB; `+inf` for identical streams.
    pub psnr_avg: f64,
    /// Aggregate SSIM.
    pub ssim: f64,
    /// Which SSIM line matched.
    pub ssim_source: SsimSource,
}

/// Why a diagnostic stream could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// A summary-line pattern did not compile.
    #[error("diagnostic pattern failed to compile: {0}")]
    Pattern(String),
    /// No PSNR summary line.
    #[error("no PSNR average in output")]
    MissingPsnr,
    /// No SSIM summary line.
    #[error("no SSIM value in output")]
    MissingSsim,
}

/// Read PSNR and SSIM from `stderr`. The first matching line wins.
pub fn parse_diagnostics(stderr: &str) -> Result<QualityReading, ParseFailure> {
    let patterns = PATTERNS
        .as_ref()
        .map_err(|e| ParseFailure::Pattern(e.to_string()))?;

    let psnr_avg = first_capture(&patterns.psnr_average, stderr)
        .and_then(|value| match value {
            "inf" => Some(f64::INFINITY),
            value => value.parse::<f64>().ok(),
        })
        .ok_or(ParseFailure::MissingPsnr)?;

    let capture = |re: &Regex| first_capture(re, stderr).and_then(|v| v.parse::<f64>().ok());

    let (ssim, ssim_source) = capture(&patterns.ssim_all)
        .map(|v| (v, SsimSource::All))
        .or_else(|| capture(&patterns.ssim_average).map(|v| (v, SsimSource::Average)))
        .ok_or(ParseFailure::MissingSsim)?;

    Ok(QualityReading {
        psnr_avg,
        ssim,
        ssim_source,
    })
}
