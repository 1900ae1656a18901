//! Fidelity metrics shared by every modality.
//!
//! - **MSE**: mean of squared per-sample differences over the common domain
//!   (lower is better, 0 = identical)
//! - **PSNR**: `10 * log10(peak^2 / MSE)` in dB (higher is better)
//! - **SSIM**: structural similarity over luminance, images only (1 = identical)
//!
//! ## Zero-error convention
//!
//! PSNR is undefined when MSE is zero. Every calculator reports
//! [`PSNR_ZERO_ERROR_CAP`] in that case so that tables stay numeric.
//!
//! | Modality | Peak | Source of PSNR |
//! |----------|------|----------------|
//! | Image | 255 | computed over RGB8 |
//! | Audio | 1.0 | computed over normalized mono samples |
//! | Video | 2^bits - 1 | reported by ffmpeg, MSE derived back |

pub mod audio;
pub mod image;
pub mod ssim;

use serde::{Deserialize, Serialize};

/// PSNR reported for identical signals, in dB.
pub const PSNR_ZERO_ERROR_CAP: f64 = 100.0;

/// Mean squared error over the overlapping prefix of two signals.
///
/// Returns `None` if either signal is empty.
#[must_use]
pub fn mean_squared_error<T>(reference: &[T], test: &[T]) -> Option<f64>
where
    T: Copy + Into<f64>,
{
    let len = reference.len().min(test.len());
    if len == 0 {
        return None;
    }

    let sum: f64 = reference
        .iter()
        .zip(test)
        .map(|(&r, &t)| {
            let diff = r.into() - t.into();
            diff * diff
        })
        .sum();

    Some(sum / len as f64)
}

/// PSNR for a given MSE and peak value, capped at zero error.
#[must_use]
pub fn psnr_from_mse(mse: f64, peak: f64) -> f64 {
    if mse == 0.0 {
        PSNR_ZERO_ERROR_CAP
    } else {
        10.0 * (peak * peak / mse).log10()
    }
}

/// Invert the PSNR formula: `MSE = peak^2 / 10^(PSNR / 10)`.
///
/// A negative PSNR or a non-positive `peak_squared` yields `+inf`.
#[must_use]
pub fn mse_from_psnr(psnr_db: f64, peak_squared: f64) -> f64 {
    if psnr_db < 0.0 || peak_squared <= 0.0 {
        return f64::INFINITY;
    }
    peak_squared / 10f64.powf(psnr_db / 10.0)
}

/// Still-image measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageFidelity {
    /// MSE over all RGB channels.
    pub mse: f64,
    /// PSNR in dB with peak 255.
    pub psnr: f64,
    /// SSIM over luminance, range 0-255.
    pub ssim: f64,
}

/// Audio measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFidelity {
    /// MSE over normalized samples.
    pub mse: f64,
    /// PSNR in dB with peak 1.0.
    pub psnr: f64,
    /// Rate both signals were compared at (the source rate).
    pub sample_rate: u32,
    /// Original rate of the derived track when it had to be resampled.
    pub resampled_from: Option<u32>,
    /// Number of samples compared after truncation.
    pub samples: usize,
}

/// Video measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoFidelity {
    /// MSE derived from the average PSNR.
    pub mse_avg: f64,
    /// Average PSNR in dB as reported by the measuring tool.
    pub psnr_avg: f64,
    /// Aggregate (or averaged) SSIM.
    pub ssim_avg: f64,
    /// Bit depth used for the peak value.
    pub bit_depth: u32,
}

/// Measurement for one matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FidelityRecord {
    /// Still image.
    Image(ImageFidelity),
    /// Audio track.
    Audio(AudioFidelity),
    /// Video stream.
    Video(VideoFidelity),
}

impl FidelityRecord {
    /// MSE regardless of modality.
    #[must_use]
    pub fn mse(&self) -> f64 {
        match self {
            Self::Image(r) => r.mse,
            Self::Audio(r) => r.mse,
            Self::Video(r) => r.mse_avg,
        }
    }

    /// PSNR in dB regardless of modality.
    #[must_use]
    pub fn psnr(&self) -> f64 {
        match self {
            Self::Image(r) => r.psnr,
            Self::Audio(r) => r.psnr,
            Self::Video(r) => r.psnr_avg,
        }
    }

    /// SSIM, when the modality measures it.
    #[must_use]
    pub fn ssim(&self) -> Option<f64> {
        match self {
            Self::Image(r) => Some(r.ssim),
            Self::Audio(_) => None,
            Self::Video(r) => Some(r.ssim_avg),
        }
    }
}
