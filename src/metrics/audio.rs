//! Audio fidelity over mono waveforms.
//!
//! The derived track is resampled to the source rate when the two differ,
//! then both are truncated to the shorter length before MSE and PSNR are
//! taken with a peak of 1.0.

use std::path::Path;

use super::{AudioFidelity, mean_squared_error, psnr_from_mse};
use crate::decode::{DecodedAudio, decode_audio};
use crate::error::{Error, Result};
use crate::resample::resample;

/// Peak amplitude of normalized samples.
pub const AUDIO_PEAK: f64 = 1.0;

/// Decode both files and compare them.
///
/// # Errors
///
/// Returns an error if either file fails to decode, resampling fails, or the
/// signals have no samples in common.
pub fn calculate_audio_metrics(source: &Path, derived: &Path) -> Result<AudioFidelity> {
    let reference = decode_audio(source)?;
    let test = decode_audio(derived)?;
    compare_signals(&reference, &test)
}

/// Compare two decoded signals at the reference's sample rate.
///
/// # Errors
///
/// Returns [`Error::EmptyOverlap`] if either signal is empty after alignment.
pub fn compare_signals(reference: &DecodedAudio, test: &DecodedAudio) -> Result<AudioFidelity> {
    let resampled;
    let (test_samples, resampled_from) = if test.sample_rate == reference.sample_rate {
        (test.samples.as_slice(), None)
    } else {
        tracing::debug!(
            path = %test.path.display(),
            from = test.sample_rate,
            to = reference.sample_rate,
            "resampling derived track"
        );
        resampled = resample(&test.samples, test.sample_rate, reference.sample_rate)?;
        (resampled.as_slice(), Some(test.sample_rate))
    };

    let overlap = reference.samples.len().min(test_samples.len());
    let mse = mean_squared_error(&reference.samples[..overlap], &test_samples[..overlap])
        .ok_or_else(|| Error::EmptyOverlap {
            path: reference.path.clone(),
        })?;

    Ok(AudioFidelity {
        mse,
        psnr: psnr_from_mse(mse, AUDIO_PEAK),
        sample_rate: reference.sample_rate,
        resampled_from,
        samples: overlap,
    })
}
