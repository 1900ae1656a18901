//! Sample-rate conversion for mono signals.

use rubato::{FftFixedIn, Resampler};

use crate::error::{Error, Result};

/// Approximate input frames per FFT block.
const TARGET_CHUNK: usize = 1024;

/// Flush rounds tried before giving up on reaching the expected length.
const MAX_FLUSH_ROUNDS: usize = 4;

/// Resample a mono signal from `from_rate` to `to_rate`.
///
/// The block size is a whole, even number of `from_rate / gcd` periods, so
/// the resampler's filter delay is an integer number of output frames and
/// output sample `i` lands exactly on input time `i * from_rate / to_rate`.
/// The result holds `ceil(len * to_rate / from_rate)` samples.
///
/// Equal rates and empty input are returned unchanged.
///
/// # Errors
///
/// Returns [`Error::Resample`] if either rate is zero or the resampler fails.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(Error::Resample(format!(
            "invalid sample rates {from_rate} -> {to_rate}"
        )));
    }
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let expected = (input.len() as u64 * u64::from(to_rate)).div_ceil(u64::from(from_rate)) as usize;
    let chunk = block_size(from_rate, to_rate);

    tracing::debug!(from_rate, to_rate, frames = input.len(), chunk, "resampling");

    let mut resampler = FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, chunk, 1, 1)
        .map_err(|e| Error::Resample(format!("failed to create resampler: {e}")))?;
    let delay = resampler.output_delay();

    let mut output = Vec::with_capacity(delay + expected + resampler.output_frames_max());
    let mut blocks = input.chunks_exact(chunk);
    for block in blocks.by_ref() {
        let produced = resampler
            .process(&[block][..], None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        output.extend(produced.into_iter().next().unwrap_or_default());
    }

    let remainder = blocks.remainder();
    if !remainder.is_empty() {
        let produced = resampler
            .process_partial(Some(&[remainder][..]), None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        output.extend(produced.into_iter().next().unwrap_or_default());
    }

    let mut rounds = 0;
    while output.len() < delay + expected && rounds < MAX_FLUSH_ROUNDS {
        let tail = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        output.extend(tail.into_iter().next().unwrap_or_default());
        rounds += 1;
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}

/// Input frames per block: the smallest even multiple of the reduced input
/// period that reaches [`TARGET_CHUNK`].
///
/// An even multiple keeps the filter centre, half a block, on a whole number
/// of output frames.
fn block_size(from_rate: u32, to_rate: u32) -> usize {
    let period = (from_rate / gcd(from_rate, to_rate)) as usize;
    let step = 2 * period;
    step * TARGET_CHUNK.div_ceil(step)
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{PI, TAU};

    use super::*;
    use crate::metrics::mean_squared_error;

    const FADE_SECS: f64 = 0.01;

    /// Sine with raised-cosine fades, sampled at `rate`.
    fn tone(freq: f64, rate: u32, secs: f64) -> Vec<f32> {
        let len = (secs * f64::from(rate)).round() as usize;
        (0..len)
            .map(|i| {
                let t = i as f64 / f64::from(rate);
                let edge = t.min(secs - t).max(0.0);
                let envelope = if edge < FADE_SECS {
                    0.5 * (1.0 - (PI * edge / FADE_SECS).cos())
                } else {
                    1.0
                };
                (0.5 * envelope * (TAU * freq * t).sin()) as f32
            })
            .collect()
    }

    fn assert_tracks(freq: f64, from_rate: u32, to_rate: u32) {
        let output = resample(&tone(freq, from_rate, 0.5), from_rate, to_rate).unwrap();
        let reference = tone(freq, to_rate, 0.5);
        assert_eq!(output.len(), reference.len());

        let mse = mean_squared_error(&reference, &output).unwrap();
        assert!(
            mse < 1e-6,
            "{freq} Hz {from_rate} -> {to_rate}: mse {mse}"
        );
    }

    #[test]
    fn test_same_rate_is_identity() {
        let input = tone(440.0, 44100, 0.1);
        assert_eq!(resample(&input, 44100, 44100).unwrap(), input);
    }

    #[test]
    fn test_upsample_by_two_is_aligned() {
        assert_tracks(440.0, 22050, 44100);
    }

    #[test]
    fn test_downsample_is_aligned() {
        assert_tracks(1000.0, 48000, 44100);
    }

    #[test]
    fn test_fractional_upsample_is_aligned() {
        assert_tracks(1000.0, 44100, 48000);
    }

    #[test]
    fn test_output_length() {
        let output = resample(&vec![0.0; 1000], 22050, 44100).unwrap();
        assert_eq!(output.len(), 2000);

        let output = resample(&vec![0.0; 1001], 48000, 44100).unwrap();
        assert_eq!(output.len(), 920);
    }

    #[test]
    fn test_block_size_is_even_period_multiple() {
        assert_eq!(block_size(22050, 44100), 1024);
        assert_eq!(block_size(48000, 44100), 1280);
        assert_eq!(block_size(44100, 48000), 1176);
        assert_eq!(block_size(8000, 44100), 1120);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(matches!(resample(&[0.0], 0, 44100), Err(Error::Resample(_))));
    }
}
