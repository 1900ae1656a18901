//! Still-image fidelity: MSE and PSNR over RGB, SSIM over luminance.

use std::path::Path;

use super::{ImageFidelity, psnr_from_mse, ssim};
use crate::decode::{DecodedImage, decode_image};
use crate::error::{Error, Result};

/// Peak sample value of 8-bit channels.
pub const IMAGE_PEAK: f64 = 255.0;

/// Decode both files and compare them.
///
/// # Errors
///
/// Returns an error if either file fails to decode, the pixel grids differ,
/// or the image is too small for SSIM.
pub fn calculate_image_metrics(source: &Path, derived: &Path) -> Result<ImageFidelity> {
    let reference = decode_image(source)?;
    let test = decode_image(derived)?;
    compare_images(&reference, &test)
}

/// Compare two decoded images.
///
/// # Arguments
///
/// * `reference` - Source image.
/// * `test` - Derived image, same pixel grid as `reference`.
///
/// # Returns
///
/// MSE averaged over every RGB channel value, PSNR with peak 255 and mean
/// SSIM over the luminance planes.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] for differing grids. Images are never
/// resized to fit.
pub fn compare_images(reference: &DecodedImage, test: &DecodedImage) -> Result<ImageFidelity> {
    if reference.width() != test.width() || reference.height() != test.height() {
        return Err(Error::DimensionMismatch {
            expected: (reference.width(), reference.height()),
            actual: (test.width(), test.height()),
        });
    }

    let mut sum = 0.0f64;
    for (r, t) in reference.rgb.pixels().zip(test.rgb.pixels()) {
        for (a, b) in [(r.r, t.r), (r.g, t.g), (r.b, t.b)] {
            let diff = f64::from(a) - f64::from(b);
            sum += diff * diff;
        }
    }
    let channel_values = (reference.width() * reference.height() * 3).max(1);
    let mse = sum / channel_values as f64;
    let psnr = psnr_from_mse(mse, IMAGE_PEAK);

    let ssim = ssim::calculate_ssim(reference.luma.as_ref(), test.luma.as_ref(), IMAGE_PEAK)?;

    Ok(ImageFidelity { mse, psnr, ssim })
}
