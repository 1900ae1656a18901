//! SSIM (structural similarity) over single-channel images.
//!
//! Uses a 7x7 uniform window with sample covariance and averages the local
//! index over every window that lies fully inside the image. Local sums come
//! from summed-area tables so the cost is linear in the pixel count.

use imgref::ImgRef;

use crate::error::{Error, Result};

/// Side length of the square window.
pub const WINDOW: usize = 7;

const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Summed-area table with a zero first row and column.
struct Integral {
    stride: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn build(width: usize, height: usize, value: impl Fn(usize, usize) -> f64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(x, y);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    /// Sum over the window whose top-left corner is (x, y).
    #[inline]
    fn window(&self, x: usize, y: usize) -> f64 {
        let s = self.stride;
        let (x1, y1) = (x + WINDOW, y + WINDOW);
        self.sums[y1 * s + x1] - self.sums[y * s + x1] - self.sums[y1 * s + x] + self.sums[y * s + x]
    }
}

/// Calculate mean SSIM between two luminance images.
///
/// # Arguments
///
/// * `reference` - Reference luminance plane.
/// * `test` - Test luminance plane.
/// * `data_range` - Dynamic range of the samples (255 for 8-bit).
///
/// # Returns
///
/// Mean SSIM in [-1, 1]; exactly 1.0 for identical inputs.
///
/// # Errors
///
/// Returns an error if the planes differ in size or are smaller than the window.
pub fn calculate_ssim(reference: ImgRef<'_, u8>, test: ImgRef<'_, u8>, data_range: f64) -> Result<f64> {
    let (width, height) = (reference.width(), reference.height());
    if width != test.width() || height != test.height() {
        return Err(Error::DimensionMismatch {
            expected: (width, height),
            actual: (test.width(), test.height()),
        });
    }
    if width < WINDOW || height < WINDOW {
        return Err(Error::MetricCalculation {
            metric: "SSIM".to_string(),
            reason: format!("image {width}x{height} is smaller than the {WINDOW}x{WINDOW} window"),
        });
    }

    let x_at = |x: usize, y: usize| f64::from(reference[(x, y)]);
    let y_at = |x: usize, y: usize| f64::from(test[(x, y)]);

    let sum_x = Integral::build(width, height, x_at);
    let sum_y = Integral::build(width, height, y_at);
    let sum_xx = Integral::build(width, height, |x, y| x_at(x, y) * x_at(x, y));
    let sum_yy = Integral::build(width, height, |x, y| y_at(x, y) * y_at(x, y));
    let sum_xy = Integral::build(width, height, |x, y| x_at(x, y) * y_at(x, y));

    let np = (WINDOW * WINDOW) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (K1 * data_range).powi(2);
    let c2 = (K2 * data_range).powi(2);

    let mut total = 0.0;
    let mut count = 0usize;
    for y in 0..=height - WINDOW {
        for x in 0..=width - WINDOW {
            let ux = sum_x.window(x, y) / np;
            let uy = sum_y.window(x, y) / np;
            let uxx = sum_xx.window(x, y) / np;
            let uyy = sum_yy.window(x, y) / np;
            let uxy = sum_xy.window(x, y) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let a1 = 2.0 * ux * uy + c1;
            let a2 = 2.0 * vxy + c2;
            let b1 = ux * ux + uy * uy + c1;
            let b2 = vx + vy + c2;

            total += (a1 * a2) / (b1 * b2);
            count += 1;
        }
    }

    Ok(total / count as f64)
}
