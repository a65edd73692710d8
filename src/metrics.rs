//! Image fidelity metrics: PSNR and SSIM.

use image::{GrayImage, Luma, RgbImage};

use crate::error::{Error, Result};

/// PSNR reported for identical images, where the true value is infinite.
pub const PSNR_IDENTICAL: f64 = 100.0;

/// Peak value of 8-bit intensities.
const PIXEL_MAX: f64 = 255.0;

/// Side length of the SSIM sliding window.
pub const SSIM_WINDOW: u32 = 7;

const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// PSNR and SSIM of one processed image against its original.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FidelityScore {
    /// Peak signal-to-noise ratio in dB.
    pub psnr: f64,
    /// Structural similarity index in `[-1, 1]`.
    pub ssim: f64,
}

/// Compute both metrics for an `(original, processed)` pair.
///
/// # Errors
///
/// See [`psnr`] and [`ssim`].
pub fn score(original: &RgbImage, processed: &RgbImage) -> Result<FidelityScore> {
    Ok(FidelityScore {
        psnr: psnr(original, processed)?,
        ssim: ssim(original, processed)?,
    })
}

fn check_shape(original: &RgbImage, processed: &RgbImage) -> Result<()> {
    if original.dimensions() == processed.dimensions() {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            expected: original.dimensions(),
            actual: processed.dimensions(),
        })
    }
}

/// Mean squared error over all pixels and channels.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the images differ in size.
pub fn mse(original: &RgbImage, processed: &RgbImage) -> Result<f64> {
    check_shape(original, processed)?;
    let a = original.as_raw();
    let b = processed.as_raw();
    if a.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let n = a.len() as f64;
    Ok(sum / n)
}

/// Peak signal-to-noise ratio: `20 * log10(255 / sqrt(MSE))`.
///
/// Returns [`PSNR_IDENTICAL`] when the MSE is exactly zero.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the images differ in size.
pub fn psnr(original: &RgbImage, processed: &RgbImage) -> Result<f64> {
    let mse = mse(original, processed)?;
    if mse == 0.0 {
        return Ok(PSNR_IDENTICAL);
    }
    Ok(20.0 * (PIXEL_MAX / mse.sqrt()).log10())
}

/// Convert to 8-bit luma with `0.299 R + 0.587 G + 0.114 B`, rounded.
#[must_use]
pub fn to_luma(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y);
        let lum = 0.299 * f64::from(px[0]) + 0.587 * f64::from(px[1]) + 0.114 * f64::from(px[2]);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = lum.round().clamp(0.0, 255.0) as u8;
        Luma([value])
    })
}

/// Structural similarity of the luma of two RGB images.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the images differ in size, or
/// [`Error::ImageTooSmall`] if either side is shorter than the window.
pub fn ssim(original: &RgbImage, processed: &RgbImage) -> Result<f64> {
    check_shape(original, processed)?;
    ssim_gray(&to_luma(original), &to_luma(processed))
}

/// Mean structural similarity of two grayscale images.
///
/// Uses a 7x7 uniform window with sample (`N - 1`) variances and the usual
/// constants `C1 = (0.01 * 255)^2`, `C2 = (0.03 * 255)^2`, averaged over
/// every window that fits entirely inside the image.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the images differ in size, or
/// [`Error::ImageTooSmall`] if either side is shorter than the window.
pub fn ssim_gray(a: &GrayImage, b: &GrayImage) -> Result<f64> {
    if a.dimensions() != b.dimensions() {
        return Err(Error::ShapeMismatch {
            expected: a.dimensions(),
            actual: b.dimensions(),
        });
    }
    let (width, height) = a.dimensions();
    if width < SSIM_WINDOW || height < SSIM_WINDOW {
        return Err(Error::ImageTooSmall {
            width,
            height,
            min: SSIM_WINDOW,
        });
    }

    let w = width as usize;
    let h = height as usize;
    let x: Vec<f64> = a.as_raw().iter().map(|&v| f64::from(v)).collect();
    let y: Vec<f64> = b.as_raw().iter().map(|&v| f64::from(v)).collect();
    let xx: Vec<f64> = x.iter().map(|v| v * v).collect();
    let yy: Vec<f64> = y.iter().map(|v| v * v).collect();
    let xy: Vec<f64> = x.iter().zip(&y).map(|(p, q)| p * q).collect();

    let sums = [&x, &y, &xx, &yy, &xy].map(|data| SummedArea::new(data, w, h));

    let win = SSIM_WINDOW as usize;
    #[allow(clippy::cast_precision_loss)]
    let np = (win * win) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (K1 * PIXEL_MAX).powi(2);
    let c2 = (K2 * PIXEL_MAX).powi(2);

    let mut total = 0.0;
    let mut count = 0usize;
    for y0 in 0..=h - win {
        for x0 in 0..=w - win {
            let [mx, my, mxx, myy, mxy] = sums.each_ref().map(|s| s.sum(x0, y0, win) / np);
            let vx = cov_norm * (mxx - mx * mx);
            let vy = cov_norm * (myy - my * my);
            let vxy = cov_norm * (mxy - mx * my);

            let num = (2.0 * mx * my + c1) * (2.0 * vxy + c2);
            let den = (mx * mx + my * my + c1) * (vx + vy + c2);
            total += num / den;
            count += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = total / count as f64;
    Ok(mean)
}

/// Summed-area table for constant-time window sums.
struct SummedArea {
    stride: usize,
    table: Vec<f64>,
}

impl SummedArea {
    fn new(data: &[f64], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut table = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += data[y * width + x];
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row;
            }
        }
        Self { stride, table }
    }

    fn sum(&self, x0: usize, y0: usize, size: usize) -> f64 {
        let (x1, y1) = (x0 + size, y0 + size);
        self.table[y1 * self.stride + x1] - self.table[y0 * self.stride + x1]
            - self.table[y1 * self.stride + x0]
            + self.table[y0 * self.stride + x0]
    }
}
