//! Atmospheric light estimation.

use std::cmp::Ordering;

use image::RgbImage;

use crate::error::{Error, Result};
use crate::plane::Plane;

/// Default fraction of dark-channel pixels used to estimate atmospheric light.
pub const DEFAULT_TOP_FRACTION: f64 = 0.001;

/// Estimated ambient light color, one value per RGB channel in `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericLight(pub [f64; 3]);

impl AtmosphericLight {
    /// Largest of the three channel values.
    #[must_use]
    pub fn max_component(&self) -> f64 {
        self.0[0].max(self.0[1]).max(self.0[2])
    }
}

/// Number of pixels selected for a given image size: `max(floor(n * fraction), 1)`.
#[must_use]
pub fn candidate_count(total_pixels: usize, top_fraction: f64) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let count = (total_pixels as f64 * top_fraction).floor() as usize;
    count.clamp(1, total_pixels.max(1))
}

/// Estimate atmospheric light from the brightest dark-channel pixels.
///
/// Selects the top `top_fraction` of pixels by dark-channel value (at least
/// one) and averages the corresponding `image` colors channel-wise. Ties are
/// broken by row-major position: among equal dark values the earlier pixel
/// wins, so the result does not depend on sort stability.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the dark channel and image differ in
/// size, or [`Error::InvalidParameter`] if the image is empty.
pub fn estimate_atmospheric_light(
    image: &RgbImage,
    dark: &Plane,
    top_fraction: f64,
) -> Result<AtmosphericLight> {
    if image.dimensions() != dark.dimensions() {
        return Err(Error::ShapeMismatch {
            expected: image.dimensions(),
            actual: dark.dimensions(),
        });
    }
    let values = dark.as_slice();
    if values.is_empty() {
        return Err(Error::invalid("image", "cannot estimate light of an empty image"));
    }

    let count = candidate_count(values.len(), top_fraction);

    // Brightest first, then lowest index
    let rank = |a: &usize, b: &usize| -> Ordering {
        values[*b].total_cmp(&values[*a]).then(a.cmp(b))
    };
    let mut indices: Vec<usize> = (0..values.len()).collect();
    if count < indices.len() {
        indices.select_nth_unstable_by(count - 1, rank);
        indices.truncate(count);
    }

    let width = image.width() as usize;
    let mut sum = [0.0_f64; 3];
    for &idx in &indices {
        #[allow(clippy::cast_possible_truncation)]
        let px = image.get_pixel((idx % width) as u32, (idx / width) as u32);
        for ch in 0..3 {
            sum[ch] += f64::from(px[ch]);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let n = indices.len() as f64;
    let light = AtmosphericLight([sum[0] / n, sum[1] / n, sum[2] / n]);
    tracing::trace!(?light, candidates = count, "estimated atmospheric light");
    Ok(light)
}
