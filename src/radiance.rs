//! Scene radiance recovery.
//!
//! Inverts the haze model `I = J * t + A * (1 - t)`:
//! `J = (I - A) / t + A`, with `t` broadcast across the color channels.

use image::{Rgb, RgbImage};

use crate::atmosphere::AtmosphericLight;
use crate::error::{Error, Result};
use crate::plane::Plane;

/// Recover the haze-free image from the hazy input.
///
/// Results are clamped to `[0, 255]` and truncated to integers.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the transmission map and image differ
/// in size, or [`Error::InvalidParameter`] if any transmission value is not
/// strictly positive.
pub fn recover_radiance(
    image: &RgbImage,
    transmission: &Plane,
    light: &AtmosphericLight,
) -> Result<RgbImage> {
    if image.dimensions() != transmission.dimensions() {
        return Err(Error::ShapeMismatch {
            expected: image.dimensions(),
            actual: transmission.dimensions(),
        });
    }
    if let Some(t) = transmission.as_slice().iter().find(|&&t| t.is_nan() || t <= 0.0) {
        return Err(Error::invalid(
            "transmission",
            format!("values must be > 0, found {t}"),
        ));
    }

    let a = light.0;
    Ok(RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y);
        let t = transmission.get(x, y);
        let mut out = [0u8; 3];
        for ch in 0..3 {
            let recovered = (f64::from(px[ch]) - a[ch]) / t + a[ch];
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                out[ch] = recovered.clamp(0.0, 255.0) as u8;
            }
        }
        Rgb(out)
    }))
}
