//! Dark channel extraction.
//!
//! The dark channel of an image is the per-pixel minimum over the three color
//! channels, eroded by a square window. In haze-free regions at least one
//! channel is usually close to zero, so bright values indicate haze.

use image::RgbImage;

use crate::plane::{Plane, SquareKernel};

/// Per-pixel minimum across the R, G and B channels, before any filtering.
#[must_use]
pub fn channel_minimum(image: &RgbImage) -> Plane {
    Plane::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y);
        f64::from(px[0].min(px[1]).min(px[2]))
    })
}

/// Compute the dark channel of `image` using the given structuring element.
///
/// Values stay within `[0, 255]` and the output has the image's dimensions.
#[must_use]
pub fn dark_channel(image: &RgbImage, kernel: SquareKernel) -> Plane {
    kernel.erode(&channel_minimum(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn uniform_black_and_white_images_keep_their_intensity() {
        let kernel = SquareKernel::new(15).unwrap();
        for value in [0u8, 255] {
            let img = RgbImage::from_pixel(40, 30, Rgb([value, value, value]));
            let dark = dark_channel(&img, kernel);
            assert_eq!(dark.dimensions(), (40, 30));
            for &v in dark.as_slice() {
                assert!((v - f64::from(value)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn channel_minimum_picks_smallest_component() {
        let img = RgbImage::from_pixel(2, 2, Rgb([120, 30, 200]));
        let min = channel_minimum(&img);
        assert!(min.as_slice().iter().all(|&v| (v - 30.0).abs() < 1e-12));
    }

    #[test]
    fn dark_pixel_darkens_its_neighborhood_only() {
        let mut img = RgbImage::from_pixel(31, 31, Rgb([220, 210, 230]));
        img.put_pixel(15, 15, Rgb([5, 210, 230]));
        let dark = dark_channel(&img, SquareKernel::new(15).unwrap());

        assert!((dark.get(8, 8) - 5.0).abs() < 1e-12);
        assert!((dark.get(22, 22) - 5.0).abs() < 1e-12);
        assert!((dark.get(7, 15) - 210.0).abs() < 1e-12);
        assert!((dark.get(15, 23) - 210.0).abs() < 1e-12);
    }
}
