//! CLAHE baseline (Contrast Limited Adaptive Histogram Equalization).
//!
//! Used as a comparison method for the Dark Channel Prior. The image is
//! converted to CIE Lab stored in 8 bits per channel (`L * 255 / 100`,
//! `a + 128`, `b + 128`), the lightness channel is equalized per tile with a
//! clipped histogram, and tile lookup tables are blended bilinearly so tile
//! borders do not show. The `a` and `b` channels are left untouched.

use image::{Rgb, RgbImage};
use palette::white_point::D65;
use palette::{IntoColor, Lab, LinSrgb, Srgb};

use crate::dehaze::DehazeMethod;
use crate::error::{Error, Result};

const BINS: usize = 256;

/// Parameters for the CLAHE baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaheParams {
    /// Histogram clip limit relative to a flat histogram (`> 0`).
    pub clip_limit: f64,
    /// Number of tiles along the x axis.
    pub tiles_x: u32,
    /// Number of tiles along the y axis.
    pub tiles_y: u32,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 3.0,
            tiles_x: 8,
            tiles_y: 8,
        }
    }
}

impl ClaheParams {
    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a non-positive clip limit or an
    /// empty tile grid.
    pub fn validate(&self) -> Result<()> {
        if !(self.clip_limit > 0.0 && self.clip_limit.is_finite()) {
            return Err(Error::invalid(
                "clip_limit",
                format!("must be > 0, got {}", self.clip_limit),
            ));
        }
        if self.tiles_x == 0 || self.tiles_y == 0 {
            return Err(Error::invalid(
                "tiles",
                format!("grid must be at least 1x1, got {}x{}", self.tiles_x, self.tiles_y),
            ));
        }
        Ok(())
    }
}

/// Validated CLAHE processor.
#[derive(Debug, Clone)]
pub struct Clahe {
    params: ClaheParams,
}

impl Clahe {
    /// Validate `params` and build the processor.
    ///
    /// # Errors
    ///
    /// See [`ClaheParams::validate`].
    pub fn new(params: ClaheParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Equalize the Lab lightness of an RGB image.
    #[must_use]
    pub fn apply_rgb(&self, image: &RgbImage) -> RgbImage {
        let (w, h) = image.dimensions();
        let lab: Vec<[u8; 3]> = image.pixels().map(|px| rgb_to_lab8(px.0)).collect();
        let lightness: Vec<u8> = lab.iter().map(|p| p[0]).collect();

        let equalized = self.equalize(&lightness, w, h);

        let mut out = RgbImage::new(w, h);
        for ((px, lab), &l) in out.pixels_mut().zip(&lab).zip(&equalized) {
            *px = Rgb(lab8_to_rgb([l, lab[1], lab[2]]));
        }
        out
    }

    /// Apply CLAHE to a single 8-bit channel of `width x height` values.
    #[must_use]
    pub fn equalize(&self, channel: &[u8], width: u32, height: u32) -> Vec<u8> {
        let w = width as usize;
        let h = height as usize;
        if w == 0 || h == 0 {
            return channel.to_vec();
        }
        let gx = (self.params.tiles_x as usize).min(w);
        let gy = (self.params.tiles_y as usize).min(h);

        let mut luts = Vec::with_capacity(gx * gy);
        for ty in 0..gy {
            for tx in 0..gx {
                let (x0, x1) = (tx * w / gx, (tx + 1) * w / gx);
                let (y0, y1) = (ty * h / gy, (ty + 1) * h / gy);
                luts.push(tile_lut(channel, w, (x0, x1), (y0, y1), self.params.clip_limit));
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let (tile_w, tile_h) = (w as f64 / gx as f64, h as f64 / gy as f64);
        let mut out = Vec::with_capacity(w * h);
        for y in 0..h {
            #[allow(clippy::cast_precision_loss)]
            let (ty1, ty2, ya) = neighbors((y as f64 + 0.5) / tile_h - 0.5, gy);
            for x in 0..w {
                #[allow(clippy::cast_precision_loss)]
                let (tx1, tx2, xa) = neighbors((x as f64 + 0.5) / tile_w - 0.5, gx);
                let v = channel[y * w + x] as usize;
                let lut = |ty: usize, tx: usize| f64::from(luts[ty * gx + tx][v]);

                let top = lut(ty1, tx1) * (1.0 - xa) + lut(ty1, tx2) * xa;
                let bottom = lut(ty2, tx1) * (1.0 - xa) + lut(ty2, tx2) * xa;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                out.push((top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8);
            }
        }
        out
    }
}

impl DehazeMethod for Clahe {
    fn name(&self) -> &str {
        "clahe"
    }

    fn apply(&self, image: &RgbImage) -> Result<RgbImage> {
        Ok(self.apply_rgb(image))
    }
}

/// Neighboring tile indices and blend weight for a fractional tile coordinate.
fn neighbors(pos: f64, tiles: usize) -> (usize, usize, f64) {
    let floor = pos.floor();
    let weight = pos - floor;
    #[allow(clippy::cast_possible_truncation)]
    let lo = floor as isize;
    let last = tiles - 1;
    #[allow(clippy::cast_sign_loss)]
    let first = if lo < 0 { 0 } else { (lo as usize).min(last) };
    #[allow(clippy::cast_sign_loss)]
    let second = if lo + 1 < 0 { 0 } else { ((lo + 1) as usize).min(last) };
    (first, second, weight)
}

/// Clipped-histogram equalization lookup table for one tile.
fn tile_lut(
    channel: &[u8],
    width: usize,
    (x0, x1): (usize, usize),
    (y0, y1): (usize, usize),
    clip_limit: f64,
) -> [u8; BINS] {
    let area = (x1 - x0) * (y1 - y0);
    let mut hist = [0usize; BINS];
    for y in y0..y1 {
        for &v in &channel[y * width + x0..y * width + x1] {
            hist[v as usize] += 1;
        }
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let limit = ((clip_limit * area as f64 / BINS as f64).floor() as usize).max(1);
    let mut excess = 0usize;
    for bin in &mut hist {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    // Spread the clipped mass evenly, leftovers at regular steps
    let batch = excess / BINS;
    let mut residual = excess % BINS;
    for bin in &mut hist {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let scale = 255.0 / area as f64;
    let mut lut = [0u8; BINS];
    let mut cumulative = 0usize;
    for (entry, &count) in lut.iter_mut().zip(&hist) {
        cumulative += count;
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        {
            *entry = (cumulative as f64 * scale).round().clamp(0.0, 255.0) as u8;
        }
    }
    lut
}

/// Convert to 8-bit Lab: `[L * 255 / 100, a + 128, b + 128]`, rounded.
fn rgb_to_lab8([r, g, b]: [u8; 3]) -> [u8; 3] {
    let srgb = Srgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
    );
    let lin: LinSrgb<f32> = srgb.into_linear();
    let lab: Lab<D65, f32> = lin.into_color();
    [lab.l * 255.0 / 100.0, lab.a + 128.0, lab.b + 128.0].map(to_u8)
}

fn lab8_to_rgb([l, a, b]: [u8; 3]) -> [u8; 3] {
    let lab = Lab::<D65, f32>::new(
        f32::from(l) * 100.0 / 255.0,
        f32::from(a) - 128.0,
        f32::from(b) - 128.0,
    );
    let lin: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(lin);
    [srgb.red, srgb.green, srgb.blue].map(|c| to_u8(c.clamp(0.0, 1.0) * 255.0))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clahe() -> Clahe {
        Clahe::new(ClaheParams::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_params() {
        let bad_clip = ClaheParams {
            clip_limit: 0.0,
            ..ClaheParams::default()
        };
        let bad_grid = ClaheParams {
            tiles_x: 0,
            ..ClaheParams::default()
        };
        assert!(Clahe::new(bad_clip).is_err());
        assert!(Clahe::new(bad_grid).is_err());
    }

    #[test]
    fn lab8_encoding_matches_reference_colors() {
        assert_eq!(rgb_to_lab8([0, 0, 0]), [0, 128, 128]);
        assert_eq!(rgb_to_lab8([255, 255, 255]), [255, 128, 128]);
        // Mid gray is L = 53.59, a = b = 0
        assert_eq!(rgb_to_lab8([128, 128, 128]), [137, 128, 128]);
        // Pure red has positive a and b
        let red = rgb_to_lab8([255, 0, 0]);
        assert!(red[1] > 200 && red[2] > 180, "{red:?}");
    }

    #[test]
    fn lab8_conversion_round_trips_within_quantization() {
        for r in (0..=255u8).step_by(51) {
            for g in (0..=255u8).step_by(51) {
                for b in (0..=255u8).step_by(51) {
                    let back = lab8_to_rgb(rgb_to_lab8([r, g, b]));
                    for (orig, got) in [r, g, b].iter().zip(back) {
                        let diff = (i32::from(*orig) - i32::from(got)).abs();
                        assert!(diff <= 4, "{:?} -> {back:?}", [r, g, b]);
                    }
                }
            }
        }
        for v in [0u8, 255] {
            assert_eq!(lab8_to_rgb(rgb_to_lab8([v, v, v])), [v, v, v]);
        }
    }

    #[test]
    fn uniform_channel_stays_uniform() {
        let channel = vec![90u8; 64 * 48];
        let out = clahe().equalize(&channel, 64, 48);
        assert_eq!(out.len(), channel.len());
        assert!(out.iter().all(|&v| v == out[0]));
    }

    #[test]
    fn low_contrast_ramp_is_stretched() {
        // Values 100..=131 across the width
        #[allow(clippy::cast_possible_truncation)]
        let channel: Vec<u8> = (0..128 * 64).map(|i| 100 + ((i % 128) / 4) as u8).collect();
        let out = clahe().equalize(&channel, 128, 64);

        let in_range = 131 - 100;
        let out_range =
            i32::from(*out.iter().max().unwrap()) - i32::from(*out.iter().min().unwrap());
        assert!(out_range > in_range, "range {out_range} not stretched");
    }

    #[test]
    fn gray_input_stays_gray() {
        #[allow(clippy::cast_possible_truncation)]
        let img = RgbImage::from_fn(40, 40, |x, y| {
            let v = (x * 3 + y * 2) as u8;
            Rgb([v, v, v])
        });
        let out = clahe().apply(&img).unwrap();
        assert_eq!(out.dimensions(), (40, 40));
        // Neutral colors have a = b = 0, so only lightness changes
        for px in out.pixels() {
            let max = px.0.iter().max().unwrap();
            let min = px.0.iter().min().unwrap();
            assert!(max - min <= 1, "{px:?}");
        }
        let lightness =
            |img: &RgbImage| -> Vec<u8> { img.pixels().map(|p| rgb_to_lab8(p.0)[0]).collect() };
        assert_ne!(lightness(&out), lightness(&img));
    }

    #[test]
    fn handles_images_smaller_than_grid() {
        let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let out = clahe().apply(&img).unwrap();
        assert_eq!(out.dimensions(), (3, 2));
    }
}
