//! Single-channel floating point grids and square morphological filters.
//!
//! The dark channel and the transmission map are both stored as a [`Plane`]:
//! a flat row-major `Vec<f64>` plus its dimensions. Erosion and dilation use a
//! square structuring element ([`SquareKernel`]) and replicate edge pixels at
//! the image border. Since replicated pixels already lie inside the window,
//! this is the same as taking the extremum over the window clipped to the
//! image, which lets both filters run as a row pass followed by a column pass.

use crate::error::{Error, Result};

/// A single-channel grid of `f64` values in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl Plane {
    /// Create a plane filled with `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: f64) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Build a plane by evaluating `f(x, y)` at every position.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f64) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `data.len() != width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<f64>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::invalid(
                "data",
                format!("expected {expected} values, got {}", data.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the position is out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f64 {
        assert!(x < self.width && y < self.height, "({x},{y}) out of bounds");
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Flat row-major view of the values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Apply `f` to every value, producing a new plane.
    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Smallest value, or `None` for an empty plane.
    #[must_use]
    pub fn min_value(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::min)
    }

    /// Largest value, or `None` for an empty plane.
    #[must_use]
    pub fn max_value(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }

    /// Arithmetic mean, or `None` for an empty plane.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.data.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.data.len() as f64;
        Some(self.data.iter().sum::<f64>() / n)
    }
}

/// Square structuring element of odd side length.
///
/// Validated once and shared by every image in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareKernel {
    size: u32,
}

impl SquareKernel {
    /// Create a `size x size` structuring element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `size` is zero or even.
    pub fn new(size: u32) -> Result<Self> {
        if size == 0 || size % 2 == 0 {
            return Err(Error::invalid(
                "patch_size",
                format!("must be a positive odd integer, got {size}"),
            ));
        }
        Ok(Self { size })
    }

    /// Side length in pixels.
    #[must_use]
    pub fn size(self) -> u32 {
        self.size
    }

    /// Distance from the center to the window edge.
    #[must_use]
    pub fn radius(self) -> u32 {
        self.size / 2
    }

    /// Morphological erosion: each value becomes the minimum of its window.
    #[must_use]
    pub fn erode(self, plane: &Plane) -> Plane {
        self.filter(plane, f64::min)
    }

    /// Morphological dilation: each value becomes the maximum of its window.
    #[must_use]
    pub fn dilate(self, plane: &Plane) -> Plane {
        self.filter(plane, f64::max)
    }

    fn filter(self, plane: &Plane, pick: fn(f64, f64) -> f64) -> Plane {
        let w = plane.width as usize;
        let h = plane.height as usize;
        let r = self.radius() as usize;
        if w == 0 || h == 0 || r == 0 {
            return plane.clone();
        }

        // Row pass
        let mut rows = vec![0.0_f64; w * h];
        for y in 0..h {
            let line = &plane.data[y * w..(y + 1) * w];
            for x in 0..w {
                let x0 = x.saturating_sub(r);
                let x1 = (x + r).min(w - 1);
                rows[y * w + x] = line[x0..=x1].iter().copied().fold(line[x], pick);
            }
        }

        // Column pass
        let mut out = vec![0.0_f64; w * h];
        for x in 0..w {
            for y in 0..h {
                let y0 = y.saturating_sub(r);
                let y1 = (y + r).min(h - 1);
                out[y * w + x] = (y0..=y1).map(|yy| rows[yy * w + x]).fold(rows[y * w + x], pick);
            }
        }

        Plane {
            width: plane.width,
            height: plane.height,
            data: out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_rejects_even_and_zero_sizes() {
        assert!(SquareKernel::new(0).is_err());
        assert!(SquareKernel::new(4).is_err());
        assert!(SquareKernel::new(16).is_err());
        assert_eq!(SquareKernel::new(15).unwrap().radius(), 7);
        assert_eq!(SquareKernel::new(1).unwrap().radius(), 0);
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Plane::from_vec(3, 2, vec![0.0; 6]).is_ok());
        assert!(Plane::from_vec(3, 2, vec![0.0; 5]).is_err());
    }

    #[test]
    fn erode_spreads_single_dark_pixel_over_window() {
        let plane = Plane::from_fn(9, 9, |x, y| if x == 4 && y == 4 { 10.0 } else { 200.0 });
        let eroded = SquareKernel::new(3).unwrap().erode(&plane);

        for y in 0..9 {
            for x in 0..9 {
                let inside = (3..=5).contains(&x) && (3..=5).contains(&y);
                let expected = if inside { 10.0 } else { 200.0 };
                assert!(
                    (eroded.get(x, y) - expected).abs() < 1e-12,
                    "({x},{y}) = {}",
                    eroded.get(x, y)
                );
            }
        }
    }

    #[test]
    fn dilate_spreads_single_bright_pixel_over_window() {
        let plane = Plane::from_fn(7, 7, |x, y| if x == 0 && y == 0 { 1.0 } else { 0.1 });
        let dilated = SquareKernel::new(5).unwrap().dilate(&plane);

        // Window clipped at the corner: radius 2 reaches (2, 2)
        assert!((dilated.get(2, 2) - 1.0).abs() < 1e-12);
        assert!((dilated.get(3, 0) - 0.1).abs() < 1e-12);
        assert!((dilated.get(0, 3) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn erode_matches_brute_force_window_minimum() {
        let plane = Plane::from_fn(13, 11, |x, y| f64::from((x * 37 + y * 91) % 23));
        let kernel = SquareKernel::new(5).unwrap();
        let eroded = kernel.erode(&plane);

        for y in 0..11i64 {
            for x in 0..13i64 {
                let mut expected = f64::INFINITY;
                for yy in (y - 2).max(0)..=(y + 2).min(10) {
                    for xx in (x - 2).max(0)..=(x + 2).min(12) {
                        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                        let v = plane.get(xx as u32, yy as u32);
                        expected = expected.min(v);
                    }
                }
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                let got = eroded.get(x as u32, y as u32);
                assert!((got - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn filters_leave_uniform_plane_unchanged() {
        let plane = Plane::filled(20, 10, 42.0);
        let kernel = SquareKernel::new(15).unwrap();
        assert_eq!(kernel.erode(&plane), plane);
        assert_eq!(kernel.dilate(&plane), plane);
    }

    #[test]
    fn plane_statistics() {
        let plane = Plane::from_vec(2, 2, vec![1.0, 2.0, 3.0, 6.0]).unwrap();
        assert_eq!(plane.min_value(), Some(1.0));
        assert_eq!(plane.max_value(), Some(6.0));
        assert_eq!(plane.mean(), Some(3.0));
        assert_eq!(Plane::filled(0, 0, 1.0).mean(), None);
    }
}
