//! Dark Channel Prior dehazing pipeline.

use image::RgbImage;

use crate::atmosphere::{self, AtmosphericLight, DEFAULT_TOP_FRACTION};
use crate::dark_channel;
use crate::error::{Error, Result};
use crate::plane::{Plane, SquareKernel};
use crate::radiance;
use crate::transmission::{self, DEFAULT_OMEGA, DEFAULT_T_MIN};

/// Default side length of the dark channel and dilation windows.
pub const DEFAULT_PATCH_SIZE: u32 = 15;

/// A method that turns an image into a processed image of the same size.
///
/// Implemented by [`DarkChannelPrior`] and the CLAHE baseline so the batch
/// evaluator can score them side by side.
pub trait DehazeMethod: Send + Sync {
    /// Short lowercase identifier used in CSV headers and file names.
    fn name(&self) -> &str;

    /// Process one image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be processed.
    fn apply(&self, image: &RgbImage) -> Result<RgbImage>;
}

/// Tunable parameters of the Dark Channel Prior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DehazeParams {
    /// Side length of the square window for erosion and dilation (odd).
    pub patch_size: u32,
    /// Fraction of haze to remove, in `(0, 1]`.
    pub omega: f64,
    /// Lower bound for transmission, in `(0, 1]`.
    pub t_min: f64,
    /// Fraction of brightest dark-channel pixels used for atmospheric light.
    pub top_fraction: f64,
}

impl Default for DehazeParams {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            omega: DEFAULT_OMEGA,
            t_min: DEFAULT_T_MIN,
            top_fraction: DEFAULT_TOP_FRACTION,
        }
    }
}

impl DehazeParams {
    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        SquareKernel::new(self.patch_size)?;
        transmission::validate_omega(self.omega)?;
        transmission::validate_t_min(self.t_min)?;
        if !(self.top_fraction > 0.0 && self.top_fraction <= 1.0) {
            return Err(Error::invalid(
                "top_fraction",
                format!("must be in (0, 1], got {}", self.top_fraction),
            ));
        }
        Ok(())
    }
}

/// Intermediate and final products of one dehazing run.
#[derive(Debug, Clone)]
pub struct Dehazed {
    /// Dark channel of the input.
    pub dark_channel: Plane,
    /// Estimated atmospheric light.
    pub atmospheric_light: AtmosphericLight,
    /// Clipped and dilated transmission map.
    pub transmission: Plane,
    /// Recovered scene radiance.
    pub recovered: RgbImage,
}

/// Validated Dark Channel Prior dehazer.
///
/// Build once with [`DarkChannelPrior::new`] and reuse for every image; the
/// structuring element is created at construction.
#[derive(Debug, Clone)]
pub struct DarkChannelPrior {
    params: DehazeParams,
    kernel: SquareKernel,
}

impl DarkChannelPrior {
    /// Validate `params` and build the dehazer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if any parameter is out of range.
    pub fn new(params: DehazeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            kernel: SquareKernel::new(params.patch_size)?,
            params,
        })
    }

    /// Parameters in use.
    #[must_use]
    pub fn params(&self) -> &DehazeParams {
        &self.params
    }

    /// Run the full pipeline and return every intermediate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for an empty image.
    pub fn run(&self, image: &RgbImage) -> Result<Dehazed> {
        let dark = dark_channel::dark_channel(image, self.kernel);
        let light = atmosphere::estimate_atmospheric_light(image, &dark, self.params.top_fraction)?;
        let transmission = transmission::estimate_transmission(
            &dark,
            &light,
            self.params.omega,
            self.params.t_min,
            self.kernel,
        )?;
        let recovered = radiance::recover_radiance(image, &transmission, &light)?;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            light = ?light.0,
            min_transmission = ?transmission.min_value(),
            "dark channel prior applied"
        );

        Ok(Dehazed {
            dark_channel: dark,
            atmospheric_light: light,
            transmission,
            recovered,
        })
    }

    /// Dehaze an image, returning only the recovered radiance.
    ///
    /// # Errors
    ///
    /// See [`DarkChannelPrior::run`].
    pub fn dehaze(&self, image: &RgbImage) -> Result<RgbImage> {
        self.run(image).map(|d| d.recovered)
    }
}

impl DehazeMethod for DarkChannelPrior {
    fn name(&self) -> &str {
        "dcp"
    }

    fn apply(&self, image: &RgbImage) -> Result<RgbImage> {
        self.dehaze(image)
    }
}
