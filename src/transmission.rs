//! Transmission map estimation.
//!
//! Transmission is the fraction of scene radiance that reaches the camera
//! without being scattered: `t = 1 - omega * dark / max(A)`. The map is
//! clipped into `[t_min, 1]` and then dilated with the same square window
//! used for the dark channel.

use crate::atmosphere::AtmosphericLight;
use crate::error::{Error, Result};
use crate::plane::{Plane, SquareKernel};

/// Default haze removal strength.
pub const DEFAULT_OMEGA: f64 = 0.95;

/// Default lower bound for transmission.
pub const DEFAULT_T_MIN: f64 = 0.1;

/// Check that `omega` lies in `(0, 1]`.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for values outside the range or NaN.
pub fn validate_omega(omega: f64) -> Result<()> {
    if omega > 0.0 && omega <= 1.0 {
        Ok(())
    } else {
        Err(Error::invalid("omega", format!("must be in (0, 1], got {omega}")))
    }
}

/// Check that `t_min` lies in `(0, 1]`.
///
/// A zero floor would let recovery divide by zero.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for values outside the range or NaN.
pub fn validate_t_min(t_min: f64) -> Result<()> {
    if t_min > 0.0 && t_min <= 1.0 {
        Ok(())
    } else {
        Err(Error::invalid("t_min", format!("must be in (0, 1], got {t_min}")))
    }
}

/// Estimate the transmission map from a dark channel and atmospheric light.
///
/// If the atmospheric light is black there is no haze to remove and the map
/// is `1.0` everywhere.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `omega` or `t_min` are out of range.
pub fn estimate_transmission(
    dark: &Plane,
    light: &AtmosphericLight,
    omega: f64,
    t_min: f64,
    kernel: SquareKernel,
) -> Result<Plane> {
    validate_omega(omega)?;
    validate_t_min(t_min)?;

    let a_max = light.max_component();
    if a_max <= 0.0 {
        return Ok(Plane::filled(dark.width(), dark.height(), 1.0));
    }

    let clipped = dark.map(|d| (1.0 - omega * d / a_max).clamp(t_min, 1.0));
    Ok(kernel.dilate(&clipped))
}
