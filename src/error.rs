//! Error types for the dcp-dehaze crate.

/// Errors that can occur while dehazing and evaluating images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value was rejected before any image was processed.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Two images or maps that must share dimensions do not.
    #[error(
        "shape mismatch: expected {}x{}, got {}x{}",
        .expected.0, .expected.1, .actual.0, .actual.1
    )]
    ShapeMismatch {
        /// Reference `(width, height)`.
        expected: (u32, u32),
        /// Offending `(width, height)`.
        actual: (u32, u32),
    },

    /// The image is too small for the requested operation.
    #[error("image too small ({width}x{height}), need at least {min}x{min}")]
    ImageTooSmall {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Minimum side length in pixels.
        min: u32,
    },

    /// An image source could not be loaded.
    #[error("failed to load `{id}`: {reason}")]
    MissingInput {
        /// Identifier of the image that could not be loaded.
        id: String,
        /// Human-readable cause.
        reason: String,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image decode or encode.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// An error occurred while writing CSV output.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
