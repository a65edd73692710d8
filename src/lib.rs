//! Single-image haze removal with the Dark Channel Prior, plus PSNR/SSIM
//! evaluation of the result.
//!
//! The pipeline follows He et al.: the dark channel (windowed minimum over the
//! color channels) locates haze, its brightest pixels give the atmospheric
//! light, and `t = 1 - omega * dark / max(A)` gives a transmission map that is
//! clipped to `[t_min, 1]` and dilated. Scene radiance is then recovered as
//! `J = (I - A) / t + A`.
//!
//! # Quick Start
//!
//! ```no_run
//! use dcp_dehaze::{DarkChannelPrior, DehazeParams, metrics};
//!
//! let dcp = DarkChannelPrior::new(DehazeParams::default()).expect("valid parameters");
//! let img = image::open("foggy.jpg").unwrap().to_rgb8();
//! let clear = dcp.dehaze(&img).unwrap();
//! let score = metrics::score(&img, &clear).unwrap();
//! println!("PSNR {:.2} dB, SSIM {:.4}", score.psnr, score.ssim);
//! clear.save("clear.jpg").unwrap();
//! ```
//!
//! # Batch Evaluation
//!
//! [`BatchEvaluator`] runs several [`DehazeMethod`]s (the Dark Channel Prior
//! and a CLAHE baseline) over many images, skipping inputs that cannot be
//! loaded, and aggregates the scores per method.
//!
//! ```no_run
//! use dcp_dehaze::{
//!     BatchEvaluator, BatchOptions, Clahe, ClaheParams, DarkChannelPrior, DehazeMethod,
//!     DehazeParams, FileSource,
//! };
//!
//! let methods: Vec<Box<dyn DehazeMethod>> = vec![
//!     Box::new(DarkChannelPrior::new(DehazeParams::default()).unwrap()),
//!     Box::new(Clahe::new(ClaheParams::default()).unwrap()),
//! ];
//! let evaluator = BatchEvaluator::new(methods, BatchOptions::default()).unwrap();
//! let report = evaluator.evaluate(&FileSource, &["image1.jpg", "image2.jpg"]).unwrap();
//! print!("{}", dcp_dehaze::report::format_summary_table(&report.summaries()));
//! ```

#![deny(missing_docs)]

pub mod atmosphere;
pub mod batch;
pub mod clahe;
pub mod dark_channel;
mod dehaze;
pub mod error;
pub mod io;
pub mod metrics;
pub mod plane;
pub mod radiance;
pub mod report;
pub mod stats;
pub mod transmission;

pub use atmosphere::AtmosphericLight;
pub use batch::{
    BatchEvaluator, BatchOptions, BatchReport, ImageRecord, MethodSummary, SkippedInput,
};
pub use clahe::{Clahe, ClaheParams};
pub use dehaze::{DarkChannelPrior, DehazeMethod, DehazeParams, Dehazed, DEFAULT_PATCH_SIZE};
pub use error::{Error, Result};
pub use io::{FileSource, ImageSource};
pub use metrics::FidelityScore;
pub use plane::{Plane, SquareKernel};
pub use stats::Summary;
