//! Batch evaluation of dehazing methods over many images.
//!
//! Every image is loaded, processed by each configured method and scored
//! against its original. Images that fail to load are skipped and reported;
//! the batch always completes with whatever could be scored.

use std::path::PathBuf;

use image::RgbImage;

use crate::dehaze::DehazeMethod;
use crate::error::{Error, Result};
use crate::io::{self, ImageSource};
use crate::metrics::{self, FidelityScore};
use crate::stats::Summary;

/// Options controlling batch side effects.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory for processed images; nothing is saved when `None`.
    pub save_dir: Option<PathBuf>,
    /// Extension (and so format) of saved images.
    pub save_extension: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            save_dir: None,
            save_extension: "jpg".to_string(),
        }
    }
}

/// Scores of one successfully processed image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Zero-based position in the input sequence.
    pub index: usize,
    /// Identifier the image was loaded from.
    pub id: String,
    /// One score per method, in the evaluator's method order.
    pub scores: Vec<FidelityScore>,
}

/// An input that was not scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInput {
    /// Zero-based position in the input sequence.
    pub index: usize,
    /// Identifier of the skipped image.
    pub id: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Aggregate statistics for one method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSummary {
    /// Method name.
    pub method: String,
    /// PSNR statistics, `None` if no image was scored.
    pub psnr: Option<Summary>,
    /// SSIM statistics, `None` if no image was scored.
    pub ssim: Option<Summary>,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Method names, in column order.
    pub methods: Vec<String>,
    /// Scored images in input order.
    pub records: Vec<ImageRecord>,
    /// Skipped images in input order.
    pub skipped: Vec<SkippedInput>,
    /// Number of processed images that could not be saved.
    pub failed_saves: usize,
}

impl BatchReport {
    /// Per-method statistics over every scored image.
    #[must_use]
    pub fn summaries(&self) -> Vec<MethodSummary> {
        self.methods
            .iter()
            .enumerate()
            .map(|(m, method)| {
                let psnr: Vec<f64> = self.records.iter().map(|r| r.scores[m].psnr).collect();
                let ssim: Vec<f64> = self.records.iter().map(|r| r.scores[m].ssim).collect();
                MethodSummary {
                    method: method.clone(),
                    psnr: Summary::of(&psnr),
                    ssim: Summary::of(&ssim),
                }
            })
            .collect()
    }

    /// Number of inputs the batch was given.
    #[must_use]
    pub fn total(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}

enum Outcome {
    Scored(ImageRecord, usize),
    Skipped(SkippedInput),
}

/// Runs a set of methods over a sequence of images.
pub struct BatchEvaluator {
    methods: Vec<Box<dyn DehazeMethod>>,
    options: BatchOptions,
}

impl BatchEvaluator {
    /// Create an evaluator for `methods`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if no methods are given or two
    /// methods share a name.
    pub fn new(methods: Vec<Box<dyn DehazeMethod>>, options: BatchOptions) -> Result<Self> {
        if methods.is_empty() {
            return Err(Error::invalid("methods", "at least one method is required"));
        }
        for (i, m) in methods.iter().enumerate() {
            if methods[..i].iter().any(|other| other.name() == m.name()) {
                return Err(Error::invalid(
                    "methods",
                    format!("method `{}` listed twice", m.name()),
                ));
            }
        }
        Ok(Self { methods, options })
    }

    /// Names of the configured methods, in order.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        self.methods.iter().map(|m| m.name().to_string()).collect()
    }

    /// Evaluate every method on every image named in `ids`.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon);
    /// records keep the input order either way.
    ///
    /// # Errors
    ///
    /// Load failures and images too small to score are skipped, not returned.
    /// Any other failure, such as a method producing an image of a different
    /// size, aborts the batch.
    pub fn evaluate<S, I>(&self, source: &S, ids: &[I]) -> Result<BatchReport>
    where
        S: ImageSource + ?Sized,
        I: AsRef<str> + Sync,
    {
        if let Some(dir) = &self.options.save_dir {
            std::fs::create_dir_all(dir)?;
        }

        #[cfg(feature = "cli")]
        let outcomes: Vec<Result<Outcome>> = {
            use rayon::prelude::*;
            ids.par_iter()
                .enumerate()
                .map(|(index, id)| self.evaluate_one(source, index, id.as_ref()))
                .collect()
        };

        #[cfg(not(feature = "cli"))]
        let outcomes: Vec<Result<Outcome>> = ids
            .iter()
            .enumerate()
            .map(|(index, id)| self.evaluate_one(source, index, id.as_ref()))
            .collect();

        let mut report = BatchReport {
            methods: self.method_names(),
            ..BatchReport::default()
        };
        for outcome in outcomes {
            match outcome? {
                Outcome::Scored(record, failed_saves) => {
                    report.failed_saves += failed_saves;
                    report.records.push(record);
                }
                Outcome::Skipped(skipped) => report.skipped.push(skipped),
            }
        }

        tracing::info!(
            scored = report.records.len(),
            skipped = report.skipped.len(),
            failed_saves = report.failed_saves,
            "batch complete"
        );
        Ok(report)
    }

    fn evaluate_one<S>(&self, source: &S, index: usize, id: &str) -> Result<Outcome>
    where
        S: ImageSource + ?Sized,
    {
        let skip = |reason: String| -> Result<Outcome> {
            tracing::warn!(id, %reason, "skipping image");
            Ok(Outcome::Skipped(SkippedInput {
                index,
                id: id.to_string(),
                reason,
            }))
        };

        let original = match source.load(id) {
            Ok(img) => img,
            Err(e) => return skip(e.to_string()),
        };

        let mut scores = Vec::with_capacity(self.methods.len());
        let mut failed_saves = 0;
        for method in &self.methods {
            let processed = method.apply(&original)?;
            let score = match metrics::score(&original, &processed) {
                Ok(score) => score,
                Err(e @ Error::ImageTooSmall { .. }) => return skip(e.to_string()),
                Err(e) => return Err(e),
            };
            tracing::debug!(
                id,
                method = method.name(),
                psnr = score.psnr,
                ssim = score.ssim,
                "scored"
            );
            if !self.save(method.name(), index, &processed) {
                failed_saves += 1;
            }
            scores.push(score);
        }

        Ok(Outcome::Scored(
            ImageRecord {
                index,
                id: id.to_string(),
                scores,
            },
            failed_saves,
        ))
    }

    /// Save a processed image if a directory is configured; `false` on failure.
    fn save(&self, method: &str, index: usize, image: &RgbImage) -> bool {
        let Some(dir) = &self.options.save_dir else {
            return true;
        };
        let path = dir.join(io::processed_file_name(
            method,
            index + 1,
            &self.options.save_extension,
        ));
        match io::save_image(image, &path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to save processed image"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use image::Rgb;

    use super::*;
    use crate::clahe::{Clahe, ClaheParams};
    use crate::dehaze::{DarkChannelPrior, DehazeParams};

    struct MemorySource(HashMap<String, RgbImage>);

    impl ImageSource for MemorySource {
        fn load(&self, id: &str) -> Result<RgbImage> {
            self.0.get(id).cloned().ok_or_else(|| Error::MissingInput {
                id: id.to_string(),
                reason: "not in memory".to_string(),
            })
        }
    }

    struct Shrink;

    impl DehazeMethod for Shrink {
        fn name(&self) -> &str {
            "shrink"
        }

        fn apply(&self, image: &RgbImage) -> Result<RgbImage> {
            Ok(RgbImage::new(image.width() - 1, image.height()))
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn hazy(seed: u32) -> RgbImage {
        RgbImage::from_fn(48, 32, |x, y| {
            Rgb([
                (120 + (x * seed) % 100) as u8,
                (130 + (y * 3) % 90) as u8,
                (150 + ((x + y) * seed) % 80) as u8,
            ])
        })
    }

    fn methods() -> Vec<Box<dyn DehazeMethod>> {
        vec![
            Box::new(DarkChannelPrior::new(DehazeParams::default()).unwrap()),
            Box::new(Clahe::new(ClaheParams::default()).unwrap()),
        ]
    }

    #[test]
    fn skipped_inputs_are_counted_and_order_is_kept() {
        let source = MemorySource(
            [("a", hazy(3)), ("c", hazy(5)), ("e", hazy(7))]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        );
        let ids = ["a", "b", "c", "d", "e"];
        let evaluator = BatchEvaluator::new(methods(), BatchOptions::default()).unwrap();

        let report = evaluator.evaluate(&source, &ids).unwrap();

        assert_eq!(report.total(), 5);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.skipped.len(), 2);
        let scored: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(scored, ["a", "c", "e"]);
        let skipped: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, [1, 3]);
        assert_eq!(report.methods, ["dcp", "clahe"]);
        assert!(report.records.iter().all(|r| r.scores.len() == 2));
    }

    #[test]
    fn summaries_cover_every_method() {
        let source = MemorySource(
            (0..4)
                .map(|i| (format!("img{i}"), hazy(i + 2)))
                .collect(),
        );
        let ids: Vec<String> = (0..4).map(|i| format!("img{i}")).collect();
        let evaluator = BatchEvaluator::new(methods(), BatchOptions::default()).unwrap();

        let report = evaluator.evaluate(&source, &ids).unwrap();
        let summaries = report.summaries();

        assert_eq!(summaries.len(), 2);
        for summary in &summaries {
            let psnr = summary.psnr.unwrap();
            let ssim = summary.ssim.unwrap();
            assert_eq!(psnr.count, 4);
            assert!(psnr.min <= psnr.median && psnr.median <= psnr.max);
            assert!(ssim.max <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn all_inputs_missing_yields_empty_records_not_error() {
        let source = MemorySource(HashMap::new());
        let evaluator = BatchEvaluator::new(methods(), BatchOptions::default()).unwrap();
        let report = evaluator.evaluate(&source, &["x", "y"]).unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(report.summaries().iter().all(|s| s.psnr.is_none()));
    }

    #[test]
    fn tiny_images_are_skipped() {
        let source = MemorySource(
            [("tiny".to_string(), RgbImage::new(4, 4))].into_iter().collect(),
        );
        let evaluator = BatchEvaluator::new(methods(), BatchOptions::default()).unwrap();
        let report = evaluator.evaluate(&source, &["tiny"]).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("too small"));
    }

    #[test]
    fn method_returning_wrong_shape_aborts() {
        let source = MemorySource([("a".to_string(), hazy(3))].into_iter().collect());
        let evaluator =
            BatchEvaluator::new(vec![Box::new(Shrink)], BatchOptions::default()).unwrap();
        assert!(matches!(
            evaluator.evaluate(&source, &["a"]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_empty_or_duplicate_methods() {
        assert!(BatchEvaluator::new(Vec::new(), BatchOptions::default()).is_err());
        let dup: Vec<Box<dyn DehazeMethod>> = vec![Box::new(Shrink), Box::new(Shrink)];
        assert!(BatchEvaluator::new(dup, BatchOptions::default()).is_err());
    }

    #[test]
    fn saves_processed_images_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource(
            [("a".to_string(), hazy(3)), ("b".to_string(), hazy(4))].into_iter().collect(),
        );
        let options = BatchOptions {
            save_dir: Some(dir.path().join("out")),
            save_extension: "png".to_string(),
        };
        let evaluator = BatchEvaluator::new(methods(), options).unwrap();

        let report = evaluator.evaluate(&source, &["a", "missing", "b"]).unwrap();

        assert_eq!(report.failed_saves, 0);
        for name in [
            "dcp_defogged_image_1.png",
            "clahe_defogged_image_1.png",
            "dcp_defogged_image_3.png",
            "clahe_defogged_image_3.png",
        ] {
            assert!(dir.path().join("out").join(name).exists(), "{name} missing");
        }
        assert!(!dir.path().join("out").join("dcp_defogged_image_2.png").exists());
    }
}
