//! Image loading and saving.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::{Error, Result};

/// Something that can resolve an identifier into an RGB image.
///
/// The batch evaluator only sees this trait, so images may come from disk,
/// memory or anywhere else.
pub trait ImageSource: Sync {
    /// Load the image named by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if the image cannot be resolved or decoded.
    fn load(&self, id: &str) -> Result<RgbImage>;
}

/// Loads images from the filesystem, treating identifiers as paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl ImageSource for FileSource {
    fn load(&self, id: &str) -> Result<RgbImage> {
        image::open(id)
            .map(|img| img.to_rgb8())
            .map_err(|e| Error::MissingInput {
                id: id.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Expand a list of files and directories into image paths.
///
/// Files are kept as given, in order. Each directory is replaced by its
/// supported image files sorted by name.
///
/// # Errors
///
/// Returns [`Error::Io`] if a directory cannot be read.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect();
            entries.sort();
            out.extend(entries);
        } else {
            out.push(input.clone());
        }
    }
    Ok(out)
}

/// Save an RGB image, choosing the encoder from the file extension.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(img)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            DynamicImage::ImageRgb8(img.clone()).save(path)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// File name for a processed image: `{method}_defogged_image_{number}.{ext}`.
#[must_use]
pub fn processed_file_name(method: &str, number: usize, extension: &str) -> String {
    format!("{method}_defogged_image_{number}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("results.csv")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn processed_file_name_uses_one_based_number() {
        assert_eq!(processed_file_name("dcp", 3, "jpg"), "dcp_defogged_image_3.jpg");
    }

    #[test]
    fn missing_file_reports_missing_input() {
        let err = FileSource.load("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
        assert!(err.to_string().contains("not/here.png"));
    }

    #[test]
    fn save_then_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let img = RgbImage::from_pixel(8, 6, Rgb([1, 2, 3]));
        save_image(&img, &path).unwrap();

        let loaded = FileSource.load(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded, img);
    }

    #[test]
    fn save_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbImage::new(2, 2);
        assert!(matches!(
            save_image(&img, &dir.path().join("out.xyz")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn collect_inputs_expands_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let single = PathBuf::from("z.png");

        let found = collect_inputs(&[single.clone(), dir.path().to_path_buf()]).unwrap();
        assert_eq!(
            found,
            vec![single, dir.path().join("a.jpg"), dir.path().join("b.png")]
        );
    }
}
