//! Seed images for image-to-video jobs.
//!
//! A local image is validated, scaled down so its longest side fits
//! [`MAX_ENCODED_SIDE`], re-encoded as JPEG and embedded as a base64 data URL.
//! Remote URLs are passed through untouched.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

/// Largest accepted source file.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Largest accepted encoded payload (the base64 text, not the raw bytes).
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const MIN_ASPECT_RATIO: f64 = 0.4;
pub const MAX_ASPECT_RATIO: f64 = 2.5;
pub const MIN_SIDE: u32 = 300;
pub const MAX_SIDE: u32 = 6000;

/// Embedded images are scaled so their longest side is at most this.
pub const MAX_ENCODED_SIDE: u32 = 1280;

/// JPEG quality used for embedded images.
pub const JPEG_QUALITY: u8 = 85;

const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::Gif,
];

/// Starting image for an image-to-video job.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedImage {
    /// Remote image fetched by the service.
    Url(String),
    /// Local image embedded in the request.
    Embedded {
        data_url: String,
        width: u32,
        height: u32,
    },
}

/// What `image check` reports about a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
}

impl ImageInfo {
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl SeedImage {
    /// The value sent as `image_url.url`.
    pub fn url(&self) -> &str {
        match self {
            SeedImage::Url(url) => url,
            SeedImage::Embedded { data_url, .. } => data_url,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, SeedImage::Embedded { .. })
    }

    /// Load, validate and embed a local image file.
    ///
    /// # Errors
    ///
    /// Returns `SeedImageError::NotFound` if the file is missing,
    /// `TooLarge` or `PayloadTooLarge` for oversized input or output,
    /// `UnsupportedFormat` for anything but JPEG/PNG/WEBP/BMP/TIFF/GIF,
    /// `Dimensions` when the size or aspect ratio is out of range, and
    /// `Decode`/`Encode` when the image crate fails.
    pub fn from_file(path: &Path) -> Result<Self, SeedImageError> {
        let info = inspect(path)?;
        let image = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(SeedImageError::Decode)?;
        log::debug!(
            "Loaded seed image {} ({}x{}, {:?})",
            info.path.display(),
            info.width,
            info.height,
            info.format
        );
        Self::from_image(&image)
    }

    /// Validate and embed an already-decoded image.
    pub fn from_image(image: &DynamicImage) -> Result<Self, SeedImageError> {
        check_dimensions(image.width(), image.height())?;

        let scaled;
        let image = if image.width().max(image.height()) > MAX_ENCODED_SIDE {
            scaled = image.resize(MAX_ENCODED_SIDE, MAX_ENCODED_SIDE, FilterType::Lanczos3);
            &scaled
        } else {
            image
        };

        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut buf = Cursor::new(Vec::new());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))
            .map_err(SeedImageError::Encode)?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(buf.get_ref());
        let data_url = format!("data:image/jpeg;base64,{}", encoded);
        if data_url.len() > MAX_PAYLOAD_BYTES {
            return Err(SeedImageError::PayloadTooLarge {
                bytes: data_url.len(),
            });
        }

        Ok(SeedImage::Embedded {
            data_url,
            width: rgb.width(),
            height: rgb.height(),
        })
    }
}

/// Read header information and check file size, format and dimensions
/// without decoding the full image.
pub fn inspect(path: &Path) -> Result<ImageInfo, SeedImageError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SeedImageError::NotFound(path.to_path_buf())
        } else {
            SeedImageError::Io(e)
        }
    })?;

    let file_size = metadata.len();
    if file_size > MAX_FILE_BYTES {
        return Err(SeedImageError::TooLarge { bytes: file_size });
    }

    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = match reader.format() {
        Some(format) if SUPPORTED_FORMATS.contains(&format) => format,
        Some(format) => {
            return Err(SeedImageError::UnsupportedFormat(format!("{:?}", format)));
        }
        None => return Err(SeedImageError::UnsupportedFormat("unknown".to_string())),
    };

    let (width, height) = reader.into_dimensions().map_err(SeedImageError::Decode)?;
    check_dimensions(width, height)?;

    Ok(ImageInfo {
        path: path.to_path_buf(),
        format,
        width,
        height,
        file_size,
    })
}

/// Check aspect ratio and side lengths against the service limits.
pub fn check_dimensions(width: u32, height: u32) -> Result<(), SeedImageError> {
    if width == 0 || height == 0 {
        return Err(SeedImageError::Dimensions {
            width,
            height,
            reason: "image is empty".to_string(),
        });
    }

    let aspect = width as f64 / height as f64;
    if !(MIN_ASPECT_RATIO..=MAX_ASPECT_RATIO).contains(&aspect) {
        return Err(SeedImageError::Dimensions {
            width,
            height,
            reason: format!(
                "aspect ratio {:.2} must be between {} and {}",
                aspect, MIN_ASPECT_RATIO, MAX_ASPECT_RATIO
            ),
        });
    }

    if width.min(height) < MIN_SIDE {
        return Err(SeedImageError::Dimensions {
            width,
            height,
            reason: format!("shortest side must be at least {}px", MIN_SIDE),
        });
    }

    if width.max(height) > MAX_SIDE {
        return Err(SeedImageError::Dimensions {
            width,
            height,
            reason: format!("longest side must be at most {}px", MAX_SIDE),
        });
    }

    Ok(())
}

/// Errors from seed image validation and encoding.
#[derive(Debug, thiserror::Error)]
pub enum SeedImageError {
    #[error("Image file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Image file is {bytes} bytes; the limit is 10 MB")]
    TooLarge { bytes: u64 },

    #[error("Encoded image is {bytes} bytes; the limit is 10 MB. Use a smaller image")]
    PayloadTooLarge { bytes: usize },

    #[error("Unsupported image format: {0}. Use JPEG, PNG, WEBP, BMP, TIFF or GIF")]
    UnsupportedFormat(String),

    #[error("Image is {width}x{height}: {reason}")]
    Dimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Failed to decode image: {0}")]
    Decode(image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 120, 200])))
    }

    #[test]
    fn test_check_dimensions_accepts_common_sizes() {
        assert!(check_dimensions(1280, 720).is_ok());
        assert!(check_dimensions(300, 300).is_ok());
        assert!(check_dimensions(720, 1280).is_ok());
    }

    #[test]
    fn test_check_dimensions_rejects_extreme_aspect() {
        let err = check_dimensions(3000, 1000).unwrap_err();
        assert!(err.to_string().contains("aspect ratio"));
        assert!(check_dimensions(300, 1000).is_err());
    }

    #[test]
    fn test_check_dimensions_rejects_small_and_large() {
        assert!(check_dimensions(299, 400).is_err());
        assert!(check_dimensions(6001, 4000).is_err());
        assert!(check_dimensions(0, 0).is_err());
    }

    #[test]
    fn test_from_image_embeds_jpeg_data_url() {
        let seed = SeedImage::from_image(&solid(640, 480)).unwrap();
        assert!(seed.is_embedded());
        assert!(seed.url().starts_with("data:image/jpeg;base64,"));
        match seed {
            SeedImage::Embedded { width, height, .. } => {
                assert_eq!((width, height), (640, 480));
            }
            SeedImage::Url(_) => panic!("expected embedded image"),
        }
    }

    #[test]
    fn test_from_image_downscales_longest_side() {
        let seed = SeedImage::from_image(&solid(2560, 1440)).unwrap();
        match seed {
            SeedImage::Embedded { width, height, .. } => {
                assert_eq!(width, 1280);
                assert_eq!(height, 720);
            }
            SeedImage::Url(_) => panic!("expected embedded image"),
        }
    }

    #[test]
    fn test_from_file_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.png");
        solid(800, 600).save(&path).unwrap();

        let info = inspect(&path).unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!((info.width, info.height), (800, 600));

        let seed = SeedImage::from_file(&path).unwrap();
        assert!(seed.url().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = SeedImage::from_file(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, SeedImageError::NotFound(_)));
    }

    #[test]
    fn test_from_file_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "just some text, not pixels").unwrap();
        let err = inspect(&path).unwrap_err();
        assert!(matches!(err, SeedImageError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_url_passthrough() {
        let seed = SeedImage::Url("https://example.com/a.png".to_string());
        assert_eq!(seed.url(), "https://example.com/a.png");
        assert!(!seed.is_embedded());
    }
}
