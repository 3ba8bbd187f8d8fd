use crate::types::{OptimizerConfig, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum OptimizeError {
        #[error("Upload is empty")]
        Empty,

        #[error("Image error: {0}")]
        Image(#[from] image::ImageError),

        #[error("Resize error: {0}")]
        Resize(#[from] fast_image_resize::ResizeError),
    }
}

use error::OptimizeError;

/// Re-encoded image ready to be written to the binary store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedImage {
    pub bytes: Vec<u8>,
    /// File extension matching the encoding of `bytes`, without the dot.
    pub extension: &'static str,
}

/// Normalizes raw uploads before they are stored.
pub trait ImageOptimizer: Send + Sync {
    fn optimize(&self, raw: &[u8]) -> Result<OptimizedImage, OptimizeError>;
}

/// Downscales so the longest side fits `max_dimension` and re-encodes.
#[derive(Debug, Clone)]
pub struct ResizingOptimizer {
    max_dimension: u32,
    quality: u8,
    format: OutputFormat,
}

impl ResizingOptimizer {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            max_dimension: config.max_dimension.max(1),
            quality: config.quality.clamp(1, 100),
            format: config.format,
        }
    }

    fn scale_down(&self, src_image: DynamicImage) -> Result<DynamicImage, OptimizeError> {
        let (src_width, src_height) = (src_image.width(), src_image.height());

        // Calculate target dimensions preserving aspect ratio, never upscaling
        let scale = (self.max_dimension as f32 / src_width.max(src_height) as f32).min(1.0);
        if scale >= 1.0 {
            return Ok(src_image);
        }
        let dst_width = ((src_width as f32 * scale) as u32).clamp(1, self.max_dimension);
        let dst_height = ((src_height as f32 * scale) as u32).clamp(1, self.max_dimension);

        let mut dst_image = DynamicImage::new(dst_width, dst_height, src_image.color());

        let mut resizer = fast_image_resize::Resizer::new();
        resizer.resize(
            &src_image,
            &mut dst_image,
            Some(&fast_image_resize::ResizeOptions::new().resize_alg(
                fast_image_resize::ResizeAlg::Convolution(fast_image_resize::FilterType::Lanczos3),
            )),
        )?;

        Ok(dst_image)
    }

    fn encode(&self, image: DynamicImage) -> Result<Vec<u8>, OptimizeError> {
        let mut out = Cursor::new(Vec::new());
        match self.format {
            OutputFormat::Webp => to_8bit(image).write_to(&mut out, ImageFormat::WebP)?,
            OutputFormat::Png => to_8bit(image).write_to(&mut out, ImageFormat::Png)?,
            OutputFormat::Jpeg => {
                let rgb = image.to_rgb8();
                JpegEncoder::new_with_quality(&mut out, self.quality).encode_image(&rgb)?;
            }
        }
        Ok(out.into_inner())
    }
}

/// Encoders only accept 8-bit RGB(A) across all output formats.
fn to_8bit(image: DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

impl ImageOptimizer for ResizingOptimizer {
    fn optimize(&self, raw: &[u8]) -> Result<OptimizedImage, OptimizeError> {
        if raw.is_empty() {
            return Err(OptimizeError::Empty);
        }

        let src_image = image::load_from_memory(raw)?;
        let resized = self.scale_down(src_image)?;

        Ok(OptimizedImage {
            bytes: self.encode(resized)?,
            extension: self.format.extension(),
        })
    }
}
