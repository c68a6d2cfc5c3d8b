//! Conversion of arbitrary raster images into TSR-ready pixel matrices.
//!
//! Importing always runs the same pipeline:
//!
//! 1. decode the source with the `image` crate and convert it to RGB,
//!    dropping any alpha channel as-is (no compositing);
//! 2. halve both dimensions, truncating odd sizes;
//! 3. reduce the palette with median cut to the size chosen by
//!    [`Quality`];
//! 4. expand the palette back to direct RGB.

use std::fs;
use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::error::{Error, Result};
use crate::matrix::PixelMatrix;
use crate::quality::Quality;
use crate::quantize::quantize_matrix;
use crate::resize::{downscale_half, ResizeAlgorithm};

/// Import settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportOptions {
    /// Palette size selector.
    pub quality: Quality,
    /// Filter used for the 50% downscale.
    pub resize_algorithm: ResizeAlgorithm,
    /// Floyd–Steinberg dithering while mapping to the palette.
    pub dithering: bool,
}

impl ImportOptions {
    /// Defaults with the given quality.
    pub fn new(quality: Quality) -> Self {
        Self {
            quality,
            ..Self::default()
        }
    }

    /// Start building options from the defaults.
    pub fn builder() -> ImportOptionsBuilder {
        ImportOptionsBuilder::default()
    }
}

/// Builder for [`ImportOptions`].
#[derive(Debug, Clone, Default)]
pub struct ImportOptionsBuilder {
    options: ImportOptions,
}

impl ImportOptionsBuilder {
    /// Set the quality level.
    pub fn quality(mut self, quality: Quality) -> Self {
        self.options.quality = quality;
        self
    }

    /// Set the downscale filter.
    pub fn resize_algorithm(mut self, algorithm: ResizeAlgorithm) -> Self {
        self.options.resize_algorithm = algorithm;
        self
    }

    /// Enable or disable dithering.
    pub fn dithering(mut self, dithering: bool) -> Self {
        self.options.dithering = dithering;
        self
    }

    /// Finish.
    pub fn build(self) -> ImportOptions {
        self.options
    }
}

/// Decode `source` (PNG, JPEG, GIF, BMP, …) and import it at `quality`.
pub fn import(source: &[u8], quality: Quality) -> Result<PixelMatrix> {
    import_with_options(source, &ImportOptions::new(quality))
}

/// Decode `source` and import it with explicit options.
pub fn import_with_options(source: &[u8], options: &ImportOptions) -> Result<PixelMatrix> {
    let image = decode_source(source)?;
    import_image(&image, options)
}

/// Read the file at `path` and import it.
pub fn import_path(path: impl AsRef<Path>, options: &ImportOptions) -> Result<PixelMatrix> {
    let source = fs::read(path.as_ref())?;
    import_with_options(&source, options)
}

/// Import an already decoded image.
pub fn import_image(image: &DynamicImage, options: &ImportOptions) -> Result<PixelMatrix> {
    let full = matrix_from_image(image)?;
    let half = downscale_half(&full, options.resize_algorithm)?;
    let quantized = quantize_matrix(&half, options.quality.palette_size(), options.dithering)?;

    log::debug!(
        "imported {}x{} -> {}x{} at {} ({} colors)",
        full.width(),
        full.height(),
        quantized.width(),
        quantized.height(),
        options.quality,
        quantized.distinct_colors()
    );
    Ok(quantized)
}

/// Decode raster bytes with the `image` crate, guessing the format.
pub fn decode_source(source: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(source).map_err(|e| Error::UnsupportedFormat(e.to_string()))
}

/// Convert a decoded image to a matrix without resizing or quantizing.
///
/// Alpha is dropped; 16-bit and float channels are narrowed to 8 bits.
pub fn matrix_from_image(image: &DynamicImage) -> Result<PixelMatrix> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    PixelMatrix::new(width, height, rgb.into_raw())
}

/// Copy a matrix into an `image` buffer, e.g. for saving as PNG.
pub fn matrix_to_image(matrix: &PixelMatrix) -> Result<RgbImage> {
    let (width, height) = matrix.dimensions();
    RgbImage::from_raw(width, height, matrix.as_raw().to_vec())
        .ok_or(Error::ImageTooLarge { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_solid_red_scenario() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0])));
        let m = import(&png_bytes(&src), Quality::Full).unwrap();
        assert_eq!(m.dimensions(), (2, 2));
        assert!(m.pixels().all(|p| p == [255, 0, 0]));
    }

    #[test]
    fn test_alpha_is_dropped_not_composited() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0])));
        let m = matrix_from_image(&src).unwrap();
        assert!(m.pixels().all(|p| p == [10, 20, 30]));
    }

    #[test]
    fn test_unsupported_source() {
        let result = import(b"definitely not an image", Quality::Full);
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_builder() {
        let opts = ImportOptions::builder()
            .quality(Quality::Low)
            .resize_algorithm(ResizeAlgorithm::Lanczos3)
            .dithering(true)
            .build();
        assert_eq!(opts.quality, Quality::Low);
        assert_eq!(opts.resize_algorithm, ResizeAlgorithm::Lanczos3);
        assert!(opts.dithering);
        assert_eq!(ImportOptions::default().quality, Quality::Full);
    }

    #[test]
    fn test_matrix_to_image_roundtrip() {
        let m = PixelMatrix::from_fn(3, 2, |x, y| [x as u8, y as u8, 9]).unwrap();
        let img = matrix_to_image(&m).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        let back = matrix_from_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_one_pixel_source_becomes_empty() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, image::Rgb([1, 2, 3])));
        let m = import_image(&src, &ImportOptions::default()).unwrap();
        assert_eq!(m, PixelMatrix::empty());
    }
}
