//! # tsrimage
//!
//! A small raster codec for the TSR format: an 8-byte little-endian
//! width/height header followed by a zlib stream of row-major RGB pixels.
//!
//! - **Codec**: lossless [`codec::encode`] / [`codec::decode`] with strict
//!   integrity checks (truncated headers, corrupt streams and size
//!   mismatches are all distinct errors).
//! - **Import**: any format the `image` crate reads is converted to RGB,
//!   halved in each dimension and reduced with median cut to the palette
//!   size picked by [`Quality`].
//! - **Performance**: optional row-parallel resampling and palette mapping
//!   via the `parallel` feature.
//!
//! ## Quickstart
//!
//! ```rust
//! use tsrimage::{codec, PixelMatrix};
//!
//! # fn main() -> tsrimage::Result<()> {
//! // 2x1 image: red, blue
//! let matrix = PixelMatrix::from_pixels(2, 1, &[[255, 0, 0], [0, 0, 255]])?;
//! let bytes = codec::encode(&matrix)?;
//! let decoded = codec::decode(&bytes)?;
//! assert_eq!(decoded, matrix);
//! # Ok(())
//! # }
//! ```
//!
//! ### Importing with a quality level
//!
//! ```rust
//! use std::io::Cursor;
//! use tsrimage::{import, Quality};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let src = image::RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]));
//! let mut png = Cursor::new(Vec::new());
//! image::DynamicImage::ImageRgb8(src).write_to(&mut png, image::ImageFormat::Png)?;
//!
//! let quality: Quality = "25%".parse()?;
//! let matrix = import::import(png.get_ref(), quality)?;
//! assert_eq!(matrix.dimensions(), (2, 2));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//! - `parallel` (default): rayon-backed Lanczos3 passes and palette mapping.
//! - `cli`: the `tsr` command-line tool.
//!
//! ## Logging
//! The library emits [`log`] records and never installs a logger.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod import;
pub mod matrix;
pub mod quality;
pub mod quantize;
pub mod resize;

pub use codec::{EncodeOptions, Header};
pub use error::{Error, Result};
pub use import::ImportOptions;
pub use matrix::{PixelMatrix, Rgb};
pub use quality::Quality;
pub use resize::ResizeAlgorithm;
