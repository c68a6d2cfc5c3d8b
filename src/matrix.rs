//! In-memory RGB pixel grid shared by the importer and the codec.
//!
//! Pixels are stored in a single contiguous row-major buffer, 3 bytes per
//! pixel, so pixel `(x, y)` starts at byte `3 * (y * width + x)`.

use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

/// One RGB pixel.
pub type Rgb = [u8; 3];

/// Bytes per pixel in a [`PixelMatrix`] and in the TSR payload.
pub const BYTES_PER_PIXEL: usize = 3;

/// Number of payload bytes for a `width` x `height` RGB image.
///
/// Fails with [`Error::ImageTooLarge`] when the size overflows `usize`.
pub(crate) fn byte_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
        .ok_or(Error::ImageTooLarge { width, height })
}

/// A width x height grid of RGB triples.
///
/// The buffer always holds exactly `3 * width * height` bytes. The empty
/// matrix is 0x0; a matrix with one zero dimension is also allowed and
/// simply holds no pixels.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct PixelMatrix {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelMatrix {
    /// Wrap a raw row-major RGB buffer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDataLength`] if `data.len() != 3 * width * height`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(Error::InvalidDataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// The 0x0 matrix.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a flat slice of pixels in row-major order.
    pub fn from_pixels(width: u32, height: u32, pixels: &[Rgb]) -> Result<Self> {
        let expected = byte_len(width, height)?;
        if pixels.len() * BYTES_PER_PIXEL != expected {
            return Err(Error::InvalidDataLength {
                expected,
                actual: pixels.len() * BYTES_PER_PIXEL,
            });
        }
        Self::new(width, height, pixels.concat())
    }

    /// Build from nested rows. Every row must have the same length.
    pub fn from_rows<R: AsRef<[Rgb]>>(rows: &[R]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self::empty());
        };
        let width = first.as_ref().len();
        let mut data = Vec::with_capacity(width * rows.len() * BYTES_PER_PIXEL);
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(Error::InvalidDataLength {
                    expected: width * BYTES_PER_PIXEL,
                    actual: row.len() * BYTES_PER_PIXEL,
                });
            }
            for px in row {
                data.extend_from_slice(px);
            }
        }
        let width = u32::try_from(width).map_err(|_| Error::ImageTooLarge {
            width: u32::MAX,
            height: rows.len() as u32,
        })?;
        let height = u32::try_from(rows.len()).map_err(|_| Error::ImageTooLarge {
            width,
            height: u32::MAX,
        })?;
        Self::new(width, height, data)
    }

    /// Build by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgb) -> Result<Self> {
        let mut data = Vec::with_capacity(byte_len(width, height)?);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    /// A matrix where every pixel is `color`.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Result<Self> {
        Self::from_fn(width, height, |_, _| color)
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when the matrix holds no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.data.len() / BYTES_PER_PIXEL
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = BYTES_PER_PIXEL * (y as usize * self.width as usize + x as usize);
        let px = &self.data[offset..offset + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2]])
    }

    /// Raw bytes of row `y`.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.row_stride();
        let start = y as usize * stride;
        Some(&self.data[start..start + stride])
    }

    /// Iterate rows top to bottom as raw RGB byte slices.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        let stride = self.row_stride();
        (0..self.height as usize).map(move |y| &self.data[y * stride..(y + 1) * stride])
    }

    /// Iterate pixels in row-major order.
    pub fn pixels(&self) -> impl ExactSizeIterator<Item = Rgb> + '_ {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| [px[0], px[1], px[2]])
    }

    /// Copy out as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<Rgb>> {
        self.rows()
            .map(|row| {
                row.chunks_exact(BYTES_PER_PIXEL)
                    .map(|px| [px[0], px[1], px[2]])
                    .collect()
            })
            .collect()
    }

    /// Row-major RGB bytes.
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Consume the matrix and return its RGB bytes.
    #[inline]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Number of distinct colors present.
    pub fn distinct_colors(&self) -> usize {
        self.pixels().collect::<HashSet<Rgb>>().len()
    }

    #[inline]
    fn row_stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }
}

impl fmt::Debug for PixelMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelMatrix")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        let result = PixelMatrix::new(2, 2, vec![0u8; 11]);
        assert!(matches!(
            result,
            Err(Error::InvalidDataLength {
                expected: 12,
                actual: 11
            })
        ));
        assert!(PixelMatrix::new(2, 2, vec![0u8; 12]).is_ok());
    }

    #[test]
    fn test_empty_matrix() {
        let m = PixelMatrix::empty();
        assert_eq!(m.dimensions(), (0, 0));
        assert!(m.is_empty());
        assert_eq!(m.rows().count(), 0);
        assert_eq!(m.get(0, 0), None);
    }

    #[test]
    fn test_zero_width_matrix_has_empty_rows() {
        let m = PixelMatrix::new(0, 5, Vec::new()).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.rows().count(), 5);
        assert!(m.rows().all(|r| r.is_empty()));
    }

    #[test]
    fn test_offset_formula() {
        let m = PixelMatrix::from_fn(3, 2, |x, y| [x as u8, y as u8, 7]).unwrap();
        assert_eq!(m.get(2, 1), Some([2, 1, 7]));
        let (x, y, w) = (2usize, 1usize, 3usize);
        let offset = 3 * (y * w + x);
        assert_eq!(&m.as_raw()[offset..offset + 3], &[2, 1, 7]);
        assert_eq!(m.get(3, 0), None);
        assert_eq!(m.get(0, 2), None);
    }

    #[test]
    fn test_from_rows_roundtrip() {
        let rows: Vec<Vec<Rgb>> = vec![
            vec![[1, 2, 3], [4, 5, 6]],
            vec![[7, 8, 9], [10, 11, 12]],
        ];
        let m = PixelMatrix::from_rows(&rows).unwrap();
        assert_eq!(m.dimensions(), (2, 2));
        assert_eq!(m.to_rows(), rows);
        assert_eq!(m.row(1), Some(&[7u8, 8, 9, 10, 11, 12][..]));
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let rows: Vec<Vec<Rgb>> = vec![vec![[0, 0, 0]; 2], vec![[0, 0, 0]; 1]];
        assert!(matches!(
            PixelMatrix::from_rows(&rows),
            Err(Error::InvalidDataLength { expected: 6, actual: 3 })
        ));
    }

    #[test]
    fn test_distinct_colors() {
        let m = PixelMatrix::from_pixels(4, 1, &[[1, 1, 1], [2, 2, 2], [1, 1, 1], [3, 3, 3]])
            .unwrap();
        assert_eq!(m.distinct_colors(), 3);
        assert_eq!(m.pixel_count(), 4);
    }

    #[test]
    fn test_byte_len_overflow() {
        if usize::BITS == 64 {
            assert_eq!(byte_len(u32::MAX, u32::MAX).ok(), None);
        }
        assert_eq!(byte_len(10, 10).unwrap(), 300);
    }
}
