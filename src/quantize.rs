//! Median-cut palette reduction.
//!
//! The color histogram is split repeatedly: the box with the widest
//! channel range is sorted along that channel and cut at its population
//! median, until there are `max_colors` boxes or nothing left to split.
//! Each box contributes the population-weighted mean of its colors as one
//! palette entry. Pixels are then mapped to their nearest entry, optionally
//! with Floyd–Steinberg error diffusion.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::matrix::{byte_len, PixelMatrix, Rgb, BYTES_PER_PIXEL};

/// Largest palette an index byte can address.
pub const MAX_PALETTE_SIZE: usize = 256;

/// A palette plus one index per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantized {
    /// Palette entries; at most [`MAX_PALETTE_SIZE`].
    pub palette: Vec<Rgb>,
    /// Row-major palette indices.
    pub indices: Vec<u8>,
}

impl Quantized {
    /// Re-expand indices into direct RGB bytes.
    pub fn expand(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.indices.len() * BYTES_PER_PIXEL);
        for &idx in &self.indices {
            out.extend_from_slice(&self.palette[idx as usize]);
        }
        out
    }
}

#[derive(Clone, Copy)]
struct ColorCount {
    rgb: Rgb,
    count: u32,
}

struct ColorBox {
    colors: Vec<ColorCount>,
    min: Rgb,
    max: Rgb,
}

impl ColorBox {
    fn from_colors(colors: Vec<ColorCount>) -> Self {
        let mut min = [255u8; 3];
        let mut max = [0u8; 3];
        for c in &colors {
            for ch in 0..3 {
                min[ch] = min[ch].min(c.rgb[ch]);
                max[ch] = max[ch].max(c.rgb[ch]);
            }
        }
        Self { colors, min, max }
    }

    /// Widest channel and its extent.
    fn range(&self) -> (usize, u8) {
        let mut channel = 0;
        let mut widest = 0u8;
        for ch in 0..3 {
            let extent = self.max[ch].saturating_sub(self.min[ch]);
            if extent > widest {
                widest = extent;
                channel = ch;
            }
        }
        (channel, widest)
    }

    fn can_split(&self) -> bool {
        self.colors.len() > 1
    }

    fn split(self) -> (ColorBox, ColorBox) {
        let (channel, _) = self.range();
        let mut colors = self.colors;
        colors.sort_by_key(|c| c.rgb[channel]);

        let total: u64 = colors.iter().map(|c| u64::from(c.count)).sum();
        let mut acc = 0u64;
        let mut split_idx = 0;
        for (i, c) in colors.iter().enumerate() {
            acc += u64::from(c.count);
            if acc >= total / 2 {
                split_idx = i;
                break;
            }
        }
        // Both halves must keep at least one color.
        let split_idx = split_idx.min(colors.len() - 2);
        let right = colors.split_off(split_idx + 1);
        (ColorBox::from_colors(colors), ColorBox::from_colors(right))
    }

    fn palette_entry(&self) -> Rgb {
        let mut sums = [0u64; 3];
        let mut total = 0u64;
        for c in &self.colors {
            let n = u64::from(c.count);
            for ch in 0..3 {
                sums[ch] += u64::from(c.rgb[ch]) * n;
            }
            total += n;
        }
        if total == 0 {
            return [0, 0, 0];
        }
        [
            (sums[0] / total) as u8,
            (sums[1] / total) as u8,
            (sums[2] / total) as u8,
        ]
    }
}

fn histogram(data: &[u8]) -> Vec<ColorCount> {
    let mut hist = HashMap::<Rgb, u32>::new();
    for px in data.chunks_exact(BYTES_PER_PIXEL) {
        *hist.entry([px[0], px[1], px[2]]).or_insert(0) += 1;
    }
    let mut colors: Vec<ColorCount> = hist
        .into_iter()
        .map(|(rgb, count)| ColorCount { rgb, count })
        .collect();
    // HashMap order is random; sort so the palette is reproducible.
    colors.sort_unstable_by_key(|c| c.rgb);
    colors
}

/// Build a palette of at most `max_colors` entries from a color histogram.
fn median_cut(colors: Vec<ColorCount>, max_colors: usize) -> Vec<Rgb> {
    if colors.is_empty() {
        return Vec::new();
    }
    let mut boxes = vec![ColorBox::from_colors(colors)];
    while boxes.len() < max_colors {
        let Some((idx, _)) = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.can_split())
            .max_by_key(|(_, b)| b.range().1)
        else {
            break;
        };
        let (left, right) = boxes.swap_remove(idx).split();
        boxes.push(left);
        boxes.push(right);
    }
    log::trace!("median cut produced {} boxes", boxes.len());
    boxes.iter().map(ColorBox::palette_entry).collect()
}

/// Median-cut palette for the pixels in `data` (row-major RGB).
pub fn median_cut_palette(data: &[u8], max_colors: usize) -> Vec<Rgb> {
    median_cut(histogram(data), max_colors.clamp(1, MAX_PALETTE_SIZE))
}

#[inline]
fn distance_sq(a: Rgb, b: Rgb) -> u32 {
    let dr = i32::from(a[0]) - i32::from(b[0]);
    let dg = i32::from(a[1]) - i32::from(b[1]);
    let db = i32::from(a[2]) - i32::from(b[2]);
    (dr * dr + dg * dg + db * db) as u32
}

/// Index of the palette entry closest to `color` (squared RGB distance).
pub fn nearest_palette_index(color: Rgb, palette: &[Rgb]) -> u8 {
    let mut best_idx = 0u8;
    let mut best_dist = u32::MAX;
    for (i, &p) in palette.iter().enumerate() {
        let dist = distance_sq(color, p);
        if dist < best_dist {
            best_dist = dist;
            best_idx = i as u8;
            if dist == 0 {
                break;
            }
        }
    }
    best_idx
}

fn nearest_for_histogram(colors: &[ColorCount], palette: &[Rgb]) -> HashMap<Rgb, u8> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        colors
            .par_iter()
            .map(|c| (c.rgb, nearest_palette_index(c.rgb, palette)))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        colors
            .iter()
            .map(|c| (c.rgb, nearest_palette_index(c.rgb, palette)))
            .collect()
    }
}

/// Reduce a row-major RGB buffer to at most `max_colors` colors.
///
/// `max_colors` is clamped to 1..=256. Images that already fit are mapped
/// exactly and never dithered.
///
/// # Errors
///
/// [`Error::InvalidDataLength`] when `data` does not match the dimensions.
pub fn quantize(
    data: &[u8],
    width: u32,
    height: u32,
    max_colors: usize,
    dithering: bool,
) -> Result<Quantized> {
    let expected = byte_len(width, height)?;
    if data.len() != expected {
        return Err(Error::InvalidDataLength {
            expected,
            actual: data.len(),
        });
    }
    let max_colors = max_colors.clamp(1, MAX_PALETTE_SIZE);
    let colors = histogram(data);

    if colors.len() <= max_colors {
        let palette: Vec<Rgb> = colors.iter().map(|c| c.rgb).collect();
        let lookup: HashMap<Rgb, u8> = palette
            .iter()
            .enumerate()
            .map(|(i, &rgb)| (rgb, i as u8))
            .collect();
        let indices = data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| lookup[&[px[0], px[1], px[2]]])
            .collect();
        log::debug!(
            "{} colors already within palette of {}, mapped exactly",
            palette.len(),
            max_colors
        );
        return Ok(Quantized { palette, indices });
    }

    let distinct = colors.len();
    let palette = median_cut(colors.clone(), max_colors);
    log::debug!(
        "median cut reduced {} colors to {} (limit {}, dithering {})",
        distinct,
        palette.len(),
        max_colors,
        dithering
    );

    let indices = if dithering {
        dither(data, width as usize, &palette)
    } else {
        let lookup = nearest_for_histogram(&colors, &palette);
        data.chunks_exact(BYTES_PER_PIXEL)
            .map(|px| lookup[&[px[0], px[1], px[2]]])
            .collect()
    };

    Ok(Quantized { palette, indices })
}

/// Quantize a row-major RGB buffer and re-expand it to direct RGB.
pub fn quantize_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    max_colors: usize,
    dithering: bool,
) -> Result<Vec<u8>> {
    Ok(quantize(data, width, height, max_colors, dithering)?.expand())
}

/// Quantize a matrix and re-expand it to direct RGB.
pub fn quantize_matrix(
    matrix: &PixelMatrix,
    max_colors: usize,
    dithering: bool,
) -> Result<PixelMatrix> {
    let (width, height) = matrix.dimensions();
    let data = quantize_rgb(matrix.as_raw(), width, height, max_colors, dithering)?;
    PixelMatrix::new(width, height, data)
}

/// Floyd–Steinberg error diffusion.
fn dither(data: &[u8], width: usize, palette: &[Rgb]) -> Vec<u8> {
    let mut indices = Vec::with_capacity(data.len() / BYTES_PER_PIXEL);
    if width == 0 {
        return indices;
    }
    // One guard cell on each side keeps the x-1 / x+1 taps in bounds.
    let mut err = vec![[0f32; 3]; width + 2];
    let mut next_err = vec![[0f32; 3]; width + 2];

    for row in data.chunks_exact(width * BYTES_PER_PIXEL) {
        for (x, px) in row.chunks_exact(BYTES_PER_PIXEL).enumerate() {
            let mut adjusted = [0u8; 3];
            for ch in 0..3 {
                adjusted[ch] = (f32::from(px[ch]) + err[x + 1][ch]).clamp(0.0, 255.0) as u8;
            }
            let idx = nearest_palette_index(adjusted, palette);
            indices.push(idx);

            let chosen = palette[idx as usize];
            for ch in 0..3 {
                let e = f32::from(adjusted[ch]) - f32::from(chosen[ch]);
                //       * 7
                // 3 5 1
                err[x + 2][ch] += e * 7.0 / 16.0;
                next_err[x][ch] += e * 3.0 / 16.0;
                next_err[x + 1][ch] += e * 5.0 / 16.0;
                next_err[x + 2][ch] += e * 1.0 / 16.0;
            }
        }
        err.iter_mut().for_each(|e| *e = [0.0; 3]);
        std::mem::swap(&mut err, &mut next_err);
    }
    indices
}
