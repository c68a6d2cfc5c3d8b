//! RGB resampling used by the importer.
//!
//! Three algorithms are available:
//! - **Nearest neighbor**: fastest, blocky results
//! - **Bilinear**: smooth and cheap (default)
//! - **Lanczos3**: sharpest, slowest
//!
//! Import always halves each dimension with [`downscale_half`], truncating
//! odd sizes, so a 101x3 source becomes 50x1.
//!
//! # Example
//!
//! ```rust
//! use tsrimage::resize::{downscale_half, ResizeAlgorithm};
//! use tsrimage::PixelMatrix;
//!
//! # fn main() -> tsrimage::Result<()> {
//! let src = PixelMatrix::filled(5, 4, [0, 128, 255])?;
//! let half = downscale_half(&src, ResizeAlgorithm::Lanczos3)?;
//! assert_eq!(half.dimensions(), (2, 2));
//! # Ok(())
//! # }
//! ```

use std::f32::consts::PI;

use crate::error::{Error, Result};
use crate::matrix::{byte_len, PixelMatrix, BYTES_PER_PIXEL};

const BPP: usize = BYTES_PER_PIXEL;

/// Resampling algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeAlgorithm {
    /// Nearest neighbor: fastest, pixelated results.
    Nearest,
    /// Bilinear interpolation: fast with smooth results.
    #[default]
    Bilinear,
    /// Lanczos3 resampling: highest quality, slowest.
    Lanczos3,
}

/// Dimensions after the fixed 50% import downscale.
#[inline]
pub const fn half_dimensions(width: u32, height: u32) -> (u32, u32) {
    (width / 2, height / 2)
}

/// Halve both dimensions of `src`, truncating toward zero.
///
/// A 1-pixel-wide or 1-pixel-tall source yields a zero-area matrix.
pub fn downscale_half(src: &PixelMatrix, algorithm: ResizeAlgorithm) -> Result<PixelMatrix> {
    let (dst_width, dst_height) = half_dimensions(src.width(), src.height());
    resize_matrix(src, dst_width, dst_height, algorithm)
}

/// Resize a [`PixelMatrix`] to `dst_width` x `dst_height`.
pub fn resize_matrix(
    src: &PixelMatrix,
    dst_width: u32,
    dst_height: u32,
    algorithm: ResizeAlgorithm,
) -> Result<PixelMatrix> {
    let data = resize(
        src.as_raw(),
        src.width(),
        src.height(),
        dst_width,
        dst_height,
        algorithm,
    )?;
    PixelMatrix::new(dst_width, dst_height, data)
}

/// Resize a raw row-major RGB buffer.
///
/// A zero-area destination always succeeds with an empty buffer. A
/// zero-area source can only be resized to a zero-area destination.
///
/// # Errors
///
/// [`Error::InvalidDimensions`] when pixels are requested from an empty
/// source, [`Error::InvalidDataLength`] when `data` does not match the
/// source dimensions.
pub fn resize(
    data: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    algorithm: ResizeAlgorithm,
) -> Result<Vec<u8>> {
    let expected_len = byte_len(src_width, src_height)?;
    if data.len() != expected_len {
        return Err(Error::InvalidDataLength {
            expected: expected_len,
            actual: data.len(),
        });
    }

    let output_len = byte_len(dst_width, dst_height)?;
    if output_len == 0 {
        return Ok(Vec::new());
    }
    if expected_len == 0 {
        return Err(Error::InvalidDimensions {
            width: src_width,
            height: src_height,
        });
    }

    let mut output = vec![0u8; output_len];
    let (sw, sh) = (src_width as usize, src_height as usize);
    let (dw, dh) = (dst_width as usize, dst_height as usize);
    match algorithm {
        ResizeAlgorithm::Nearest => resize_nearest(&mut output, data, sw, sh, dw, dh),
        ResizeAlgorithm::Bilinear => resize_bilinear(&mut output, data, sw, sh, dw, dh),
        ResizeAlgorithm::Lanczos3 => resize_lanczos3(&mut output, data, sw, sh, dw, dh),
    }
    log::trace!(
        "resized {}x{} -> {}x{} ({:?})",
        src_width,
        src_height,
        dst_width,
        dst_height,
        algorithm
    );
    Ok(output)
}

/// Map a destination coordinate to the source pixel whose center is nearest.
#[inline]
fn nearest_source(dst: usize, ratio: f32, src_size: usize) -> usize {
    ((dst as f32 + 0.5) * ratio - 0.5)
        .round()
        .clamp(0.0, (src_size - 1) as f32) as usize
}

fn resize_nearest(
    output: &mut [u8],
    data: &[u8],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) {
    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    for (dst_y, dst_row) in output.chunks_exact_mut(dst_width * BPP).enumerate() {
        let src_y = nearest_source(dst_y, y_ratio, src_height);
        for (dst_x, px) in dst_row.chunks_exact_mut(BPP).enumerate() {
            let src_x = nearest_source(dst_x, x_ratio, src_width);
            let src_idx = (src_y * src_width + src_x) * BPP;
            px.copy_from_slice(&data[src_idx..src_idx + BPP]);
        }
    }
    debug_assert_eq!(output.len(), dst_width * dst_height * BPP);
}

/// Bilinear interpolation on pixel centers.
fn resize_bilinear(
    output: &mut [u8],
    data: &[u8],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) {
    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;
    let max_x = (src_width - 1) as f32;
    let max_y = (src_height - 1) as f32;

    for dst_y in 0..dst_height {
        let src_y_f = ((dst_y as f32 + 0.5) * y_ratio - 0.5).clamp(0.0, max_y);
        let src_y0 = src_y_f.floor() as usize;
        let src_y1 = (src_y0 + 1).min(src_height - 1);
        let y_frac = src_y_f - src_y0 as f32;

        for dst_x in 0..dst_width {
            let src_x_f = ((dst_x as f32 + 0.5) * x_ratio - 0.5).clamp(0.0, max_x);
            let src_x0 = src_x_f.floor() as usize;
            let src_x1 = (src_x0 + 1).min(src_width - 1);
            let x_frac = src_x_f - src_x0 as f32;

            let idx00 = (src_y0 * src_width + src_x0) * BPP;
            let idx01 = (src_y0 * src_width + src_x1) * BPP;
            let idx10 = (src_y1 * src_width + src_x0) * BPP;
            let idx11 = (src_y1 * src_width + src_x1) * BPP;
            let dst_idx = (dst_y * dst_width + dst_x) * BPP;

            for c in 0..BPP {
                let top = data[idx00 + c] as f32 * (1.0 - x_frac) + data[idx01 + c] as f32 * x_frac;
                let bottom =
                    data[idx10 + c] as f32 * (1.0 - x_frac) + data[idx11 + c] as f32 * x_frac;
                let value = top * (1.0 - y_frac) + bottom * y_frac;
                output[dst_idx + c] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

#[inline]
fn lanczos_kernel(x: f32, a: f32) -> f32 {
    if x.abs() < f32::EPSILON {
        1.0
    } else if x.abs() >= a {
        0.0
    } else {
        let pi_x = PI * x;
        let pi_x_a = PI * x / a;
        (a * pi_x.sin() * pi_x_a.sin()) / (pi_x * pi_x_a)
    }
}

/// Normalized filter taps for one destination pixel.
#[derive(Clone)]
struct Contribution {
    start: usize,
    weights: Vec<f32>,
}

fn precompute_contributions(src_size: usize, dst_size: usize) -> Vec<Contribution> {
    const A: f32 = 3.0;

    let scale = src_size as f32 / dst_size as f32;
    // Widen the kernel when shrinking so every source pixel contributes.
    let filter_scale = scale.max(1.0);
    let support = A * filter_scale;

    (0..dst_size)
        .map(|dst_idx| {
            let src_center = (dst_idx as f32 + 0.5) * scale - 0.5;
            let start = ((src_center - support).floor() as isize).max(0) as usize;
            let end = ((src_center + support).ceil() as usize + 1).min(src_size);

            let mut weights: Vec<f32> = (start..end)
                .map(|src_idx| lanczos_kernel((src_idx as f32 - src_center) / filter_scale, A))
                .collect();
            let sum: f32 = weights.iter().sum();
            if sum.abs() > f32::EPSILON {
                weights.iter_mut().for_each(|w| *w /= sum);
            }
            Contribution { start, weights }
        })
        .collect()
}

#[inline]
fn resample_row_horizontal(src_row: &[u8], dst_row: &mut [u8], contributions: &[Contribution]) {
    for (px, contrib) in dst_row.chunks_exact_mut(BPP).zip(contributions) {
        let mut sums = [0.0f32; BPP];
        for (i, &weight) in contrib.weights.iter().enumerate() {
            let src_idx = (contrib.start + i) * BPP;
            for c in 0..BPP {
                sums[c] += src_row[src_idx + c] as f32 * weight;
            }
        }
        for c in 0..BPP {
            px[c] = sums[c].round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[inline]
fn resample_column_vertical(temp: &[u8], dst_row: &mut [u8], contrib: &Contribution) {
    let row_stride = dst_row.len();
    for (i, out) in dst_row.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        for (k, &weight) in contrib.weights.iter().enumerate() {
            sum += temp[(contrib.start + k) * row_stride + i] as f32 * weight;
        }
        *out = sum.round().clamp(0.0, 255.0) as u8;
    }
}

/// Separable Lanczos3: horizontal pass into a temp buffer, then vertical.
fn resize_lanczos3(
    output: &mut [u8],
    data: &[u8],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) {
    let h_contribs = precompute_contributions(src_width, dst_width);
    let v_contribs = precompute_contributions(src_height, dst_height);

    let src_stride = src_width * BPP;
    let dst_stride = dst_width * BPP;
    let mut temp = vec![0u8; src_height * dst_stride];

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        temp.par_chunks_mut(dst_stride)
            .zip(data.par_chunks(src_stride))
            .for_each(|(temp_row, src_row)| {
                resample_row_horizontal(src_row, temp_row, &h_contribs);
            });
        output
            .par_chunks_mut(dst_stride)
            .zip(v_contribs.par_iter())
            .for_each(|(dst_row, contrib)| {
                resample_column_vertical(&temp, dst_row, contrib);
            });
    }

    #[cfg(not(feature = "parallel"))]
    {
        for (temp_row, src_row) in temp.chunks_mut(dst_stride).zip(data.chunks(src_stride)) {
            resample_row_horizontal(src_row, temp_row, &h_contribs);
        }
        for (dst_row, contrib) in output.chunks_mut(dst_stride).zip(v_contribs.iter()) {
            resample_column_vertical(&temp, dst_row, contrib);
        }
    }

    debug_assert_eq!(output.len(), dst_height * dst_stride);
}
