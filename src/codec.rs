//! TSR container encoder and decoder.
//!
//! Layout:
//!
//! | Offset | Size | Field   | Encoding                                   |
//! |--------|------|---------|--------------------------------------------|
//! | 0      | 4    | width   | `u32`, little-endian                       |
//! | 4      | 4    | height  | `u32`, little-endian                       |
//! | 8      | rest | payload | zlib stream of row-major RGB, 3 bytes/pixel |
//!
//! The payload always inflates to exactly `3 * width * height` bytes.
//!
//! # Example
//!
//! ```rust
//! use tsrimage::{codec, PixelMatrix};
//!
//! # fn main() -> tsrimage::Result<()> {
//! let matrix = PixelMatrix::filled(2, 2, [255, 0, 0])?;
//! let bytes = codec::encode(&matrix)?;
//! assert_eq!(&bytes[..8], &[2, 0, 0, 0, 2, 0, 0, 0]);
//! assert_eq!(codec::decode(&bytes)?, matrix);
//! # Ok(())
//! # }
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

use crate::error::{Error, Result};
use crate::matrix::{byte_len, PixelMatrix};

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 8;

/// Highest zlib compression level.
pub const MAX_COMPRESSION_LEVEL: u8 = 9;

/// Upper bound on the DEFLATE expansion ratio, used to size the first
/// inflate window without trusting the header.
const MAX_DEFLATE_RATIO: usize = 1032;

/// Smallest inflate window.
const MIN_INFLATE_WINDOW: usize = 4 * 1024;

/// Parsed TSR header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl Header {
    /// Serialize to the on-disk 8-byte form.
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&self.width.to_le_bytes());
        out[4..].copy_from_slice(&self.height.to_le_bytes());
        out
    }

    /// Parse the first 8 bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::TruncatedHeader { actual: data.len() });
        }
        let width = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let height = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        Ok(Self { width, height })
    }

    /// Inflated payload size implied by this header.
    pub fn payload_len(self) -> Result<usize> {
        byte_len(self.width, self.height)
    }
}

/// Encoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// zlib compression level (0-9, default 9).
    pub compression_level: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::max_compression()
    }
}

impl EncodeOptions {
    /// Level 1.
    pub fn fast() -> Self {
        Self {
            compression_level: 1,
        }
    }

    /// Level 6, zlib's own default.
    pub fn balanced() -> Self {
        Self {
            compression_level: 6,
        }
    }

    /// Level 9. TSR files are written once, so ratio wins over speed.
    pub fn max_compression() -> Self {
        Self {
            compression_level: MAX_COMPRESSION_LEVEL,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(Error::InvalidCompressionLevel(self.compression_level));
        }
        Ok(())
    }
}

/// Encode a matrix at maximum compression.
pub fn encode(matrix: &PixelMatrix) -> Result<Vec<u8>> {
    encode_with_options(matrix, &EncodeOptions::default())
}

/// Encode a matrix with explicit options.
pub fn encode_with_options(matrix: &PixelMatrix, options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    encode_into(&mut output, matrix, options)?;
    Ok(output)
}

/// Encode into a caller-provided buffer.
///
/// The buffer is cleared first, so it can be reused across calls.
pub fn encode_into(output: &mut Vec<u8>, matrix: &PixelMatrix, options: &EncodeOptions) -> Result<()> {
    options.validate()?;
    output.clear();
    output.reserve(HEADER_LEN + matrix.as_raw().len() / 4 + 64);

    let header = Header {
        width: matrix.width(),
        height: matrix.height(),
    };
    output.extend_from_slice(&header.to_bytes());

    let mut encoder = ZlibEncoder::new(
        &mut *output,
        Compression::new(u32::from(options.compression_level)),
    );
    encoder
        .write_all(matrix.as_raw())
        .map_err(|e| Error::Encode(e.to_string()))?;
    encoder.finish().map_err(|e| Error::Encode(e.to_string()))?;

    log::debug!(
        "encoded {}x{} ({} raw bytes) into {} bytes at level {}",
        header.width,
        header.height,
        matrix.as_raw().len(),
        output.len(),
        options.compression_level
    );
    Ok(())
}

/// Encode and write to any sink.
pub fn write_to<W: Write>(mut writer: W, matrix: &PixelMatrix, options: &EncodeOptions) -> Result<()> {
    let bytes = encode_with_options(matrix, options)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Encode and write a complete file at `path`.
///
/// The bytes are written to a temporary sibling first and renamed into
/// place, so readers never observe a partially written file.
pub fn save(path: impl AsRef<Path>, matrix: &PixelMatrix, options: &EncodeOptions) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_with_options(matrix, options)?;
    let tmp = temp_sibling(path);

    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(&bytes)?;
        file.sync_all()
    });
    if let Err(err) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }

    log::debug!("saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.tsr".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

/// Parse only the header of a TSR byte stream.
pub fn read_header(data: &[u8]) -> Result<Header> {
    Header::parse(data)
}

/// Decode a complete TSR byte stream.
///
/// # Errors
///
/// - [`Error::TruncatedHeader`] when fewer than 8 bytes are given.
/// - [`Error::ImageTooLarge`] when the header area cannot be addressed.
/// - [`Error::CorruptData`] when the zlib stream is invalid, truncated or
///   followed by trailing bytes.
/// - [`Error::MalformedImage`] when the stream inflates to a length other
///   than `3 * width * height`.
pub fn decode(data: &[u8]) -> Result<PixelMatrix> {
    let header = Header::parse(data)?;
    let expected = header.payload_len()?;
    let payload = &data[HEADER_LEN..];

    let pixels = inflate_exact(payload, header, expected)?;
    log::debug!(
        "decoded {}x{} from {} compressed bytes",
        header.width,
        header.height,
        payload.len()
    );
    PixelMatrix::new(header.width, header.height, pixels)
}

/// Read a whole TSR stream from `reader` and decode it.
pub fn read_from<R: Read>(mut reader: R) -> Result<PixelMatrix> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode(&data)
}

/// Read and decode the TSR file at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<PixelMatrix> {
    let data = fs::read(path.as_ref())?;
    decode(&data)
}

/// Inflate a zlib stream that must produce exactly `expected` bytes.
///
/// Never produces more than `expected + 1` bytes of output, so a forged
/// header or payload cannot make the decoder allocate without bound.
fn inflate_exact(payload: &[u8], header: Header, expected: usize) -> Result<Vec<u8>> {
    let limit = expected.saturating_add(1);
    let window = payload
        .len()
        .saturating_mul(MAX_DEFLATE_RATIO)
        .max(MIN_INFLATE_WINDOW);
    let mut out = vec![0u8; limit.min(window)];
    let mut inflater = Decompress::new(true);

    loop {
        let read = inflater.total_in() as usize;
        let written = inflater.total_out() as usize;
        let status = inflater
            .decompress(&payload[read..], &mut out[written..], FlushDecompress::None)
            .map_err(|e| Error::CorruptData(e.to_string()))?;
        let now_read = inflater.total_in() as usize;
        let now_written = inflater.total_out() as usize;

        match status {
            Status::StreamEnd => {
                out.truncate(now_written);
                if now_read != payload.len() {
                    return Err(Error::CorruptData(format!(
                        "{} trailing bytes after zlib stream",
                        payload.len() - now_read
                    )));
                }
                break;
            }
            Status::Ok | Status::BufError => {
                if now_written == out.len() {
                    if out.len() >= limit {
                        return Err(Error::MalformedImage {
                            width: header.width,
                            height: header.height,
                            expected,
                            actual: now_written,
                        });
                    }
                    let grown = out.len().saturating_mul(2).min(limit);
                    out.resize(grown, 0);
                } else if now_read == payload.len() {
                    return Err(Error::CorruptData("zlib stream is truncated".into()));
                } else if now_read == read && now_written == written {
                    return Err(Error::CorruptData("zlib stream made no progress".into()));
                }
            }
        }
    }

    if out.len() != expected {
        return Err(Error::MalformedImage {
            width: header.width,
            height: header.height,
            expected,
            actual: out.len(),
        });
    }
    Ok(out)
}
