//! Error types for the tsrimage library.

use std::fmt;
use std::io;

/// Result type alias for tsrimage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while importing, encoding or decoding images.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Reading or writing a file or stream failed.
    Io(io::Error),
    /// The zlib compressor failed while encoding.
    Encode(String),
    /// The compressed payload could not be inflated.
    CorruptData(String),
    /// Input is too short to hold the 8-byte header.
    TruncatedHeader {
        /// Number of bytes actually available.
        actual: usize,
    },
    /// Inflated payload length disagrees with the header dimensions.
    MalformedImage {
        /// Width from the header.
        width: u32,
        /// Height from the header.
        height: u32,
        /// Bytes implied by the header (`3 * width * height`).
        expected: usize,
        /// Bytes actually produced. For oversized payloads this is a lower bound.
        actual: usize,
    },
    /// A resize was asked to produce pixels from an image that has none.
    InvalidDimensions {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
    /// Image area does not fit in addressable memory.
    ImageTooLarge {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
    /// The source image could not be decoded by the raster decoder.
    UnsupportedFormat(String),
    /// Unrecognized quality token.
    InvalidQuality(String),
    /// Pixel buffer length doesn't match the declared dimensions.
    InvalidDataLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes provided.
        actual: usize,
    },
    /// Compression level outside 0-9.
    InvalidCompressionLevel(u8),
}

impl Error {
    /// True for errors that mean the TSR header or payload size is inconsistent.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::TruncatedHeader { .. } | Error::MalformedImage { .. } | Error::ImageTooLarge { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Encode(msg) => write!(f, "Encode error: {}", msg),
            Error::CorruptData(msg) => write!(f, "Corrupt TSR payload: {}", msg),
            Error::TruncatedHeader { actual } => {
                write!(f, "Truncated TSR header: need 8 bytes, got {}", actual)
            }
            Error::MalformedImage {
                width,
                height,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Malformed TSR image: {}x{} needs {} payload bytes, got {}",
                    width, height, expected, actual
                )
            }
            Error::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
            Error::ImageTooLarge { width, height } => {
                write!(f, "Image {}x{} is too large to address", width, height)
            }
            Error::UnsupportedFormat(msg) => write!(f, "Unsupported source image: {}", msg),
            Error::InvalidQuality(token) => {
                write!(
                    f,
                    "Invalid quality {:?}: expected one of 100%, 75%, 50%, 25%",
                    token
                )
            }
            Error::InvalidDataLength { expected, actual } => {
                write!(
                    f,
                    "Invalid pixel data length: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Error::InvalidCompressionLevel(level) => {
                write!(f, "Invalid compression level {}: must be 0-9", level)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
