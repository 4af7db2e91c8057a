use std::io;
use std::path::PathBuf;

use enough::StopReason;

/// Errors from BMP decoding, grayscale conversion and encoding.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BitmapError {
    #[error("cannot open {}: {source}", .path.display())]
    IoOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("truncated input: {region} needs {needed} bytes, got {actual}")]
    TruncatedInput {
        region: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error(
        "unsupported BMP: expecting uncompressed 24 BPP, got {bits_per_pixel} BPP with compression {compression}"
    )]
    UnsupportedFormat { bits_per_pixel: u16, compression: u32 },

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("allocation limit exceeded: {0}")]
    AllocationLimitExceeded(String),

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("read error in {region}: {source}")]
    Read {
        region: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("write failure in {region}: {source}")]
    WriteFailure {
        region: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

impl From<StopReason> for BitmapError {
    fn from(r: StopReason) -> Self {
        BitmapError::Cancelled(r)
    }
}
