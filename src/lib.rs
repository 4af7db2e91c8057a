//! # graybmp
//!
//! Grayscale conversion for uncompressed 24-bit BMP images.
//!
//! The container codec reads the 14-byte file header and the 40-byte common
//! info header, validates that the image is 24 bits per pixel with no
//! compression, and carries every other byte (extended info fields, gaps,
//! row padding, data after the pixels) through unchanged. Only pixel values
//! change, so the output has exactly the same layout and size as the input.
//!
//! Pixels are converted with a fixed-point BT.601 luma,
//! `(77*R + 150*G + 29*B + 128) >> 8`, written back into all three channels.
//!
//! ## Non-Goals
//!
//! - Compressed (RLE, bitfields), palette, or non-24-bit BMPs
//! - Streaming: the whole pixel buffer is held in memory
//!
//! ## Usage
//!
//! ```no_run
//! use graybmp::{GrayscaleRequest, Limits, RowLayout, Unstoppable};
//!
//! let limits = Limits {
//!     max_pixels: Some(100_000_000),
//!     ..Limits::default()
//! };
//! let input: &[u8] = &[]; // your BMP bytes
//! let mut output = Vec::new();
//! let timings = GrayscaleRequest::new()
//!     .with_limits(&limits)
//!     .with_row_layout(RowLayout::Padded)
//!     .convert(&mut &input[..], &mut output, &Unstoppable)?;
//! eprintln!("{timings}");
//! # Ok::<(), graybmp::BitmapError>(())
//! ```

#![forbid(unsafe_code)]

mod error;
mod limits;
mod pipeline;

pub mod bmp;
pub mod gray;

// Re-exports
pub use bmp::{Bitmap, BmpHeader, BmpInfoHeader, RowLayout};
pub use enough::{Stop, StopReason, Unstoppable};
pub use error::BitmapError;
pub use gray::{luma, to_grayscale};
#[cfg(feature = "parallel")]
pub use gray::to_grayscale_parallel;
pub use limits::Limits;
pub use pipeline::{GrayscaleRequest, PhaseTimings};
