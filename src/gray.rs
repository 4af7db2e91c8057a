//! Fixed-point BT.601 grayscale over BGR pixel rows.
//!
//! `y = (77*r + 150*g + 29*b + 128) >> 8`, i.e. 0.299/0.587/0.114 scaled by
//! 256 with round-half-up. The result is written back into all three
//! channels, so the buffer stays 24-bit BGR. Row padding is left untouched.

use enough::Stop;

use crate::bmp::BYTES_PER_PIXEL;
use crate::error::BitmapError;

pub const LUMA_R: u32 = 77;
pub const LUMA_G: u32 = 150;
pub const LUMA_B: u32 = 29;
const ROUNDING: u32 = 128;

/// Rows handed to a single worker at a time.
pub const DEFAULT_ROWS_PER_CHUNK: usize = 64;

/// Gray level for one pixel.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = LUMA_R * u32::from(r) + LUMA_G * u32::from(g) + LUMA_B * u32::from(b) + ROUNDING;
    // coefficients sum to 256, so y >> 8 <= 255
    (y >> 8) as u8
}

#[inline]
fn gray_row(row: &mut [u8]) {
    for px in row.chunks_exact_mut(BYTES_PER_PIXEL) {
        let y = luma(px[2], px[1], px[0]);
        px.fill(y);
    }
}

/// Validate the geometry and return (region length, pixel bytes per row).
fn region(len: usize, width: u32, height: u32, stride: usize) -> Result<(usize, usize), BitmapError> {
    let row_bytes = (width as usize)
        .checked_mul(BYTES_PER_PIXEL)
        .ok_or_else(|| BitmapError::AllocationLimitExceeded(format!("row of {width} pixels")))?;
    if row_bytes > stride {
        return Err(BitmapError::BufferTooSmall {
            needed: row_bytes,
            actual: stride,
        });
    }
    let needed = stride
        .checked_mul(height as usize)
        .ok_or_else(|| BitmapError::AllocationLimitExceeded(format!("{height} rows of {stride} bytes")))?;
    if len < needed {
        return Err(BitmapError::BufferTooSmall {
            needed,
            actual: len,
        });
    }
    Ok((needed, row_bytes))
}

/// Convert `height` rows of `width` BGR pixels in place, one row at a time.
pub fn to_grayscale(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    stride: usize,
    stop: &dyn Stop,
) -> Result<(), BitmapError> {
    let (len, row_bytes) = region(pixels.len(), width, height, stride)?;
    if len == 0 {
        return Ok(());
    }
    for (i, row) in pixels[..len].chunks_exact_mut(stride).enumerate() {
        if i % 16 == 0 {
            stop.check()?;
        }
        gray_row(&mut row[..row_bytes]);
    }
    Ok(())
}

/// Parallel variant of [`to_grayscale`].
///
/// The buffer is split into disjoint chunks of `rows_per_chunk` rows and
/// processed on the rayon pool. The stop token is checked before each chunk.
#[cfg(feature = "parallel")]
pub fn to_grayscale_parallel(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    stride: usize,
    rows_per_chunk: usize,
    stop: &(dyn Stop + Sync),
) -> Result<(), BitmapError> {
    use rayon::prelude::*;

    let (len, row_bytes) = region(pixels.len(), width, height, stride)?;
    if len == 0 {
        return Ok(());
    }
    let chunk_len = stride.saturating_mul(rows_per_chunk.max(1));
    pixels[..len]
        .par_chunks_mut(chunk_len)
        .try_for_each(|chunk| -> Result<(), BitmapError> {
            stop.check()?;
            for row in chunk.chunks_exact_mut(stride) {
                gray_row(&mut row[..row_bytes]);
            }
            Ok(())
        })
}
