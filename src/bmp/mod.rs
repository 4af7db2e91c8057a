//! BMP container codec for uncompressed 24-bit images.
//!
//! Only the fields needed for validation and sizing are interpreted: the data
//! offset in the file header, and width, height, bit depth and compression in
//! the common 40-byte info header. Everything else (extended V4/V5 fields,
//! bitfield masks, gaps, data after the pixels) is carried as opaque bytes and
//! written back unchanged.

mod decode;
mod encode;

use std::io::{Read, Write};

use enough::Stop;

use crate::error::BitmapError;
use crate::limits::Limits;

/// Size of the BITMAPFILEHEADER.
pub const HEADER_SIZE: usize = 14;
/// Size of the common part of BITMAPINFOHEADER.
pub const COMMON_INFO_SIZE: usize = 40;
/// Smallest legal pixel data offset.
pub const MIN_DATA_OFFSET: usize = HEADER_SIZE + COMMON_INFO_SIZE;

const DATA_OFFSET_POS: usize = 10;
const WIDTH_POS: usize = 4;
const HEIGHT_POS: usize = 8;
const BPP_POS: usize = 14;
const COMPRESSION_POS: usize = 16;

/// Bytes per BGR pixel.
pub const BYTES_PER_PIXEL: usize = 3;

#[inline]
pub(crate) fn le16(b: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([b[pos], b[pos + 1]])
}

#[inline]
pub(crate) fn le32(b: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([b[pos], b[pos + 1], b[pos + 2], b[pos + 3]])
}

/// How pixel rows are laid out in the pixel region.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowLayout {
    /// Standard BMP: every row padded to a multiple of 4 bytes.
    #[default]
    Padded,
    /// Rows packed back to back (`width * 3` bytes each), as written by
    /// some legacy tools.
    Packed,
}

impl RowLayout {
    /// Bytes per row for `width` pixels, or `None` on overflow.
    pub fn stride(self, width: u32) -> Option<usize> {
        let row_bytes = (width as usize).checked_mul(BYTES_PER_PIXEL)?;
        match self {
            Self::Padded => row_bytes.checked_add(3).map(|r| r & !3),
            Self::Packed => Some(row_bytes),
        }
    }
}

/// The fixed 14-byte file header, kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BmpHeader {
    bytes: [u8; HEADER_SIZE],
}

impl BmpHeader {
    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.bytes
    }

    /// Offset from the start of the file to the pixel data.
    pub fn data_offset(&self) -> u32 {
        le32(&self.bytes, DATA_OFFSET_POS)
    }
}

/// The common 40-byte part of the info header, kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BmpInfoHeader {
    bytes: [u8; COMMON_INFO_SIZE],
}

impl BmpInfoHeader {
    pub fn from_bytes(bytes: [u8; COMMON_INFO_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; COMMON_INFO_SIZE] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        le32(&self.bytes, WIDTH_POS)
    }

    /// Raw signed height. Negative means the rows are stored top-down.
    pub fn height(&self) -> i32 {
        le32(&self.bytes, HEIGHT_POS) as i32
    }

    pub fn bits_per_pixel(&self) -> u16 {
        le16(&self.bytes, BPP_POS)
    }

    /// Full 32-bit compression code.
    pub fn compression(&self) -> u32 {
        le32(&self.bytes, COMPRESSION_POS)
    }

    pub fn is_top_down(&self) -> bool {
        self.height() < 0
    }
}

/// A decoded BMP: header regions plus the owned pixel buffer.
#[derive(Clone, Debug)]
pub struct Bitmap {
    pub(crate) header: BmpHeader,
    pub(crate) info: BmpInfoHeader,
    pub(crate) remaining_info: Vec<u8>,
    pub(crate) pixels: Vec<u8>,
    pub(crate) trailing: Vec<u8>,
    pub(crate) width: u32,
    pub(crate) rows: u32,
    pub(crate) stride: usize,
}

impl Bitmap {
    pub fn header(&self) -> &BmpHeader {
        &self.header
    }

    pub fn info(&self) -> &BmpInfoHeader {
        &self.info
    }

    /// Extended info fields, masks and gap bytes between the info header and
    /// the pixel data.
    pub fn remaining_info(&self) -> &[u8] {
        &self.remaining_info
    }

    /// Pixel region in file order, including any row padding.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Bytes following the pixel region.
    pub fn trailing(&self) -> &[u8] {
        &self.trailing
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of pixel rows (absolute value of the header height).
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Bytes per row in the pixel region.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Total number of bytes [`encode`] will write.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE
            + COMMON_INFO_SIZE
            + self.remaining_info.len()
            + self.pixels.len()
            + self.trailing.len()
    }
}

/// Decode a 24-bit uncompressed BMP from `reader`.
pub fn decode<R: Read + ?Sized>(
    reader: &mut R,
    limits: &Limits,
    row_layout: RowLayout,
    stop: &dyn Stop,
) -> Result<Bitmap, BitmapError> {
    decode::decode_bitmap(reader, limits, row_layout, stop)
}

/// Decode from an in-memory byte slice.
pub fn decode_bytes(
    data: &[u8],
    limits: &Limits,
    row_layout: RowLayout,
    stop: &dyn Stop,
) -> Result<Bitmap, BitmapError> {
    let mut cursor = data;
    decode::decode_bitmap(&mut cursor, limits, row_layout, stop)
}

/// Write every region of `bitmap` to `writer`, verbatim and in file order.
pub fn encode<W: Write + ?Sized>(
    writer: &mut W,
    bitmap: &Bitmap,
    stop: &dyn Stop,
) -> Result<(), BitmapError> {
    encode::encode_bitmap(writer, bitmap, stop)
}

/// Encode into a freshly allocated `Vec`.
pub fn encode_to_vec(bitmap: &Bitmap, stop: &dyn Stop) -> Result<Vec<u8>, BitmapError> {
    let mut out = Vec::with_capacity(bitmap.encoded_len());
    encode::encode_bitmap(&mut out, bitmap, stop)?;
    Ok(out)
}
