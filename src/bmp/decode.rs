//! BMP decoder: header regions, validation, and the raw pixel buffer.

use std::io::{ErrorKind, Read};

use enough::Stop;
use log::debug;

use super::{
    Bitmap, BmpHeader, BmpInfoHeader, COMMON_INFO_SIZE, HEADER_SIZE, MIN_DATA_OFFSET, RowLayout,
};
use crate::error::BitmapError;
use crate::limits::Limits;

pub(crate) fn decode_bitmap<R: Read + ?Sized>(
    reader: &mut R,
    limits: &Limits,
    row_layout: RowLayout,
    stop: &dyn Stop,
) -> Result<Bitmap, BitmapError> {
    let mut header = [0u8; HEADER_SIZE];
    read_region(reader, &mut header, "file header")?;
    let header = BmpHeader::from_bytes(header);

    let mut info = [0u8; COMMON_INFO_SIZE];
    read_region(reader, &mut info, "info header")?;
    let info = BmpInfoHeader::from_bytes(info);

    debug!(
        "BMP header: data_offset={} width={} height={} bpp={} compression={}",
        header.data_offset(),
        info.width(),
        info.height(),
        info.bits_per_pixel(),
        info.compression()
    );

    validate_format(&info)?;

    let remaining_size = remaining_info_size(header.data_offset())?;
    limits.check_remaining_info(remaining_size)?;
    let remaining_info = read_declared(reader, remaining_size, "remaining info")?;

    stop.check()?;

    let width = info.width();
    let rows = row_count(&info)?;
    limits.check(width, rows)?;

    let stride = row_layout
        .stride(width)
        .ok_or_else(|| too_large(width, rows))?;
    let buffer_size = stride
        .checked_mul(rows as usize)
        .ok_or_else(|| too_large(width, rows))?;
    limits.check_memory(buffer_size)?;
    debug!("pixel region: {rows} rows x {stride} bytes ({row_layout:?})");

    let pixels = read_declared(reader, buffer_size, "pixel data")?;

    stop.check()?;

    let trailing = read_trailing(reader, limits)?;
    if !trailing.is_empty() {
        debug!("{} trailing bytes after pixel data", trailing.len());
    }

    Ok(Bitmap {
        header,
        info,
        remaining_info,
        pixels,
        trailing,
        width,
        rows,
        stride,
    })
}

fn validate_format(info: &BmpInfoHeader) -> Result<(), BitmapError> {
    let bits_per_pixel = info.bits_per_pixel();
    let compression = info.compression();
    if bits_per_pixel != 24 || compression != 0 {
        return Err(BitmapError::UnsupportedFormat {
            bits_per_pixel,
            compression,
        });
    }
    Ok(())
}

/// Size of the opaque region between the common info header and the pixels.
pub(crate) fn remaining_info_size(data_offset: u32) -> Result<usize, BitmapError> {
    (data_offset as usize)
        .checked_sub(MIN_DATA_OFFSET)
        .ok_or_else(|| {
            BitmapError::MalformedHeader(format!(
                "data offset {data_offset} is smaller than the {MIN_DATA_OFFSET} header bytes"
            ))
        })
}

fn row_count(info: &BmpInfoHeader) -> Result<u32, BitmapError> {
    let height = info.height();
    if height == i32::MIN {
        return Err(BitmapError::MalformedHeader(format!(
            "height {height} has no positive counterpart"
        )));
    }
    Ok(height.unsigned_abs())
}

fn too_large(width: u32, rows: u32) -> BitmapError {
    BitmapError::AllocationLimitExceeded(format!(
        "pixel buffer for {width}x{rows} overflows the address space"
    ))
}

/// Largest allocation made before any of a region's bytes have arrived.
const INITIAL_REGION_CAPACITY: usize = 1 << 20;

/// Read a region whose length comes from the header. The buffer grows only
/// as data arrives, so a header that over-declares its size fails with
/// `TruncatedInput` without allocating the declared amount.
fn read_declared<R: Read + ?Sized>(
    reader: &mut R,
    len: usize,
    region: &'static str,
) -> Result<Vec<u8>, BitmapError> {
    let mut buf = Vec::new();
    let initial = len.min(INITIAL_REGION_CAPACITY);
    buf.try_reserve_exact(initial).map_err(|e| {
        BitmapError::AllocationLimitExceeded(format!("{region} of {len} bytes: {e}"))
    })?;
    (&mut *reader)
        .take(len as u64)
        .read_to_end(&mut buf)
        .map_err(|source| BitmapError::Read { region, source })?;
    if buf.len() < len {
        return Err(BitmapError::TruncatedInput {
            region,
            needed: len,
            actual: buf.len(),
        });
    }
    Ok(buf)
}

/// Fill `buf` completely, reporting how far we got if the stream ends early.
fn read_region<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    region: &'static str,
) -> Result<(), BitmapError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(BitmapError::TruncatedInput {
                    region,
                    needed: buf.len(),
                    actual: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(source) => return Err(BitmapError::Read { region, source }),
        }
    }
    Ok(())
}

fn read_trailing<R: Read + ?Sized>(reader: &mut R, limits: &Limits) -> Result<Vec<u8>, BitmapError> {
    let mut trailing = Vec::new();
    let result = match limits.max_trailing_bytes {
        // one byte past the limit is enough to tell that it was exceeded
        Some(max) => (&mut *reader)
            .take(max.saturating_add(1))
            .read_to_end(&mut trailing),
        None => reader.read_to_end(&mut trailing),
    };
    result.map_err(|source| BitmapError::Read {
        region: "trailing data",
        source,
    })?;
    limits.check_trailing(trailing.len())?;
    Ok(trailing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enough::Unstoppable;

    fn header_bytes(width: u32, height: i32, bpp: u16, compression: u32, offset: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"BM");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&40u32.to_le_bytes());
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&bpp.to_le_bytes());
        out.extend_from_slice(&compression.to_le_bytes());
        out.extend_from_slice(&[0u8; 20]);
        out
    }

    fn decode(data: &[u8], layout: RowLayout) -> Result<Bitmap, BitmapError> {
        let mut cursor = data;
        decode_bitmap(&mut cursor, &Limits::default(), layout, &Unstoppable)
    }

    #[test]
    fn remaining_info_size_underflow_is_malformed() {
        assert_eq!(remaining_info_size(54).unwrap(), 0);
        assert_eq!(remaining_info_size(138).unwrap(), 84);
        assert!(matches!(
            remaining_info_size(53),
            Err(BitmapError::MalformedHeader(_))
        ));
        assert!(matches!(
            remaining_info_size(0),
            Err(BitmapError::MalformedHeader(_))
        ));
    }

    #[test]
    fn short_file_header() {
        match decode(&[b'B', b'M', 0, 0], RowLayout::Padded) {
            Err(BitmapError::TruncatedInput {
                region,
                needed,
                actual,
            }) => {
                assert_eq!(region, "file header");
                assert_eq!(needed, HEADER_SIZE);
                assert_eq!(actual, 4);
            }
            other => panic!("expected TruncatedInput, got {other:?}"),
        }
    }

    #[test]
    fn short_info_header() {
        let data = header_bytes(1, 1, 24, 0, 54);
        match decode(&data[..30], RowLayout::Padded) {
            Err(BitmapError::TruncatedInput { region, actual, .. }) => {
                assert_eq!(region, "info header");
                assert_eq!(actual, 16);
            }
            other => panic!("expected TruncatedInput, got {other:?}"),
        }
    }

    #[test]
    fn compression_upper_bits_are_rejected() {
        let data = header_bytes(1, 1, 24, 0x0001_0000, 54);
        match decode(&data, RowLayout::Padded) {
            Err(BitmapError::UnsupportedFormat { compression, .. }) => {
                assert_eq!(compression, 0x0001_0000)
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn format_is_checked_before_offset() {
        let data = header_bytes(1, 1, 32, 0, 10);
        assert!(matches!(
            decode(&data, RowLayout::Padded),
            Err(BitmapError::UnsupportedFormat {
                bits_per_pixel: 32,
                ..
            })
        ));
    }

    #[test]
    fn min_height_is_malformed() {
        let data = header_bytes(1, i32::MIN, 24, 0, 54);
        assert!(matches!(
            decode(&data, RowLayout::Padded),
            Err(BitmapError::MalformedHeader(_))
        ));
    }

    #[test]
    fn top_down_rows_are_counted() {
        let mut data = header_bytes(1, -2, 24, 0, 54);
        data.extend_from_slice(&[1, 2, 3, 0, 4, 5, 6, 0]);
        let bmp = decode(&data, RowLayout::Padded).unwrap();
        assert_eq!(bmp.rows(), 2);
        assert_eq!(bmp.stride(), 4);
        assert!(bmp.info().is_top_down());
    }

    #[test]
    fn huge_dimensions_rejected_before_allocation() {
        let data = header_bytes(u32::MAX, i32::MAX, 24, 0, 54);
        assert!(matches!(
            decode(&data, RowLayout::Padded),
            Err(BitmapError::AllocationLimitExceeded(_))
        ));
    }

    #[test]
    fn unlimited_overflow_still_rejected() {
        let data = header_bytes(u32::MAX, i32::MAX, 24, 0, 54);
        let mut cursor = &data[..];
        let result = decode_bitmap(&mut cursor, &Limits::none(), RowLayout::Padded, &Unstoppable);
        assert!(matches!(
            result,
            Err(BitmapError::AllocationLimitExceeded(_))
        ));
    }

    #[test]
    fn over_declared_pixels_fail_without_allocating() {
        // 2^20 x 2^20 pixels would need terabytes; the file has none of them
        let data = header_bytes(1 << 20, 1 << 20, 24, 0, 54);
        let mut cursor = &data[..];
        match decode_bitmap(&mut cursor, &Limits::none(), RowLayout::Padded, &Unstoppable) {
            Err(BitmapError::TruncatedInput {
                region,
                needed,
                actual,
            }) => {
                assert_eq!(region, "pixel data");
                assert_eq!(needed, 3 << 40);
                assert_eq!(actual, 0);
            }
            other => panic!("expected TruncatedInput, got {other:?}"),
        }
    }

    #[test]
    fn large_region_read_in_full() {
        let (w, h) = (700u32, 600i32);
        let stride = RowLayout::Padded.stride(w).unwrap();
        let mut data = header_bytes(w, h, 24, 0, 54);
        let pixel_len = stride * h as usize;
        assert!(pixel_len > INITIAL_REGION_CAPACITY);
        data.extend((0..pixel_len).map(|i| i as u8));
        let bmp = decode(&data, RowLayout::Padded).unwrap();
        assert_eq!(bmp.pixels().len(), pixel_len);
        assert_eq!(bmp.pixels(), &data[54..]);
    }

    #[test]
    fn remaining_info_limit_applies() {
        let data = header_bytes(1, 1, 24, 0, 54 + 100);
        let limits = Limits {
            max_remaining_info_bytes: Some(64),
            ..Limits::default()
        };
        let mut cursor = &data[..];
        let result = decode_bitmap(&mut cursor, &limits, RowLayout::Padded, &Unstoppable);
        assert!(matches!(
            result,
            Err(BitmapError::AllocationLimitExceeded(_))
        ));
    }

    #[test]
    fn trailing_limit_applies() {
        let mut data = header_bytes(1, 1, 24, 0, 54);
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&[9u8; 10]);
        let limits = Limits {
            max_trailing_bytes: Some(8),
            ..Limits::default()
        };
        let mut cursor = &data[..];
        let result = decode_bitmap(&mut cursor, &limits, RowLayout::Padded, &Unstoppable);
        assert!(matches!(
            result,
            Err(BitmapError::AllocationLimitExceeded(_))
        ));
    }

    #[test]
    fn read_errors_keep_region() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk on fire"))
            }
        }
        match decode_bitmap(&mut Broken, &Limits::default(), RowLayout::Padded, &Unstoppable) {
            Err(BitmapError::Read { region, .. }) => assert_eq!(region, "file header"),
            other => panic!("expected Read error, got {other:?}"),
        }
    }
}
