//! BMP encoder: verbatim region passthrough.

use std::io::Write;

use enough::Stop;

use super::Bitmap;
use crate::error::BitmapError;

/// Write all regions in file order. Headers are not re-validated and no
/// offsets are recomputed.
pub(crate) fn encode_bitmap<W: Write + ?Sized>(
    writer: &mut W,
    bitmap: &Bitmap,
    stop: &dyn Stop,
) -> Result<(), BitmapError> {
    write_region(writer, bitmap.header.as_bytes(), "file header")?;
    write_region(writer, bitmap.info.as_bytes(), "info header")?;
    write_region(writer, &bitmap.remaining_info, "remaining info")?;

    stop.check()?;

    write_region(writer, &bitmap.pixels, "pixel data")?;
    write_region(writer, &bitmap.trailing, "trailing data")?;

    writer.flush().map_err(|source| BitmapError::WriteFailure {
        region: "flush",
        source,
    })
}

fn write_region<W: Write + ?Sized>(
    writer: &mut W,
    bytes: &[u8],
    region: &'static str,
) -> Result<(), BitmapError> {
    writer
        .write_all(bytes)
        .map_err(|source| BitmapError::WriteFailure { region, source })
}
