use crate::error::BitmapError;

/// Default cap on `width * height`.
pub const DEFAULT_MAX_PIXELS: u64 = 1 << 28;
/// Default cap on the pixel buffer allocation (1 GiB).
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = 1 << 30;
/// Default cap on the opaque region between the info header and the pixels.
pub const DEFAULT_MAX_REMAINING_INFO_BYTES: u64 = 16 << 20;
/// Default cap on bytes following the pixel data.
pub const DEFAULT_MAX_TRAILING_BYTES: u64 = 64 << 20;

/// Resource limits for a conversion.
///
/// [`Limits::default`] carries finite bounds so that corrupt headers are
/// rejected before allocating. [`Limits::none`] lifts them; size arithmetic
/// stays overflow-checked either way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum bytes for the pixel buffer allocation.
    pub max_memory_bytes: Option<u64>,
    /// Maximum size of the extended info / gap region.
    pub max_remaining_info_bytes: Option<u64>,
    /// Maximum size of data after the pixel region.
    pub max_trailing_bytes: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_width: None,
            max_height: None,
            max_pixels: Some(DEFAULT_MAX_PIXELS),
            max_memory_bytes: Some(DEFAULT_MAX_MEMORY_BYTES),
            max_remaining_info_bytes: Some(DEFAULT_MAX_REMAINING_INFO_BYTES),
            max_trailing_bytes: Some(DEFAULT_MAX_TRAILING_BYTES),
        }
    }
}

impl Limits {
    /// No limits at all.
    pub fn none() -> Self {
        Self {
            max_width: None,
            max_height: None,
            max_pixels: None,
            max_memory_bytes: None,
            max_remaining_info_bytes: None,
            max_trailing_bytes: None,
        }
    }

    /// Check dimensions against limits.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), BitmapError> {
        let pixels = u64::from(width) * u64::from(height);
        check_bound(self.max_width, "width", u64::from(width))?;
        check_bound(self.max_height, "height", u64::from(height))?;
        check_bound(self.max_pixels, "pixel count", pixels)
    }

    /// Check that the pixel buffer allocation is within memory limits.
    pub(crate) fn check_memory(&self, bytes: usize) -> Result<(), BitmapError> {
        check_bound(self.max_memory_bytes, "pixel buffer bytes", bytes as u64)
    }

    pub(crate) fn check_remaining_info(&self, bytes: usize) -> Result<(), BitmapError> {
        check_bound(self.max_remaining_info_bytes, "remaining info bytes", bytes as u64)
    }

    pub(crate) fn check_trailing(&self, bytes: usize) -> Result<(), BitmapError> {
        check_bound(self.max_trailing_bytes, "trailing data bytes", bytes as u64)
    }
}

fn check_bound(limit: Option<u64>, what: &str, value: u64) -> Result<(), BitmapError> {
    match limit {
        Some(max) if value > max => Err(BitmapError::AllocationLimitExceeded(format!(
            "{what} {value} exceeds limit {max}"
        ))),
        _ => Ok(()),
    }
}
