use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use enough::Stop;
use log::{debug, warn};

use crate::bmp::{self, Bitmap, RowLayout};
use crate::error::BitmapError;
use crate::gray;
use crate::limits::Limits;

/// Wall-clock time spent in each phase of a conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub total: Duration,
    pub read: Duration,
    pub compute: Duration,
    pub write: Duration,
}

impl fmt::Display for PhaseTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {:.4} s | Read: {:.4} s | Compute: {:.4} s | Write: {:.4} s",
            self.total.as_secs_f64(),
            self.read.as_secs_f64(),
            self.compute.as_secs_f64(),
            self.write.as_secs_f64()
        )
    }
}

/// Builder for a decode → grayscale → encode run.
///
/// ```no_run
/// use graybmp::{GrayscaleRequest, Unstoppable};
///
/// let timings = GrayscaleRequest::new()
///     .with_parallel(false)
///     .convert_file("source.bmp", "output.bmp", &Unstoppable)?;
/// eprintln!("{timings}");
/// # Ok::<(), graybmp::BitmapError>(())
/// ```
#[derive(Clone, Debug)]
pub struct GrayscaleRequest<'a> {
    limits: Option<&'a Limits>,
    row_layout: RowLayout,
    parallel: bool,
    rows_per_chunk: usize,
}

impl Default for GrayscaleRequest<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> GrayscaleRequest<'a> {
    pub fn new() -> Self {
        Self {
            limits: None,
            row_layout: RowLayout::default(),
            parallel: cfg!(feature = "parallel"),
            rows_per_chunk: gray::DEFAULT_ROWS_PER_CHUNK,
        }
    }

    /// Use `limits` instead of [`Limits::default`].
    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn with_row_layout(mut self, row_layout: RowLayout) -> Self {
        self.row_layout = row_layout;
        self
    }

    /// Run the transform on the rayon pool. Ignored without the `parallel`
    /// feature.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_rows_per_chunk(mut self, rows: usize) -> Self {
        self.rows_per_chunk = rows.max(1);
        self
    }

    /// Decode `reader` fully, without transforming.
    pub fn decode<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        stop: &dyn Stop,
    ) -> Result<Bitmap, BitmapError> {
        let default_limits;
        let limits = match self.limits {
            Some(l) => l,
            None => {
                default_limits = Limits::default();
                &default_limits
            }
        };
        bmp::decode(reader, limits, self.row_layout, stop)
    }

    /// Grayscale the pixel buffer of an already decoded bitmap.
    pub fn transform(
        &self,
        bitmap: &mut Bitmap,
        stop: &(dyn Stop + Sync),
    ) -> Result<(), BitmapError> {
        let (width, rows, stride) = (bitmap.width(), bitmap.rows(), bitmap.stride());
        self.run_transform(bitmap.pixels_mut(), width, rows, stride, stop)
    }

    #[cfg(feature = "parallel")]
    fn run_transform(
        &self,
        pixels: &mut [u8],
        width: u32,
        rows: u32,
        stride: usize,
        stop: &(dyn Stop + Sync),
    ) -> Result<(), BitmapError> {
        if self.parallel {
            gray::to_grayscale_parallel(pixels, width, rows, stride, self.rows_per_chunk, stop)
        } else {
            gray::to_grayscale(pixels, width, rows, stride, stop)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_transform(
        &self,
        pixels: &mut [u8],
        width: u32,
        rows: u32,
        stride: usize,
        stop: &(dyn Stop + Sync),
    ) -> Result<(), BitmapError> {
        gray::to_grayscale(pixels, width, rows, stride, stop)
    }

    /// Stream form: read a BMP from `reader`, write the grayscale BMP to
    /// `writer`.
    pub fn convert<R: Read + ?Sized, W: Write + ?Sized>(
        &self,
        reader: &mut R,
        writer: &mut W,
        stop: &(dyn Stop + Sync),
    ) -> Result<PhaseTimings, BitmapError> {
        let start = Instant::now();
        let (bitmap, mut timings) = self.read_and_transform(reader, stop)?;

        let write_start = Instant::now();
        bmp::encode(writer, &bitmap, stop)?;
        timings.write = write_start.elapsed();
        timings.total = start.elapsed();
        debug!("{timings}");
        Ok(timings)
    }

    /// Convert `src` into `dst`.
    ///
    /// `dst` is only created once the source has been decoded and
    /// transformed, so a rejected input leaves no output file behind. If
    /// writing fails, the partial output is removed when it is a regular
    /// file; devices, pipes and symlinks are left alone.
    pub fn convert_file(
        &self,
        src: impl AsRef<Path>,
        dst: impl AsRef<Path>,
        stop: &(dyn Stop + Sync),
    ) -> Result<PhaseTimings, BitmapError> {
        let (src, dst) = (src.as_ref(), dst.as_ref());
        let start = Instant::now();

        let input = File::open(src).map_err(|source| BitmapError::IoOpen {
            path: src.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(input);
        let (bitmap, mut timings) = self.read_and_transform(&mut reader, stop)?;
        drop(reader);

        let write_start = Instant::now();
        write_to_path(dst, |output| write_bitmap(output, &bitmap, stop))?;
        timings.write = write_start.elapsed();
        timings.total = start.elapsed();
        debug!("{} -> {}: {timings}", src.display(), dst.display());
        Ok(timings)
    }

    fn read_and_transform<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        stop: &(dyn Stop + Sync),
    ) -> Result<(Bitmap, PhaseTimings), BitmapError> {
        let mut timings = PhaseTimings::default();

        let read_start = Instant::now();
        let mut bitmap = self.decode(reader, stop)?;
        timings.read = read_start.elapsed();

        let compute_start = Instant::now();
        self.transform(&mut bitmap, stop)?;
        timings.compute = compute_start.elapsed();

        Ok((bitmap, timings))
    }
}

/// Create `dst` and hand it to `write`. If `write` fails, `dst` is removed
/// again unless it already existed as something other than a regular file.
fn write_to_path(
    dst: &Path,
    write: impl FnOnce(File) -> Result<(), BitmapError>,
) -> Result<(), BitmapError> {
    let removable = match fs::symlink_metadata(dst) {
        Ok(meta) => meta.file_type().is_file(),
        Err(e) => e.kind() == ErrorKind::NotFound,
    };
    let output = File::create(dst).map_err(|source| BitmapError::IoOpen {
        path: dst.to_path_buf(),
        source,
    })?;

    // `write` owns the file, so it is closed by the time we clean up
    let Err(e) = write(output) else {
        return Ok(());
    };
    if !removable {
        warn!("write to {} failed; not a regular file, left in place", dst.display());
    } else {
        match fs::remove_file(dst) {
            Ok(()) => warn!("removed partial output {}", dst.display()),
            Err(rm) => warn!("could not remove partial output {}: {rm}", dst.display()),
        }
    }
    Err(e)
}

fn write_bitmap(output: File, bitmap: &Bitmap, stop: &dyn Stop) -> Result<(), BitmapError> {
    let mut writer = BufWriter::new(output);
    if let Err(e) = bmp::encode(&mut writer, bitmap, stop) {
        // drop buffered bytes instead of flushing them again on close
        let (_file, _unwritten) = writer.into_parts();
        return Err(e);
    }
    writer.into_inner().map_err(|e| BitmapError::WriteFailure {
        region: "flush",
        source: e.into_error(),
    })?;
    Ok(())
}
