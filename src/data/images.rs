use std::io::Cursor;
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{NetError, Result};

const LABEL_MAGIC: u32 = 2049;
const IMAGE_MAGIC: u32 = 2051;
const MAX_COUNT: usize = 100_000;
const MAX_SIDE: usize = 128;

/// A source of labelled greyscale images, as consumed by
/// [`ExampleSet::from_images`](crate::data::ExampleSet::from_images).
pub trait LabelledImages {
    fn count(&self) -> usize;
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn label(&self, n: usize) -> u8;
    /// Row-major pixels of image `n`, `rows() * cols()` bytes.
    fn pixels(&self, n: usize) -> &[u8];
    fn max_label(&self) -> u8;
}

/// Images and labels read from a pair of IDX files (the MNIST format).
///
/// # IDX1 label file layout
/// ```text
/// bytes  0-3:   magic 2049  (big-endian u32)
/// bytes  4-7:   N           (number of labels, big-endian u32)
/// bytes  8..:   N bytes, one label each
/// ```
///
/// # IDX3 image file layout
/// ```text
/// bytes  0-3:   magic 2051  (big-endian u32)
/// bytes  4-7:   N           (number of images, big-endian u32)
/// bytes  8-11:  rows        (big-endian u32)
/// bytes 12-15:  cols        (big-endian u32)
/// bytes 16..:   N * rows * cols bytes, row-major, uint8
/// ```
#[derive(Debug, Clone)]
pub struct IdxImages {
    rows: usize,
    cols: usize,
    labels: Vec<u8>,
    pixels: Vec<u8>,
    max_label: u8,
}

impl IdxImages {
    /// Reads `len` images starting at image `start` (`len == 0` means all
    /// remaining from the file's count).
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        label_path: P,
        image_path: Q,
        start: usize,
        len: usize,
    ) -> Result<IdxImages> {
        let label_bytes = std::fs::read(label_path)?;
        let image_bytes = std::fs::read(image_path)?;
        IdxImages::from_bytes(&label_bytes, &image_bytes, start, len)
    }

    pub fn from_bytes(
        label_bytes: &[u8],
        image_bytes: &[u8],
        start: usize,
        len: usize,
    ) -> Result<IdxImages> {
        // ── Label file ──────────────────────────────────────────────────────
        let mut r = Cursor::new(label_bytes);
        let magic = r.read_u32::<BigEndian>()?;
        if magic != LABEL_MAGIC {
            return Err(NetError::Format(format!(
                "incorrect magic number in label file: {:#x}", magic
            )));
        }
        let count = r.read_u32::<BigEndian>()? as usize;
        if count > MAX_COUNT {
            return Err(NetError::Format(format!(
                "unfeasibly large count in label file: {}", count
            )));
        }
        let len = if len == 0 { count.saturating_sub(start) } else { len };
        if len == 0 || start.checked_add(len).map_or(true, |end| end > count) {
            return Err(NetError::Range(format!(
                "requested {} images from image {}, only {} in label file",
                len, start, count
            )));
        }
        let label_data = &label_bytes[8..];
        if label_data.len() < start + len {
            return Err(NetError::Format(format!(
                "not enough labels in label file: need {}, have {}",
                start + len, label_data.len()
            )));
        }
        let labels = label_data[start..start + len].to_vec();

        // ── Image file ──────────────────────────────────────────────────────
        let mut r = Cursor::new(image_bytes);
        let magic = r.read_u32::<BigEndian>()?;
        if magic != IMAGE_MAGIC {
            return Err(NetError::Format(format!(
                "incorrect magic number in image file: {:#x}", magic
            )));
        }
        let count2 = r.read_u32::<BigEndian>()? as usize;
        if count2 != count {
            return Err(NetError::Format(format!(
                "image file count {} does not agree with label file count {}",
                count2, count
            )));
        }
        let rows = r.read_u32::<BigEndian>()? as usize;
        let cols = r.read_u32::<BigEndian>()? as usize;
        if rows > MAX_SIDE || cols > MAX_SIDE {
            return Err(NetError::Format(format!(
                "bad dimensions in image file: {}x{}", rows, cols
            )));
        }
        let n_pixels = rows * cols;
        let image_data = &image_bytes[16..];
        if image_data.len() < (start + len) * n_pixels {
            return Err(NetError::Format(format!(
                "wrong amount of pixels in image file: need {}, have {}",
                (start + len) * n_pixels, image_data.len()
            )));
        }
        let pixels = image_data[start * n_pixels..(start + len) * n_pixels].to_vec();

        let max_label = labels.iter().copied().max().unwrap_or(0);

        Ok(IdxImages { rows, cols, labels, pixels, max_label })
    }
}

impl LabelledImages for IdxImages {
    fn count(&self) -> usize {
        self.labels.len()
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn label(&self, n: usize) -> u8 {
        self.labels[n]
    }

    fn pixels(&self, n: usize) -> &[u8] {
        let size = self.rows * self.cols;
        &self.pixels[n * size..(n + 1) * size]
    }

    fn max_label(&self) -> u8 {
        self.max_label
    }
}
