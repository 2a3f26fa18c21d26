//! Channel-major pixel buffer, the unit of exchange between all operators.
//!
//! Storage is a flat `Vec<f64>` indexed `(channel, row, col)` in that order.
//! Intensities follow the 8-bit convention (0–255) so that noise sigmas and
//! convergence thresholds read in familiar units, but values are unclamped
//! until export.

use image::{GrayImage, Luma};

use crate::error::{Result, SuperResError};

/// Spatial dimensions of one image plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageSize {
    pub rows: usize,
    pub cols: usize,
}

impl ImageSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Pixels per channel.
    pub fn num_pixels(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether both dimensions divide evenly by `scale`.
    pub fn divisible_by(&self, scale: usize) -> bool {
        scale > 0 && self.rows % scale == 0 && self.cols % scale == 0
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// A multi-channel 2D image with channel-major flat storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    channels: usize,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl PixelBuffer {
    /// Zero-filled buffer with the given dimensions.
    pub fn zeros(channels: usize, rows: usize, cols: usize) -> Self {
        Self {
            channels,
            rows,
            cols,
            data: vec![0.0; channels * rows * cols],
        }
    }

    /// Wrap existing flat channel-major data.
    pub fn from_data(channels: usize, rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        let expected = channels * rows * cols;
        if data.len() != expected {
            return Err(SuperResError::DimensionMismatch {
                expected: format!("{expected} values for {channels}x{rows}x{cols}"),
                actual: format!("{} values", data.len()),
            });
        }
        Ok(Self {
            channels,
            rows,
            cols,
            data,
        })
    }

    /// Single-channel buffer from an 8-bit grayscale image.
    pub fn from_gray(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        let (rows, cols) = (h as usize, w as usize);
        let mut buf = Self::zeros(1, rows, cols);
        for y in 0..h {
            for x in 0..w {
                buf.set(0, y as usize, x as usize, img.get_pixel(x, y)[0] as f64);
            }
        }
        buf
    }

    /// Export one channel as an 8-bit grayscale image, clamping to [0, 255].
    pub fn to_gray(&self, channel: usize) -> Option<GrayImage> {
        if channel >= self.channels {
            return None;
        }
        let mut img = GrayImage::new(self.cols as u32, self.rows as u32);
        for r in 0..self.rows {
            for c in 0..self.cols {
                let v = self.get(channel, r, c).clamp(0.0, 255.0).round() as u8;
                img.put_pixel(c as u32, r as u32, Luma([v]));
            }
        }
        Some(img)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Spatial dimensions (shared by all channels).
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.rows, self.cols)
    }

    pub fn num_values(&self) -> usize {
        self.data.len()
    }

    /// Flat index for `(channel, row, col)` in channel-major order.
    #[inline]
    pub fn pixel_index(&self, channel: usize, row: usize, col: usize) -> usize {
        debug_assert!(channel < self.channels && row < self.rows && col < self.cols);
        (channel * self.rows + row) * self.cols + col
    }

    #[inline]
    pub fn get(&self, channel: usize, row: usize, col: usize) -> f64 {
        self.data[self.pixel_index(channel, row, col)]
    }

    #[inline]
    pub fn set(&mut self, channel: usize, row: usize, col: usize, value: f64) {
        let idx = self.pixel_index(channel, row, col);
        self.data[idx] = value;
    }

    /// One channel as a contiguous row-major slice.
    pub fn channel(&self, channel: usize) -> &[f64] {
        let n = self.rows * self.cols;
        &self.data[channel * n..(channel + 1) * n]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f64] {
        let n = self.rows * self.cols;
        &mut self.data[channel * n..(channel + 1) * n]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Whether dimensions match another buffer exactly.
    pub fn same_shape(&self, other: &PixelBuffer) -> bool {
        self.channels == other.channels && self.rows == other.rows && self.cols == other.cols
    }

    /// Euclidean inner product over all values. Panics on shape mismatch.
    pub fn dot(&self, other: &PixelBuffer) -> f64 {
        assert!(self.same_shape(other), "dot on mismatched buffers");
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// L2 norm over all values.
    pub fn norm_l2(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// `self += alpha * other`, element-wise. Panics on shape mismatch.
    pub fn scaled_add(&mut self, alpha: f64, other: &PixelBuffer) {
        assert!(self.same_shape(other), "scaled_add on mismatched buffers");
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += alpha * b;
        }
    }

    /// `self -= other`, element-wise. Panics on shape mismatch.
    pub fn subtract(&mut self, other: &PixelBuffer) {
        self.scaled_add(-1.0, other);
    }

    /// True when every value is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Nearest-neighbor upsampling by an integer factor (block replication).
    /// Used to build the solver's initial guess from the first observation.
    pub fn upsample_replicate(&self, scale: usize) -> PixelBuffer {
        assert!(scale > 0, "upsample scale must be positive");
        let mut out = PixelBuffer::zeros(self.channels, self.rows * scale, self.cols * scale);
        for ch in 0..self.channels {
            for r in 0..out.rows {
                for c in 0..out.cols {
                    out.set(ch, r, c, self.get(ch, r / scale, c / scale));
                }
            }
        }
        out
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
