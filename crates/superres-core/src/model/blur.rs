//! Point-spread-function blur: convolution with a fixed kernel.

use nalgebra::DMatrix;

use crate::buffer::{ImageSize, PixelBuffer};
use crate::error::{Result, SuperResError};
use crate::model::DegradationOperator;

/// Convolves every frame with a fixed square kernel, zero-padded at the
/// borders. The adjoint convolves with the 180°-rotated kernel.
#[derive(Debug, Clone)]
pub struct BlurOperator {
    /// Row-major `(2r+1) x (2r+1)` kernel, normalized to unit sum.
    kernel: Vec<f64>,
    radius: usize,
}

impl BlurOperator {
    /// Gaussian PSF with the given radius and sigma.
    pub fn gaussian(radius: usize, sigma: f64) -> Result<Self> {
        if radius == 0 {
            return Err(SuperResError::InvalidConfig(
                "blur radius must be positive".into(),
            ));
        }
        if !(sigma > 0.0) || !sigma.is_finite() {
            return Err(SuperResError::InvalidConfig(format!(
                "blur sigma must be positive and finite, got {sigma}"
            )));
        }
        let side = 2 * radius + 1;
        let mut kernel = Vec::with_capacity(side * side);
        let inv_two_sigma2 = 1.0 / (2.0 * sigma * sigma);
        for di in -(radius as i64)..=(radius as i64) {
            for dj in -(radius as i64)..=(radius as i64) {
                let d2 = (di * di + dj * dj) as f64;
                kernel.push((-d2 * inv_two_sigma2).exp());
            }
        }
        let sum: f64 = kernel.iter().sum();
        for k in &mut kernel {
            *k /= sum;
        }
        Ok(Self { kernel, radius })
    }

    /// Arbitrary square kernel; `kernel.len()` must be `(2*radius+1)²`.
    pub fn from_kernel(kernel: Vec<f64>, radius: usize) -> Result<Self> {
        let side = 2 * radius + 1;
        if kernel.len() != side * side {
            return Err(SuperResError::InvalidConfig(format!(
                "kernel length {} does not match radius {radius}",
                kernel.len()
            )));
        }
        Ok(Self { kernel, radius })
    }

    #[inline]
    fn tap(&self, di: i64, dj: i64, flipped: bool) -> f64 {
        let side = (2 * self.radius + 1) as i64;
        let r = self.radius as i64;
        let (di, dj) = if flipped { (-di, -dj) } else { (di, dj) };
        self.kernel[((di + r) * side + (dj + r)) as usize]
    }

    fn convolve(&self, image: &mut PixelBuffer, flipped: bool) {
        let size = image.size();
        let rad = self.radius as i64;
        for ch in 0..image.channels() {
            let src = image.channel(ch).to_vec();
            let dst = image.channel_mut(ch);
            for r in 0..size.rows as i64 {
                for c in 0..size.cols as i64 {
                    let mut acc = 0.0;
                    for di in -rad..=rad {
                        let sr = r + di;
                        if sr < 0 || sr >= size.rows as i64 {
                            continue;
                        }
                        for dj in -rad..=rad {
                            let sc = c + dj;
                            if sc < 0 || sc >= size.cols as i64 {
                                continue;
                            }
                            acc += self.tap(di, dj, flipped)
                                * src[(sr * size.cols as i64 + sc) as usize];
                        }
                    }
                    dst[(r * size.cols as i64 + c) as usize] = acc;
                }
            }
        }
    }
}

impl DegradationOperator for BlurOperator {
    fn apply(&self, image: &mut PixelBuffer, _index: usize) -> Result<()> {
        self.convolve(image, false);
        Ok(())
    }

    fn apply_transpose(&self, image: &mut PixelBuffer, _index: usize) -> Result<()> {
        self.convolve(image, true);
        Ok(())
    }

    fn operator_matrix(&self, size: ImageSize, _index: usize) -> Result<DMatrix<f64>> {
        let n = size.num_pixels();
        let mut m = DMatrix::zeros(n, n);
        let rad = self.radius as i64;
        for r in 0..size.rows as i64 {
            for c in 0..size.cols as i64 {
                let row_idx = (r * size.cols as i64 + c) as usize;
                for di in -rad..=rad {
                    let sr = r + di;
                    if sr < 0 || sr >= size.rows as i64 {
                        continue;
                    }
                    for dj in -rad..=rad {
                        let sc = c + dj;
                        if sc < 0 || sc >= size.cols as i64 {
                            continue;
                        }
                        m[(row_idx, (sr * size.cols as i64 + sc) as usize)] =
                            self.tap(di, dj, false);
                    }
                }
            }
        }
        Ok(m)
    }

    fn patch_radius(&self) -> usize {
        self.radius
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
