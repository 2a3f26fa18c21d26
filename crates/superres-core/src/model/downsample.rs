//! Spatial decimation by an integer scale factor.

use nalgebra::DMatrix;

use crate::buffer::{ImageSize, PixelBuffer};
use crate::error::{Result, SuperResError};
use crate::model::DegradationOperator;

/// Block-averaging decimation: each low-resolution pixel is the mean of its
/// `scale x scale` source block.
///
/// The adjoint is therefore block replication scaled by `1/scale²` — every
/// forward matrix entry is `1/scale²`, and the transpose scatters with the
/// same weight. Forward, adjoint, and matrix all use this one definition.
#[derive(Debug, Clone, Copy)]
pub struct DownsampleOperator {
    scale: usize,
}

impl DownsampleOperator {
    pub fn new(scale: usize) -> Result<Self> {
        if scale == 0 {
            return Err(SuperResError::InvalidConfig(
                "downsampling scale must be a positive integer".into(),
            ));
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    fn check_divisible(&self, size: ImageSize) -> Result<()> {
        if !size.divisible_by(self.scale) {
            return Err(SuperResError::DimensionMismatch {
                expected: format!("dimensions divisible by {}", self.scale),
                actual: size.to_string(),
            });
        }
        Ok(())
    }
}

impl DegradationOperator for DownsampleOperator {
    fn apply(&self, image: &mut PixelBuffer, _index: usize) -> Result<()> {
        self.check_divisible(image.size())?;
        let s = self.scale;
        let (rows, cols) = (image.rows() / s, image.cols() / s);
        let weight = 1.0 / (s * s) as f64;
        let mut out = PixelBuffer::zeros(image.channels(), rows, cols);
        for ch in 0..image.channels() {
            for r in 0..rows {
                for c in 0..cols {
                    let mut acc = 0.0;
                    for br in 0..s {
                        for bc in 0..s {
                            acc += image.get(ch, r * s + br, c * s + bc);
                        }
                    }
                    out.set(ch, r, c, acc * weight);
                }
            }
        }
        *image = out;
        Ok(())
    }

    fn apply_transpose(&self, image: &mut PixelBuffer, _index: usize) -> Result<()> {
        let s = self.scale;
        let weight = 1.0 / (s * s) as f64;
        let mut out = PixelBuffer::zeros(image.channels(), image.rows() * s, image.cols() * s);
        for ch in 0..image.channels() {
            for r in 0..out.rows() {
                for c in 0..out.cols() {
                    out.set(ch, r, c, weight * image.get(ch, r / s, c / s));
                }
            }
        }
        *image = out;
        Ok(())
    }

    fn operator_matrix(&self, size: ImageSize, _index: usize) -> Result<DMatrix<f64>> {
        self.check_divisible(size)?;
        let s = self.scale;
        let out = self.output_size(size);
        let weight = 1.0 / (s * s) as f64;
        let mut m = DMatrix::zeros(out.num_pixels(), size.num_pixels());
        for r in 0..out.rows {
            for c in 0..out.cols {
                let row_idx = r * out.cols + c;
                for br in 0..s {
                    for bc in 0..s {
                        let col_idx = (r * s + br) * size.cols + (c * s + bc);
                        m[(row_idx, col_idx)] = weight;
                    }
                }
            }
        }
        Ok(m)
    }

    /// A low-resolution pixel draws from source pixels up to `scale - 1`
    /// away from its block origin.
    fn patch_radius(&self) -> usize {
        self.scale - 1
    }

    fn output_size(&self, size: ImageSize) -> ImageSize {
        ImageSize::new(size.rows / self.scale, size.cols / self.scale)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_adjoint_identity, assert_matrix_agreement};
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_zero_scale() {
        assert!(DownsampleOperator::new(0).is_err());
    }

    #[test]
    fn test_hand_computed_4x4_by_2() {
        let op = DownsampleOperator::new(2).unwrap();
        #[rustfmt::skip]
        let data = vec![
            1.0, 2.0,  3.0, 4.0,
            5.0, 6.0,  7.0, 8.0,
            9.0, 10.0, 11.0, 12.0,
            13.0, 14.0, 15.0, 16.0,
        ];
        let mut img = PixelBuffer::from_data(1, 4, 4, data).unwrap();
        op.apply(&mut img, 0).unwrap();
        assert_eq!(img.size(), ImageSize::new(2, 2));
        assert_relative_eq!(img.get(0, 0, 0), 3.5); // mean of 1,2,5,6
        assert_relative_eq!(img.get(0, 0, 1), 5.5);
        assert_relative_eq!(img.get(0, 1, 0), 11.5);
        assert_relative_eq!(img.get(0, 1, 1), 13.5);
    }

    #[test]
    fn test_transpose_replicates_with_inverse_square_weight() {
        let op = DownsampleOperator::new(2).unwrap();
        let mut img = PixelBuffer::from_data(1, 1, 1, vec![8.0]).unwrap();
        op.apply_transpose(&mut img, 0).unwrap();
        assert_eq!(img.size(), ImageSize::new(2, 2));
        for v in img.as_slice() {
            assert_relative_eq!(*v, 2.0); // 8 / s²
        }
    }

    #[test]
    fn test_down_up_round_trip_energy() {
        // D Dᵗ = (1/s²) I for block averaging: one LR pixel survives a
        // transpose-then-forward trip scaled by exactly 1/s².
        let op = DownsampleOperator::new(3).unwrap();
        let mut img = PixelBuffer::from_data(1, 1, 1, vec![9.0]).unwrap();
        op.apply_transpose(&mut img, 0).unwrap();
        op.apply(&mut img, 0).unwrap();
        assert_eq!(img.size(), ImageSize::new(1, 1));
        assert_relative_eq!(img.get(0, 0, 0), 1.0);
    }

    #[test]
    fn test_indivisible_dimensions_are_an_error() {
        let op = DownsampleOperator::new(2).unwrap();
        let mut img = PixelBuffer::zeros(1, 3, 4);
        let err = op.apply(&mut img, 0).unwrap_err();
        assert!(matches!(
            err,
            crate::SuperResError::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn test_adjoint_identity() {
        let op = DownsampleOperator::new(2).unwrap();
        assert_adjoint_identity(&op, 0, 6, 4, 23);
    }

    #[test]
    fn test_matrix_matches_apply() {
        let op = DownsampleOperator::new(3).unwrap();
        assert_matrix_agreement(&op, 0, 6, 3, 29);
    }
}
