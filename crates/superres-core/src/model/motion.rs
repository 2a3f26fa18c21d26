//! Translational motion warp with sub-pixel bilinear interpolation.

use std::sync::Arc;

use nalgebra::DMatrix;

use crate::buffer::{ImageSize, PixelBuffer};
use crate::error::Result;
use crate::model::DegradationOperator;
use crate::motion::MotionShiftSequence;

/// Up to four bilinear taps for one destination pixel: (row, col, weight).
/// Out-of-bounds taps are dropped (zero padding).
fn bilinear_taps(
    dest_row: usize,
    dest_col: usize,
    dx: f64,
    dy: f64,
    size: ImageSize,
) -> impl Iterator<Item = (usize, usize, f64)> {
    // Content moves by (+dx, +dy), so destination (r, c) gathers from
    // (r - dy, c - dx).
    let src_row = dest_row as f64 - dy;
    let src_col = dest_col as f64 - dx;
    let r0 = src_row.floor();
    let c0 = src_col.floor();
    let fr = src_row - r0;
    let fc = src_col - c0;

    [
        (r0, c0, (1.0 - fr) * (1.0 - fc)),
        (r0, c0 + 1.0, (1.0 - fr) * fc),
        (r0 + 1.0, c0, fr * (1.0 - fc)),
        (r0 + 1.0, c0 + 1.0, fr * fc),
    ]
    .into_iter()
    .filter_map(move |(r, c, w)| {
        if w <= 0.0 || r < 0.0 || c < 0.0 || r >= size.rows as f64 || c >= size.cols as f64 {
            None
        } else {
            Some((r as usize, c as usize, w))
        }
    })
}

/// Shifts frame `index` by the sequence's `(dx, dy)` via bilinear
/// interpolation, zero-padded at the borders.
///
/// The adjoint scatters each value back through the same interpolation
/// weights. That is the true transpose of the bilinear gather, which is not
/// the same as re-applying the forward warp with a negated shift.
#[derive(Debug, Clone)]
pub struct MotionOperator {
    shifts: Arc<MotionShiftSequence>,
}

impl MotionOperator {
    /// The sequence must cover every frame index the operator is applied to.
    pub fn new(shifts: Arc<MotionShiftSequence>) -> Self {
        Self { shifts }
    }

    pub fn shifts(&self) -> &MotionShiftSequence {
        &self.shifts
    }
}

impl DegradationOperator for MotionOperator {
    fn apply(&self, image: &mut PixelBuffer, index: usize) -> Result<()> {
        let shift = self.shifts.get(index)?;
        let size = image.size();
        for ch in 0..image.channels() {
            let src = image.channel(ch).to_vec();
            let dst = image.channel_mut(ch);
            for r in 0..size.rows {
                for c in 0..size.cols {
                    let mut acc = 0.0;
                    for (sr, sc, w) in bilinear_taps(r, c, shift.dx, shift.dy, size) {
                        acc += w * src[sr * size.cols + sc];
                    }
                    dst[r * size.cols + c] = acc;
                }
            }
        }
        Ok(())
    }

    fn apply_transpose(&self, image: &mut PixelBuffer, index: usize) -> Result<()> {
        let shift = self.shifts.get(index)?;
        let size = image.size();
        for ch in 0..image.channels() {
            let src = image.channel(ch).to_vec();
            let dst = image.channel_mut(ch);
            dst.fill(0.0);
            for r in 0..size.rows {
                for c in 0..size.cols {
                    let v = src[r * size.cols + c];
                    for (sr, sc, w) in bilinear_taps(r, c, shift.dx, shift.dy, size) {
                        dst[sr * size.cols + sc] += w * v;
                    }
                }
            }
        }
        Ok(())
    }

    fn operator_matrix(&self, size: ImageSize, index: usize) -> Result<DMatrix<f64>> {
        let shift = self.shifts.get(index)?;
        let n = size.num_pixels();
        let mut m = DMatrix::zeros(n, n);
        for r in 0..size.rows {
            for c in 0..size.cols {
                let row_idx = r * size.cols + c;
                for (sr, sc, w) in bilinear_taps(r, c, shift.dx, shift.dy, size) {
                    m[(row_idx, sr * size.cols + sc)] += w;
                }
            }
        }
        Ok(m)
    }

    fn patch_radius(&self) -> usize {
        self.shifts.max_patch_radius()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_adjoint_identity, assert_matrix_agreement};
    use approx::assert_relative_eq;

    fn op_with(shifts: Vec<(f64, f64)>) -> MotionOperator {
        MotionOperator::new(Arc::new(MotionShiftSequence::from(shifts)))
    }

    #[test]
    fn test_integer_shift_moves_pixel() {
        let op = op_with(vec![(1.0, 2.0)]);
        let mut img = PixelBuffer::zeros(1, 5, 5);
        img.set(0, 1, 1, 9.0);
        op.apply(&mut img, 0).unwrap();
        assert_relative_eq!(img.get(0, 3, 2), 9.0);
        assert_relative_eq!(img.get(0, 1, 1), 0.0);
    }

    #[test]
    fn test_subpixel_shift_splits_bilinearly() {
        let op = op_with(vec![(0.5, 0.0)]);
        let mut img = PixelBuffer::zeros(1, 3, 3);
        img.set(0, 1, 1, 1.0);
        op.apply(&mut img, 0).unwrap();
        assert_relative_eq!(img.get(0, 1, 1), 0.5);
        assert_relative_eq!(img.get(0, 1, 2), 0.5);
    }

    #[test]
    fn test_border_content_is_zero_padded() {
        let op = op_with(vec![(2.0, 0.0)]);
        let mut img = PixelBuffer::zeros(1, 3, 3);
        for c in 0..3 {
            img.set(0, 1, c, 1.0);
        }
        op.apply(&mut img, 0).unwrap();
        assert_relative_eq!(img.get(0, 1, 0), 0.0);
        assert_relative_eq!(img.get(0, 1, 1), 0.0);
        assert_relative_eq!(img.get(0, 1, 2), 1.0);
    }

    #[test]
    fn test_adjoint_identity_subpixel() {
        let op = op_with(vec![(0.7, -1.2)]);
        assert_adjoint_identity(&op, 0, 7, 6, 11);
    }

    #[test]
    fn test_matrix_matches_apply() {
        let op = op_with(vec![(-0.4, 0.9)]);
        assert_matrix_agreement(&op, 0, 5, 4, 13);
    }

    #[test]
    fn test_index_beyond_sequence_is_error() {
        let op = op_with(vec![(0.0, 0.0)]);
        let mut img = PixelBuffer::zeros(1, 2, 2);
        assert!(op.apply(&mut img, 3).is_err());
        assert!(op.apply_transpose(&mut img, 3).is_err());
    }

    #[test]
    fn test_patch_radius_from_sequence() {
        let op = op_with(vec![(0.5, 0.5), (-2.1, 1.0)]);
        assert_eq!(op.patch_radius(), 3);
    }
}
