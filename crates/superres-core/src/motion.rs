//! Per-frame translational motion offsets.

use crate::error::{Result, SuperResError};

/// A 2D translation in pixels, sub-pixel capable. Immutable once built.
///
/// `dx` moves content along columns (positive = right), `dy` along rows
/// (positive = down).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MotionShift {
    pub dx: f64,
    pub dy: f64,
}

impl MotionShift {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Maximum pixel displacement in either axis, rounded up to a whole
    /// pixel for sub-pixel amounts.
    pub fn patch_radius(&self) -> usize {
        self.dx.abs().max(self.dy.abs()).ceil() as usize
    }
}

/// Ordered list of per-frame shifts, indexed by frame index. Read-only once
/// constructed; shared with the motion operator through an `Arc`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct MotionShiftSequence {
    shifts: Vec<MotionShift>,
}

impl MotionShiftSequence {
    pub fn new(shifts: Vec<MotionShift>) -> Self {
        Self { shifts }
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Shift for frame `index`, or an index error when the sequence is
    /// shorter than the requested frame.
    pub fn get(&self, index: usize) -> Result<MotionShift> {
        self.shifts
            .get(index)
            .copied()
            .ok_or(SuperResError::FrameIndexOutOfRange {
                index,
                available: self.shifts.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &MotionShift> {
        self.shifts.iter()
    }

    /// Largest per-frame patch radius across the sequence.
    pub fn max_patch_radius(&self) -> usize {
        self.shifts
            .iter()
            .map(MotionShift::patch_radius)
            .max()
            .unwrap_or(0)
    }
}

impl From<Vec<(f64, f64)>> for MotionShiftSequence {
    fn from(pairs: Vec<(f64, f64)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(dx, dy)| MotionShift::new(dx, dy))
                .collect(),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_out_of_range() {
        let seq = MotionShiftSequence::from(vec![(1.0, 0.0), (0.0, -2.0)]);
        assert_eq!(seq.get(1).unwrap().dy, -2.0);
        let err = seq.get(2).unwrap_err();
        assert!(matches!(
            err,
            crate::SuperResError::FrameIndexOutOfRange {
                index: 2,
                available: 2
            }
        ));
    }

    #[test]
    fn test_patch_radius_rounds_up_subpixel() {
        assert_eq!(MotionShift::new(0.25, -1.5).patch_radius(), 2);
        assert_eq!(MotionShift::new(0.0, 0.0).patch_radius(), 0);
        let seq = MotionShiftSequence::from(vec![(0.5, 0.5), (-3.2, 1.0)]);
        assert_eq!(seq.max_patch_radius(), 4);
    }
}
