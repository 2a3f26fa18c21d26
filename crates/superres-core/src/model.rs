//! Forward degradation model: an ordered composition of operators.
//!
//! Each operator models one physical cause of resolution loss and exposes
//! three consistent views of the same linear action: a matrix-free forward
//! apply, the matching adjoint (transpose) apply, and an explicit per-channel
//! operator matrix for validation. The model applies operators in forward
//! order and their adjoints in strict reverse order, per the adjoint
//! composition rule `(ABC)ᵗ = CᵗBᵗAᵗ`.

mod blur;
mod downsample;
mod motion;
mod noise;

pub use blur::BlurOperator;
pub use downsample::DownsampleOperator;
pub use motion::MotionOperator;
pub use noise::NoiseOperator;

use nalgebra::DMatrix;

use crate::buffer::{ImageSize, PixelBuffer};
use crate::error::Result;

/// One degradation step applied to a single frame.
///
/// Contract: `apply` and `apply_transpose` must be exact adjoints of each
/// other, and both must agree numerically with `operator_matrix` for every
/// frame index. The noise operator is the deliberate exception: its forward
/// action is stochastic and its adjoint is the identity.
pub trait DegradationOperator: std::fmt::Debug {
    /// Forward degradation of frame `index`, in place.
    fn apply(&self, image: &mut PixelBuffer, index: usize) -> Result<()>;

    /// Adjoint of the forward action, mapping a residual in the degraded
    /// domain back toward the un-degraded domain.
    fn apply_transpose(&self, image: &mut PixelBuffer, index: usize) -> Result<()>;

    /// Explicit linear operator over one channel of `rows*cols` pixels in
    /// row-major order. Shape is `output_size(size).num_pixels()` by
    /// `size.num_pixels()`.
    fn operator_matrix(&self, size: ImageSize, index: usize) -> Result<DMatrix<f64>>;

    /// Maximum spatial footprint in pixels, rounded up for sub-pixel
    /// effects. A composed chain's radius is the sum of its parts.
    fn patch_radius(&self) -> usize;

    /// Spatial dimensions produced from an input of `size`. Identity for
    /// every operator except decimation.
    fn output_size(&self, size: ImageSize) -> ImageSize {
        size
    }
}

/// Ordered composition of degradation operators, applied per frame.
///
/// Owns its operators; order of insertion is the physical forward order,
/// e.g. motion, then blur, then downsampling: `y = D(B(M(x)))`.
#[derive(Debug, Default)]
pub struct ImageModel {
    operators: Vec<Box<dyn DegradationOperator>>,
}

impl ImageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operator at the end of the forward chain.
    pub fn add_operator(&mut self, operator: Box<dyn DegradationOperator>) {
        self.operators.push(operator);
    }

    /// Builder form of [`add_operator`](Self::add_operator).
    pub fn with_operator(mut self, operator: Box<dyn DegradationOperator>) -> Self {
        self.add_operator(operator);
        self
    }

    pub fn num_operators(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Simulate a full observation of frame `index`: every operator in
    /// forward order.
    pub fn apply(&self, image: &mut PixelBuffer, index: usize) -> Result<()> {
        for op in &self.operators {
            op.apply(image, index)?;
        }
        Ok(())
    }

    /// Propagate a residual back to the high-resolution domain: every
    /// operator's adjoint, reverse order.
    pub fn apply_transpose(&self, image: &mut PixelBuffer, index: usize) -> Result<()> {
        for op in self.operators.iter().rev() {
            op.apply_transpose(image, index)?;
        }
        Ok(())
    }

    /// Explicit matrix of the whole chain for one channel: the product of
    /// per-operator matrices, rightmost applied first.
    pub fn operator_matrix(&self, size: ImageSize, index: usize) -> Result<DMatrix<f64>> {
        let mut composed: Option<DMatrix<f64>> = None;
        let mut current = size;
        for op in &self.operators {
            let m = op.operator_matrix(current, index)?;
            current = op.output_size(current);
            composed = Some(match composed {
                None => m,
                Some(prev) => m * prev,
            });
        }
        Ok(composed.unwrap_or_else(|| DMatrix::identity(size.num_pixels(), size.num_pixels())))
    }

    /// Spatial dimensions of a simulated observation for an input of `size`.
    pub fn output_size(&self, size: ImageSize) -> ImageSize {
        self.operators
            .iter()
            .fold(size, |s, op| op.output_size(s))
    }

    /// Sum of per-operator patch radii.
    pub fn patch_radius(&self) -> usize {
        self.operators.iter().map(|op| op.patch_radius()).sum()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
