//! Additive Gaussian observation noise.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand_distr::Normal;

use crate::buffer::{ImageSize, PixelBuffer};
use crate::error::{Result, SuperResError};
use crate::model::DegradationOperator;

/// Adds i.i.d. zero-mean Gaussian noise to every pixel.
///
/// The draw is seeded from a base seed plus the frame index, so degrading a
/// given frame is reproducible while frames stay independent. Noise has no
/// meaningful linear adjoint: `apply_transpose` is a passthrough and the
/// operator matrix is the identity, which keeps this operator inert in
/// gradient chains.
#[derive(Debug, Clone)]
pub struct NoiseOperator {
    distribution: Normal<f64>,
    sigma: f64,
    seed: u64,
}

impl NoiseOperator {
    /// Noise standard deviation in pixel intensity units; must be >= 0.
    pub fn new(sigma: f64) -> Result<Self> {
        Self::with_seed(sigma, 0)
    }

    pub fn with_seed(sigma: f64, seed: u64) -> Result<Self> {
        if !(sigma >= 0.0) || !sigma.is_finite() {
            return Err(SuperResError::InvalidConfig(format!(
                "noise sigma must be non-negative and finite, got {sigma}"
            )));
        }
        let distribution = Normal::new(0.0, sigma)
            .map_err(|e| SuperResError::InvalidConfig(format!("noise distribution: {e}")))?;
        Ok(Self {
            distribution,
            sigma,
            seed,
        })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl DegradationOperator for NoiseOperator {
    fn apply(&self, image: &mut PixelBuffer, index: usize) -> Result<()> {
        if self.sigma == 0.0 {
            return Ok(());
        }
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index as u64));
        for v in image.as_mut_slice() {
            *v += self.distribution.sample(&mut rng);
        }
        Ok(())
    }

    fn apply_transpose(&self, _image: &mut PixelBuffer, _index: usize) -> Result<()> {
        Ok(())
    }

    fn operator_matrix(&self, size: ImageSize, _index: usize) -> Result<DMatrix<f64>> {
        let n = size.num_pixels();
        Ok(DMatrix::identity(n, n))
    }

    fn patch_radius(&self) -> usize {
        0
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
