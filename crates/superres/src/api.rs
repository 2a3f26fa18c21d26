//! High-level resolve API.
//!
//! [`SuperResolver`] is the primary entry point: it wraps a
//! [`SuperResolveConfig`], assembles the forward degradation chain
//! (motion → blur → downsample), and drives the MAP solver. Create once,
//! resolve many sequences.

use std::sync::Arc;

use superres_core::model::{BlurOperator, DownsampleOperator, ImageModel, MotionOperator};
use superres_core::solver::{MapSolver, SolveOutcome};
use superres_core::{
    MotionShiftSequence, PixelBuffer, Result, SolveStatus, SuperResError,
};

use crate::config::SuperResolveConfig;

/// Outcome of one resolve: the high-resolution estimate plus solver
/// metadata.
#[derive(Debug, Clone)]
pub struct SuperResolveResult {
    /// The recovered high-resolution buffer.
    pub estimate: PixelBuffer,
    /// How the solver terminated. `MaxIterationsReached` is a best-effort
    /// outcome, not a failure.
    pub status: SolveStatus,
    /// Descent steps taken.
    pub iterations: usize,
    /// Data residual norm at the estimate.
    pub residual_norm: f64,
}

impl From<SolveOutcome> for SuperResolveResult {
    fn from(o: SolveOutcome) -> Self {
        Self {
            estimate: o.estimate,
            status: o.status,
            iterations: o.iterations,
            residual_norm: o.residual_norm,
        }
    }
}

/// Primary super-resolution interface.
///
/// # Examples
///
/// ```
/// use superres::{MotionShiftSequence, PixelBuffer, SuperResolveConfig, SuperResolver};
///
/// let config = SuperResolveConfig { max_iterations: 5, ..Default::default() };
/// let resolver = SuperResolver::new(config).unwrap();
/// let frames = vec![PixelBuffer::zeros(1, 8, 8); 2];
/// let shifts = MotionShiftSequence::from(vec![(0.0, 0.0), (0.5, -0.5)]);
/// let result = resolver.resolve(&frames, &shifts).unwrap();
/// assert_eq!(result.estimate.rows(), 16);
/// ```
#[derive(Debug)]
pub struct SuperResolver {
    config: SuperResolveConfig,
}

impl SuperResolver {
    /// Validates the configuration; all parameter errors surface here.
    pub fn new(config: SuperResolveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Resolver with default tuning.
    pub fn with_defaults() -> Self {
        Self {
            config: SuperResolveConfig::default(),
        }
    }

    pub fn config(&self) -> &SuperResolveConfig {
        &self.config
    }

    /// Forward chain used both for solving and for simulating observations:
    /// motion warp, PSF blur, decimation. Noise is deliberately absent — it
    /// has no adjoint and belongs only to data generation.
    pub fn build_model(&self, shifts: Arc<MotionShiftSequence>) -> Result<ImageModel> {
        Ok(ImageModel::new()
            .with_operator(Box::new(MotionOperator::new(shifts)))
            .with_operator(Box::new(BlurOperator::gaussian(
                self.config.blur_radius,
                self.config.blur_sigma,
            )?))
            .with_operator(Box::new(DownsampleOperator::new(self.config.scale)?)))
    }

    /// Recover a high-resolution estimate from observed low-resolution
    /// frames and their per-frame motion shifts.
    ///
    /// The initial guess is the first observed frame upsampled by the scale
    /// factor. The shift sequence must cover every frame.
    pub fn resolve(
        &self,
        frames: &[PixelBuffer],
        shifts: &MotionShiftSequence,
    ) -> Result<SuperResolveResult> {
        if frames.is_empty() {
            return Err(SuperResError::InvalidConfig("no observed frames".into()));
        }
        if shifts.is_empty() {
            return Err(SuperResError::InvalidConfig(
                "empty motion shift sequence".into(),
            ));
        }
        if shifts.len() < frames.len() {
            return Err(SuperResError::FrameIndexOutOfRange {
                index: frames.len() - 1,
                available: shifts.len(),
            });
        }

        tracing::info!(
            num_frames = frames.len(),
            scale = self.config.scale,
            frame_size = %frames[0].size(),
            "resolving sequence"
        );

        let model = self.build_model(Arc::new(shifts.clone()))?;
        let solver = MapSolver::with_total_variation(
            self.config.solver_config(),
            model,
            frames.to_vec(),
        )?;
        let initial = frames[0].upsample_replicate(self.config.scale);
        let outcome = solver.solve(initial)?;
        Ok(outcome.into())
    }

    /// Convenience wrapper over [`resolve`](Self::resolve) for 8-bit
    /// grayscale frames. The estimate stays a [`PixelBuffer`]; export with
    /// [`PixelBuffer::to_gray`].
    pub fn resolve_gray(
        &self,
        frames: &[image::GrayImage],
        shifts: &MotionShiftSequence,
    ) -> Result<SuperResolveResult> {
        let buffers: Vec<PixelBuffer> = frames.iter().map(PixelBuffer::from_gray).collect();
        self.resolve(&buffers, shifts)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
