//! superres-core — numerics for multi-frame super-resolution.
//!
//! Models the forward degradation of a high-resolution scene into a sequence
//! of low-resolution observed frames, and solves the inverse problem. The
//! pieces are:
//!
//! 1. **Buffer** – channel-major pixel container exchanged by all operators.
//! 2. **Motion** – per-frame sub-pixel translation offsets.
//! 3. **Model** – composable degradation operators (motion warp, PSF blur,
//!    decimation, additive noise) with matching adjoint actions and explicit
//!    operator-matrix representations.
//! 4. **Regularizer** – total-variation smoothness prior.
//! 5. **Solver** – MAP estimator: regularized least squares driven by the
//!    model's forward and adjoint passes.
//!
//! The forward composition is `y_i = N(D(B(M_i(x))))` per frame `i`; the
//! solver minimizes `Σ_i ‖y_i − A_i x‖² + λ · TV(x)` by gradient descent,
//! propagating per-frame residuals back through the adjoint chain.

pub mod buffer;
pub mod error;
pub mod model;
pub mod motion;
pub mod regularizer;
pub mod solver;

#[cfg(test)]
pub(crate) mod test_utils;

pub use buffer::{ImageSize, PixelBuffer};
pub use error::{Result, SuperResError};
pub use model::{
    BlurOperator, DegradationOperator, DownsampleOperator, ImageModel, MotionOperator,
    NoiseOperator,
};
pub use motion::{MotionShift, MotionShiftSequence};
pub use regularizer::{Regularizer, TotalVariation};
pub use solver::{MapSolver, MapSolverConfig, SolveOutcome, SolveStatus};
