//! MAP estimation of the high-resolution image.
//!
//! Minimizes `Σ_i ‖y_i − A_i x‖² + λ · Σ_p tv_p(x)` by gradient descent
//! with backtracking step halving. Each iteration simulates every observed
//! frame through the forward model, propagates the per-frame residual back
//! through the adjoint chain, accumulates into one gradient buffer, adds the
//! weighted regularization gradient, and steps.
//!
//! Lifecycle: construction validates configuration and observations
//! (initialized), [`MapSolver::solve`] iterates on an exclusively owned
//! estimate and ends in one of two terminal states — [`SolveStatus::Converged`]
//! when the gradient RMS drops below the threshold, or
//! [`SolveStatus::MaxIterationsReached`] with the best-so-far estimate, which
//! is a reported outcome and not an error.

use crate::buffer::PixelBuffer;
use crate::error::{Result, SuperResError};
use crate::model::ImageModel;
use crate::regularizer::{Regularizer, TotalVariation};

const MAX_BACKTRACK_HALVINGS: usize = 24;

/// Solver tuning, validated at construction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MapSolverConfig {
    /// Regularization weight λ; 0 disables the prior.
    pub regularization_weight: f64,
    /// Convergence threshold on the gradient RMS.
    pub convergence_threshold: f64,
    /// Iteration cap; 0 returns the initial guess unchanged.
    pub max_iterations: usize,
    /// Initial descent step; halved when a step fails to decrease the
    /// objective.
    pub step_size: f64,
}

impl Default for MapSolverConfig {
    fn default() -> Self {
        Self {
            regularization_weight: 0.05,
            convergence_threshold: 1e-3,
            max_iterations: 100,
            step_size: 0.2,
        }
    }
}

impl MapSolverConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.regularization_weight >= 0.0) || !self.regularization_weight.is_finite() {
            return Err(SuperResError::InvalidConfig(format!(
                "regularization weight must be non-negative and finite, got {}",
                self.regularization_weight
            )));
        }
        if !(self.convergence_threshold > 0.0) || !self.convergence_threshold.is_finite() {
            return Err(SuperResError::InvalidConfig(format!(
                "convergence threshold must be positive and finite, got {}",
                self.convergence_threshold
            )));
        }
        if !(self.step_size > 0.0) || !self.step_size.is_finite() {
            return Err(SuperResError::InvalidConfig(format!(
                "step size must be positive and finite, got {}",
                self.step_size
            )));
        }
        Ok(())
    }
}

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SolveStatus {
    /// Gradient RMS fell below the convergence threshold.
    Converged,
    /// Iteration cap hit first; the estimate is the best reached so far.
    MaxIterationsReached,
}

/// Result of a solve: the estimate plus how it terminated.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub estimate: PixelBuffer,
    pub status: SolveStatus,
    /// Descent steps actually taken.
    pub iterations: usize,
    /// Data residual norm `sqrt(Σ_i ‖y_i − A_i x‖²)` at the returned
    /// estimate; infinite when the cap was 0 and nothing was evaluated.
    pub residual_norm: f64,
}

/// Iterative MAP estimator over a fixed model and observation set.
#[derive(Debug)]
pub struct MapSolver {
    config: MapSolverConfig,
    model: ImageModel,
    regularizer: Box<dyn Regularizer>,
    observations: Vec<PixelBuffer>,
}

impl MapSolver {
    /// Fatal configuration errors (empty observations, mismatched frame
    /// dimensions, invalid tuning, non-finite observations) surface here,
    /// before any iteration.
    pub fn new(
        config: MapSolverConfig,
        model: ImageModel,
        regularizer: Box<dyn Regularizer>,
        observations: Vec<PixelBuffer>,
    ) -> Result<Self> {
        config.validate()?;
        let first = observations
            .first()
            .ok_or_else(|| SuperResError::InvalidConfig("no observed frames".into()))?;
        for (i, frame) in observations.iter().enumerate() {
            if !frame.same_shape(first) {
                return Err(SuperResError::DimensionMismatch {
                    expected: format!("{}ch {}", first.channels(), first.size()),
                    actual: format!("{}ch {} (frame {i})", frame.channels(), frame.size()),
                });
            }
            if !frame.is_finite() {
                return Err(SuperResError::NumericalInstability(format!(
                    "observed frame {i} contains NaN or Inf"
                )));
            }
        }
        Ok(Self {
            config,
            model,
            regularizer,
            observations,
        })
    }

    /// Solver with the default total-variation prior.
    pub fn with_total_variation(
        config: MapSolverConfig,
        model: ImageModel,
        observations: Vec<PixelBuffer>,
    ) -> Result<Self> {
        Self::new(
            config,
            model,
            Box::new(TotalVariation::default()),
            observations,
        )
    }

    pub fn config(&self) -> &MapSolverConfig {
        &self.config
    }

    pub fn num_frames(&self) -> usize {
        self.observations.len()
    }

    /// Accumulated data-fidelity gradient `Σ_i 2·A_iᵗ(A_i x − y_i)` and the
    /// data cost `Σ_i ‖A_i x − y_i‖²`.
    fn data_terms(&self, x: &PixelBuffer) -> Result<(PixelBuffer, f64)> {
        let mut grad = PixelBuffer::zeros(x.channels(), x.rows(), x.cols());
        let mut cost = 0.0;
        for (i, observed) in self.observations.iter().enumerate() {
            let mut residual = x.clone();
            self.model.apply(&mut residual, i)?;
            if !residual.same_shape(observed) {
                return Err(SuperResError::DimensionMismatch {
                    expected: format!("{}ch {}", observed.channels(), observed.size()),
                    actual: format!(
                        "{}ch {} (simulated frame {i})",
                        residual.channels(),
                        residual.size()
                    ),
                });
            }
            residual.subtract(observed);
            if !residual.is_finite() {
                return Err(SuperResError::NumericalInstability(format!(
                    "NaN or Inf in the residual of frame {i}"
                )));
            }
            let norm = residual.norm_l2();
            cost += norm * norm;
            self.model.apply_transpose(&mut residual, i)?;
            if !residual.same_shape(&grad) {
                return Err(SuperResError::DimensionMismatch {
                    expected: format!("{}ch {}", grad.channels(), grad.size()),
                    actual: format!(
                        "{}ch {} (back-propagated frame {i})",
                        residual.channels(),
                        residual.size()
                    ),
                });
            }
            grad.scaled_add(2.0, &residual);
        }
        Ok((grad, cost))
    }

    fn objective(&self, x: &PixelBuffer) -> Result<f64> {
        let (_, data_cost) = self.data_terms(x)?;
        Ok(data_cost + self.regularization_cost(x))
    }

    fn regularization_cost(&self, x: &PixelBuffer) -> f64 {
        if self.config.regularization_weight == 0.0 {
            return 0.0;
        }
        self.config.regularization_weight * self.regularizer.residuals(x).iter().sum::<f64>()
    }

    /// Run the descent from `initial`, which the solver owns exclusively
    /// until a terminal state is reached.
    pub fn solve(&self, initial: PixelBuffer) -> Result<SolveOutcome> {
        if !initial.is_finite() {
            return Err(SuperResError::NumericalInstability(
                "initial guess contains NaN or Inf".into(),
            ));
        }
        if self.config.max_iterations == 0 {
            return Ok(SolveOutcome {
                estimate: initial,
                status: SolveStatus::MaxIterationsReached,
                iterations: 0,
                residual_norm: f64::INFINITY,
            });
        }

        let mut x = initial;
        let inv_sqrt_n = 1.0 / (x.num_values() as f64).sqrt();
        let mut step = self.config.step_size;
        let (mut grad, mut data_cost) = self.data_terms(&x)?;

        for iteration in 0..self.config.max_iterations {
            if self.config.regularization_weight > 0.0 {
                let reg_grad = self.regularizer.gradient(&x);
                grad.scaled_add(self.config.regularization_weight, &reg_grad);
            }
            if !grad.is_finite() {
                return Err(SuperResError::NumericalInstability(format!(
                    "NaN or Inf in the gradient at iteration {iteration}"
                )));
            }

            let grad_rms = grad.norm_l2() * inv_sqrt_n;
            if grad_rms < self.config.convergence_threshold {
                tracing::info!(
                    iteration,
                    grad_rms,
                    residual_norm = data_cost.sqrt(),
                    "converged"
                );
                return Ok(SolveOutcome {
                    estimate: x,
                    status: SolveStatus::Converged,
                    iterations: iteration,
                    residual_norm: data_cost.sqrt(),
                });
            }

            let current_objective = data_cost + self.regularization_cost(&x);
            let mut accepted = None;
            for _ in 0..MAX_BACKTRACK_HALVINGS {
                let mut candidate = x.clone();
                candidate.scaled_add(-step, &grad);
                let candidate_objective = self.objective(&candidate)?;
                if candidate_objective <= current_objective {
                    accepted = Some(candidate);
                    break;
                }
                step *= 0.5;
            }
            let Some(next) = accepted else {
                // No step of any length decreases the objective: the
                // estimate is numerically stationary.
                tracing::warn!(iteration, grad_rms, "no descent step found, stopping");
                return Ok(SolveOutcome {
                    estimate: x,
                    status: SolveStatus::Converged,
                    iterations: iteration,
                    residual_norm: data_cost.sqrt(),
                });
            };
            x = next;

            let (next_grad, next_cost) = self.data_terms(&x)?;
            grad = next_grad;
            data_cost = next_cost;
            tracing::debug!(
                iteration,
                step,
                grad_rms,
                data_cost,
                "descent step accepted"
            );
        }

        tracing::info!(
            max_iterations = self.config.max_iterations,
            residual_norm = data_cost.sqrt(),
            "iteration cap reached before convergence"
        );
        Ok(SolveOutcome {
            estimate: x,
            status: SolveStatus::MaxIterationsReached,
            iterations: self.config.max_iterations,
            residual_norm: data_cost.sqrt(),
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
