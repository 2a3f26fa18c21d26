//! User-facing configuration for the resolve pipeline.

use superres_core::solver::MapSolverConfig;
use superres_core::{Result, SuperResError};

/// Everything needed to assemble the forward model and tune the solver.
///
/// Defaults follow the common video case: 2x upscale, a mild Gaussian PSF,
/// 8-bit intensity units for noise.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SuperResolveConfig {
    /// Integer downsampling factor between the high-resolution estimate and
    /// the observed frames.
    pub scale: usize,
    /// Gaussian PSF radius in pixels (kernel side is `2r + 1`).
    pub blur_radius: usize,
    /// Gaussian PSF sigma in pixels.
    pub blur_sigma: f64,
    /// Sensor noise standard deviation in intensity units (0–255 scale).
    /// Used when simulating degraded sequences; the solve itself treats
    /// noise as part of the data misfit.
    pub noise_sigma: f64,
    /// Total-variation regularization weight λ.
    pub regularization_weight: f64,
    /// Convergence threshold on the solver's gradient RMS.
    pub convergence_threshold: f64,
    /// Solver iteration cap.
    pub max_iterations: usize,
    /// Initial descent step size.
    pub step_size: f64,
}

impl Default for SuperResolveConfig {
    fn default() -> Self {
        Self {
            scale: 2,
            blur_radius: 2,
            blur_sigma: 1.0,
            noise_sigma: 5.0,
            regularization_weight: 0.05,
            convergence_threshold: 1e-3,
            max_iterations: 100,
            step_size: 0.2,
        }
    }
}

impl SuperResolveConfig {
    /// Reject invalid parameters before any model is built: non-positive
    /// scale, non-positive blur parameters, negative noise sigma, or bad
    /// solver tuning.
    pub fn validate(&self) -> Result<()> {
        if self.scale == 0 {
            return Err(SuperResError::InvalidConfig(
                "scale must be a positive integer".into(),
            ));
        }
        if self.blur_radius == 0 {
            return Err(SuperResError::InvalidConfig(
                "blur radius must be positive".into(),
            ));
        }
        if !(self.blur_sigma > 0.0) || !self.blur_sigma.is_finite() {
            return Err(SuperResError::InvalidConfig(format!(
                "blur sigma must be positive and finite, got {}",
                self.blur_sigma
            )));
        }
        if !(self.noise_sigma >= 0.0) || !self.noise_sigma.is_finite() {
            return Err(SuperResError::InvalidConfig(format!(
                "noise sigma must be non-negative and finite, got {}",
                self.noise_sigma
            )));
        }
        self.solver_config().validate()
    }

    /// The solver slice of this configuration.
    pub fn solver_config(&self) -> MapSolverConfig {
        MapSolverConfig {
            regularization_weight: self.regularization_weight,
            convergence_threshold: self.convergence_threshold,
            max_iterations: self.max_iterations,
            step_size: self.step_size,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SuperResolveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = |f: fn(&mut SuperResolveConfig)| {
            let mut cfg = SuperResolveConfig::default();
            f(&mut cfg);
            cfg.validate()
        };
        assert!(bad(|c| c.scale = 0).is_err());
        assert!(bad(|c| c.blur_radius = 0).is_err());
        assert!(bad(|c| c.blur_sigma = -0.5).is_err());
        assert!(bad(|c| c.noise_sigma = f64::INFINITY).is_err());
        assert!(bad(|c| c.convergence_threshold = 0.0).is_err());
        assert!(bad(|c| c.step_size = 0.0).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let cfg = SuperResolveConfig {
            scale: 3,
            max_iterations: 40,
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SuperResolveConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scale, 3);
        assert_eq!(back.max_iterations, 40);
    }
}
