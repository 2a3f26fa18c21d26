//! superres — recover a high-resolution image from a sequence of degraded
//! low-resolution frames.
//!
//! The physical forward model degrades a high-resolution scene per frame:
//! translational motion, point-spread-function blur, and decimation (with
//! additive sensor noise when simulating data). [`SuperResolver`] inverts
//! that chain: it assembles the operator composition from a
//! [`SuperResolveConfig`], upsamples the first observed frame as the initial
//! guess, and runs the regularized MAP solver from `superres-core`.
//!
//! # Public API
//! - [`SuperResolver`] and [`SuperResolveConfig`] as primary entry points
//! - [`SequenceGenerator`] for producing synthetic degraded sequences from a
//!   single clean image (ground-truth testing)
//! - re-exported core types: [`PixelBuffer`], [`MotionShiftSequence`],
//!   solver statuses and errors

mod api;
mod config;
mod degrade;

pub use api::{SuperResolveResult, SuperResolver};
pub use config::SuperResolveConfig;
pub use degrade::SequenceGenerator;

pub use superres_core::{
    ImageSize, MotionShift, MotionShiftSequence, PixelBuffer, Result, SolveStatus, SuperResError,
};
