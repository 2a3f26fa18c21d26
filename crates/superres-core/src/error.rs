//! Error taxonomy for model construction and solving.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SuperResError>;

/// Errors surfaced by operator construction, model application, and solving.
#[derive(Debug, thiserror::Error)]
pub enum SuperResError {
    /// A configuration value rejected at construction/setup time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A frame index beyond the available per-frame data (motion shifts,
    /// observations). Fatal at the call site, never clamped.
    #[error("frame index {index} out of range: {available} frames available")]
    FrameIndexOutOfRange { index: usize, available: usize },

    /// Buffer dimensions incompatible with an operator or with another
    /// buffer in the same chain.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// NaN or Inf detected in a residual or estimate. Surfaced instead of
    /// propagating through further iterations.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),
}
