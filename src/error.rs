//! # Configuration Errors
//!
//! Only the non-real-time configuration path can fail. Everything on the
//! audio path clamps instead of erroring, so these never appear inside
//! `process()`.

use thiserror::Error;

/// Errors returned when an [`EngineConfig`](crate::engine::EngineConfig)
/// cannot be turned into a working delay line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The sample rate must be a finite, strictly positive number of Hz.
    #[error("invalid sample rate: {0} Hz (must be finite and > 0)")]
    InvalidSampleRate(f32),

    /// The requested history would need an unreasonably large allocation.
    #[error("max delay of {requested} samples exceeds the limit of {limit} samples")]
    MaxDelayTooLarge {
        /// Requested maximum delay in samples.
        requested: usize,
        /// Hard ceiling on the delay line length.
        limit: usize,
    },
}
