//! Error Types
//!
//! This module defines the error types used throughout geocache.
//!
//! # Overview
//!
//! [`GeocacheError`] covers every failure a caller can observe:
//! - Upstream sample fetch failures
//! - GPU buffer allocation and resize preconditions
//! - Malformed track or sample data
//! - Settings parsing
//!
//! [`SoftFailure`] is the narrower, recoverable subset that is routed to a
//! [`DiagnosticSink`](crate::DiagnosticSink) instead of being returned.
//!
//! ```rust,ignore
//! use geocache_core::errors::{GeocacheError, Result};
//!
//! fn check(count: usize) -> Result<()> {
//!     if count == 0 {
//!         return Err(GeocacheError::EmptyTimeTable);
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for geocache.
#[derive(Error, Debug)]
pub enum GeocacheError {
    // ========================================================================
    // Sample Source Errors
    // ========================================================================
    /// The upstream source could not provide the requested frame.
    #[error("Missing sample for frame {frame}: {reason}")]
    MissingSample {
        /// Frame index that was requested
        frame: usize,
        /// Source-specific description
        reason: String,
    },

    /// Sample timestamps must be strictly increasing.
    #[error("Sample time {time} does not follow previous time {previous}")]
    NonMonotonicTime {
        /// Last accepted timestamp
        previous: f32,
        /// Rejected timestamp
        time: f32,
    },

    /// A track was registered without any samples.
    #[error("Track has an empty time table")]
    EmptyTimeTable,

    /// Sample attribute arrays or indices are inconsistent.
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    // ========================================================================
    // GPU Resource Errors
    // ========================================================================
    /// A buffer was requested with a zero byte size.
    #[error("Invalid buffer resize for '{label}': {size_bytes} bytes")]
    InvalidBufferResize {
        /// Debug label of the buffer
        label: String,
        /// Requested size
        size_bytes: u64,
    },

    /// The handle does not refer to a live buffer.
    #[error("Unknown GPU buffer: {0}")]
    UnknownBuffer(String),

    /// A write would run past the end of the buffer.
    #[error("Buffer write out of range: offset {offset} + {len} bytes > {size} bytes")]
    WriteOutOfRange {
        /// Byte offset of the write
        offset: u64,
        /// Length of the write
        len: u64,
        /// Allocated size of the buffer
        size: u64,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings could not be parsed.
    #[error("Settings parse error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Recoverable per-track failure reported through a diagnostic sink.
///
/// Playback never aborts on these; the track keeps its last good pose.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SoftFailure {
    #[error("missing sample: {reason}")]
    MissingSample { reason: String },

    #[error("invalid buffer resize to {size_bytes} bytes")]
    InvalidBufferResize { size_bytes: u64 },
}

impl SoftFailure {
    /// Narrows a hard error to its recoverable form, if it has one.
    #[must_use]
    pub fn from_error(err: &GeocacheError) -> Option<Self> {
        match err {
            GeocacheError::MissingSample { reason, .. } => Some(Self::MissingSample {
                reason: reason.clone(),
            }),
            GeocacheError::InvalidBufferResize { size_bytes, .. } => {
                Some(Self::InvalidBufferResize {
                    size_bytes: *size_bytes,
                })
            }
            _ => None,
        }
    }
}

/// Alias for `Result<T, GeocacheError>`.
pub type Result<T> = std::result::Result<T, GeocacheError>;
