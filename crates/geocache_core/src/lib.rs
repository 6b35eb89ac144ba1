//! # geocache_core
//!
//! Foundational types shared by every geocache crate:
//!
//! - [`Sample`]: one decoded mesh frame plus its [`TopologySignature`]
//! - [`SampleSource`]: the upstream provider of samples, time tables and visibility
//! - [`FlipbookTrack`]: an in-memory [`SampleSource`] built from appended samples
//! - [`CacheSettings`]: runtime switches for playback behaviour
//! - [`DiagnosticSink`]: where recoverable per-track failures are reported
//! - [`GeocacheError`]: the crate-wide error type

pub mod diagnostics;
pub mod errors;
pub mod ids;
pub mod sample;
pub mod settings;
pub mod source;

pub use diagnostics::{DiagnosticEvent, DiagnosticLog, DiagnosticSink, LogSink};
pub use errors::{GeocacheError, Result, SoftFailure};
pub use ids::{MaterialRef, TrackKey};
pub use sample::{MeshBatch, Sample, TopologySignature};
pub use settings::CacheSettings;
pub use source::{FlipbookTrack, SampleSource, VisibilitySample, VisibilityTimeline};
