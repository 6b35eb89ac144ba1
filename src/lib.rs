//! # geocache
//!
//! Playback of pre-baked geometry caches with double-buffered GPU vertex data.
//!
//! This crate re-exports the workspace members:
//!
//! - [`geocache_core`]: samples, sample sources, settings, errors and diagnostics
//! - [`geocache_gpu`]: the [`GpuContext`] abstraction and the per-track vertex store
//! - [`geocache_playback`]: frame resolution, the two-frame sample cache, track
//!   animators and the [`SceneAggregator`]
//!
//! Most users only need the [`prelude`].

pub use geocache_core;
pub use geocache_gpu;
pub use geocache_playback;

pub use glam;

pub use geocache_core::{
    CacheSettings, DiagnosticLog, DiagnosticSink, FlipbookTrack, GeocacheError, LogSink,
    MaterialRef, MeshBatch, Result, Sample, SampleSource, SoftFailure, TopologySignature,
    TrackKey, VisibilityTimeline,
};
pub use geocache_gpu::{
    BufferKey, BufferUsage, DoubleBufferedVertexStore, GpuContext, HostContext, SlotId,
    SlotView, VertexAttribute, WgpuContext,
};
pub use geocache_playback::{
    AnimatorState, FramePair, PlaybackState, Pose, SceneAggregator, Track, TrackAnimator, TrackRenderState, resolve,
};

pub mod prelude {
    pub use geocache_core::{
        CacheSettings, DiagnosticLog, DiagnosticSink, FlipbookTrack, GeocacheError, Result,
        Sample, SampleSource, TrackKey, VisibilityTimeline,
    };
    pub use geocache_gpu::{GpuContext, HostContext, VertexAttribute, WgpuContext};
    pub use geocache_playback::{
        PlaybackState, SceneAggregator, Track, TrackAnimator, TrackRenderState,
    };
}
