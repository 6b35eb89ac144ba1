//! # geocache_gpu
//!
//! GPU-side storage for geometry cache playback.
//!
//! - [`GpuContext`]: the buffer create/resize/write/destroy capability
//! - [`HostContext`]: CPU-memory implementation for headless runs and tests
//! - [`WgpuContext`]: implementation backed by a `wgpu` device and queue
//! - [`DoubleBufferedVertexStore`]: per-track position ring plus single-buffered attributes

pub mod context;
pub mod host;
pub mod vertex_store;
pub mod wgpu_context;

pub use context::{BufferKey, BufferUsage, GpuContext};
pub use host::{GpuStats, HostContext};
pub use vertex_store::{
    AttributeBuffer, DoubleBufferedVertexStore, SlotId, SlotView, VertexAttribute,
    VertexBufferSlot,
};
pub use wgpu_context::WgpuContext;
