//! Double-buffered vertex storage.
//!
//! A track keeps two position buffers: the one written for the current render
//! frame and the one written for the render frame before it. This is not the
//! same as the cache's mesh frames; a 10 fps cache interpolated to 60 fps
//! renders writes a new position buffer every render frame.
//!
//! The renderer derives per-vertex velocity from the pair as
//! `(current - previous) / (current.time - previous.time)`.
//!
//! Tangents, texture coordinates, colors and motion vectors carry no history
//! and are single-buffered, as is the index buffer.

use geocache_core::{GeocacheError, Result};
use glam::Vec3;

use crate::context::{BufferKey, BufferUsage, GpuContext};

/// Marker for one of the two position slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    #[inline]
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    #[inline]
    fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// One of the two position buffers of a track.
#[derive(Debug, Clone, Default)]
pub struct VertexBufferSlot {
    buffer: Option<BufferKey>,
    frame_index: usize,
    time: f32,
    size_bytes: u64,
    valid: bool,
}

impl VertexBufferSlot {
    #[must_use]
    pub fn buffer(&self) -> Option<BufferKey> {
        self.buffer
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Read-only view of a written slot, as handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotView {
    pub slot: SlotId,
    pub buffer: BufferKey,
    /// Cache frame the positions were taken from (nearest frame when blended)
    pub frame_index: usize,
    /// Exact cache time the positions represent
    pub time: f32,
    pub size_bytes: u64,
}

/// Single-buffered per-vertex attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    TangentX,
    TangentZ,
    TexCoord,
    Color,
    MotionVector,
}

impl VertexAttribute {
    pub const COUNT: usize = 5;

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::TangentX => "TangentX",
            Self::TangentZ => "TangentZ",
            Self::TexCoord => "TexCoord",
            Self::Color => "Color",
            Self::MotionVector => "MotionVector",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A lazily created buffer that is resized only when the written size changes.
#[derive(Debug, Clone, Default)]
pub struct AttributeBuffer {
    buffer: Option<BufferKey>,
    size_bytes: u64,
}

impl AttributeBuffer {
    #[must_use]
    pub fn buffer(&self) -> Option<BufferKey> {
        self.buffer
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Writes `bytes` at offset 0, creating or resizing first when needed.
    /// Returns `true` if the buffer was created or resized.
    pub fn write(
        &mut self,
        gpu: &mut dyn GpuContext,
        usage: BufferUsage,
        label: &str,
        bytes: &[u8],
    ) -> Result<bool> {
        let size = bytes.len() as u64;
        let (key, reallocated) =
            ensure_buffer(gpu, self.buffer, self.size_bytes, size, usage, label)?;
        self.buffer = Some(key);
        self.size_bytes = size;
        gpu.write_buffer(key, 0, bytes)?;
        Ok(reallocated)
    }

    fn release(&mut self, gpu: &mut dyn GpuContext) {
        if let Some(key) = self.buffer.take() {
            gpu.destroy_buffer(key);
        }
        self.size_bytes = 0;
    }
}

/// Creates `current` if absent, resizes it if `size` differs from `allocated`.
fn ensure_buffer(
    gpu: &mut dyn GpuContext,
    current: Option<BufferKey>,
    allocated: u64,
    size: u64,
    usage: BufferUsage,
    label: &str,
) -> Result<(BufferKey, bool)> {
    if size == 0 {
        return Err(GeocacheError::InvalidBufferResize {
            label: label.to_string(),
            size_bytes: size,
        });
    }
    match current {
        None => Ok((gpu.create_buffer(size, usage, label)?, true)),
        Some(key) if allocated != size => {
            log::debug!("Buffer '{label}' resized: {allocated} -> {size} bytes");
            gpu.resize_buffer(key, size)?;
            Ok((key, true))
        }
        Some(key) => Ok((key, false)),
    }
}

/// Per-track vertex storage: a two-slot position ring, single-buffered
/// attributes and the index buffer.
#[derive(Debug, Default)]
pub struct DoubleBufferedVertexStore {
    label: String,
    slots: [VertexBufferSlot; 2],
    current: Option<SlotId>,
    /// No upload happened this render frame; previous reports current.
    settled: bool,
    last_upload_frame: Option<u64>,
    attributes: [AttributeBuffer; VertexAttribute::COUNT],
    indices: AttributeBuffer,
    index_count: u32,
}

impl DoubleBufferedVertexStore {
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// `true` once the first position upload has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn current_slot(&self) -> Option<SlotId> {
        self.current
    }

    #[must_use]
    pub fn slot(&self, id: SlotId) -> &VertexBufferSlot {
        &self.slots[id.index()]
    }

    /// Writes positions into the slot not marked current, then marks it current.
    ///
    /// The buffer is resized only when the byte size differs from the slot's
    /// allocation. At most one upload per `render_frame` is allowed.
    pub fn upload(
        &mut self,
        gpu: &mut dyn GpuContext,
        render_frame: u64,
        frame_index: usize,
        time: f32,
        positions: &[Vec3],
    ) -> Result<SlotId> {
        debug_assert_ne!(
            self.last_upload_frame,
            Some(render_frame),
            "'{}' uploaded twice in render frame {render_frame}",
            self.label
        );

        let bytes: &[u8] = bytemuck::cast_slice(positions);
        let size = bytes.len() as u64;
        let target = self.current.map_or(SlotId::A, SlotId::other);
        let label = format!("{}_Positions{:?}", self.label, target);

        let slot = &mut self.slots[target.index()];
        let (key, _) = ensure_buffer(
            gpu,
            slot.buffer,
            slot.size_bytes,
            size,
            BufferUsage::Vertex,
            &label,
        )?;
        slot.buffer = Some(key);
        slot.size_bytes = size;
        slot.valid = false;

        gpu.write_buffer(key, 0, bytes)?;
        slot.frame_index = frame_index;
        slot.time = time;
        slot.valid = true;

        self.current = Some(target);
        self.settled = false;
        self.last_upload_frame = Some(render_frame);
        Ok(target)
    }

    /// Marks a render frame without new positions: motion history collapses
    /// onto the current slot until the next upload.
    pub fn settle(&mut self) {
        if self.current.is_some() {
            self.settled = true;
        }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    fn view(&self, id: SlotId) -> Option<SlotView> {
        let slot = &self.slots[id.index()];
        if !slot.valid {
            return None;
        }
        Some(SlotView {
            slot: id,
            buffer: slot.buffer?,
            frame_index: slot.frame_index,
            time: slot.time,
            size_bytes: slot.size_bytes,
        })
    }

    #[must_use]
    pub fn current(&self) -> Option<SlotView> {
        self.current.and_then(|id| self.view(id))
    }

    /// The slot written one render frame earlier. Falls back to the current
    /// slot before the second upload and while settled.
    #[must_use]
    pub fn previous(&self) -> Option<SlotView> {
        let current = self.current?;
        if self.settled {
            return self.view(current);
        }
        self.view(current.other()).or_else(|| self.view(current))
    }

    /// `current.time - previous.time`; zero when there is no motion history.
    #[must_use]
    pub fn motion_time_delta(&self) -> f32 {
        match (self.current(), self.previous()) {
            (Some(current), Some(previous)) => current.time - previous.time,
            _ => 0.0,
        }
    }

    pub fn upload_attribute(
        &mut self,
        gpu: &mut dyn GpuContext,
        attribute: VertexAttribute,
        bytes: &[u8],
    ) -> Result<()> {
        let label = format!("{}_{}", self.label, attribute.label());
        self.attributes[attribute.index()].write(gpu, BufferUsage::Vertex, &label, bytes)?;
        Ok(())
    }

    /// Destroys one attribute buffer, e.g. when the current frame lacks it.
    pub fn release_attribute(&mut self, gpu: &mut dyn GpuContext, attribute: VertexAttribute) {
        self.attributes[attribute.index()].release(gpu);
    }

    #[must_use]
    pub fn attribute(&self, attribute: VertexAttribute) -> &AttributeBuffer {
        &self.attributes[attribute.index()]
    }

    pub fn upload_indices(&mut self, gpu: &mut dyn GpuContext, indices: &[u32]) -> Result<()> {
        let label = format!("{}_Indices", self.label);
        self.indices
            .write(gpu, BufferUsage::Index, &label, bytemuck::cast_slice(indices))?;
        self.index_count = indices.len() as u32;
        Ok(())
    }

    #[must_use]
    pub fn index_buffer(&self) -> Option<BufferKey> {
        self.indices.buffer()
    }

    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Total bytes currently allocated for this track.
    #[must_use]
    pub fn allocated_size(&self) -> u64 {
        let slots: u64 = self
            .slots
            .iter()
            .filter(|s| s.buffer.is_some())
            .map(|s| s.size_bytes)
            .sum();
        let attributes: u64 = self.attributes.iter().map(AttributeBuffer::size_bytes).sum();
        slots + attributes + self.indices.size_bytes()
    }

    /// Destroys every owned buffer and returns to the uninitialized state.
    pub fn release(&mut self, gpu: &mut dyn GpuContext) {
        for slot in &mut self.slots {
            if let Some(key) = slot.buffer.take() {
                gpu.destroy_buffer(key);
            }
            *slot = VertexBufferSlot::default();
        }
        for attribute in &mut self.attributes {
            attribute.release(gpu);
        }
        self.indices.release(gpu);
        self.index_count = 0;
        self.current = None;
        self.settled = false;
        self.last_upload_frame = None;
    }
}
