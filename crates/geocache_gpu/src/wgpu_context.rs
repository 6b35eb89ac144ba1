//! `wgpu`-backed GPU context.
//!
//! Buffers cannot change size in place on the device, so a resize allocates a
//! new `wgpu::Buffer` and rebinds it under the same [`BufferKey`]. The old
//! buffer is dropped; `wgpu` keeps it alive until in-flight work is done.

use geocache_core::{GeocacheError, Result};
use slotmap::SlotMap;

use crate::context::{BufferKey, BufferUsage, GpuContext};

struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
    usage: wgpu::BufferUsages,
    label: String,
}

impl GpuBuffer {
    fn new(device: &wgpu::Device, size: u64, usage: wgpu::BufferUsages, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: aligned_size(size),
            usage,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            size,
            usage,
            label: label.to_string(),
        }
    }

    fn resize(&mut self, device: &wgpu::Device, new_size: u64) {
        self.buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label),
            size: aligned_size(new_size),
            usage: self.usage,
            mapped_at_creation: false,
        });
        self.size = new_size;
    }
}

fn aligned_size(size: u64) -> u64 {
    size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

fn wgpu_usage(usage: BufferUsage) -> wgpu::BufferUsages {
    match usage {
        BufferUsage::Vertex => {
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
        }
        BufferUsage::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
    }
}

pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: SlotMap<BufferKey, GpuBuffer>,
}

impl WgpuContext {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: SlotMap::with_key(),
        }
    }

    /// The device buffer currently bound to `key`. Re-query after a resize.
    #[must_use]
    pub fn buffer(&self, key: BufferKey) -> Option<&wgpu::Buffer> {
        self.buffers.get(key).map(|b| &b.buffer)
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Allocated size as requested by the caller, before alignment padding.
    #[must_use]
    pub fn buffer_size(&self, key: BufferKey) -> Option<u64> {
        self.buffers.get(key).map(|b| b.size)
    }
}

impl GpuContext for WgpuContext {
    fn create_buffer(
        &mut self,
        size_bytes: u64,
        usage: BufferUsage,
        label: &str,
    ) -> Result<BufferKey> {
        if size_bytes == 0 {
            return Err(GeocacheError::InvalidBufferResize {
                label: label.to_string(),
                size_bytes,
            });
        }
        let buffer = GpuBuffer::new(&self.device, size_bytes, wgpu_usage(usage), label);
        Ok(self.buffers.insert(buffer))
    }

    fn resize_buffer(&mut self, key: BufferKey, size_bytes: u64) -> Result<()> {
        let Self {
            device, buffers, ..
        } = self;
        let gpu_buffer = buffers
            .get_mut(key)
            .ok_or_else(|| GeocacheError::UnknownBuffer(format!("{key:?}")))?;
        if size_bytes == 0 {
            return Err(GeocacheError::InvalidBufferResize {
                label: gpu_buffer.label.clone(),
                size_bytes,
            });
        }
        log::debug!(
            "Resizing '{}': {} -> {} bytes",
            gpu_buffer.label,
            gpu_buffer.size,
            size_bytes
        );
        gpu_buffer.resize(device, size_bytes);
        Ok(())
    }

    fn write_buffer(&mut self, key: BufferKey, offset: u64, bytes: &[u8]) -> Result<()> {
        let gpu_buffer = self
            .buffers
            .get(key)
            .ok_or_else(|| GeocacheError::UnknownBuffer(format!("{key:?}")))?;
        let len = bytes.len() as u64;
        if offset + len > gpu_buffer.size {
            return Err(GeocacheError::WriteOutOfRange {
                offset,
                len,
                size: gpu_buffer.size,
            });
        }
        self.queue.write_buffer(&gpu_buffer.buffer, offset, bytes);
        Ok(())
    }

    fn destroy_buffer(&mut self, key: BufferKey) {
        if let Some(gpu_buffer) = self.buffers.remove(key) {
            gpu_buffer.buffer.destroy();
        }
    }
}
