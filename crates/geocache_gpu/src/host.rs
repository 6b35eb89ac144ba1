//! CPU-memory GPU context.
//!
//! Keeps a byte copy of every buffer and counts operations, so headless tools
//! and tests can inspect exactly what would have reached the device.

use geocache_core::{GeocacheError, Result};
use slotmap::SlotMap;

use crate::context::{BufferKey, BufferUsage, GpuContext};

/// Operation counters since creation (or the last [`HostContext::reset_stats`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuStats {
    pub creates: u32,
    pub resizes: u32,
    pub writes: u32,
    pub destroys: u32,
    pub bytes_written: u64,
}

#[derive(Debug)]
struct HostBuffer {
    label: String,
    usage: BufferUsage,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct HostContext {
    buffers: SlotMap<BufferKey, HostBuffer>,
    stats: GpuStats,
}

impl HostContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of a live buffer.
    #[must_use]
    pub fn read(&self, buffer: BufferKey) -> Option<&[u8]> {
        self.buffers.get(buffer).map(|b| b.data.as_slice())
    }

    /// Copies a live buffer out as typed elements.
    #[must_use]
    pub fn read_as<T: bytemuck::Pod>(&self, buffer: BufferKey) -> Option<Vec<T>> {
        self.read(buffer)
            .map(|bytes| bytemuck::pod_collect_to_vec::<u8, T>(bytes))
    }

    #[must_use]
    pub fn label(&self, buffer: BufferKey) -> Option<&str> {
        self.buffers.get(buffer).map(|b| b.label.as_str())
    }

    #[must_use]
    pub fn usage(&self, buffer: BufferKey) -> Option<BufferUsage> {
        self.buffers.get(buffer).map(|b| b.usage)
    }

    #[must_use]
    pub fn contains(&self, buffer: BufferKey) -> bool {
        self.buffers.contains_key(buffer)
    }

    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn stats(&self) -> GpuStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = GpuStats::default();
    }

    fn get_mut(&mut self, buffer: BufferKey) -> Result<&mut HostBuffer> {
        self.buffers
            .get_mut(buffer)
            .ok_or_else(|| GeocacheError::UnknownBuffer(format!("{buffer:?}")))
    }
}

impl GpuContext for HostContext {
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
        self.stats.creates += 1;
        Ok(self.buffers.insert(HostBuffer {
            label: label.to_string(),
            usage,
            data: vec![0; size_bytes as usize],
        }))
    }

    fn resize_buffer(&mut self, buffer: BufferKey, size_bytes: u64) -> Result<()> {
        let host = self.get_mut(buffer)?;
        if size_bytes == 0 {
            return Err(GeocacheError::InvalidBufferResize {
                label: host.label.clone(),
                size_bytes,
            });
        }
        host.data.resize(size_bytes as usize, 0);
        self.stats.resizes += 1;
        Ok(())
    }

    fn write_buffer(&mut self, buffer: BufferKey, offset: u64, bytes: &[u8]) -> Result<()> {
        let host = self.get_mut(buffer)?;
        let start = offset as usize;
        let end = start + bytes.len();
        if end > host.data.len() {
            return Err(GeocacheError::WriteOutOfRange {
                offset,
                len: bytes.len() as u64,
                size: host.data.len() as u64,
            });
        }
        host.data[start..end].copy_from_slice(bytes);
        self.stats.writes += 1;
        self.stats.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferKey) {
        if self.buffers.remove(buffer).is_some() {
            self.stats.destroys += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_past_end_is_rejected() {
        let mut ctx = HostContext::new();
        let key = ctx.create_buffer(8, BufferUsage::Vertex, "b").unwrap();
        assert!(ctx.write_buffer(key, 4, &[1, 2, 3, 4]).is_ok());
        assert!(matches!(
            ctx.write_buffer(key, 6, &[1, 2, 3, 4]),
            Err(GeocacheError::WriteOutOfRange { .. })
        ));
        assert_eq!(ctx.read(key).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_sized_buffers_are_rejected() {
        let mut ctx = HostContext::new();
        assert!(ctx.create_buffer(0, BufferUsage::Index, "b").is_err());
        let key = ctx.create_buffer(4, BufferUsage::Index, "b").unwrap();
        assert!(matches!(
            ctx.resize_buffer(key, 0),
            Err(GeocacheError::InvalidBufferResize { size_bytes: 0, .. })
        ));
    }

    #[test]
    fn destroy_invalidates_handle() {
        let mut ctx = HostContext::new();
        let key = ctx.create_buffer(4, BufferUsage::Vertex, "b").unwrap();
        ctx.destroy_buffer(key);
        ctx.destroy_buffer(key);
        assert!(!ctx.contains(key));
        assert_eq!(ctx.stats().destroys, 1);
        assert!(ctx.write_buffer(key, 0, &[0; 4]).is_err());
    }
}
