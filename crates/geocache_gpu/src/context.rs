use geocache_core::Result;
use slotmap::new_key_type;

new_key_type! {
    /// Handle to a buffer owned by a [`GpuContext`].
    pub struct BufferKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// Buffer management capability the vertex store drives.
///
/// Every call is an enqueue from the caller's point of view: implementations
/// must not block, and must apply operations in submission order.
pub trait GpuContext {
    /// Allocates an uninitialized buffer. Zero sizes are rejected.
    fn create_buffer(&mut self, size_bytes: u64, usage: BufferUsage, label: &str)
    -> Result<BufferKey>;

    /// Changes the size of a live buffer. The handle stays valid; contents are undefined.
    fn resize_buffer(&mut self, buffer: BufferKey, size_bytes: u64) -> Result<()>;

    fn write_buffer(&mut self, buffer: BufferKey, offset: u64, bytes: &[u8]) -> Result<()>;

    fn destroy_buffer(&mut self, buffer: BufferKey);
}
