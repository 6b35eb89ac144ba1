//! Decoded mesh frames.
//!
//! A [`Sample`] is immutable once built. Tracks hand them out as `Arc<Sample>`
//! so a sample cache can hold on to a frame without copying vertex data.

use glam::{Vec2, Vec3, Vec4};
use xxhash_rust::xxh3::xxh3_64;

use crate::errors::{GeocacheError, Result};

/// Fingerprint used to decide whether two samples can be blended vertex by vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TopologySignature {
    pub vertex_count: u32,
    pub index_count: u32,
    /// xxh3 hash of the index list
    pub connectivity: u64,
}

impl TopologySignature {
    #[must_use]
    pub fn from_mesh(vertex_count: usize, indices: &[u32]) -> Self {
        Self {
            vertex_count: vertex_count as u32,
            index_count: indices.len() as u32,
            connectivity: xxh3_64(bytemuck::cast_slice(indices)),
        }
    }
}

/// A contiguous index range drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshBatch {
    pub start_index: u32,
    pub num_triangles: u32,
    pub material_index: u32,
}

/// One decoded mesh frame.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    tangents_x: Option<Vec<Vec4>>,
    tangents_z: Option<Vec<Vec4>>,
    uvs: Option<Vec<Vec2>>,
    colors: Option<Vec<[u8; 4]>>,
    /// Units per second of cache time
    motion_vectors: Option<Vec<Vec3>>,
    batches: Vec<MeshBatch>,
    topology: TopologySignature,
}

impl Sample {
    /// Creates a sample with a single batch covering every index.
    #[must_use]
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let topology = TopologySignature::from_mesh(positions.len(), &indices);
        let batches = vec![MeshBatch {
            start_index: 0,
            num_triangles: (indices.len() / 3) as u32,
            material_index: 0,
        }];
        Self {
            positions,
            indices,
            tangents_x: None,
            tangents_z: None,
            uvs: None,
            colors: None,
            motion_vectors: None,
            batches,
            topology,
        }
    }

    #[must_use]
    pub fn with_tangents(mut self, tangents_x: Vec<Vec4>, tangents_z: Vec<Vec4>) -> Self {
        self.tangents_x = Some(tangents_x);
        self.tangents_z = Some(tangents_z);
        self
    }

    #[must_use]
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: Vec<[u8; 4]>) -> Self {
        self.colors = Some(colors);
        self
    }

    #[must_use]
    pub fn with_motion_vectors(mut self, motion_vectors: Vec<Vec3>) -> Self {
        self.motion_vectors = Some(motion_vectors);
        self
    }

    #[must_use]
    pub fn with_batches(mut self, batches: Vec<MeshBatch>) -> Self {
        self.batches = batches;
        self
    }

    /// Checks that every attribute array matches the vertex count and that
    /// indices describe whole triangles inside the vertex range.
    pub fn validate(&self) -> Result<()> {
        let count = self.positions.len();
        let lengths = [
            ("tangent_x", self.tangents_x.as_ref().map(Vec::len)),
            ("tangent_z", self.tangents_z.as_ref().map(Vec::len)),
            ("uv", self.uvs.as_ref().map(Vec::len)),
            ("color", self.colors.as_ref().map(Vec::len)),
            ("motion_vector", self.motion_vectors.as_ref().map(Vec::len)),
        ];
        for (name, len) in lengths {
            if let Some(len) = len
                && len != count
            {
                return Err(GeocacheError::InvalidSample(format!(
                    "{name} count {len} does not match vertex count {count}"
                )));
            }
        }

        if self.indices.len() % 3 != 0 {
            return Err(GeocacheError::InvalidSample(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(&max) = self.indices.iter().max()
            && max as usize >= count
        {
            return Err(GeocacheError::InvalidSample(format!(
                "index {max} out of range for {count} vertices"
            )));
        }

        let index_count = self.indices.len() as u64;
        for batch in &self.batches {
            let end = u64::from(batch.start_index) + u64::from(batch.num_triangles) * 3;
            if end > index_count {
                return Err(GeocacheError::InvalidSample(format!(
                    "batch {batch:?} exceeds {index_count} indices"
                )));
            }
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[must_use]
    pub fn tangents_x(&self) -> Option<&[Vec4]> {
        self.tangents_x.as_deref()
    }

    #[must_use]
    pub fn tangents_z(&self) -> Option<&[Vec4]> {
        self.tangents_z.as_deref()
    }

    #[must_use]
    pub fn uvs(&self) -> Option<&[Vec2]> {
        self.uvs.as_deref()
    }

    #[must_use]
    pub fn colors(&self) -> Option<&[[u8; 4]]> {
        self.colors.as_deref()
    }

    #[must_use]
    pub fn motion_vectors(&self) -> Option<&[Vec3]> {
        self.motion_vectors.as_deref()
    }

    #[must_use]
    pub fn batches(&self) -> &[MeshBatch] {
        &self.batches
    }

    #[inline]
    #[must_use]
    pub fn topology(&self) -> TopologySignature {
        self.topology
    }

    /// Whether positions of `self` and `other` can be blended vertex by vertex.
    #[inline]
    #[must_use]
    pub fn is_topology_compatible(&self, other: &Sample) -> bool {
        self.topology == other.topology
    }
}
