use std::sync::Arc;

use geocache_core::{MaterialRef, SampleSource};
use glam::Affine3A;

/// Registration data for one animated sub-mesh stream.
#[derive(Clone)]
pub struct Track {
    pub name: String,
    pub source: Arc<dyn SampleSource>,
    /// Indexed by `MeshBatch::material_index`
    pub materials: Vec<MaterialRef>,
    pub world_transform: Affine3A,
}

impl Track {
    #[must_use]
    pub fn new(name: &str, source: Arc<dyn SampleSource>) -> Self {
        Self {
            name: name.to_string(),
            source,
            materials: Vec::new(),
            world_transform: Affine3A::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_materials(mut self, materials: Vec<MaterialRef>) -> Self {
        self.materials = materials;
        self
    }

    #[must_use]
    pub fn with_world_transform(mut self, world_transform: Affine3A) -> Self {
        self.world_transform = world_transform;
        self
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("name", &self.name)
            .field("frames", &self.source.frame_count())
            .field("materials", &self.materials)
            .field("world_transform", &self.world_transform)
            .finish()
    }
}
