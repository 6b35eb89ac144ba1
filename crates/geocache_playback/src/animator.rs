//! Per-track playback.
//!
//! A [`TrackAnimator`] turns the shared playback clock into GPU data for one
//! track: resolve the frame pair, make sure both frames are resident, derive
//! the pose (blended or nearest frame), and write it into the track's
//! double-buffered vertex store. Work is skipped whenever the pose is the
//! same as the last one uploaded.

use std::sync::Arc;

use geocache_core::{
    CacheSettings, DiagnosticSink, GeocacheError, MaterialRef, MeshBatch, Result, Sample,
    SoftFailure, TopologySignature, TrackKey,
};
use geocache_gpu::{BufferKey, DoubleBufferedVertexStore, GpuContext, SlotView, VertexAttribute};
use glam::{Affine3A, Vec3};

use crate::playback::PlaybackState;
use crate::resolver::{FrameCursor, FramePair, resolve_with_cursor};
use crate::sample_cache::SampleCache;
use crate::track::Track;

/// What was (or will be) written into the position buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pose {
    /// One frame's positions verbatim
    Exact { frame: usize },
    /// Positions lerped from `frame_a` towards `frame_b`
    Blend {
        frame_a: usize,
        frame_b: usize,
        factor: f32,
    },
}

impl Pose {
    #[must_use]
    pub fn nearest_frame(&self) -> usize {
        match *self {
            Self::Exact { frame } => frame,
            Self::Blend {
                frame_a,
                frame_b,
                factor,
            } => {
                if factor < 0.5 {
                    frame_a
                } else {
                    frame_b
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AnimatorState {
    /// Nothing has been uploaded yet
    #[default]
    Uninitialized,
    /// `pose` is what the current position slot holds
    Steady { pose: Pose },
}

/// Everything a track update needs from its owner for one render frame.
pub struct FrameContext<'a> {
    pub gpu: &'a mut dyn GpuContext,
    pub sink: &'a dyn DiagnosticSink,
    pub settings: CacheSettings,
    /// Monotonic render frame counter; at most one upload per value and track.
    pub render_frame: u64,
}

/// Read-only per-track output consumed by the rendering pipeline.
#[derive(Debug, Clone, Copy)]
pub struct TrackRenderState<'a> {
    pub key: TrackKey,
    pub name: &'a str,
    pub visible: bool,
    pub current: Option<SlotView>,
    pub previous: Option<SlotView>,
    /// `current.time - previous.time` in cache seconds
    pub motion_time_delta: f32,
    /// Scale for per-sample motion vectors (the playback speed)
    pub velocity_scale: f32,
    pub index_buffer: Option<BufferKey>,
    pub index_count: u32,
    pub world_transform: Affine3A,
    pub materials: &'a [MaterialRef],
    pub batches: &'a [MeshBatch],
    store: &'a DoubleBufferedVertexStore,
}

impl TrackRenderState<'_> {
    #[must_use]
    pub fn attribute(&self, attribute: VertexAttribute) -> Option<BufferKey> {
        self.store.attribute(attribute).buffer()
    }

    /// Visible and holding at least one uploaded pose.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        self.visible && self.current.is_some()
    }
}

pub struct TrackAnimator {
    key: TrackKey,
    track: Track,
    cursor: FrameCursor,
    cache: SampleCache,
    store: DoubleBufferedVertexStore,
    state: AnimatorState,
    last_pair: Option<FramePair>,
    /// Frame the single-buffered attributes were last taken from
    attribute_frame: Option<usize>,
    uploaded_topology: Option<TopologySignature>,
    batches: Vec<MeshBatch>,
    visible: bool,
    velocity_scale: f32,
    blend_scratch: Vec<Vec3>,
}

impl TrackAnimator {
    #[must_use]
    pub fn new(key: TrackKey, track: Track) -> Self {
        let store = DoubleBufferedVertexStore::new(&track.name);
        Self {
            key,
            track,
            cursor: FrameCursor::default(),
            cache: SampleCache::new(),
            store,
            state: AnimatorState::Uninitialized,
            last_pair: None,
            attribute_frame: None,
            uploaded_topology: None,
            batches: Vec::new(),
            visible: true,
            velocity_scale: 1.0,
            blend_scratch: Vec::new(),
        }
    }

    /// Advances this track to `playback.time`.
    ///
    /// Returns `true` if new positions were uploaded. Missing samples and
    /// rejected buffer sizes are reported to `frame.sink`; the track then
    /// keeps rendering its last good pose.
    pub fn update(&mut self, frame: &mut FrameContext<'_>, playback: PlaybackState) -> bool {
        let source = Arc::clone(&self.track.source);
        self.velocity_scale = playback.speed;

        self.visible = self
            .cache
            .visibility(source.as_ref(), playback.time, playback.looping);
        if !self.visible && frame.settings.skip_invisible_tracks {
            self.settle(frame.settings);
            return false;
        }

        let times = source.time_table();
        let Some(pair) = resolve_with_cursor(
            playback.time,
            playback.looping,
            playback.backward,
            times,
            &mut self.cursor,
        ) else {
            return false;
        };

        let moved = self
            .last_pair
            .is_none_or(|last| (last.frame_a, last.frame_b) != (pair.frame_a, pair.frame_b));
        if moved || !self.cache.holds(pair.frame_a, pair.frame_b) {
            let outcome = self
                .cache
                .ensure_frames(source.as_ref(), pair.frame_a, pair.frame_b);
            for (frame_index, failure) in &outcome.failures {
                frame
                    .sink
                    .report_soft_failure(self.key, *frame_index, failure);
            }
        }
        self.last_pair = Some(pair);

        let Some(pose) = self.choose_pose(pair, frame.settings) else {
            // Neither frame is resident: hold the last good pose
            self.settle(frame.settings);
            return false;
        };

        if let AnimatorState::Steady { pose: last } = self.state
            && last == pose
        {
            self.settle(frame.settings);
            return false;
        }

        let before = self.state;
        match self.upload_pose(frame, pose, times) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Skipping update of track '{}': {err}", self.track.name);
                if let Some(failure) = SoftFailure::from_error(&err) {
                    frame
                        .sink
                        .report_soft_failure(self.key, pose.nearest_frame(), &failure);
                }
                // Positions may have landed before the failure
                self.state != before
            }
        }
    }

    fn settle(&mut self, settings: CacheSettings) {
        if settings.settle_motion_when_static {
            self.store.settle();
        }
    }

    fn choose_pose(&self, pair: FramePair, settings: CacheSettings) -> Option<Pose> {
        let resident = |frame: usize| self.cache.sample(frame).is_some();

        if pair.is_exact() {
            return resident(pair.frame_a).then_some(Pose::Exact {
                frame: pair.frame_a,
            });
        }

        if settings.interpolate_frames
            && self
                .cache
                .is_topology_compatible(pair.frame_a, pair.frame_b)
        {
            return Some(Pose::Blend {
                frame_a: pair.frame_a,
                frame_b: pair.frame_b,
                factor: pair.factor,
            });
        }

        // Topology changed between the frames, or interpolation is off
        let nearest = pair.nearest();
        let other = if nearest == pair.frame_a {
            pair.frame_b
        } else {
            pair.frame_a
        };
        [nearest, other]
            .into_iter()
            .find(|&frame| resident(frame))
            .map(|frame| Pose::Exact { frame })
    }

    fn upload_pose(&mut self, frame: &mut FrameContext<'_>, pose: Pose, times: &[f32]) -> Result<()> {
        let nearest = pose.nearest_frame();
        let nearest_sample = self
            .cache
            .sample(nearest)
            .cloned()
            .ok_or_else(|| GeocacheError::MissingSample {
                frame: nearest,
                reason: "frame not resident".to_string(),
            })?;

        match pose {
            Pose::Exact { frame: index } => {
                self.store.upload(
                    &mut *frame.gpu,
                    frame.render_frame,
                    index,
                    times[index],
                    nearest_sample.positions(),
                )?;
            }
            Pose::Blend {
                frame_a,
                frame_b,
                factor,
            } => {
                let (Some(a), Some(b)) = (self.cache.sample(frame_a), self.cache.sample(frame_b))
                else {
                    return Err(GeocacheError::MissingSample {
                        frame: frame_b,
                        reason: "blend frame not resident".to_string(),
                    });
                };
                blend_positions(a.positions(), b.positions(), factor, &mut self.blend_scratch);
                let time = times[frame_a] + (times[frame_b] - times[frame_a]) * factor;
                self.store.upload(
                    &mut *frame.gpu,
                    frame.render_frame,
                    nearest,
                    time,
                    &self.blend_scratch,
                )?;
            }
        }
        self.state = AnimatorState::Steady { pose };

        if self.attribute_frame != Some(nearest) {
            self.upload_attributes(&mut *frame.gpu, &nearest_sample)?;
            self.attribute_frame = Some(nearest);
        }
        Ok(())
    }

    fn upload_attributes(&mut self, gpu: &mut dyn GpuContext, sample: &Sample) -> Result<()> {
        let attributes: [(VertexAttribute, Option<&[u8]>); VertexAttribute::COUNT] = [
            (
                VertexAttribute::TangentX,
                sample.tangents_x().map(|v| bytemuck::cast_slice::<_, u8>(v)),
            ),
            (
                VertexAttribute::TangentZ,
                sample.tangents_z().map(|v| bytemuck::cast_slice::<_, u8>(v)),
            ),
            (
                VertexAttribute::TexCoord,
                sample.uvs().map(|v| bytemuck::cast_slice::<_, u8>(v)),
            ),
            (
                VertexAttribute::Color,
                sample.colors().map(|v| bytemuck::cast_slice::<_, u8>(v)),
            ),
            (
                VertexAttribute::MotionVector,
                sample.motion_vectors().map(|v| bytemuck::cast_slice::<_, u8>(v)),
            ),
        ];
        for (attribute, bytes) in attributes {
            match bytes {
                Some(bytes) if !bytes.is_empty() => {
                    self.store.upload_attribute(gpu, attribute, bytes)?;
                }
                // Never leave a buffer sized for another frame bound
                _ => self.store.release_attribute(gpu, attribute),
            }
        }

        let topology = sample.topology();
        if self.uploaded_topology != Some(topology) && !sample.indices().is_empty() {
            self.store.upload_indices(gpu, sample.indices())?;
            self.uploaded_topology = Some(topology);
        }
        self.batches = sample.batches().to_vec();
        Ok(())
    }

    #[must_use]
    pub fn render_state(&self) -> TrackRenderState<'_> {
        TrackRenderState {
            key: self.key,
            name: &self.track.name,
            visible: self.visible,
            current: self.store.current(),
            previous: self.store.previous(),
            motion_time_delta: self.store.motion_time_delta(),
            velocity_scale: self.velocity_scale,
            index_buffer: self.store.index_buffer(),
            index_count: self.store.index_count(),
            world_transform: self.track.world_transform,
            materials: &self.track.materials,
            batches: &self.batches,
            store: &self.store,
        }
    }

    /// Destroys GPU buffers and drops resident samples.
    pub fn release(&mut self, gpu: &mut dyn GpuContext) {
        self.store.release(gpu);
        self.cache.clear();
        self.state = AnimatorState::Uninitialized;
        self.last_pair = None;
        self.attribute_frame = None;
        self.uploaded_topology = None;
        self.batches.clear();
    }

    #[must_use]
    pub fn key(&self) -> TrackKey {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.track.name
    }

    #[must_use]
    pub fn track(&self) -> &Track {
        &self.track
    }

    #[must_use]
    pub fn state(&self) -> AnimatorState {
        self.state
    }

    /// Frame pair resolved by the last update.
    #[must_use]
    pub fn frame_pair(&self) -> Option<FramePair> {
        self.last_pair
    }

    #[must_use]
    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }

    #[must_use]
    pub fn store(&self) -> &DoubleBufferedVertexStore {
        &self.store
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_world_transform(&mut self, world_transform: Affine3A) {
        self.track.world_transform = world_transform;
    }
}

/// Writes `lerp(a[i], b[i], t)` for every vertex into `out`.
pub fn blend_positions(a: &[Vec3], b: &[Vec3], t: f32, out: &mut Vec<Vec3>) {
    debug_assert_eq!(a.len(), b.len());
    out.clear();
    out.extend(a.iter().zip(b).map(|(p, q)| p.lerp(*q, t)));
}

#[cfg(test)]
mod tests {
    use geocache_core::{DiagnosticLog, FlipbookTrack};
    use geocache_gpu::{BufferUsage, HostContext};

    use super::*;

    /// Host memory that refuses to allocate index buffers.
    struct NoIndexBuffers(HostContext);

    impl GpuContext for NoIndexBuffers {
        fn create_buffer(
            &mut self,
            size_bytes: u64,
            usage: BufferUsage,
            label: &str,
        ) -> Result<BufferKey> {
            if usage == BufferUsage::Index {
                return Err(GeocacheError::InvalidBufferResize {
                    label: label.to_string(),
                    size_bytes: 0,
                });
            }
            self.0.create_buffer(size_bytes, usage, label)
        }

        fn resize_buffer(&mut self, buffer: BufferKey, size_bytes: u64) -> Result<()> {
            self.0.resize_buffer(buffer, size_bytes)
        }

        fn write_buffer(&mut self, buffer: BufferKey, offset: u64, bytes: &[u8]) -> Result<()> {
            self.0.write_buffer(buffer, offset, bytes)
        }

        fn destroy_buffer(&mut self, buffer: BufferKey) {
            self.0.destroy_buffer(buffer);
        }
    }

    fn two_frame_track() -> Track {
        let mut flipbook = FlipbookTrack::new("track");
        for i in 0..2 {
            let x = i as f32;
            flipbook
                .add_mesh_sample(Sample::new(vec![Vec3::splat(x); 3], vec![0, 1, 2]), x)
                .unwrap();
        }
        Track::new("track", Arc::new(flipbook))
    }

    #[test]
    fn state_follows_positions_when_index_upload_fails() {
        let mut animator = TrackAnimator::new(TrackKey::default(), two_frame_track());
        let mut gpu = NoIndexBuffers(HostContext::new());
        let log = DiagnosticLog::new();
        let playback = PlaybackState {
            time: 0.0,
            looping: false,
            ..Default::default()
        };

        let mut frame = FrameContext {
            gpu: &mut gpu,
            sink: &log,
            settings: CacheSettings::default(),
            render_frame: 1,
        };
        assert!(animator.update(&mut frame, playback));
        assert_eq!(log.len(), 1);
        assert_eq!(
            animator.state(),
            AnimatorState::Steady {
                pose: Pose::Exact { frame: 0 }
            }
        );
        assert_eq!(animator.store().current().unwrap().frame_index, 0);
        assert!(animator.store().index_buffer().is_none());

        // The uploaded pose is recognised: no second position write
        frame.render_frame = 2;
        assert!(!animator.update(&mut frame, playback));
    }

    #[test]
    fn blend_reuses_scratch() {
        let a = [Vec3::ZERO, Vec3::X];
        let b = [Vec3::splat(2.0), Vec3::X * 3.0];
        let mut out = vec![Vec3::NEG_ONE; 8];
        blend_positions(&a, &b, 0.5, &mut out);
        assert_eq!(out, vec![Vec3::ONE, Vec3::X * 2.0]);
    }

    #[test]
    fn nearest_frame_of_blend() {
        let pose = Pose::Blend {
            frame_a: 4,
            frame_b: 5,
            factor: 0.49,
        };
        assert_eq!(pose.nearest_frame(), 4);
        assert_eq!(Pose::Exact { frame: 7 }.nearest_frame(), 7);
    }
}
