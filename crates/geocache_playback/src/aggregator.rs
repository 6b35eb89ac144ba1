//! Owner of every track of one renderable object.

use std::sync::Arc;

use geocache_core::{
    CacheSettings, DiagnosticSink, GeocacheError, LogSink, Result, TrackKey,
};
use geocache_gpu::GpuContext;
use glam::Affine3A;
use slotmap::SlotMap;

use crate::animator::{FrameContext, TrackAnimator, TrackRenderState};
use crate::playback::PlaybackState;
use crate::track::Track;

/// Advances all tracks of one object in lockstep from a shared
/// [`PlaybackState`] and owns their GPU buffers.
///
/// Each call to [`SceneAggregator::advance_time`] is one render frame.
pub struct SceneAggregator<G: GpuContext> {
    gpu: G,
    tracks: SlotMap<TrackKey, TrackAnimator>,
    playback: PlaybackState,
    settings: CacheSettings,
    sink: Arc<dyn DiagnosticSink>,
    render_frame: u64,
    any_changed: bool,
}

impl<G: GpuContext> SceneAggregator<G> {
    /// Creates an empty aggregator reporting soft failures through `log`.
    #[must_use]
    pub fn new(gpu: G) -> Self {
        Self {
            gpu,
            tracks: SlotMap::with_key(),
            playback: PlaybackState::default(),
            settings: CacheSettings::default(),
            sink: Arc::new(LogSink),
            render_frame: 0,
            any_changed: false,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a track. Nothing is fetched or uploaded until the next
    /// [`SceneAggregator::advance_time`].
    ///
    /// # Errors
    /// Returns [`GeocacheError::EmptyTimeTable`] if the source has no samples.
    pub fn add_track(&mut self, track: Track) -> Result<TrackKey> {
        if track.source.time_table().is_empty() {
            return Err(GeocacheError::EmptyTimeTable);
        }
        log::debug!(
            "Registered geometry cache track '{}' ({} frames)",
            track.name,
            track.source.frame_count()
        );
        Ok(self
            .tracks
            .insert_with_key(|key| TrackAnimator::new(key, track)))
    }

    /// Removes a track and destroys its GPU buffers. Returns `false` for a
    /// stale key.
    pub fn remove_track(&mut self, key: TrackKey) -> bool {
        match self.tracks.remove(key) {
            Some(mut animator) => {
                animator.release(&mut self.gpu);
                true
            }
            None => false,
        }
    }

    pub fn clear_tracks(&mut self) {
        for (_, mut animator) in self.tracks.drain() {
            animator.release(&mut self.gpu);
        }
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Moves every track to `time` for a new render frame.
    ///
    /// Returns `true` if any track uploaded new positions.
    pub fn advance_time(&mut self, time: f32, looping: bool, backward: bool, speed: f32) -> bool {
        self.playback = PlaybackState {
            time,
            looping,
            backward,
            speed,
        };
        self.render_frame += 1;

        let mut frame = FrameContext {
            gpu: &mut self.gpu,
            sink: self.sink.as_ref(),
            settings: self.settings,
            render_frame: self.render_frame,
        };
        let mut changed = false;
        for animator in self.tracks.values_mut() {
            changed |= animator.update(&mut frame, self.playback);
        }
        self.any_changed = changed;
        changed
    }

    /// Advances by `dt` wall-clock seconds with the current playback flags.
    pub fn tick(&mut self, dt: f32) -> bool {
        let PlaybackState {
            looping,
            backward,
            speed,
            ..
        } = self.playback;
        let time = self.playback.step(dt);
        self.advance_time(time, looping, backward, speed)
    }

    /// Whether the last [`SceneAggregator::advance_time`] uploaded anything.
    #[must_use]
    pub fn any_changed(&self) -> bool {
        self.any_changed
    }

    #[must_use]
    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    #[must_use]
    pub fn render_frame(&self) -> u64 {
        self.render_frame
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[must_use]
    pub fn track(&self, key: TrackKey) -> Option<&TrackAnimator> {
        self.tracks.get(key)
    }

    pub fn tracks(&self) -> impl Iterator<Item = (TrackKey, &TrackAnimator)> {
        self.tracks.iter()
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn render_states(&self) -> impl Iterator<Item = TrackRenderState<'_>> {
        self.tracks.values().map(TrackAnimator::render_state)
    }

    /// Returns `false` for a stale key.
    pub fn set_track_world_transform(&mut self, key: TrackKey, world_transform: Affine3A) -> bool {
        match self.tracks.get_mut(key) {
            Some(animator) => {
                animator.set_world_transform(world_transform);
                true
            }
            None => false,
        }
    }

    /// Bytes of GPU memory held by all tracks.
    #[must_use]
    pub fn allocated_size(&self) -> u64 {
        self.tracks
            .values()
            .map(|animator| animator.store().allocated_size())
            .sum()
    }

    #[must_use]
    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: CacheSettings) {
        self.settings = settings;
    }

    #[must_use]
    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }
}

impl<G: GpuContext> Drop for SceneAggregator<G> {
    fn drop(&mut self) {
        self.clear_tracks();
    }
}
