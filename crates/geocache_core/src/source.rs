//! Upstream sample providers.
//!
//! The playback core never owns decoded mesh storage. It asks a
//! [`SampleSource`] for frames by index and keeps at most two of them alive.

use std::sync::Arc;

use crate::errors::{GeocacheError, Result};
use crate::sample::Sample;

/// Provider of decoded frames, timestamps and visibility for one track.
pub trait SampleSource: Send + Sync {
    /// Returns the decoded frame at `index`.
    fn fetch_sample(&self, index: usize) -> Result<Arc<Sample>>;

    /// Ascending sample timestamps in seconds.
    fn time_table(&self) -> &[f32];

    /// Whether the track renders at all at `time`.
    fn visibility_at(&self, time: f32) -> bool;

    /// Length of one loop iteration.
    fn duration(&self) -> f32 {
        self.time_table().last().copied().unwrap_or(0.0)
    }

    fn frame_count(&self) -> usize {
        self.time_table().len()
    }
}

/// A half-open `[start, end)` interval with a fixed visibility state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilitySample {
    pub start: f32,
    pub end: f32,
    pub visible: bool,
}

/// Ordered visibility intervals. Times not covered by any interval are visible.
#[derive(Debug, Clone, Default)]
pub struct VisibilityTimeline {
    samples: Vec<VisibilitySample>,
}

impl VisibilityTimeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interval, keeping the list ordered by start time.
    pub fn push(&mut self, start: f32, end: f32, visible: bool) {
        let sample = VisibilitySample {
            start,
            end,
            visible,
        };
        let at = self.samples.partition_point(|s| s.start <= start);
        self.samples.insert(at, sample);
    }

    #[must_use]
    pub fn with_range(mut self, start: f32, end: f32, visible: bool) -> Self {
        self.push(start, end, visible);
        self
    }

    #[must_use]
    pub fn visible_at(&self, time: f32) -> bool {
        // Last interval starting at or before `time`
        let next = self.samples.partition_point(|s| s.start <= time);
        if next == 0 {
            return true;
        }
        let sample = &self.samples[next - 1];
        if time < sample.end {
            sample.visible
        } else {
            true
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// In-memory track built by appending decoded frames at increasing times.
///
/// Frames can be unloaded individually to model streamed data that is no
/// longer resident; fetching an unloaded frame reports a missing sample.
#[derive(Debug, Clone, Default)]
pub struct FlipbookTrack {
    name: String,
    times: Vec<f32>,
    samples: Vec<Option<Arc<Sample>>>,
    visibility: VisibilityTimeline,
    duration: f32,
}

impl FlipbookTrack {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a frame. Times must be strictly increasing.
    pub fn add_mesh_sample(&mut self, sample: Sample, time: f32) -> Result<()> {
        if let Some(&previous) = self.times.last()
            && time <= previous
        {
            return Err(GeocacheError::NonMonotonicTime { previous, time });
        }
        sample.validate()?;

        self.times.push(time);
        self.samples.push(Some(Arc::new(sample)));
        self.duration = self.duration.max(time);
        Ok(())
    }

    pub fn set_visibility(&mut self, visibility: VisibilityTimeline) {
        self.visibility = visibility;
    }

    /// Drops the decoded data of one frame while keeping its timestamp.
    pub fn unload_sample(&mut self, index: usize) -> Option<Arc<Sample>> {
        self.samples.get_mut(index).and_then(Option::take)
    }

    /// Restores decoded data for a previously unloaded frame.
    pub fn reload_sample(&mut self, index: usize, sample: Sample) -> Result<()> {
        sample.validate()?;
        let slot = self
            .samples
            .get_mut(index)
            .ok_or_else(|| GeocacheError::MissingSample {
                frame: index,
                reason: "frame index out of range".to_string(),
            })?;
        *slot = Some(Arc::new(sample));
        Ok(())
    }
}

impl SampleSource for FlipbookTrack {
    fn fetch_sample(&self, index: usize) -> Result<Arc<Sample>> {
        match self.samples.get(index) {
            Some(Some(sample)) => Ok(Arc::clone(sample)),
            Some(None) => Err(GeocacheError::MissingSample {
                frame: index,
                reason: format!("frame not resident in '{}'", self.name),
            }),
            None => Err(GeocacheError::MissingSample {
                frame: index,
                reason: format!("'{}' has {} frames", self.name, self.times.len()),
            }),
        }
    }

    fn time_table(&self) -> &[f32] {
        &self.times
    }

    fn visibility_at(&self, time: f32) -> bool {
        self.visibility.visible_at(time)
    }

    fn duration(&self) -> f32 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn sample() -> Sample {
        Sample::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
    }

    #[test]
    fn rejects_non_monotonic_times() {
        let mut track = FlipbookTrack::new("t");
        track.add_mesh_sample(sample(), 0.0).unwrap();
        track.add_mesh_sample(sample(), 1.0).unwrap();
        let err = track.add_mesh_sample(sample(), 1.0).unwrap_err();
        assert!(matches!(err, GeocacheError::NonMonotonicTime { .. }));
        assert_eq!(track.frame_count(), 2);
        assert!((track.duration() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn unloaded_frame_is_missing() {
        let mut track = FlipbookTrack::new("t");
        track.add_mesh_sample(sample(), 0.0).unwrap();
        assert!(track.unload_sample(0).is_some());
        assert!(matches!(
            track.fetch_sample(0),
            Err(GeocacheError::MissingSample { frame: 0, .. })
        ));
        track.reload_sample(0, sample()).unwrap();
        assert!(track.fetch_sample(0).is_ok());
        assert!(track.fetch_sample(5).is_err());
    }

    #[test]
    fn visibility_ranges() {
        let timeline = VisibilityTimeline::new()
            .with_range(1.0, 2.0, false)
            .with_range(3.0, 4.0, true);
        assert!(timeline.visible_at(0.5));
        assert!(!timeline.visible_at(1.0));
        assert!(!timeline.visible_at(1.99));
        assert!(timeline.visible_at(2.0));
        assert!(timeline.visible_at(3.5));
    }
}
