//! The two resident frames of a track.
//!
//! A track keeps the frame just before the playback time ("current") and the
//! one just after it ("next"); every rendered pose is derived from these two.
//! Samples are shared `Arc`s handed out by the source, replaced wholesale when
//! the resolved pair moves and never mutated in place.

use std::sync::Arc;

use geocache_core::{Sample, SampleSource, SoftFailure};
use smallvec::SmallVec;

use crate::resolver::wrap_time;

#[derive(Debug, Clone)]
struct Resident {
    index: usize,
    sample: Arc<Sample>,
}

/// Result of [`SampleCache::ensure_frames`].
#[derive(Debug, Default)]
pub struct EnsureOutcome {
    /// A resident slot now holds a different frame than before.
    pub changed: bool,
    /// Frames the source failed to provide, one entry per failed fetch.
    pub failures: SmallVec<[(usize, SoftFailure); 2]>,
}

#[derive(Debug, Default)]
pub struct SampleCache {
    current: Option<Resident>,
    next: Option<Resident>,
}

impl SampleCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `frame_a` the current and `frame_b` the next resident sample.
    ///
    /// Frames already resident in either slot are reused without fetching.
    /// When a fetch fails the slot keeps its previous sample and the failure
    /// is returned for reporting.
    pub fn ensure_frames(
        &mut self,
        source: &dyn SampleSource,
        frame_a: usize,
        frame_b: usize,
    ) -> EnsureOutcome {
        let mut outcome = EnsureOutcome::default();
        if self.holds(frame_a, frame_b) {
            return outcome;
        }

        let current = self.obtain(source, frame_a, &mut outcome.failures);
        let next = if frame_b == frame_a {
            current.clone()
        } else {
            self.obtain(source, frame_b, &mut outcome.failures)
        };

        if let Some(current) = current {
            outcome.changed |= index_of(self.current.as_ref()) != Some(current.index);
            self.current = Some(current);
        }
        if let Some(next) = next {
            outcome.changed |= index_of(self.next.as_ref()) != Some(next.index);
            self.next = Some(next);
        }
        outcome
    }

    /// `true` if `frame_a` and `frame_b` are resident as current and next.
    #[must_use]
    pub fn holds(&self, frame_a: usize, frame_b: usize) -> bool {
        index_of(self.current.as_ref()) == Some(frame_a)
            && index_of(self.next.as_ref()) == Some(frame_b)
    }

    /// The resident sample for `index`, if either slot holds it.
    #[must_use]
    pub fn sample(&self, index: usize) -> Option<&Arc<Sample>> {
        [self.current.as_ref(), self.next.as_ref()]
            .into_iter()
            .flatten()
            .find(|r| r.index == index)
            .map(|r| &r.sample)
    }

    /// `(current, next)` resident frame indices.
    #[must_use]
    pub fn resident_frames(&self) -> (Option<usize>, Option<usize>) {
        (index_of(self.current.as_ref()), index_of(self.next.as_ref()))
    }

    /// Whether both frames are resident and share one topology signature.
    #[must_use]
    pub fn is_topology_compatible(&self, frame_a: usize, frame_b: usize) -> bool {
        match (self.sample(frame_a), self.sample(frame_b)) {
            (Some(a), Some(b)) => a.is_topology_compatible(b),
            _ => false,
        }
    }

    /// Visibility at `time`, looked up independently of the mesh frames.
    #[must_use]
    pub fn visibility(&self, source: &dyn SampleSource, time: f32, looping: bool) -> bool {
        source.visibility_at(wrap_time(time, looping, source.duration()))
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.next = None;
    }

    fn obtain(
        &self,
        source: &dyn SampleSource,
        index: usize,
        failures: &mut SmallVec<[(usize, SoftFailure); 2]>,
    ) -> Option<Resident> {
        if let Some(sample) = self.sample(index) {
            return Some(Resident {
                index,
                sample: Arc::clone(sample),
            });
        }
        match source.fetch_sample(index) {
            Ok(sample) => Some(Resident { index, sample }),
            Err(err) => {
                let failure = SoftFailure::from_error(&err).unwrap_or_else(|| {
                    SoftFailure::MissingSample {
                        reason: err.to_string(),
                    }
                });
                failures.push((index, failure));
                None
            }
        }
    }
}

fn index_of(resident: Option<&Resident>) -> Option<usize> {
    resident.map(|r| r.index)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use geocache_core::{FlipbookTrack, Result, VisibilityTimeline};
    use glam::Vec3;

    use super::*;

    /// Counts fetches on top of a flipbook.
    struct CountingSource {
        inner: FlipbookTrack,
        fetches: AtomicUsize,
    }

    impl SampleSource for CountingSource {
        fn fetch_sample(&self, index: usize) -> Result<Arc<Sample>> {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            self.inner.fetch_sample(index)
        }

        fn time_table(&self) -> &[f32] {
            self.inner.time_table()
        }

        fn visibility_at(&self, time: f32) -> bool {
            self.inner.visibility_at(time)
        }
    }

    fn source(frames: usize) -> CountingSource {
        let mut inner = FlipbookTrack::new("cache");
        for i in 0..frames {
            let x = i as f32;
            inner
                .add_mesh_sample(
                    Sample::new(vec![Vec3::new(x, 0.0, 0.0); 3], vec![0, 1, 2]),
                    x,
                )
                .unwrap();
        }
        CountingSource {
            inner,
            fetches: AtomicUsize::new(0),
        }
    }

    #[test]
    fn resident_pair_is_not_refetched() {
        let src = source(3);
        let mut cache = SampleCache::new();

        let first = cache.ensure_frames(&src, 0, 1);
        assert!(first.changed);
        assert!(first.failures.is_empty());
        assert_eq!(src.fetches.load(Ordering::Relaxed), 2);

        let again = cache.ensure_frames(&src, 0, 1);
        assert!(!again.changed);
        assert_eq!(src.fetches.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn forward_step_reuses_next_as_current() {
        let src = source(4);
        let mut cache = SampleCache::new();
        cache.ensure_frames(&src, 0, 1);
        let outcome = cache.ensure_frames(&src, 1, 2);
        assert!(outcome.changed);
        assert_eq!(src.fetches.load(Ordering::Relaxed), 3);
        assert_eq!(cache.resident_frames(), (Some(1), Some(2)));

        // Backward playback swaps the order of the same window
        cache.ensure_frames(&src, 2, 1);
        assert_eq!(src.fetches.load(Ordering::Relaxed), 3);
        assert_eq!(cache.resident_frames(), (Some(2), Some(1)));
    }

    #[test]
    fn failed_fetch_keeps_previous_sample() {
        let mut src = source(3);
        let mut cache = SampleCache::new();
        cache.ensure_frames(&src, 0, 1);

        src.inner.unload_sample(2);
        let outcome = cache.ensure_frames(&src, 1, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, 2);
        assert!(matches!(
            outcome.failures[0].1,
            SoftFailure::MissingSample { .. }
        ));
        assert_eq!(cache.resident_frames(), (Some(1), Some(1)));
        assert!(cache.sample(2).is_none());
        assert!(!cache.holds(1, 2));
        assert!(!cache.is_topology_compatible(1, 2));
    }

    #[test]
    fn exact_pair_fetches_once() {
        let src = source(2);
        let mut cache = SampleCache::new();
        cache.ensure_frames(&src, 1, 1);
        assert_eq!(src.fetches.load(Ordering::Relaxed), 1);
        assert!(cache.holds(1, 1));
        assert!(cache.is_topology_compatible(1, 1));
    }

    #[test]
    fn visibility_wraps_when_looping() {
        let mut src = source(3);
        src.inner
            .set_visibility(VisibilityTimeline::new().with_range(0.5, 1.0, false));
        let cache = SampleCache::new();
        assert!(!cache.visibility(&src, 0.75, false));
        assert!(cache.visibility(&src, 2.75, false));
        assert!(!cache.visibility(&src, 2.75, true));
    }
}
