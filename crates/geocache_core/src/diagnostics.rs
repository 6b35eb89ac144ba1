//! Soft-failure reporting.
//!
//! Tracks never abort playback on a recoverable failure. They hand it to a
//! [`DiagnosticSink`] once per occurrence and keep rendering the last good pose.

use parking_lot::Mutex;

use crate::errors::SoftFailure;
use crate::ids::TrackKey;

pub trait DiagnosticSink: Send + Sync {
    fn report_soft_failure(&self, track: TrackKey, frame_index: usize, failure: &SoftFailure);
}

/// Forwards every report to the `log` facade at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report_soft_failure(&self, track: TrackKey, frame_index: usize, failure: &SoftFailure) {
        log::warn!("Geometry cache track {track:?}, frame {frame_index}: {failure}");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEvent {
    pub track: TrackKey,
    pub frame_index: usize,
    pub failure: SoftFailure,
}

/// Collects reports in memory; useful for tooling and tests.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl DiagnosticLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn report_soft_failure(&self, track: TrackKey, frame_index: usize, failure: &SoftFailure) {
        self.events.lock().push(DiagnosticEvent {
            track,
            frame_index,
            failure: failure.clone(),
        });
    }
}
