//! # geocache_playback
//!
//! Drives geometry cache tracks from a playback clock:
//!
//! - [`resolver`]: time → bracketing frame pair and interpolation factor
//! - [`SampleCache`]: the two resident decoded frames of a track
//! - [`TrackAnimator`]: resolves, fetches, blends and uploads one track
//! - [`SceneAggregator`]: advances every track of one object in lockstep
//!
//! ```rust,ignore
//! let mut cache = SceneAggregator::new(HostContext::new());
//! let key = cache.add_track(Track::new("body", Arc::new(flipbook)))?;
//!
//! // Once per render frame
//! if cache.advance_time(elapsed, true, false, 1.0) {
//!     for state in cache.render_states() {
//!         // rebuild draw state from state.current / state.previous
//!     }
//! }
//! ```

pub mod aggregator;
pub mod animator;
pub mod playback;
pub mod resolver;
pub mod sample_cache;
pub mod track;

pub use aggregator::SceneAggregator;
pub use animator::{AnimatorState, FrameContext, Pose, TrackAnimator, TrackRenderState};
pub use playback::PlaybackState;
pub use resolver::{FrameCursor, FramePair, resolve, resolve_with_cursor, wrap_time};
pub use sample_cache::{EnsureOutcome, SampleCache};
pub use track::Track;
