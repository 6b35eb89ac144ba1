//! Playback Settings
//!
//! Runtime switches that change how tracks turn resolved frames into GPU data.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use geocache_core::CacheSettings;
//!
//! // Default: interpolate between frames, settle motion blur when paused
//! let settings = CacheSettings::default();
//!
//! // Stepped playback for debugging raw frames
//! let settings = CacheSettings {
//!     interpolate_frames: false,
//!     ..Default::default()
//! };
//!
//! // Or load from JSON; missing fields keep their defaults
//! let settings = CacheSettings::from_json(r#"{ "interpolate_frames": false }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Behaviour switches shared by every track of an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Blend positions between the bracketing frames when their topology matches.
    /// When disabled, the nearer frame is always uploaded verbatim.
    pub interpolate_frames: bool,

    /// When a render frame passes without an upload, report the current slot as
    /// the previous one too, so motion vectors drop to zero while playback holds.
    pub settle_motion_when_static: bool,

    /// Skip frame fetching and uploads while a track is invisible.
    pub skip_invisible_tracks: bool,
}

impl Default for CacheSettings {
    #[inline]
    fn default() -> Self {
        Self {
            interpolate_frames: true,
            settle_motion_when_static: true,
            skip_invisible_tracks: true,
        }
    }
}

impl CacheSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_keep_defaults() {
        let settings = CacheSettings::from_json(r#"{ "interpolate_frames": false }"#).unwrap();
        assert!(!settings.interpolate_frames);
        assert!(settings.settle_motion_when_static);
        assert!(settings.skip_invisible_tracks);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(CacheSettings::from_json("{ interpolate_frames: ").is_err());
    }
}
