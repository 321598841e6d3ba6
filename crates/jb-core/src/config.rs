//! Coordinator configuration
//!
//! All values are fixed at construction. Missing fields fall back to
//! defaults when deserializing, so a JSON file only needs the keys it
//! wants to change.

use serde::{Deserialize, Serialize};

use crate::curve::FadeCurve;
use crate::error::{JbError, JbResult};

/// Default number of music tracks
pub const DEFAULT_TRACK_COUNT: usize = 3;

/// Default number of pooled sfx voices
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Default fade duration
pub const DEFAULT_FADE_DURATION_MS: u32 = 1000;

/// Default number of retained diagnostics
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 256;

/// Default command queue capacity for the handle/processor pair
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Number of independently controlled music tracks
    pub track_count: usize,
    /// Idle voices kept ready for one-shot effects
    pub pool_size: usize,
    /// Hard cap on simultaneously active sfx voices (`None` = 2 × pool size)
    pub max_active_voices: Option<usize>,
    /// Duration of every fade started by the coordinator
    pub fade_duration_ms: u32,
    /// Shape used by every fade
    pub fade_curve: FadeCurve,
    /// Diagnostics retained until drained
    pub diagnostics_capacity: usize,
    /// Commands buffered between two processor ticks
    pub command_queue_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            track_count: DEFAULT_TRACK_COUNT,
            pool_size: DEFAULT_POOL_SIZE,
            max_active_voices: None,
            fade_duration_ms: DEFAULT_FADE_DURATION_MS,
            fade_curve: FadeCurve::Linear,
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_track_count(mut self, track_count: usize) -> Self {
        self.track_count = track_count;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_max_active_voices(mut self, max: usize) -> Self {
        self.max_active_voices = Some(max);
        self
    }

    pub fn with_fade_duration_ms(mut self, fade_duration_ms: u32) -> Self {
        self.fade_duration_ms = fade_duration_ms;
        self
    }

    pub fn with_fade_curve(mut self, curve: FadeCurve) -> Self {
        self.fade_curve = curve;
        self
    }

    /// Upper bound on idle + active voices
    #[inline]
    pub fn voice_limit(&self) -> usize {
        self.pool_size * 2
    }

    /// Effective cap on simultaneously active voices
    pub fn active_voice_cap(&self) -> usize {
        self.max_active_voices
            .unwrap_or_else(|| self.voice_limit())
            .min(self.voice_limit())
    }

    pub fn validate(&self) -> JbResult<()> {
        if self.track_count == 0 {
            return Err(JbError::InvalidConfig("track_count must be at least 1".into()));
        }
        if self.pool_size == 0 {
            return Err(JbError::InvalidConfig("pool_size must be at least 1".into()));
        }
        if self.max_active_voices == Some(0) {
            return Err(JbError::InvalidConfig(
                "max_active_voices must be at least 1".into(),
            ));
        }
        if self.command_queue_capacity == 0 {
            return Err(JbError::InvalidConfig(
                "command_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
