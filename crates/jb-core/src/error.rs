//! Error types for Jukebox

use thiserror::Error;

use crate::types::Category;

/// Core error type
///
/// Every variant is recoverable. Some are returned to the caller
/// (`InvalidTrackId`, `EmptyClipName`, `ResourceNotFound`), others are only
/// reported as diagnostics while the operation carries on
/// (`PoolExhaustedFallback`, `CacheInUse`, `VoiceStolen`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JbError {
    #[error("Invalid track id {track_id} (track count {track_count})")]
    InvalidTrackId { track_id: usize, track_count: usize },

    #[error("Empty clip name")]
    EmptyClipName,

    #[error("Resource not found: {category}/{name}")]
    ResourceNotFound { name: String, category: Category },

    #[error("Voice pool exhausted, constructed new voice ({active} active)")]
    PoolExhaustedFallback { active: usize },

    #[error("Cache entry still in use: {category}/{name}")]
    CacheInUse { name: String, category: Category },

    #[error("Active voice limit {limit} reached, stole voice in slot {slot}")]
    VoiceStolen { slot: usize, limit: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl JbError {
    /// True for conditions that never abort the requested operation
    #[inline]
    pub fn is_notice(&self) -> bool {
        matches!(
            self,
            JbError::PoolExhaustedFallback { .. }
                | JbError::CacheInUse { .. }
                | JbError::VoiceStolen { .. }
        )
    }

    /// Log this error at the level matching its severity
    pub fn log(&self) {
        if self.is_notice() {
            log::debug!("{}", self);
        } else {
            log::warn!("{}", self);
        }
    }
}

/// Result type alias
pub type JbResult<T> = Result<T, JbError>;
