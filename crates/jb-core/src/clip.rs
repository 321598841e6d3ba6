//! Decoded clip handle
//!
//! A `Clip` is a cheap, immutable, shared handle to decoded audio. The
//! payload is opaque to the coordinator; only the backend that created the
//! voices knows how to interpret it. Cloning a clip clones the handle, not
//! the audio.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

struct ClipInner {
    name: String,
    duration_ms: u64,
    payload: Box<dyn Any + Send + Sync>,
}

/// Shared handle to a decoded clip
#[derive(Clone)]
pub struct Clip {
    inner: Arc<ClipInner>,
}

impl Clip {
    /// Wrap a decoded payload
    pub fn new<T>(name: impl Into<String>, duration_ms: u64, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            inner: Arc::new(ClipInner {
                name: name.into(),
                duration_ms,
                payload: Box::new(payload),
            }),
        }
    }

    /// Clip without payload (headless backends, tests)
    pub fn silent(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(name, duration_ms, ())
    }

    /// Logical name the clip was resolved from
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Playable duration at pitch 1.0
    #[inline]
    pub fn duration_ms(&self) -> u64 {
        self.inner.duration_ms
    }

    /// Downcast the payload
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.inner.payload.downcast_ref::<T>()
    }

    /// Identity comparison (same loaded clip, not just same name)
    #[inline]
    pub fn ptr_eq(&self, other: &Clip) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to this clip
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("name", &self.inner.name)
            .field("duration_ms", &self.inner.duration_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_vs_name() {
        let a = Clip::silent("hit", 250);
        let b = a.clone();
        let c = Clip::silent("hit", 250);

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a.name(), c.name());
        assert_eq!(a.handle_count(), 2);
    }

    #[test]
    fn test_payload_downcast() {
        let clip = Clip::new("pcm", 1000, vec![0.0f32; 4]);
        assert_eq!(clip.payload::<Vec<f32>>().map(Vec::len), Some(4));
        assert!(clip.payload::<String>().is_none());
    }
}
