//! External collaborators
//!
//! The coordinator never touches an audio device or a file system itself.
//! It drives opaque [`Voice`]s created by an [`AudioBackend`] and asks an
//! [`AssetResolver`] to turn logical names into decoded [`Clip`]s.

mod virtual_backend;

pub use virtual_backend::{VirtualBackend, VirtualVoice, VoiceProbe, VoiceSnapshot};

use jb_core::{Category, Clip, Vec3};

/// A single playback primitive (one device-level source)
pub trait Voice: Send {
    /// Attach a clip, replacing any previous one. Does not start playback.
    fn load(&mut self, clip: &Clip);
    fn play(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn set_volume(&mut self, volume: f32);
    fn set_pitch(&mut self, pitch: f32);
    fn set_looping(&mut self, looping: bool);
    /// Toggle positional mode. `position` is `None` when disabled.
    fn set_positional(&mut self, positional: bool, position: Option<Vec3>);
    fn set_muted(&mut self, muted: bool);

    /// Drop the attached clip
    fn unload(&mut self) {}

    /// Bypass any per-voice effect chain
    fn set_bypass_effects(&mut self, _bypass: bool) {}
}

/// Factory for voices
pub trait AudioBackend: Send {
    type Voice: Voice;

    fn create_voice(&mut self) -> Self::Voice;
}

/// Turns a logical clip name into decoded audio
pub trait AssetResolver: Send {
    /// Resolve synchronously. `None` means "not found".
    fn resolve(&mut self, name: &str, category: Category) -> Option<Clip>;

    /// Release backing data no longer referenced by any cache
    fn unload_unused(&mut self) {}
}

impl<T: AssetResolver + ?Sized> AssetResolver for Box<T> {
    fn resolve(&mut self, name: &str, category: Category) -> Option<Clip> {
        (**self).resolve(name, category)
    }

    fn unload_unused(&mut self) {
        (**self).unload_unused()
    }
}
