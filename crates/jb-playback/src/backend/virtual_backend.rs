//! Headless backend
//!
//! Voices keep their state in shared cells instead of talking to a device.
//! The host advances simulated playback time with [`VirtualBackend::advance`];
//! non-looping voices stop on their own once the clip has run out, just as
//! a device source would. Every voice ever created stays observable through
//! a [`VoiceProbe`], which is what the CLI and the tests inspect.

use std::sync::Arc;

use jb_core::{Clip, Vec3};
use parking_lot::Mutex;

use super::{AudioBackend, Voice};

/// Observable state of one virtual voice
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSnapshot {
    pub clip_name: Option<String>,
    pub playing: bool,
    pub volume: f32,
    pub pitch: f32,
    pub looping: bool,
    pub positional: bool,
    pub position: Option<Vec3>,
    pub muted: bool,
    pub bypass_effects: bool,
    /// Playback position inside the clip
    pub position_ms: f64,
    pub load_count: u32,
    pub play_count: u32,
    pub stop_count: u32,
    /// The owning coordinator dropped the voice
    pub destroyed: bool,
}

impl Default for VoiceSnapshot {
    fn default() -> Self {
        Self {
            clip_name: None,
            playing: false,
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            positional: false,
            position: None,
            muted: false,
            bypass_effects: false,
            position_ms: 0.0,
            load_count: 0,
            play_count: 0,
            stop_count: 0,
            destroyed: false,
        }
    }
}

#[derive(Debug, Default)]
struct VoiceCell {
    state: VoiceSnapshot,
    clip_duration_ms: u64,
}

type SharedCell = Arc<Mutex<VoiceCell>>;

/// Voice handed to the coordinator
pub struct VirtualVoice {
    index: usize,
    cell: SharedCell,
}

impl VirtualVoice {
    /// Creation order, the index accepted by [`VirtualBackend::probe`]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Voice for VirtualVoice {
    fn load(&mut self, clip: &Clip) {
        let mut cell = self.cell.lock();
        cell.state.clip_name = Some(clip.name().to_string());
        cell.state.playing = false;
        cell.state.position_ms = 0.0;
        cell.state.load_count += 1;
        cell.clip_duration_ms = clip.duration_ms();
    }

    fn play(&mut self) {
        let mut cell = self.cell.lock();
        if cell.state.clip_name.is_none() {
            return;
        }
        cell.state.playing = true;
        cell.state.position_ms = 0.0;
        cell.state.play_count += 1;
    }

    fn stop(&mut self) {
        let mut cell = self.cell.lock();
        cell.state.playing = false;
        cell.state.position_ms = 0.0;
        cell.state.stop_count += 1;
    }

    fn is_playing(&self) -> bool {
        self.cell.lock().state.playing
    }

    fn set_volume(&mut self, volume: f32) {
        self.cell.lock().state.volume = volume;
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.cell.lock().state.pitch = pitch;
    }

    fn set_looping(&mut self, looping: bool) {
        self.cell.lock().state.looping = looping;
    }

    fn set_positional(&mut self, positional: bool, position: Option<Vec3>) {
        let mut cell = self.cell.lock();
        cell.state.positional = positional;
        cell.state.position = position;
    }

    fn set_muted(&mut self, muted: bool) {
        self.cell.lock().state.muted = muted;
    }

    fn unload(&mut self) {
        let mut cell = self.cell.lock();
        cell.state.clip_name = None;
        cell.state.playing = false;
        cell.clip_duration_ms = 0;
    }

    fn set_bypass_effects(&mut self, bypass: bool) {
        self.cell.lock().state.bypass_effects = bypass;
    }
}

impl Drop for VirtualVoice {
    fn drop(&mut self) {
        let mut cell = self.cell.lock();
        cell.state.playing = false;
        cell.state.destroyed = true;
    }
}

/// Read/poke access to a voice from outside the coordinator
#[derive(Clone)]
pub struct VoiceProbe {
    cell: SharedCell,
}

impl VoiceProbe {
    pub fn snapshot(&self) -> VoiceSnapshot {
        self.cell.lock().state.clone()
    }

    pub fn volume(&self) -> f32 {
        self.cell.lock().state.volume
    }

    pub fn is_playing(&self) -> bool {
        self.cell.lock().state.playing
    }

    /// Stop the voice behind the coordinator's back
    pub fn force_stop(&self) {
        let mut cell = self.cell.lock();
        cell.state.playing = false;
        cell.state.stop_count += 1;
    }
}

#[derive(Default)]
struct BackendInner {
    cells: Vec<SharedCell>,
}

/// Cloneable handle to the shared virtual device
#[derive(Clone, Default)]
pub struct VirtualBackend {
    inner: Arc<Mutex<BackendInner>>,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance simulated playback time for every playing voice
    pub fn advance(&self, delta_ms: u32) {
        let inner = self.inner.lock();
        for cell in &inner.cells {
            let mut cell = cell.lock();
            if !cell.state.playing {
                continue;
            }
            let duration = cell.clip_duration_ms as f64;
            let pitch = cell.state.pitch.abs().max(0.01) as f64;
            cell.state.position_ms += delta_ms as f64 * pitch;

            if cell.state.position_ms >= duration {
                if cell.state.looping && duration > 0.0 {
                    cell.state.position_ms %= duration;
                } else {
                    cell.state.playing = false;
                    cell.state.position_ms = duration;
                }
            }
        }
    }

    /// Voices created so far, including destroyed ones
    pub fn created_count(&self) -> usize {
        self.inner.lock().cells.len()
    }

    /// Voices still owned by a coordinator
    pub fn live_count(&self) -> usize {
        self.inner
            .lock()
            .cells
            .iter()
            .filter(|c| !c.lock().state.destroyed)
            .count()
    }

    /// Voices currently producing sound
    pub fn playing_count(&self) -> usize {
        self.inner
            .lock()
            .cells
            .iter()
            .filter(|c| c.lock().state.playing)
            .count()
    }

    /// Probe for the voice created `index`-th (creation order)
    pub fn probe(&self, index: usize) -> Option<VoiceProbe> {
        self.inner
            .lock()
            .cells
            .get(index)
            .map(|cell| VoiceProbe { cell: Arc::clone(cell) })
    }

    pub fn probes(&self) -> Vec<VoiceProbe> {
        self.inner
            .lock()
            .cells
            .iter()
            .map(|cell| VoiceProbe { cell: Arc::clone(cell) })
            .collect()
    }

    /// Probes for playing voices whose clip has the given name
    pub fn probes_playing(&self, clip_name: &str) -> Vec<VoiceProbe> {
        self.probes()
            .into_iter()
            .filter(|p| {
                let s = p.snapshot();
                s.playing && s.clip_name.as_deref() == Some(clip_name)
            })
            .collect()
    }
}

impl AudioBackend for VirtualBackend {
    type Voice = VirtualVoice;

    fn create_voice(&mut self) -> VirtualVoice {
        let cell: SharedCell = Arc::new(Mutex::new(VoiceCell::default()));
        let mut inner = self.inner.lock();
        inner.cells.push(Arc::clone(&cell));
        VirtualVoice {
            index: inner.cells.len() - 1,
            cell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_stops_at_clip_end() {
        let mut backend = VirtualBackend::new();
        let mut voice = backend.create_voice();
        voice.load(&Clip::silent("blip", 100));
        voice.play();

        backend.advance(60);
        assert!(voice.is_playing());
        backend.advance(60);
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_looping_voice_wraps() {
        let mut backend = VirtualBackend::new();
        let mut voice = backend.create_voice();
        voice.load(&Clip::silent("loop", 100));
        voice.set_looping(true);
        voice.play();

        backend.advance(250);
        let snap = backend.probe(0).unwrap().snapshot();
        assert!(snap.playing);
        assert!((snap.position_ms - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_speeds_up_playback() {
        let mut backend = VirtualBackend::new();
        let mut voice = backend.create_voice();
        voice.load(&Clip::silent("fast", 100));
        voice.set_pitch(2.0);
        voice.play();

        backend.advance(50);
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_drop_marks_destroyed() {
        let mut backend = VirtualBackend::new();
        let voice = backend.create_voice();
        assert_eq!(backend.live_count(), 1);
        drop(voice);
        assert_eq!(backend.live_count(), 0);
        assert_eq!(backend.created_count(), 1);
        assert!(backend.probe(0).unwrap().snapshot().destroyed);
    }

    #[test]
    fn test_play_without_clip_is_ignored() {
        let mut backend = VirtualBackend::new();
        let mut voice = backend.create_voice();
        voice.play();
        assert!(!voice.is_playing());
    }
}
