//! Music Track Set
//!
//! A fixed array of music channels, created once and indexed by track id.
//! Each track owns one backend voice for its whole life. The fade and mixer
//! logic lives in the coordinator; tracks only hold state and forward
//! output volumes to their voice.

use jb_core::{Category, Clip, JbError, JbResult};
use serde::Serialize;

use crate::backend::{AudioBackend, Voice};
use crate::fade::FadeId;
use crate::mixer::VolumeSettings;

/// Read-only view of one track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackState {
    pub id: usize,
    pub clip_name: Option<String>,
    pub playing: bool,
    pub target_volume: f32,
    /// Current unscaled volume
    pub level: f32,
    pub looping: bool,
    pub fading: bool,
}

pub struct MusicTrack<V: Voice> {
    id: usize,
    voice: V,
    clip: Option<Clip>,
    playing: bool,
    target_volume: f32,
    level: f32,
    looping: bool,
    active_fade: Option<FadeId>,
}

impl<V: Voice> MusicTrack<V> {
    fn new(id: usize, voice: V) -> Self {
        Self {
            id,
            voice,
            clip: None,
            playing: false,
            target_volume: 1.0,
            level: 0.0,
            looping: true,
            active_fade: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn clip_name(&self) -> Option<&str> {
        self.clip.as_ref().map(Clip::name)
    }

    pub fn clip(&self) -> Option<&Clip> {
        self.clip.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Playing `name` right now?
    pub fn is_playing_clip(&self, name: &str) -> bool {
        self.playing && self.clip_name() == Some(name)
    }

    pub fn target_volume(&self) -> f32 {
        self.target_volume
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn active_fade(&self) -> Option<FadeId> {
        self.active_fade
    }

    pub(crate) fn set_active_fade(&mut self, fade: Option<FadeId>) {
        self.active_fade = fade;
    }

    pub(crate) fn set_target_volume(&mut self, volume: f32) {
        self.target_volume = volume;
    }

    pub(crate) fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.voice.set_looping(looping);
    }

    /// Load `clip` and start it at the current level
    pub(crate) fn start(&mut self, clip: Clip, looping: bool, settings: &VolumeSettings) {
        if self.voice.is_playing() {
            self.voice.stop();
        }
        self.voice.load(&clip);
        self.voice.set_looping(looping);
        self.voice.set_volume(settings.effective(Category::Music, self.level));
        self.voice.play();

        self.clip = Some(clip);
        self.looping = looping;
        self.playing = true;
    }

    /// Store a new unscaled level and push the mixed value to the voice
    pub(crate) fn apply_level(&mut self, level: f32, settings: &VolumeSettings) {
        self.level = level;
        self.voice.set_volume(settings.effective(Category::Music, level));
    }

    /// Recompute output from the stored level (after a mixer change)
    pub(crate) fn refresh_output(&mut self, settings: &VolumeSettings) {
        self.apply_level(self.level, settings);
    }

    /// Stop immediately and forget the clip
    pub(crate) fn halt(&mut self) {
        if self.voice.is_playing() {
            self.voice.stop();
        }
        self.clip = None;
        self.playing = false;
        self.level = 0.0;
        self.active_fade = None;
    }

    pub(crate) fn unload(&mut self) {
        self.voice.unload();
    }

    /// Marked playing but the voice went quiet
    pub(crate) fn finished_early(&self) -> bool {
        self.playing && !self.voice.is_playing()
    }

    pub fn state(&self) -> TrackState {
        TrackState {
            id: self.id,
            clip_name: self.clip_name().map(str::to_string),
            playing: self.playing,
            target_volume: self.target_volume,
            level: self.level,
            looping: self.looping,
            fading: self.active_fade.is_some(),
        }
    }
}

pub struct TrackSet<V: Voice> {
    tracks: Vec<MusicTrack<V>>,
}

impl<V: Voice> TrackSet<V> {
    pub fn new<B>(track_count: usize, backend: &mut B) -> Self
    where
        B: AudioBackend<Voice = V> + ?Sized,
    {
        let tracks = (0..track_count)
            .map(|id| MusicTrack::new(id, backend.create_voice()))
            .collect();
        Self { tracks }
    }

    fn invalid(&self, track_id: usize) -> JbError {
        JbError::InvalidTrackId {
            track_id,
            track_count: self.tracks.len(),
        }
    }

    pub fn get(&self, track_id: usize) -> JbResult<&MusicTrack<V>> {
        self.tracks.get(track_id).ok_or_else(|| self.invalid(track_id))
    }

    pub fn get_mut(&mut self, track_id: usize) -> JbResult<&mut MusicTrack<V>> {
        let err = self.invalid(track_id);
        self.tracks.get_mut(track_id).ok_or(err)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MusicTrack<V>> {
        self.tracks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MusicTrack<V>> {
        self.tracks.iter_mut()
    }

    pub fn playing_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.playing).count()
    }

    /// Is any playing track using the clip named `name`?
    pub fn references(&self, name: &str) -> bool {
        self.tracks.iter().any(|t| t.is_playing_clip(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::VirtualBackend;

    #[test]
    fn test_tracks_created_up_front() {
        let mut backend = VirtualBackend::new();
        let tracks = TrackSet::new(3, &mut backend);
        assert_eq!(tracks.len(), 3);
        assert_eq!(backend.created_count(), 3);
        assert_eq!(tracks.playing_count(), 0);
    }

    #[test]
    fn test_out_of_range() {
        let mut backend = VirtualBackend::new();
        let mut tracks = TrackSet::new(2, &mut backend);
        assert_eq!(
            tracks.get(2).err(),
            Some(JbError::InvalidTrackId {
                track_id: 2,
                track_count: 2
            })
        );
        assert!(tracks.get_mut(7).is_err());
        assert!(tracks.get(1).is_ok());
    }

    #[test]
    fn test_start_and_halt() {
        let mut backend = VirtualBackend::new();
        let mut tracks = TrackSet::new(1, &mut backend);
        let settings = VolumeSettings::default();

        let track = tracks.get_mut(0).unwrap();
        track.apply_level(0.5, &settings);
        track.start(Clip::silent("theme", 5000), true, &settings);
        assert!(track.is_playing_clip("theme"));
        assert!(tracks.references("theme"));

        let probe = backend.probe(0).unwrap();
        assert!(probe.is_playing());
        assert_eq!(probe.volume(), 0.5);
        assert!(probe.snapshot().looping);

        let track = tracks.get_mut(0).unwrap();
        track.halt();
        assert!(!probe.is_playing());
        assert_eq!(track.clip_name(), None);
        assert_eq!(track.level(), 0.0);
        assert!(!tracks.references("theme"));
    }

    #[test]
    fn test_finished_early() {
        let mut backend = VirtualBackend::new();
        let mut tracks = TrackSet::new(1, &mut backend);
        let settings = VolumeSettings::default();
        tracks
            .get_mut(0)
            .unwrap()
            .start(Clip::silent("sting", 100), false, &settings);

        assert!(!tracks.get(0).unwrap().finished_early());
        backend.advance(150);
        assert!(tracks.get(0).unwrap().finished_early());
    }

    #[test]
    fn test_output_follows_mixer() {
        let mut backend = VirtualBackend::new();
        let mut tracks = TrackSet::new(1, &mut backend);
        let mut settings = VolumeSettings::default();

        let track = tracks.get_mut(0).unwrap();
        track.apply_level(0.8, &settings);
        settings.set_master(0.5);
        track.refresh_output(&settings);

        assert!((backend.probe(0).unwrap().volume() - 0.4).abs() < 1e-6);
        assert_eq!(track.state().level, 0.8);
    }
}
