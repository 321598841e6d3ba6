//! Voice Pool
//!
//! Reusable one-shot voices for sound effects, kept in an arena of slots
//! referenced by index.
//!
//! ```text
//!   acquire:  idle.pop()  ──or──  create (idle empty)  ──or──  steal oldest (cap hit)
//!                 │
//!                 ▼
//!             ACTIVE  ── monitor: clip elapsed | voice stopped early ──▶ release
//!                                                                         │
//!   release:  idle < size && idle + active < 2 × size ? ──yes──▶ IDLE     │
//!                                                     └──no───▶ destroyed ◀┘
//! ```
//!
//! A slot is either idle or active, never both. `idle + active` never
//! exceeds twice the configured pool size, and the number of active voices
//! never exceeds the configured cap.

use jb_core::{Clip, CoordinatorConfig, Vec3};

use crate::backend::{AudioBackend, Voice};

/// Caller-side reference to one playing effect
///
/// The slot's generation changes every time the slot is checked out or its
/// voice is destroyed, so a handle kept after its voice was recycled no
/// longer resolves, even when the slot is later refilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SfxHandle {
    slot: usize,
    generation: u32,
}

impl SfxHandle {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Active,
}

/// How a voice was obtained for a play request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// Popped from the idle pool
    Reused,
    /// Idle pool was empty; a new voice was constructed
    Created,
    /// Active cap reached; the oldest active voice was cut off and reused
    Stolen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Pooled,
    Destroyed,
    /// Slot was not active (already released, or never checked out)
    NotActive,
}

/// Play-time parameters for one effect
#[derive(Debug, Clone)]
pub struct VoiceRequest {
    pub clip: Clip,
    /// Caller's unscaled volume
    pub scale: f32,
    /// Already mixed output volume
    pub volume: f32,
    pub pitch: f32,
    pub position: Option<Vec3>,
    pub muted: bool,
}

pub struct SfxVoice<V> {
    voice: V,
    clip: Option<Clip>,
    scale: f32,
    volume: f32,
    pitch: f32,
    position: Option<Vec3>,
    state: VoiceState,
    elapsed_ms: u64,
    expected_ms: u64,
}

impl<V: Voice> SfxVoice<V> {
    fn new(voice: V) -> Self {
        Self {
            voice,
            clip: None,
            scale: 1.0,
            volume: 1.0,
            pitch: 1.0,
            position: None,
            state: VoiceState::Idle,
            elapsed_ms: 0,
            expected_ms: 0,
        }
    }

    pub fn clip(&self) -> Option<&Clip> {
        self.clip.as_ref()
    }

    /// Unscaled volume, what fades interpolate
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Output volume last sent to the voice
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn is_spatial(&self) -> bool {
        self.position.is_some()
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Backend voice this entry drives
    pub fn output(&self) -> &V {
        &self.voice
    }

    fn configure(&mut self, request: VoiceRequest) {
        let voice = &mut self.voice;
        voice.load(&request.clip);
        voice.set_volume(request.volume);
        voice.set_pitch(request.pitch);
        voice.set_looping(false);
        voice.set_muted(request.muted);
        voice.set_positional(request.position.is_some(), request.position);

        let pitch = request.pitch.abs().max(0.01);
        self.expected_ms = (request.clip.duration_ms() as f64 / pitch as f64).ceil() as u64;
        self.elapsed_ms = 0;
        self.scale = request.scale;
        self.volume = request.volume;
        self.pitch = request.pitch;
        self.position = request.position;
        self.clip = Some(request.clip);
    }

    /// Back to default configuration. The clip stays attached.
    fn reset(&mut self) {
        if self.voice.is_playing() {
            self.voice.stop();
        }
        self.voice.set_volume(1.0);
        self.voice.set_pitch(1.0);
        self.voice.set_looping(false);
        self.voice.set_muted(false);
        self.voice.set_positional(false, None);
        self.voice.set_bypass_effects(false);

        self.scale = 1.0;
        self.volume = 1.0;
        self.pitch = 1.0;
        self.position = None;
        self.elapsed_ms = 0;
        self.expected_ms = 0;
    }
}

pub struct VoicePool<V: Voice> {
    slots: Vec<Option<SfxVoice<V>>>,
    /// Per slot, survives the voice
    generations: Vec<u32>,
    free_slots: Vec<usize>,
    idle: Vec<usize>,
    /// Oldest first
    active: Vec<usize>,
    pool_size: usize,
    voice_limit: usize,
    active_cap: usize,
}

impl<V: Voice> VoicePool<V> {
    /// Create the pool and prewarm `pool_size` idle voices
    pub fn new<B>(config: &CoordinatorConfig, backend: &mut B) -> Self
    where
        B: AudioBackend<Voice = V> + ?Sized,
    {
        let voice_limit = config.voice_limit();
        let mut pool = Self {
            slots: Vec::with_capacity(voice_limit),
            generations: Vec::with_capacity(voice_limit),
            free_slots: Vec::new(),
            idle: Vec::with_capacity(config.pool_size),
            active: Vec::with_capacity(voice_limit),
            pool_size: config.pool_size,
            voice_limit,
            active_cap: config.active_voice_cap(),
        };

        for _ in 0..config.pool_size {
            let slot = pool.insert_voice(backend.create_voice());
            pool.idle.push(slot);
        }
        pool
    }

    fn insert_voice(&mut self, voice: V) -> usize {
        let entry = Some(SfxVoice::new(voice));
        match self.free_slots.pop() {
            Some(slot) => {
                self.slots[slot] = entry;
                slot
            }
            None => {
                self.slots.push(entry);
                self.generations.push(0);
                self.slots.len() - 1
            }
        }
    }

    /// Check out a voice, configure it and start playback
    pub fn play<B>(&mut self, backend: &mut B, request: VoiceRequest) -> (SfxHandle, Acquisition)
    where
        B: AudioBackend<Voice = V> + ?Sized,
    {
        let (slot, acquisition) = if self.active.len() >= self.active_cap {
            let slot = self.active.remove(0);
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.reset();
            }
            (slot, Acquisition::Stolen)
        } else if let Some(slot) = self.idle.pop() {
            (slot, Acquisition::Reused)
        } else {
            (self.insert_voice(backend.create_voice()), Acquisition::Created)
        };

        let generation = self.bump_generation(slot);
        let entry = self.slots[slot].get_or_insert_with(|| SfxVoice::new(backend.create_voice()));
        entry.state = VoiceState::Active;
        entry.configure(request);
        entry.voice.play();

        self.active.push(slot);
        (SfxHandle { slot, generation }, acquisition)
    }

    fn bump_generation(&mut self, slot: usize) -> u32 {
        let generation = self.generations[slot].wrapping_add(1);
        self.generations[slot] = generation;
        generation
    }

    fn destroy(&mut self, slot: usize) {
        self.slots[slot] = None;
        self.bump_generation(slot);
        self.free_slots.push(slot);
    }

    /// Return an active voice. Idempotent.
    pub fn release(&mut self, slot: usize) -> ReleaseOutcome {
        let Some(index) = self.active.iter().position(|&s| s == slot) else {
            return ReleaseOutcome::NotActive;
        };
        self.active.remove(index);

        let Some(entry) = self.slots[slot].as_mut() else {
            return ReleaseOutcome::NotActive;
        };
        entry.reset();

        if self.idle.len() < self.pool_size && self.idle.len() + self.active.len() < self.voice_limit
        {
            entry.state = VoiceState::Idle;
            self.idle.push(slot);
            ReleaseOutcome::Pooled
        } else {
            self.destroy(slot);
            ReleaseOutcome::Destroyed
        }
    }

    /// Advance playback monitors. Returns slots whose clip ran out or whose
    /// voice was stopped early; the caller releases them.
    pub fn poll_finished(&mut self, delta_ms: u32) -> Vec<usize> {
        let mut finished = Vec::new();
        for &slot in &self.active {
            let Some(entry) = self.slots[slot].as_mut() else {
                continue;
            };
            entry.elapsed_ms += delta_ms as u64;
            if !entry.voice.is_playing() || entry.elapsed_ms >= entry.expected_ms {
                finished.push(slot);
            }
        }
        finished
    }

    /// Slot behind a handle, if the handle is still current
    pub fn resolve(&self, handle: SfxHandle) -> Option<usize> {
        let entry = self.slots.get(handle.slot)?.as_ref()?;
        (entry.state == VoiceState::Active && self.generations[handle.slot] == handle.generation)
            .then_some(handle.slot)
    }

    pub fn is_active(&self, slot: usize) -> bool {
        self.active.contains(&slot)
    }

    pub fn voice(&self, slot: usize) -> Option<&SfxVoice<V>> {
        self.slots.get(slot)?.as_ref()
    }

    /// Set the unscaled and output volume of a voice
    pub fn set_volume(&mut self, slot: usize, scale: f32, volume: f32) {
        if let Some(entry) = self.slots.get_mut(slot).and_then(Option::as_mut) {
            entry.scale = scale;
            entry.volume = volume;
            entry.voice.set_volume(volume);
        }
    }

    pub fn set_muted_all(&mut self, muted: bool) {
        for &slot in &self.active {
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.voice.set_muted(muted);
            }
        }
    }

    /// Does any idle or active voice still hold `clip`?
    pub fn references_clip(&self, clip: &Clip) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|entry| entry.clip.as_ref().is_some_and(|c| c.ptr_eq(clip)))
    }

    /// Destroy every idle voice
    pub fn drain_idle(&mut self) -> usize {
        let idle = std::mem::take(&mut self.idle);
        for &slot in &idle {
            self.destroy(slot);
        }
        idle.len()
    }

    /// Active slots, oldest first
    pub fn active_slots(&self) -> Vec<usize> {
        self.active.clone()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn total_count(&self) -> usize {
        self.idle.len() + self.active.len()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn voice_limit(&self) -> usize {
        self.voice_limit
    }

    pub fn active_cap(&self) -> usize {
        self.active_cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{VirtualBackend, VirtualVoice};

    fn pool(size: usize) -> (VirtualBackend, VoicePool<VirtualVoice>) {
        let mut backend = VirtualBackend::new();
        let config = CoordinatorConfig::default().with_pool_size(size);
        let pool = VoicePool::new(&config, &mut backend);
        (backend, pool)
    }

    fn request(name: &str, duration_ms: u64) -> VoiceRequest {
        VoiceRequest {
            clip: Clip::silent(name, duration_ms),
            scale: 0.8,
            volume: 0.8,
            pitch: 1.0,
            position: None,
            muted: false,
        }
    }

    #[test]
    fn test_prewarmed() {
        let (backend, pool) = pool(4);
        assert_eq!(pool.idle_count(), 4);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(backend.created_count(), 4);
    }

    #[test]
    fn test_reuse_then_create() {
        let (mut backend, mut pool) = pool(2);

        let (_, a) = pool.play(&mut backend, request("a", 100));
        let (_, b) = pool.play(&mut backend, request("b", 100));
        let (_, c) = pool.play(&mut backend, request("c", 100));

        assert_eq!(a, Acquisition::Reused);
        assert_eq!(b, Acquisition::Reused);
        assert_eq!(c, Acquisition::Created);
        assert_eq!(pool.active_count(), 3);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(backend.created_count(), 3);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut backend, mut pool) = pool(2);
        let (handle, _) = pool.play(&mut backend, request("a", 100));

        assert_eq!(pool.release(handle.slot()), ReleaseOutcome::Pooled);
        assert_eq!(pool.release(handle.slot()), ReleaseOutcome::NotActive);
        assert_eq!(pool.idle_count(), 2);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_excess_voices_destroyed_on_release() {
        let (mut backend, mut pool) = pool(2);
        let handles: Vec<_> = (0..4)
            .map(|i| pool.play(&mut backend, request(&format!("s{i}"), 100)).0)
            .collect();
        assert_eq!(pool.total_count(), 4);

        let outcomes: Vec<_> = handles.iter().map(|h| pool.release(h.slot())).collect();
        assert_eq!(
            outcomes,
            vec![
                ReleaseOutcome::Pooled,
                ReleaseOutcome::Pooled,
                ReleaseOutcome::Destroyed,
                ReleaseOutcome::Destroyed
            ]
        );
        assert_eq!(pool.idle_count(), 2);
        assert_eq!(backend.live_count(), 2);
    }

    #[test]
    fn test_steals_oldest_at_cap() {
        let mut backend = VirtualBackend::new();
        let config = CoordinatorConfig::default()
            .with_pool_size(2)
            .with_max_active_voices(3);
        let mut pool = VoicePool::new(&config, &mut backend);

        let first = pool.play(&mut backend, request("a", 1000)).0;
        pool.play(&mut backend, request("b", 1000));
        pool.play(&mut backend, request("c", 1000));
        let (stolen, how) = pool.play(&mut backend, request("d", 1000));

        assert_eq!(how, Acquisition::Stolen);
        assert_eq!(stolen.slot(), first.slot());
        assert_eq!(pool.active_count(), 3);
        assert!(pool.resolve(first).is_none());
        assert_eq!(pool.resolve(stolen), Some(stolen.slot()));
        assert_eq!(
            pool.voice(stolen.slot()).and_then(|v| v.clip()).map(Clip::name),
            Some("d")
        );
    }

    #[test]
    fn test_monitor_reports_elapsed_and_early_stop() {
        let (mut backend, mut pool) = pool(2);
        let (long, _) = pool.play(&mut backend, request("long", 1000));
        let (short, _) = pool.play(&mut backend, request("short", 100));

        assert!(pool.poll_finished(50).is_empty());
        assert_eq!(pool.poll_finished(50), vec![short.slot()]);

        backend.probe(long.slot()).unwrap().force_stop();
        let finished = pool.poll_finished(1);
        assert!(finished.contains(&long.slot()));
    }

    #[test]
    fn test_pitch_scales_expected_duration() {
        let (mut backend, mut pool) = pool(1);
        let mut req = request("slow", 100);
        req.pitch = 0.5;
        pool.play(&mut backend, req);

        assert!(pool.poll_finished(150).is_empty());
        assert_eq!(pool.poll_finished(50).len(), 1);
    }

    #[test]
    fn test_release_resets_voice() {
        let (mut backend, mut pool) = pool(1);
        let mut req = request("pos", 100);
        req.pitch = 1.5;
        req.position = Some(Vec3::new(1.0, 2.0, 3.0));
        let (handle, _) = pool.play(&mut backend, req);

        let probe = backend.probe(handle.slot()).unwrap();
        assert!(probe.snapshot().positional);

        pool.release(handle.slot());
        let snap = probe.snapshot();
        assert!(!snap.playing);
        assert!(!snap.positional);
        assert_eq!(snap.pitch, 1.0);
        assert!(!snap.bypass_effects);
        assert!(pool.voice(handle.slot()).unwrap().clip().is_some());
    }

    #[test]
    fn test_references_clip_includes_idle() {
        let (mut backend, mut pool) = pool(1);
        let req = request("keep", 100);
        let clip = req.clip.clone();
        let (handle, _) = pool.play(&mut backend, req);
        pool.release(handle.slot());

        assert!(pool.references_clip(&clip));
        assert_eq!(pool.drain_idle(), 1);
        assert!(!pool.references_clip(&clip));
    }

    #[test]
    fn test_freed_slots_are_reused() {
        let (mut backend, mut pool) = pool(1);
        let a = pool.play(&mut backend, request("a", 100)).0;
        let b = pool.play(&mut backend, request("b", 100)).0;
        pool.release(a.slot());
        pool.release(b.slot());
        pool.drain_idle();

        let c = pool.play(&mut backend, request("c", 100)).0;
        assert!(c.slot() == a.slot() || c.slot() == b.slot());
    }

    #[test]
    fn test_handle_stays_stale_after_slot_refilled() {
        let (mut backend, mut pool) = pool(1);
        let a = pool.play(&mut backend, request("a", 100)).0;
        let b = pool.play(&mut backend, request("b", 100)).0;
        assert_eq!(pool.release(a.slot()), ReleaseOutcome::Pooled);
        assert_eq!(pool.release(b.slot()), ReleaseOutcome::Destroyed);

        let c = pool.play(&mut backend, request("c", 100)).0;
        let (d, how) = pool.play(&mut backend, request("d", 100));
        assert_eq!(how, Acquisition::Created);
        assert_eq!(c.slot(), a.slot());
        assert_eq!(d.slot(), b.slot());

        assert_ne!(d, b);
        assert!(pool.resolve(a).is_none());
        assert!(pool.resolve(b).is_none());
        assert_eq!(pool.resolve(d), Some(d.slot()));
    }
}
