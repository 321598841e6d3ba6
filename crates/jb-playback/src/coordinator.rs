//! Audio Coordinator
//!
//! Owns the track set, the sfx voice pool, the clip cache, the fade scheduler
//! and the volume settings, plus the two external collaborators (backend and
//! resolver). Every mutation goes through `&mut self`, and time only moves
//! forward inside [`AudioCoordinator::tick`]:
//!
//! 1. Step fades, push mixed volumes, run completion actions
//! 2. Detect music tracks that stopped on their own
//! 3. Poll sfx monitors and return finished voices to the pool
//! 4. Advance the clock
//!
//! Refused requests return a [`JbError`]; every condition, refused or not,
//! is also logged and kept for [`AudioCoordinator::take_diagnostics`].

use jb_core::{Category, CoordinatorConfig, JbError, JbResult, Vec3, clamp01};
use serde::{Deserialize, Serialize};

use crate::backend::{AssetResolver, AudioBackend};
use crate::cache::{CacheStats, ClipCache, EvictionReport};
use crate::diagnostics::Diagnostics;
use crate::fade::{FadeCompletion, FadeScheduler, FadeStep, FadeTarget};
use crate::mixer::VolumeSettings;
use crate::pool::{Acquisition, ReleaseOutcome, SfxHandle, SfxVoice, VoicePool, VoiceRequest};
use crate::tracks::{TrackSet, TrackState};

// ═══════════════════════════════════════════════════════════════════════════════
// STATS
// ═══════════════════════════════════════════════════════════════════════════════

/// Point-in-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorStats {
    pub playing_tracks: usize,
    pub active_voices: usize,
    pub idle_voices: usize,
    pub music_clips: usize,
    pub sfx_clips: usize,
    pub active_fades: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub clock_ms: u64,
}

fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

// ═══════════════════════════════════════════════════════════════════════════════
// COORDINATOR
// ═══════════════════════════════════════════════════════════════════════════════

pub struct AudioCoordinator<B: AudioBackend, R: AssetResolver> {
    config: CoordinatorConfig,
    backend: B,
    resolver: R,
    tracks: TrackSet<B::Voice>,
    pool: VoicePool<B::Voice>,
    cache: ClipCache,
    fades: FadeScheduler,
    volume: VolumeSettings,
    diagnostics: Diagnostics,
    clock_ms: u64,
}

impl<B: AudioBackend, R: AssetResolver> AudioCoordinator<B, R> {
    /// Build tracks and prewarm the pool
    pub fn new(config: CoordinatorConfig, mut backend: B, resolver: R) -> JbResult<Self> {
        config.validate()?;

        let tracks = TrackSet::new(config.track_count, &mut backend);
        let pool = VoicePool::new(&config, &mut backend);
        log::info!(
            "[Coordinator] {} tracks, pool {} (limit {}, active cap {}), fade {} ms {}",
            config.track_count,
            config.pool_size,
            pool.voice_limit(),
            pool.active_cap(),
            config.fade_duration_ms,
            config.fade_curve.name()
        );

        Ok(Self {
            fades: FadeScheduler::new(config.fade_duration_ms, config.fade_curve),
            diagnostics: Diagnostics::new(config.diagnostics_capacity),
            config,
            backend,
            resolver,
            tracks,
            pool,
            cache: ClipCache::new(),
            volume: VolumeSettings::default(),
            clock_ms: 0,
        })
    }

    /// Record a refused request and hand the error back
    fn fail<T>(&mut self, error: JbError) -> JbResult<T> {
        self.diagnostics.report(error.clone());
        Err(error)
    }

    fn check_track(&mut self, track_id: usize) -> JbResult<()> {
        match self.tracks.get(track_id) {
            Ok(_) => Ok(()),
            Err(err) => self.fail(err),
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // MUSIC
    // ───────────────────────────────────────────────────────────────────────────

    /// Play `name` on a track
    ///
    /// When the track is already playing `name` and `force_restart` is false,
    /// only the volume and loop flag change: no cache lookup, no reload.
    pub fn play_music(
        &mut self,
        track_id: usize,
        name: &str,
        volume: f32,
        fade_in: bool,
        force_restart: bool,
        looping: bool,
    ) -> JbResult<()> {
        self.check_track(track_id)?;
        if is_blank(name) {
            return self.fail(JbError::EmptyClipName);
        }
        let volume = clamp01(volume);

        if !force_restart && self.tracks.get(track_id)?.is_playing_clip(name) {
            log::trace!("[Music] Track {} already on '{}', retargeting", track_id, name);
            self.tracks.get_mut(track_id)?.set_looping(looping);
            return self.retarget_track(track_id, volume, fade_in);
        }

        let Some(clip) = self.cache.get(name, Category::Music, &mut self.resolver) else {
            return self.fail(JbError::ResourceNotFound {
                name: name.to_string(),
                category: Category::Music,
            });
        };

        self.fades.cancel(FadeTarget::Track(track_id));
        let track = self.tracks.get_mut(track_id)?;
        track.set_active_fade(None);
        track.set_target_volume(volume);

        let start_level = if fade_in { track.level() } else { volume };
        track.apply_level(start_level, &self.volume);
        track.start(clip, looping, &self.volume);

        if fade_in {
            let id = self.fades.start(
                FadeTarget::Track(track_id),
                start_level,
                volume,
                FadeCompletion::Hold,
            );
            track.set_active_fade(Some(id));
        }

        log::debug!(
            "[Music] Track {} ← '{}' (vol {:.2}, fade {}, loop {})",
            track_id,
            name,
            volume,
            fade_in,
            looping
        );
        Ok(())
    }

    /// Stop a track, fading to silence first when `fade_out` is set
    pub fn stop_track(&mut self, track_id: usize, fade_out: bool) -> JbResult<()> {
        self.check_track(track_id)?;
        let track = self.tracks.get_mut(track_id)?;
        if !track.is_playing() {
            return Ok(());
        }

        if fade_out {
            let id = self.fades.start(
                FadeTarget::Track(track_id),
                track.level(),
                0.0,
                FadeCompletion::StopTrack,
            );
            track.set_active_fade(Some(id));
            log::debug!("[Music] Track {} fading out", track_id);
        } else {
            self.fades.cancel(FadeTarget::Track(track_id));
            track.halt();
            log::debug!("[Music] Track {} stopped", track_id);
        }
        Ok(())
    }

    pub fn stop_all_music(&mut self, fade_out: bool) {
        for track_id in 0..self.tracks.len() {
            // Ids come from the set itself
            let _ = self.stop_track(track_id, fade_out);
        }
    }

    /// Change a playing track's volume. No-op when the track is silent.
    pub fn set_track_volume(&mut self, track_id: usize, volume: f32, fade: bool) -> JbResult<()> {
        self.check_track(track_id)?;
        if !self.tracks.get(track_id)?.is_playing() {
            return Ok(());
        }
        self.retarget_track(track_id, clamp01(volume), fade)
    }

    fn retarget_track(&mut self, track_id: usize, volume: f32, fade: bool) -> JbResult<()> {
        let track = self.tracks.get_mut(track_id)?;
        track.set_target_volume(volume);

        if fade {
            let id = self.fades.start(
                FadeTarget::Track(track_id),
                track.level(),
                volume,
                FadeCompletion::Hold,
            );
            track.set_active_fade(Some(id));
        } else {
            self.fades.cancel(FadeTarget::Track(track_id));
            track.set_active_fade(None);
            track.apply_level(volume, &self.volume);
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // SFX
    // ───────────────────────────────────────────────────────────────────────────

    /// Fire a one-shot effect
    ///
    /// Returns `Ok(None)` without doing anything while sfx are muted or when
    /// `volume_scale` is not positive.
    pub fn play_sfx(
        &mut self,
        name: &str,
        volume_scale: f32,
        pitch: f32,
        position: Option<Vec3>,
    ) -> JbResult<Option<SfxHandle>> {
        if is_blank(name) {
            return self.fail(JbError::EmptyClipName);
        }
        if self.volume.sfx_muted || volume_scale.is_nan() || volume_scale <= 0.0 {
            log::trace!("[Sfx] Skipping '{}' (muted or silent)", name);
            return Ok(None);
        }

        let Some(clip) = self.cache.get(name, Category::Sfx, &mut self.resolver) else {
            return self.fail(JbError::ResourceNotFound {
                name: name.to_string(),
                category: Category::Sfx,
            });
        };

        let scale = volume_scale.min(1.0);
        let pitch = if pitch.is_finite() && pitch != 0.0 {
            pitch
        } else {
            1.0
        };
        let request = VoiceRequest {
            clip,
            scale,
            volume: self.volume.effective(Category::Sfx, scale),
            pitch,
            position,
            muted: self.volume.sfx_muted,
        };

        let (handle, acquisition) = self.pool.play(&mut self.backend, request);
        // A recycled slot must not inherit the previous owner's fade
        self.fades.cancel(FadeTarget::Voice(handle.slot()));

        match acquisition {
            Acquisition::Reused => {}
            Acquisition::Created => self.diagnostics.report(JbError::PoolExhaustedFallback {
                active: self.pool.active_count(),
            }),
            Acquisition::Stolen => self.diagnostics.report(JbError::VoiceStolen {
                slot: handle.slot(),
                limit: self.pool.active_cap(),
            }),
        }

        log::trace!(
            "[Sfx] '{}' on slot {} (scale {:.2}, pitch {:.2})",
            name,
            handle.slot(),
            scale,
            pitch
        );
        Ok(Some(handle))
    }

    /// Stop one effect. Returns false for a stale handle.
    pub fn stop_sfx(&mut self, handle: SfxHandle, fade_out: bool) -> bool {
        let Some(slot) = self.pool.resolve(handle) else {
            return false;
        };

        if fade_out {
            let from = self.pool.voice(slot).map_or(0.0, |v| v.scale());
            self.fades.start(
                FadeTarget::Voice(slot),
                from,
                0.0,
                FadeCompletion::ReleaseVoice,
            );
        } else {
            self.release_voice(slot);
        }
        true
    }

    pub fn is_sfx_active(&self, handle: SfxHandle) -> bool {
        self.pool.resolve(handle).is_some()
    }

    /// Voice behind a live handle
    pub fn sfx_voice(&self, handle: SfxHandle) -> Option<&SfxVoice<B::Voice>> {
        self.pool.resolve(handle).and_then(|slot| self.pool.voice(slot))
    }

    pub fn stop_all_sfx(&mut self) {
        for slot in self.pool.active_slots() {
            self.release_voice(slot);
        }
    }

    fn release_voice(&mut self, slot: usize) {
        self.fades.cancel(FadeTarget::Voice(slot));
        match self.pool.release(slot) {
            ReleaseOutcome::Pooled => log::trace!("[Sfx] Slot {} back to pool", slot),
            ReleaseOutcome::Destroyed => log::trace!("[Sfx] Slot {} destroyed", slot),
            ReleaseOutcome::NotActive => {}
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // VOLUME
    // ───────────────────────────────────────────────────────────────────────────

    pub fn set_master_volume(&mut self, volume: f32) {
        self.volume.set_master(volume);
        self.refresh_music();
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.volume.set_category_volume(Category::Music, volume);
        self.refresh_music();
    }

    /// Applies to effects started after the call
    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.volume.set_category_volume(Category::Sfx, volume);
    }

    /// Returns the new mute state
    pub fn toggle_music_mute(&mut self) -> bool {
        let muted = self.volume.toggle_mute(Category::Music);
        self.refresh_music();
        log::debug!("[Music] Muted: {}", muted);
        muted
    }

    /// Returns the new mute state
    pub fn toggle_sfx_mute(&mut self) -> bool {
        let muted = self.volume.toggle_mute(Category::Sfx);
        self.pool.set_muted_all(muted);
        log::debug!("[Sfx] Muted: {}", muted);
        muted
    }

    fn refresh_music(&mut self) {
        for track in self.tracks.iter_mut().filter(|t| t.is_playing()) {
            track.refresh_output(&self.volume);
        }
    }

    pub fn volume_settings(&self) -> VolumeSettings {
        self.volume
    }

    // ───────────────────────────────────────────────────────────────────────────
    // RESOURCES
    // ───────────────────────────────────────────────────────────────────────────

    /// Drop cache entries nothing is using
    ///
    /// Music entries survive while a playing track uses them; sfx entries
    /// while any active or idle voice still holds the clip. Each survivor is
    /// reported as [`JbError::CacheInUse`].
    pub fn evict_unused_resources(&mut self, force: bool) -> EvictionReport {
        let tracks = &self.tracks;
        let pool = &self.pool;
        let report = self
            .cache
            .evict_unused(|category, name, clip| match category {
                Category::Music => tracks.references(name),
                Category::Sfx => pool.references_clip(clip),
            });

        for (category, name) in &report.in_use {
            self.diagnostics.report(JbError::CacheInUse {
                name: name.clone(),
                category: *category,
            });
        }
        if force {
            self.resolver.unload_unused();
        }

        log::debug!(
            "[Cache] Evicted {} entries, kept {} in use",
            report.removed.len(),
            report.in_use.len()
        );
        report
    }

    /// Stop everything and empty the cache and the pool
    pub fn evict_all_resources(&mut self) {
        for track_id in 0..self.tracks.len() {
            let _ = self.stop_track(track_id, false);
        }
        self.stop_all_sfx();
        self.fades.clear();

        self.cache.clear();
        let drained = self.pool.drain_idle();
        for track in self.tracks.iter_mut() {
            track.unload();
        }
        self.resolver.unload_unused();

        log::info!("[Cache] Evicted all resources ({} pooled voices released)", drained);
    }

    /// Load a clip into the cache without playing it
    pub fn preload(&mut self, name: &str, category: Category) -> JbResult<()> {
        if is_blank(name) {
            return self.fail(JbError::EmptyClipName);
        }
        if self.cache.get(name, category, &mut self.resolver).is_none() {
            return self.fail(JbError::ResourceNotFound {
                name: name.to_string(),
                category,
            });
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // TICK
    // ───────────────────────────────────────────────────────────────────────────

    pub fn tick(&mut self, delta_ms: u32) {
        for step in self.fades.advance(delta_ms) {
            self.apply_fade_step(step);
        }

        for track in self.tracks.iter_mut() {
            if track.finished_early() {
                self.fades.cancel(FadeTarget::Track(track.id()));
                log::debug!(
                    "[Music] Track {} finished ('{}')",
                    track.id(),
                    track.clip_name().unwrap_or_default()
                );
                track.halt();
            }
        }

        for slot in self.pool.poll_finished(delta_ms) {
            self.release_voice(slot);
        }

        self.clock_ms += delta_ms as u64;
    }

    fn apply_fade_step(&mut self, step: FadeStep) {
        match step.target {
            FadeTarget::Track(track_id) => {
                let Ok(track) = self.tracks.get_mut(track_id) else {
                    return;
                };
                track.apply_level(step.value, &self.volume);
                if let Some(completion) = step.completion {
                    track.set_active_fade(None);
                    if completion == FadeCompletion::StopTrack {
                        track.halt();
                        log::debug!("[Fade] Track {} faded out", track_id);
                    }
                }
            }
            FadeTarget::Voice(slot) => {
                if !self.pool.is_active(slot) {
                    return;
                }
                let output = self.volume.effective(Category::Sfx, step.value);
                self.pool.set_volume(slot, step.value, output);
                if step.completion == Some(FadeCompletion::ReleaseVoice) {
                    self.release_voice(slot);
                }
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // QUERIES
    // ───────────────────────────────────────────────────────────────────────────

    pub fn track_state(&self, track_id: usize) -> JbResult<TrackState> {
        self.tracks.get(track_id).map(|t| t.state())
    }

    pub fn track_states(&self) -> Vec<TrackState> {
        self.tracks.iter().map(|t| t.state()).collect()
    }

    pub fn stats(&self) -> CoordinatorStats {
        let cache = self.cache.stats();
        CoordinatorStats {
            playing_tracks: self.tracks.playing_count(),
            active_voices: self.pool.active_count(),
            idle_voices: self.pool.idle_count(),
            music_clips: cache.music_entries,
            sfx_clips: cache.sfx_entries,
            active_fades: self.fades.len(),
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            clock_ms: self.clock_ms,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Cached names for one category, sorted
    pub fn cached_names(&self, category: Category) -> Vec<String> {
        self.cache.names(category)
    }

    /// Drain diagnostics reported since the last call
    pub fn take_diagnostics(&mut self) -> Vec<JbError> {
        self.diagnostics.take()
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::VirtualBackend;
    use crate::library::ClipLibrary;

    fn coordinator() -> AudioCoordinator<VirtualBackend, ClipLibrary> {
        let library = ClipLibrary::new()
            .with(Category::Music, "theme", 60_000)
            .with(Category::Sfx, "click", 100);
        let config = CoordinatorConfig::default()
            .with_track_count(2)
            .with_pool_size(2)
            .with_fade_duration_ms(100);
        AudioCoordinator::new(config, VirtualBackend::new(), library).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = CoordinatorConfig::default().with_pool_size(0);
        let result = AudioCoordinator::new(config, VirtualBackend::new(), ClipLibrary::new());
        assert!(matches!(result, Err(JbError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_track_reported() {
        let mut coord = coordinator();
        let err = coord.play_music(5, "theme", 1.0, false, false, true);
        assert_eq!(
            err,
            Err(JbError::InvalidTrackId {
                track_id: 5,
                track_count: 2
            })
        );
        assert_eq!(coord.take_diagnostics().len(), 1);
    }

    #[test]
    fn test_blank_names_refused() {
        let mut coord = coordinator();
        assert_eq!(
            coord.play_music(0, "   ", 1.0, false, false, true),
            Err(JbError::EmptyClipName)
        );
        assert_eq!(coord.play_sfx("", 1.0, 1.0, None), Err(JbError::EmptyClipName));
        assert_eq!(coord.stats().cache_misses, 0);
    }

    #[test]
    fn test_missing_music_leaves_track_untouched() {
        let mut coord = coordinator();
        let err = coord.play_music(0, "nope", 1.0, true, false, true);
        assert!(matches!(err, Err(JbError::ResourceNotFound { .. })));

        let state = coord.track_state(0).unwrap();
        assert!(!state.playing);
        assert_eq!(state.clip_name, None);
        assert_eq!(coord.stats().active_fades, 0);
    }

    #[test]
    fn test_sfx_skipped_when_muted_or_silent() {
        let mut coord = coordinator();
        assert_eq!(coord.play_sfx("click", 0.0, 1.0, None), Ok(None));
        assert_eq!(coord.play_sfx("click", -1.0, 1.0, None), Ok(None));
        coord.toggle_sfx_mute();
        assert_eq!(coord.play_sfx("click", 1.0, 1.0, None), Ok(None));
        assert_eq!(coord.stats().cache_misses, 0);
    }

    #[test]
    fn test_stop_sfx_with_fade_releases_on_completion() {
        let mut coord = coordinator();
        let handle = coord.play_sfx("click", 1.0, 0.1, None).unwrap().unwrap();

        assert!(coord.stop_sfx(handle, true));
        coord.tick(50);
        assert!(coord.is_sfx_active(handle));
        coord.tick(50);
        assert!(!coord.is_sfx_active(handle));
        assert!(!coord.stop_sfx(handle, false));
    }

    #[test]
    fn test_clock_advances() {
        let mut coord = coordinator();
        coord.tick(16);
        coord.tick(17);
        assert_eq!(coord.clock_ms(), 33);
        assert_eq!(coord.stats().clock_ms, 33);
    }
}
