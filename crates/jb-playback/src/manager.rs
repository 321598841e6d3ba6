//! Coordinator Manager
//!
//! Thread-safe front-end for an [`AudioCoordinator`].
//!
//! ## Thread Safety Design
//!
//! The coordinator is split into two parts:
//! - `CoordinatorHandle`: cloneable handle for game/UI threads. Every call
//!   becomes a [`CoordinatorCommand`] pushed onto a lock-free ring buffer.
//! - `CoordinatorProcessor`: single owner of the coordinator. Each
//!   `process(delta_ms)` drains the queue, runs one tick and publishes stats.
//!
//! Commands queued before a `process` call are all applied before that
//! tick's fades and monitors run.

use parking_lot::{Mutex, RwLock};
use rtrb::{Consumer, Producer, RingBuffer};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use jb_core::{Category, CoordinatorConfig, JbError, JbResult, Vec3};

use crate::backend::{AssetResolver, AudioBackend};
use crate::coordinator::{AudioCoordinator, CoordinatorStats};
use crate::mixer::VolumeSettings;
use crate::pool::SfxHandle;
use crate::tracks::TrackState;

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Caller-chosen id for an effect posted through a handle
pub type SfxTicket = u64;

/// Invalid ticket (returned when the command could not be queued)
pub const INVALID_SFX_TICKET: SfxTicket = 0;

/// Commands sent from game/UI threads to the processor
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorCommand {
    PlayMusic {
        track_id: usize,
        name: String,
        volume: f32,
        fade_in: bool,
        force_restart: bool,
        looping: bool,
    },
    StopTrack {
        track_id: usize,
        fade_out: bool,
    },
    StopAllMusic {
        fade_out: bool,
    },
    SetTrackVolume {
        track_id: usize,
        volume: f32,
        fade: bool,
    },
    PlaySfx {
        ticket: SfxTicket,
        name: String,
        volume_scale: f32,
        pitch: f32,
        position: Option<Vec3>,
    },
    StopSfx {
        ticket: SfxTicket,
        fade_out: bool,
    },
    StopAllSfx,
    SetMasterVolume(f32),
    SetMusicVolume(f32),
    SetSfxVolume(f32),
    ToggleMusicMute,
    ToggleSfxMute,
    EvictUnused {
        force: bool,
    },
    EvictAll,
    Preload {
        name: String,
        category: Category,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared state between Handle and Processor
struct CoordinatorShared {
    /// Command producer (Mutex so any thread can push)
    command_tx: Mutex<Producer<CoordinatorCommand>>,
    /// Published after every processed tick
    stats: RwLock<CoordinatorStats>,
    tracks: RwLock<Vec<TrackState>>,
    volume: RwLock<VolumeSettings>,
    next_ticket: AtomicU64,
    dropped_commands: AtomicU64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLE (any thread)
// ═══════════════════════════════════════════════════════════════════════════════

/// Thread-safe handle for game/UI code
#[derive(Clone)]
pub struct CoordinatorHandle {
    shared: Arc<CoordinatorShared>,
}

impl CoordinatorHandle {
    /// Queue a command. Returns false (and logs) when the queue is full.
    pub fn push_command(&self, cmd: CoordinatorCommand) -> bool {
        let mut tx = self.shared.command_tx.lock();
        match tx.push(cmd) {
            Ok(()) => true,
            Err(rtrb::PushError::Full(cmd)) => {
                self.shared.dropped_commands.fetch_add(1, Ordering::Relaxed);
                log::warn!("[Coordinator] Command queue full, dropping {:?}", cmd);
                false
            }
        }
    }

    pub fn play_music(
        &self,
        track_id: usize,
        name: &str,
        volume: f32,
        fade_in: bool,
        force_restart: bool,
        looping: bool,
    ) -> bool {
        self.push_command(CoordinatorCommand::PlayMusic {
            track_id,
            name: name.to_string(),
            volume,
            fade_in,
            force_restart,
            looping,
        })
    }

    pub fn stop_track(&self, track_id: usize, fade_out: bool) -> bool {
        self.push_command(CoordinatorCommand::StopTrack { track_id, fade_out })
    }

    pub fn stop_all_music(&self, fade_out: bool) -> bool {
        self.push_command(CoordinatorCommand::StopAllMusic { fade_out })
    }

    pub fn set_track_volume(&self, track_id: usize, volume: f32, fade: bool) -> bool {
        self.push_command(CoordinatorCommand::SetTrackVolume {
            track_id,
            volume,
            fade,
        })
    }

    /// Post an effect. The ticket can later be passed to [`stop_sfx`](Self::stop_sfx).
    pub fn play_sfx(
        &self,
        name: &str,
        volume_scale: f32,
        pitch: f32,
        position: Option<Vec3>,
    ) -> SfxTicket {
        let ticket = self.shared.next_ticket.fetch_add(1, Ordering::Relaxed);
        let queued = self.push_command(CoordinatorCommand::PlaySfx {
            ticket,
            name: name.to_string(),
            volume_scale,
            pitch,
            position,
        });
        if queued { ticket } else { INVALID_SFX_TICKET }
    }

    pub fn stop_sfx(&self, ticket: SfxTicket, fade_out: bool) -> bool {
        self.push_command(CoordinatorCommand::StopSfx { ticket, fade_out })
    }

    pub fn stop_all_sfx(&self) -> bool {
        self.push_command(CoordinatorCommand::StopAllSfx)
    }

    pub fn set_master_volume(&self, volume: f32) -> bool {
        self.push_command(CoordinatorCommand::SetMasterVolume(volume))
    }

    pub fn set_music_volume(&self, volume: f32) -> bool {
        self.push_command(CoordinatorCommand::SetMusicVolume(volume))
    }

    pub fn set_sfx_volume(&self, volume: f32) -> bool {
        self.push_command(CoordinatorCommand::SetSfxVolume(volume))
    }

    pub fn toggle_music_mute(&self) -> bool {
        self.push_command(CoordinatorCommand::ToggleMusicMute)
    }

    pub fn toggle_sfx_mute(&self) -> bool {
        self.push_command(CoordinatorCommand::ToggleSfxMute)
    }

    pub fn evict_unused_resources(&self, force: bool) -> bool {
        self.push_command(CoordinatorCommand::EvictUnused { force })
    }

    pub fn evict_all_resources(&self) -> bool {
        self.push_command(CoordinatorCommand::EvictAll)
    }

    pub fn preload(&self, name: &str, category: Category) -> bool {
        self.push_command(CoordinatorCommand::Preload {
            name: name.to_string(),
            category,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES (last published state)
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn stats(&self) -> CoordinatorStats {
        *self.shared.stats.read()
    }

    pub fn track_states(&self) -> Vec<TrackState> {
        self.shared.tracks.read().clone()
    }

    pub fn volume_settings(&self) -> VolumeSettings {
        *self.shared.volume.read()
    }

    /// Commands lost to a full queue
    pub fn dropped_commands(&self) -> u64 {
        self.shared.dropped_commands.load(Ordering::Relaxed)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROCESSOR (tick thread only)
// ═══════════════════════════════════════════════════════════════════════════════

/// Single owner of the coordinator and the consumer end of the queue
pub struct CoordinatorProcessor<B: AudioBackend, R: AssetResolver> {
    shared: Arc<CoordinatorShared>,
    command_rx: Consumer<CoordinatorCommand>,
    coordinator: AudioCoordinator<B, R>,
    /// Ticket → live voice handle
    sfx_tickets: HashMap<SfxTicket, SfxHandle>,
}

impl<B: AudioBackend, R: AssetResolver> CoordinatorProcessor<B, R> {
    /// Apply queued commands, run one tick, publish state.
    ///
    /// Returns the diagnostics reported during this call.
    pub fn process(&mut self, delta_ms: u32) -> Vec<JbError> {
        // 1. Apply pending commands
        self.process_commands();

        // 2. Advance fades and monitors
        self.coordinator.tick(delta_ms);

        // 3. Forget tickets whose voice is gone
        let coordinator = &self.coordinator;
        self.sfx_tickets.retain(|_, handle| coordinator.is_sfx_active(*handle));

        // 4. Publish
        *self.shared.stats.write() = self.coordinator.stats();
        *self.shared.tracks.write() = self.coordinator.track_states();
        *self.shared.volume.write() = self.coordinator.volume_settings();

        self.coordinator.take_diagnostics()
    }

    fn process_commands(&mut self) {
        while let Ok(cmd) = self.command_rx.pop() {
            self.execute(cmd);
        }
    }

    fn execute(&mut self, cmd: CoordinatorCommand) {
        let coord = &mut self.coordinator;
        // Refusals are already in the diagnostics buffer
        match cmd {
            CoordinatorCommand::PlayMusic {
                track_id,
                name,
                volume,
                fade_in,
                force_restart,
                looping,
            } => {
                let _ = coord.play_music(track_id, &name, volume, fade_in, force_restart, looping);
            }
            CoordinatorCommand::StopTrack { track_id, fade_out } => {
                let _ = coord.stop_track(track_id, fade_out);
            }
            CoordinatorCommand::StopAllMusic { fade_out } => coord.stop_all_music(fade_out),
            CoordinatorCommand::SetTrackVolume {
                track_id,
                volume,
                fade,
            } => {
                let _ = coord.set_track_volume(track_id, volume, fade);
            }
            CoordinatorCommand::PlaySfx {
                ticket,
                name,
                volume_scale,
                pitch,
                position,
            } => {
                if let Ok(Some(handle)) = coord.play_sfx(&name, volume_scale, pitch, position) {
                    self.sfx_tickets.insert(ticket, handle);
                }
            }
            CoordinatorCommand::StopSfx { ticket, fade_out } => {
                if let Some(handle) = self.sfx_tickets.get(&ticket).copied() {
                    coord.stop_sfx(handle, fade_out);
                }
            }
            CoordinatorCommand::StopAllSfx => coord.stop_all_sfx(),
            CoordinatorCommand::SetMasterVolume(volume) => coord.set_master_volume(volume),
            CoordinatorCommand::SetMusicVolume(volume) => coord.set_music_volume(volume),
            CoordinatorCommand::SetSfxVolume(volume) => coord.set_sfx_volume(volume),
            CoordinatorCommand::ToggleMusicMute => {
                coord.toggle_music_mute();
            }
            CoordinatorCommand::ToggleSfxMute => {
                coord.toggle_sfx_mute();
            }
            CoordinatorCommand::EvictUnused { force } => {
                coord.evict_unused_resources(force);
            }
            CoordinatorCommand::EvictAll => coord.evict_all_resources(),
            CoordinatorCommand::Preload { name, category } => {
                let _ = coord.preload(&name, category);
            }
        }
    }

    pub fn coordinator(&self) -> &AudioCoordinator<B, R> {
        &self.coordinator
    }

    /// Direct access for single-threaded hosts
    pub fn coordinator_mut(&mut self) -> &mut AudioCoordinator<B, R> {
        &mut self.coordinator
    }

    /// Live handle behind a ticket
    pub fn sfx_handle(&self, ticket: SfxTicket) -> Option<SfxHandle> {
        self.sfx_tickets.get(&ticket).copied()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FACTORY
// ═══════════════════════════════════════════════════════════════════════════════

/// Create a coordinator split into a handle and a processor
///
/// The handle can be cloned and shared across threads. The processor must
/// stay on the thread that drives ticks.
pub fn create_coordinator<B, R>(
    config: CoordinatorConfig,
    backend: B,
    resolver: R,
) -> JbResult<(CoordinatorHandle, CoordinatorProcessor<B, R>)>
where
    B: AudioBackend,
    R: AssetResolver,
{
    let (command_tx, command_rx) = RingBuffer::new(config.command_queue_capacity);
    let coordinator = AudioCoordinator::new(config, backend, resolver)?;

    let shared = Arc::new(CoordinatorShared {
        command_tx: Mutex::new(command_tx),
        stats: RwLock::new(coordinator.stats()),
        tracks: RwLock::new(coordinator.track_states()),
        volume: RwLock::new(coordinator.volume_settings()),
        next_ticket: AtomicU64::new(INVALID_SFX_TICKET + 1),
        dropped_commands: AtomicU64::new(0),
    });

    let handle = CoordinatorHandle {
        shared: Arc::clone(&shared),
    };

    let processor = CoordinatorProcessor {
        shared,
        command_rx,
        coordinator,
        sfx_tickets: HashMap::new(),
    };

    Ok((handle, processor))
}
