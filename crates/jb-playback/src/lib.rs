//! Jukebox Playback Coordinator
//!
//! Multi-track music and pooled sound-effect playback over an abstract
//! voice backend:
//! - Fixed set of music tracks with per-track fades
//! - Bounded pool of reusable one-shot sfx voices
//! - Lazily populated clip cache with reference-checked eviction
//! - Master / category volume mixer with mute flags
//! - Lock-free command queue for multi-threaded hosts
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      PLAYBACK ARCHITECTURE                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                   │
//! │   Game/UI Thread                     Tick Thread                  │
//! │   ┌──────────────────┐              ┌──────────────────────┐     │
//! │   │ play_music()     │              │ CoordinatorProcessor │     │
//! │   │ play_sfx()       │───Command───▶│ .process(delta_ms)   │     │
//! │   │ set_*_volume()   │   Queue      │                      │     │
//! │   │ evict_*()        │  (lock-free) │   AudioCoordinator   │     │
//! │   └──────────────────┘              └──────────┬───────────┘     │
//! │                                                │                  │
//! │        ┌──────────────┬───────────────┬────────┴─────┬────────┐  │
//! │        ▼              ▼               ▼              ▼        ▼  │
//! │   ┌─────────┐   ┌───────────┐   ┌───────────┐   ┌───────┐ ┌─────┐│
//! │   │TrackSet │   │ VoicePool │   │ ClipCache │   │ Fades │ │Mixer││
//! │   └────┬────┘   └─────┬─────┘   └─────┬─────┘   └───────┘ └─────┘│
//! │        └──── Voice ───┘               └── AssetResolver          │
//! │           (AudioBackend)                                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jb_core::{Category, CoordinatorConfig};
//! use jb_playback::{ClipLibrary, VirtualBackend, create_coordinator};
//!
//! let library = ClipLibrary::new().with(Category::Music, "theme", 90_000);
//! let (handle, mut processor) =
//!     create_coordinator(CoordinatorConfig::default(), VirtualBackend::new(), library)?;
//!
//! // Any thread
//! handle.play_music(0, "theme", 0.8, true, false, true);
//!
//! // Tick thread, every frame
//! let diagnostics = processor.process(16);
//! ```

pub mod backend;
pub mod cache;
pub mod coordinator;
pub mod diagnostics;
pub mod fade;
pub mod library;
pub mod manager;
pub mod mixer;
pub mod pool;
pub mod tracks;

pub use backend::{
    AssetResolver, AudioBackend, VirtualBackend, VirtualVoice, Voice, VoiceProbe, VoiceSnapshot,
};
pub use cache::{CacheStats, ClipCache, EvictionReport};
pub use coordinator::{AudioCoordinator, CoordinatorStats};
pub use diagnostics::Diagnostics;
pub use fade::{FadeCompletion, FadeId, FadeJob, FadePhase, FadeScheduler, FadeStep, FadeTarget};
pub use library::{ClipLibrary, ClipManifest, LibraryCounters};
pub use manager::{
    CoordinatorCommand, CoordinatorHandle, CoordinatorProcessor, INVALID_SFX_TICKET, SfxTicket,
    create_coordinator,
};
pub use mixer::VolumeSettings;
pub use pool::{Acquisition, ReleaseOutcome, SfxHandle, SfxVoice, VoicePool, VoiceRequest};
pub use tracks::{MusicTrack, TrackSet, TrackState};
