//! Jukebox CLI
//!
//! Builds a coordinator on the virtual backend and runs a scripted scenario
//! through the handle/processor pair:
//!   1. Fade in music on track 0
//!   2. Cross-fade to track 1
//!   3. Burst of effects larger than the pool
//!   4. Master volume dip and recovery
//!   5. Eviction of unused clips
//!
//! Usage:
//!   jukebox --manifest clips.json --ticks 600 --tick-ms 16 --json
//!   RUST_LOG=debug jukebox --pool-size 4 --fade-ms 250

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use jb_core::CoordinatorConfig;
use jb_playback::{
    ClipLibrary, ClipManifest, CoordinatorHandle, CoordinatorProcessor, CoordinatorStats,
    TrackState, VirtualBackend, VolumeSettings, create_coordinator,
};
use serde::Serialize;

const DEFAULT_MANIFEST: &str = r#"{
    "music": { "title_theme": 95000, "battle_loop": 120000 },
    "sfx": {
        "ui_click": 120, "ui_back": 150, "coin": 400, "jump": 350,
        "hit_light": 250, "hit_heavy": 600, "explosion": 1800, "whoosh": 500
    }
}"#;

#[derive(Parser)]
#[command(name = "jukebox", about = "Run a scripted playback scenario on a virtual device")]
struct Cli {
    /// Coordinator config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Clip manifest (JSON: {"music": {name: ms}, "sfx": {name: ms}})
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Total ticks to run
    #[arg(long, default_value_t = 300)]
    ticks: u32,

    /// Milliseconds per tick
    #[arg(long, default_value_t = 16)]
    tick_ms: u32,

    /// Override music track count
    #[arg(long)]
    track_count: Option<usize>,

    /// Override sfx pool size
    #[arg(long)]
    pool_size: Option<usize>,

    /// Override fade duration
    #[arg(long)]
    fade_ms: Option<u32>,

    /// Sleep between ticks
    #[arg(long)]
    realtime: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    stats: CoordinatorStats,
    volume: VolumeSettings,
    tracks: Vec<TrackState>,
    diagnostics: Vec<String>,
    dropped_commands: u64,
}

struct Driver {
    handle: CoordinatorHandle,
    processor: CoordinatorProcessor<VirtualBackend, ClipLibrary>,
    backend: VirtualBackend,
    tick_ms: u32,
    realtime: bool,
    diagnostics: Vec<String>,
}

impl Driver {
    fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.backend.advance(self.tick_ms);
            for diag in self.processor.process(self.tick_ms) {
                self.diagnostics.push(diag.to_string());
            }
            if self.realtime {
                thread::sleep(Duration::from_millis(self.tick_ms as u64));
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let manifest = load_manifest(cli.manifest.as_deref())?;
    let music: Vec<&String> = manifest.music.keys().collect();
    let sfx: Vec<&String> = manifest.sfx.keys().collect();
    if music.is_empty() {
        bail!("Manifest has no music clips");
    }

    log::info!(
        "Starting jukebox: {} music / {} sfx clips, {} ticks × {} ms",
        music.len(),
        sfx.len(),
        cli.ticks,
        cli.tick_ms
    );

    let backend = VirtualBackend::new();
    let pool_size = config.pool_size;
    let two_tracks = config.track_count > 1;
    let (handle, processor) =
        create_coordinator(config, backend.clone(), ClipLibrary::from_manifest(&manifest))
            .context("Failed to create coordinator")?;

    let mut driver = Driver {
        handle,
        processor,
        backend,
        tick_ms: cli.tick_ms,
        realtime: cli.realtime,
        diagnostics: Vec::new(),
    };
    let phase = (cli.ticks / 5).max(1);

    // 1. Fade in
    driver.handle.play_music(0, music[0], 0.8, true, false, true);
    driver.run(phase);

    // 2. Cross-fade
    let next = music.get(1).copied().unwrap_or(music[0]);
    if two_tracks {
        driver.handle.stop_track(0, true);
        driver.handle.play_music(1, next, 0.8, true, false, true);
    } else {
        driver.handle.play_music(0, next, 0.8, true, true, true);
    }
    driver.run(phase);

    // 3. Burst past the pool
    if !sfx.is_empty() {
        for i in 0..pool_size + 5 {
            driver
                .handle
                .play_sfx(sfx[i % sfx.len()], 1.0, 1.0 + (i % 3) as f32 * 0.1, None);
        }
    }
    driver.run(phase);

    // 4. Master dip
    driver.handle.set_master_volume(0.3);
    driver.run(phase / 2);
    driver.handle.set_master_volume(1.0);
    driver.run(phase / 2);

    // 5. Evict
    driver.handle.evict_unused_resources(true);
    driver.run(cli.ticks.saturating_sub(phase * 4).max(1));

    let report = Report {
        stats: driver.handle.stats(),
        volume: driver.handle.volume_settings(),
        tracks: driver.handle.track_states(),
        diagnostics: driver.diagnostics,
        dropped_commands: driver.handle.dropped_commands(),
    };
    print_report(&report, cli.json)
}

fn load_config(cli: &Cli) -> Result<CoordinatorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => CoordinatorConfig::default(),
    };

    if let Some(track_count) = cli.track_count {
        config = config.with_track_count(track_count);
    }
    if let Some(pool_size) = cli.pool_size {
        config = config.with_pool_size(pool_size);
    }
    if let Some(fade_ms) = cli.fade_ms {
        config = config.with_fade_duration_ms(fade_ms);
    }

    config.validate().context("Invalid coordinator config")?;
    Ok(config)
}

fn load_manifest(path: Option<&Path>) -> Result<ClipManifest> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?,
        None => DEFAULT_MANIFEST.to_string(),
    };
    serde_json::from_str(&text).context("Invalid clip manifest")
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let stats = &report.stats;
    println!("Jukebox run finished at {} ms", stats.clock_ms);
    println!(
        "  tracks playing: {}   voices: {} active / {} idle   fades: {}",
        stats.playing_tracks, stats.active_voices, stats.idle_voices, stats.active_fades
    );
    println!(
        "  volume: master {:.2}  music {:.2}  sfx {:.2}",
        report.volume.master, report.volume.music, report.volume.sfx
    );
    println!(
        "  cache: {} music / {} sfx   hits {}  misses {}",
        stats.music_clips, stats.sfx_clips, stats.cache_hits, stats.cache_misses
    );
    for track in &report.tracks {
        println!(
            "  track {}: {:<14} playing={} level={:.2} target={:.2}",
            track.id,
            track.clip_name.as_deref().unwrap_or("-"),
            track.playing,
            track.level,
            track.target_volume
        );
    }
    println!("  diagnostics: {}", report.diagnostics.len());
    for diag in &report.diagnostics {
        println!("    {}", diag);
    }
    if report.dropped_commands > 0 {
        println!("  dropped commands: {}", report.dropped_commands);
    }
    Ok(())
}
