//! Coordinator tick benchmarks

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use jb_core::{Category, CoordinatorConfig};
use jb_playback::{AudioCoordinator, ClipLibrary, VirtualBackend};

fn loaded_coordinator() -> AudioCoordinator<VirtualBackend, ClipLibrary> {
    let mut library = ClipLibrary::new();
    for i in 0..4 {
        library.register(Category::Music, &format!("track_{i}"), 120_000);
    }
    for i in 0..64 {
        library.register(Category::Sfx, &format!("sfx_{i}"), 1 << 40);
    }

    let config = CoordinatorConfig::default()
        .with_track_count(4)
        .with_pool_size(32)
        .with_fade_duration_ms(u32::MAX);
    let mut coord = AudioCoordinator::new(config, VirtualBackend::new(), library)
        .expect("valid config");

    for i in 0..4 {
        coord
            .play_music(i, &format!("track_{i}"), 0.8, true, false, true)
            .expect("track plays");
    }
    for i in 0..64 {
        coord
            .play_sfx(&format!("sfx_{i}"), 1.0, 1.0, None)
            .expect("sfx plays");
    }
    coord
}

fn bench_tick_idle(c: &mut Criterion) {
    let config = CoordinatorConfig::default();
    let mut coord =
        AudioCoordinator::new(config, VirtualBackend::new(), ClipLibrary::new()).expect("config");

    c.bench_function("tick_idle", |b| {
        b.iter(|| {
            coord.tick(black_box(16));
        })
    });
}

fn bench_tick_loaded(c: &mut Criterion) {
    let mut coord = loaded_coordinator();

    c.bench_function("tick_4_fading_tracks_64_voices", |b| {
        b.iter(|| {
            coord.tick(black_box(1));
        })
    });
}

fn bench_sfx_churn(c: &mut Criterion) {
    let mut library = ClipLibrary::new();
    library.register(Category::Sfx, "blip", 50);
    let config = CoordinatorConfig::default().with_pool_size(16);
    let mut coord = AudioCoordinator::new(config, VirtualBackend::new(), library).expect("config");

    c.bench_function("sfx_play_and_return", |b| {
        b.iter(|| {
            for _ in 0..8 {
                let _ = coord.play_sfx(black_box("blip"), 1.0, 1.0, None);
            }
            coord.tick(100);
        })
    });
}

criterion_group!(benches, bench_tick_idle, bench_tick_loaded, bench_sfx_churn);
criterion_main!(benches);
