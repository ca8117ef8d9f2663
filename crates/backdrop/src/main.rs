//! Headless backdrop runner.
//!
//! Drives the engine against an in-memory surface at 60 Hz and writes PNG
//! snapshots of the composited frames.
//!
//! Usage: `backdrop [CONFIG.ron] [BIOME]`

use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use backdrop::{BackdropConfig, Engine, EngineOptions, SettingsPatch};
use engine_core::{FrameClock, ManualScheduler, MemorySurface};
use procgen::BiomeKind;

const FRAME_MS: f64 = 1000.0 / 60.0;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let mut config = match args.next() {
        Some(path) => BackdropConfig::load_from(&path).with_context(|| format!("loading {}", path))?,
        None => BackdropConfig::load(),
    };
    if let Some(name) = args.next() {
        config.settings.biome = BiomeKind::from_name(&name);
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {:?}", config.output_dir))?;

    let surface = MemorySurface::new(config.width, config.height, config.device_pixel_ratio);
    let scheduler = ManualScheduler::new();
    let ready = Rc::new(Cell::new(false));
    let ready_flag = ready.clone();

    let mut engine = Engine::create(
        Box::new(surface.clone()),
        Box::new(scheduler.clone()),
        SettingsPatch::from(config.settings),
        EngineOptions {
            seed: config.seed,
            on_ready: Some(Box::new(move || ready_flag.set(true))),
            ..Default::default()
        },
    )
    .context("building the backdrop")?;
    anyhow::ensure!(ready.get(), "engine finished construction without signalling ready");

    log::info!(
        "running {} frames of {} seed {} into {:?}",
        config.frames,
        engine.settings().biome.name(),
        engine.seed(),
        config.output_dir
    );

    let mut clock = FrameClock::new();
    let mut now_ms = 0.0;
    for frame in 1..=config.frames {
        for _token in scheduler.take_pending() {
            engine.frame(now_ms);
        }
        clock.update(now_ms);
        now_ms += FRAME_MS;

        let snapshot = config.snapshot_every > 0 && frame % config.snapshot_every == 0;
        if snapshot || frame == config.frames {
            let path = config.output_dir.join(format!("frame_{:04}.png", frame));
            engine
                .frame_layer()
                .save_png(&path)
                .with_context(|| format!("writing {:?}", path))?;
            log::info!(
                "frame {} ({:.1}s at {:.0} fps, {} birds) -> {:?}",
                frame,
                clock.elapsed_seconds(),
                clock.fps(),
                engine.flocks().bird_count(),
                path
            );
        }
    }

    let stats = engine.stats();
    engine.destroy();
    log::info!(
        "done: {} frames presented, {} terrain builds, {} base draws",
        surface.presents(),
        stats.terrain_builds,
        stats.base_draws
    );
    Ok(())
}
