//! Headless playback probe.
//!
//! Builds a procedural wave cache (a grid whose heights change every frame,
//! plus one frame with a different topology), plays it back through a
//! [`SceneAggregator`] on the CPU-memory GPU context and logs what reached
//! the buffers.
//!
//! ```text
//! playback_probe [settings.json]
//! ```

use std::sync::Arc;

use anyhow::Context;
use geocache::prelude::*;
use glam::{Vec2, Vec3};

const GRID: u32 = 16;
const CACHE_FPS: f32 = 12.0;
const CACHE_FRAMES: usize = 24;
const RENDER_FPS: f32 = 60.0;

fn grid_indices(size: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity((size as usize - 1).pow(2) * 6);
    for y in 0..size - 1 {
        for x in 0..size - 1 {
            let i = y * size + x;
            indices.extend_from_slice(&[i, i + size, i + 1, i + 1, i + size, i + size + 1]);
        }
    }
    indices
}

fn wave_frame(size: u32, phase: f32) -> Sample {
    let mut positions = Vec::with_capacity((size * size) as usize);
    let mut uvs = Vec::with_capacity(positions.capacity());
    for y in 0..size {
        for x in 0..size {
            let u = x as f32 / (size - 1) as f32;
            let v = y as f32 / (size - 1) as f32;
            let height = ((u + phase) * std::f32::consts::TAU).sin() * 0.1;
            positions.push(Vec3::new(u - 0.5, height, v - 0.5));
            uvs.push(Vec2::new(u, v));
        }
    }
    Sample::new(positions, grid_indices(size)).with_uvs(uvs)
}

fn build_cache() -> Result<FlipbookTrack> {
    let mut flipbook = FlipbookTrack::new("wave");
    for frame in 0..CACHE_FRAMES {
        let time = frame as f32 / CACHE_FPS;
        // One coarser frame exercises the topology fallback
        let size = if frame == CACHE_FRAMES / 2 { GRID / 2 } else { GRID };
        flipbook.add_mesh_sample(wave_frame(size, frame as f32 / CACHE_FRAMES as f32), time)?;
    }
    let duration = (CACHE_FRAMES - 1) as f32 / CACHE_FPS;
    flipbook.set_visibility(VisibilityTimeline::new().with_range(
        duration * 0.8,
        duration * 0.9,
        false,
    ));
    Ok(flipbook)
}

fn load_settings() -> anyhow::Result<CacheSettings> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file '{path}'"))?;
            CacheSettings::from_json(&json).with_context(|| format!("Invalid settings in '{path}'"))
        }
        None => Ok(CacheSettings::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;
    log::info!("Settings: {settings:?}");

    let diagnostics = Arc::new(DiagnosticLog::new());
    let mut scene = SceneAggregator::new(HostContext::new())
        .with_settings(settings)
        .with_diagnostics(diagnostics.clone());
    let key = scene.add_track(Track::new("wave", Arc::new(build_cache()?)))?;

    let render_frames = (RENDER_FPS * 3.0) as u32;
    let mut uploads = 0;
    for _ in 0..render_frames {
        if scene.tick(1.0 / RENDER_FPS) {
            uploads += 1;
        }
        if let Some(state) = scene.track(key).map(TrackAnimator::render_state)
            && let (Some(current), Some(previous)) = (state.current, state.previous)
        {
            log::debug!(
                "t={:.3} visible={} frame={} dt={:.4} indices={}",
                scene.playback().time,
                state.visible,
                current.frame_index,
                current.time - previous.time,
                state.index_count,
            );
        }
    }

    let stats = scene.gpu().stats();
    log::info!(
        "{render_frames} render frames, {uploads} position uploads, {} live buffers, {} bytes allocated",
        scene.gpu().live_buffers(),
        scene.allocated_size()
    );
    log::info!(
        "GPU ops: {} creates, {} resizes, {} writes ({} bytes)",
        stats.creates,
        stats.resizes,
        stats.writes,
        stats.bytes_written
    );
    for event in diagnostics.events() {
        log::warn!("frame {}: {}", event.frame_index, event.failure);
    }

    scene.clear_tracks();
    anyhow::ensure!(
        scene.gpu().live_buffers() == 0,
        "buffers leaked after clearing tracks"
    );
    Ok(())
}
