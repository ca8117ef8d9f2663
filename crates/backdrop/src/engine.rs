//! The backdrop engine: owns every cache, drives rebuild tiers and the
//! per-frame overlay.
//!
//! Lifecycle is `Constructing -> Running -> Destroyed`. Construction builds
//! everything synchronously, fires the ready callback and asks the host for
//! the first frame. Each frame advances the flocks, redraws the overlay,
//! presents and asks for the next frame. Settings updates pick the cheapest
//! tier that keeps the picture correct:
//!
//! - terrain (biome, density, zoom, seed, size): heights, river, mesh,
//!   triangle records, then everything below
//! - lighting (sun, softness, interaction): shadow map
//! - water (elevation, biome, glint): the water color cache
//! - base (any of the above, or contrast): shading and the base layer

use std::time::Instant;

use engine_core::{FrameClock, FrameScheduler, FrameToken, ResizeObserver, Surface};
use procgen::{
    build_triangle_records, random_seed, DelaunayTriangulator, HeightGrid, HeightModel, Mesh, NoiseField, River,
    ShadowMap, TriangleRecord, Triangulator,
};
use renderer::Layer;

use crate::compositor::{Compositor, OverlayFrame};
use crate::error::EngineError;
use crate::flock::FlockSim;
use crate::settings::{Settings, SettingsPatch};
use crate::shading::{shade_terrain, ColorContext, Lighting, ShadedTerrain};
use crate::water::WaterCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Constructing,
    Running,
    Destroyed,
}

/// How often each rebuild tier ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub terrain_builds: u64,
    pub shadow_builds: u64,
    pub water_builds: u64,
    pub base_draws: u64,
    pub frames: u64,
}

/// Optional construction inputs.
#[derive(Default)]
pub struct EngineOptions {
    /// Terrain seed; random when absent.
    pub seed: Option<u32>,
    /// Called once, after the first base layer is drawn.
    pub on_ready: Option<Box<dyn FnOnce()>>,
    /// Defaults to [`DelaunayTriangulator`].
    pub triangulator: Option<Box<dyn Triangulator>>,
    /// Disconnected on destroy.
    pub resize_observer: Option<Box<dyn ResizeObserver>>,
}

/// Everything derived from biome, density, zoom, seed and canvas size.
struct Terrain {
    grid: HeightGrid,
    river: River,
    mesh: Mesh,
    triangles: Vec<TriangleRecord>,
}

impl Terrain {
    fn build(
        settings: &Settings,
        seed: u32,
        noise: NoiseField,
        width: f32,
        height: f32,
        triangulator: &dyn Triangulator,
    ) -> Result<Self, EngineError> {
        let model = HeightModel::new(settings.biome, noise, width, height, settings.zoom);
        // The river walks the terrain without its own valley.
        let dry = HeightGrid::build(width, height, model.pixel_scale(), |x, y| model.height_no_river01(x, y));
        let spacing = Mesh::spacing_for(width, height, settings.tri_density);
        let river = River::carve(&model, &dry, seed, River::min_width_for(spacing));
        let grid = if river.is_enabled() {
            HeightGrid::build(width, height, model.pixel_scale(), |x, y| model.height01(x, y, &river))
        } else {
            dry
        };
        let mesh = Mesh::build(width, height, settings.tri_density, seed, &river, triangulator)?;
        let triangles = build_triangle_records(&mesh, &grid, &river);
        Ok(Self {
            grid,
            river,
            mesh,
            triangles,
        })
    }
}

fn device_size(css: (u32, u32), dpr: f32) -> (u32, u32) {
    let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    let scale = |v: u32| ((v as f32 * dpr).round() as u32).max(1);
    (scale(css.0), scale(css.1))
}

pub struct Engine {
    surface: Box<dyn Surface>,
    scheduler: Box<dyn FrameScheduler>,
    resize_observer: Option<Box<dyn ResizeObserver>>,
    triangulator: Box<dyn Triangulator>,
    on_ready: Option<Box<dyn FnOnce()>>,
    state: EngineState,
    settings: Settings,
    seed: u32,
    interacting: bool,
    /// Canvas size in CSS pixels, at least 1x1.
    css_size: (u32, u32),
    noise: NoiseField,
    terrain: Terrain,
    shadow: ShadowMap,
    shaded: ShadedTerrain,
    water: WaterCache,
    compositor: Compositor,
    flocks: FlockSim,
    clock: FrameClock,
    pending: Option<FrameToken>,
    stats: EngineStats,
}

impl Engine {
    /// Build the scene for `surface`, draw the base layer, fire `on_ready`
    /// and request the first frame.
    pub fn create(
        mut surface: Box<dyn Surface>,
        scheduler: Box<dyn FrameScheduler>,
        patch: SettingsPatch,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let settings = Settings::from_patch(patch);
        let seed = options.seed.unwrap_or_else(random_seed);
        let triangulator = options.triangulator.unwrap_or_else(|| Box::new(DelaunayTriangulator));

        let (cw, ch) = surface.css_size();
        let css_size = (cw.max(1), ch.max(1));
        let dpr = surface.device_pixel_ratio();
        let (dw, dh) = device_size(css_size, dpr);
        surface.resize(dw, dh);

        let start = Instant::now();
        let noise = NoiseField::new(seed);
        let (w, h) = (css_size.0 as f32, css_size.1 as f32);
        let terrain = Terrain::build(&settings, seed, noise, w, h, triangulator.as_ref())?;
        let lighting = Lighting::new(&settings);
        let shadow = ShadowMap::build(&terrain.grid, w, h, lighting.sun, settings.softness, false);
        let water = WaterCache::build(settings.biome.palette(), settings.elevation, settings.glint_hsl());

        let mut engine = Self {
            surface,
            scheduler,
            resize_observer: options.resize_observer,
            triangulator,
            on_ready: options.on_ready,
            state: EngineState::Constructing,
            settings,
            seed,
            interacting: false,
            css_size,
            noise,
            terrain,
            shadow,
            shaded: ShadedTerrain::default(),
            water,
            compositor: Compositor::new(dw, dh, dw as f32 / css_size.0 as f32),
            flocks: FlockSim::new(&mut rand::thread_rng()),
            clock: FrameClock::new(),
            pending: None,
            stats: EngineStats {
                terrain_builds: 1,
                shadow_builds: 1,
                water_builds: 1,
                ..Default::default()
            },
        };
        engine.redraw_base();

        engine.state = EngineState::Running;
        log::info!(
            "backdrop ready: {} seed {} at {}x{} ({} triangles) in {:.1?}",
            engine.settings.biome.name(),
            seed,
            dw,
            dh,
            engine.terrain.triangles.len(),
            start.elapsed()
        );
        if let Some(ready) = engine.on_ready.take() {
            ready();
        }
        engine.pending = Some(engine.scheduler.request_frame());
        Ok(engine)
    }

    /// Frame callback. `now_ms` is the host's frame timestamp.
    pub fn frame(&mut self, now_ms: f64) {
        if self.state != EngineState::Running {
            return;
        }
        self.pending = None;
        self.clock.update(now_ms);

        let (w, h) = self.canvas_size();
        self.flocks.update(self.clock.delta_seconds(), w, h, &mut rand::thread_rng());

        let palette = self.settings.biome.palette();
        let warmth = palette.glint_warmth(self.settings.elevation);
        let sun = procgen::sun_vector(self.settings.azimuth, self.settings.elevation);
        self.compositor.draw_overlay(&OverlayFrame {
            terrain: &self.shaded,
            water: &self.water,
            flocks: &self.flocks,
            time: self.clock.elapsed_seconds(),
            animate_water: self.settings.animate_water,
            sun,
            warmth,
        });
        self.compositor.present(self.surface.as_mut());
        self.stats.frames += 1;

        self.pending = Some(self.scheduler.request_frame());
    }

    /// Merge `patch` into the settings and run the rebuild tiers it needs.
    /// `interacting` lowers shadow quality while a control is being dragged.
    /// On error the previous settings stay in place, so the same patch can
    /// be retried.
    pub fn update_settings(&mut self, patch: SettingsPatch, interacting: bool) -> Result<(), EngineError> {
        if self.state == EngineState::Destroyed {
            log::debug!("settings update after destroy ignored");
            return Ok(());
        }
        let mut next = self.settings;
        let changes = next.apply(patch);

        if changes.terrain {
            let start = Instant::now();
            let terrain = self.build_terrain(&next, self.noise, self.seed, self.css_size)?;
            self.settings = next;
            self.interacting = interacting;
            self.install_terrain(terrain, start);
            return Ok(());
        }

        let quality_changed = self.interacting != interacting;
        self.settings = next;
        self.interacting = interacting;
        if changes.water {
            self.rebuild_water();
        }
        if changes.lighting || quality_changed {
            self.rebuild_shadow();
        }
        if changes.base || quality_changed {
            self.redraw_base();
        }
        Ok(())
    }

    /// Switch to a new terrain seed and rebuild everything.
    pub fn set_seed(&mut self, seed: u32) -> Result<(), EngineError> {
        if self.state == EngineState::Destroyed {
            return Ok(());
        }
        let start = Instant::now();
        let noise = NoiseField::new(seed);
        let terrain = self.build_terrain(&self.settings, noise, seed, self.css_size)?;
        self.seed = seed;
        self.noise = noise;
        self.install_terrain(terrain, start);
        Ok(())
    }

    /// The surface's container changed size. Ignored after destroy. On
    /// error the surface and layers keep their previous size.
    pub fn notify_resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        if self.state == EngineState::Destroyed {
            log::debug!("resize to {}x{} after destroy ignored", width, height);
            return Ok(());
        }
        let start = Instant::now();
        let css_size = (width.max(1), height.max(1));
        let terrain = self.build_terrain(&self.settings, self.noise, self.seed, css_size)?;
        self.css_size = css_size;
        let (dw, dh) = device_size(css_size, self.surface.device_pixel_ratio());
        self.surface.resize(dw, dh);
        self.compositor.resize(dw, dh, dw as f32 / css_size.0 as f32);
        self.install_terrain(terrain, start);
        Ok(())
    }

    /// Rebuild heights, river, mesh, shadows, water colors and the base.
    pub fn rebuild_all(&mut self) -> Result<(), EngineError> {
        if self.state == EngineState::Destroyed {
            return Ok(());
        }
        let start = Instant::now();
        let terrain = self.build_terrain(&self.settings, self.noise, self.seed, self.css_size)?;
        self.install_terrain(terrain, start);
        Ok(())
    }

    /// Stop animating and detach from the host. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }
        if let Some(mut observer) = self.resize_observer.take() {
            observer.disconnect();
        }
        self.flocks.clear();
        self.on_ready = None;
        self.state = EngineState::Destroyed;
        log::info!("backdrop destroyed after {} frames", self.stats.frames);
    }

    fn canvas_size(&self) -> (f32, f32) {
        (self.css_size.0 as f32, self.css_size.1 as f32)
    }

    fn build_terrain(
        &self,
        settings: &Settings,
        noise: NoiseField,
        seed: u32,
        css_size: (u32, u32),
    ) -> Result<Terrain, EngineError> {
        let (w, h) = (css_size.0 as f32, css_size.1 as f32);
        Terrain::build(settings, seed, noise, w, h, self.triangulator.as_ref())
    }

    /// Swap in freshly built terrain and rebuild every tier below it.
    fn install_terrain(&mut self, terrain: Terrain, start: Instant) {
        self.terrain = terrain;
        self.stats.terrain_builds += 1;
        self.rebuild_water();
        self.rebuild_shadow();
        self.redraw_base();
        log::debug!(
            "full rebuild: {} triangles in {:.1?}",
            self.terrain.triangles.len(),
            start.elapsed()
        );
    }

    fn rebuild_shadow(&mut self) {
        let (w, h) = self.canvas_size();
        let sun = procgen::sun_vector(self.settings.azimuth, self.settings.elevation);
        self.shadow = ShadowMap::build(&self.terrain.grid, w, h, sun, self.settings.softness, self.interacting);
        self.stats.shadow_builds += 1;
    }

    fn rebuild_water(&mut self) {
        self.water = WaterCache::build(
            self.settings.biome.palette(),
            self.settings.elevation,
            self.settings.glint_hsl(),
        );
        self.stats.water_builds += 1;
    }

    /// Shade every triangle and redraw the base layer.
    fn redraw_base(&mut self) {
        let lighting = Lighting::new(&self.settings);
        let (w, h) = self.canvas_size();
        let colors = ColorContext {
            palette: self.settings.biome.palette(),
            biome: self.settings.biome.def(),
            noise: &self.noise,
            min_dim: w.min(h),
        };
        self.shaded = shade_terrain(&self.terrain.triangles, &self.shadow, &lighting, &colors);
        self.compositor.draw_base(&self.shaded, &self.water);
        self.stats.base_draws += 1;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    /// Canvas size in CSS pixels.
    pub fn css_size(&self) -> (u32, u32) {
        self.css_size
    }

    pub fn triangles(&self) -> &[TriangleRecord] {
        &self.terrain.triangles
    }

    pub fn mesh(&self) -> &Mesh {
        &self.terrain.mesh
    }

    pub fn height_grid(&self) -> &HeightGrid {
        &self.terrain.grid
    }

    pub fn river(&self) -> &River {
        &self.terrain.river
    }

    pub fn shadow(&self) -> &ShadowMap {
        &self.shadow
    }

    pub fn water_cache(&self) -> &WaterCache {
        &self.water
    }

    pub fn flocks(&self) -> &FlockSim {
        &self.flocks
    }

    pub fn base_layer(&self) -> &Layer {
        self.compositor.base()
    }

    pub fn overlay_layer(&self) -> &Layer {
        self.compositor.overlay()
    }

    /// The last frame handed to the surface.
    pub fn frame_layer(&self) -> &Layer {
        self.compositor.frame()
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.pending
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}
