//! Offscreen layers and the per-frame composite.
//!
//! The base layer holds the lit land plus a still water tone and only
//! changes on rebuilds. The overlay is cleared and redrawn every frame with
//! shimmering water, the sun-edge bloom and birds. Presenting always draws
//! base then overlay.

use engine_core::Surface;
use glam::{Vec2, Vec3};
use renderer::{Hsl, Layer, Rgba};

use crate::flock::FlockSim;
use crate::shading::ShadedTerrain;
use crate::water::WaterCache;

/// Seam-hiding stroke width in CSS pixels.
pub const SEAM_STROKE: f32 = 0.8;
/// Brightness swing of each shimmer wave.
pub const SHIMMER_AMPLITUDE: (f32, f32) = (0.06, 0.035);
/// Spatial frequency of each wave, radians per CSS pixel along (x, y).
pub const SHIMMER_WAVE: [Vec2; 2] = [Vec2::new(0.045, 0.11), Vec2::new(-0.07, 0.05)];
/// Temporal frequency of each wave, radians per second.
pub const SHIMMER_SPEED: (f32, f32) = (1.3, 2.1);
/// Bloom reach from the sunward edge, as a fraction of the canvas diagonal.
pub const BLOOM_REACH: f32 = 0.55;
pub const BLOOM_ALPHA: f32 = 0.22;
pub const BIRD_COLOR: Rgba = Rgba::new(28, 30, 36, 210);
/// Half wingspan in CSS pixels at bird scale 1.
pub const BIRD_WINGSPAN: f32 = 5.0;

/// Inputs for one overlay redraw.
pub struct OverlayFrame<'a> {
    pub terrain: &'a ShadedTerrain,
    pub water: &'a WaterCache,
    pub flocks: &'a FlockSim,
    /// Seconds since the animation started.
    pub time: f32,
    pub animate_water: bool,
    pub sun: Vec3,
    /// 0 with a high sun, 1 with a low one.
    pub warmth: f32,
}

#[derive(Debug, Clone)]
pub struct Compositor {
    base: Layer,
    overlay: Layer,
    frame: Layer,
    /// Device pixels per CSS pixel.
    scale: f32,
}

impl Compositor {
    pub fn new(width: u32, height: u32, scale: f32) -> Self {
        Self {
            base: Layer::new(width, height),
            overlay: Layer::new(width, height),
            frame: Layer::new(width, height),
            scale,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32, scale: f32) {
        self.base.resize(width, height);
        self.overlay.resize(width, height);
        self.frame.resize(width, height);
        self.scale = scale;
    }

    pub fn base(&self) -> &Layer {
        &self.base
    }

    pub fn overlay(&self) -> &Layer {
        &self.overlay
    }

    /// The last composited frame.
    pub fn frame(&self) -> &Layer {
        &self.frame
    }

    fn to_device(&self, path: [Vec2; 3]) -> [Vec2; 3] {
        path.map(|p| p * self.scale)
    }

    fn fill(layer: &mut Layer, [a, b, c]: [Vec2; 3], color: Rgba, stroke: f32) {
        layer.fill_triangle(a, b, c, color);
        layer.stroke_triangle(a, b, c, stroke, color);
    }

    /// Redraw the static base layer.
    pub fn draw_base(&mut self, terrain: &ShadedTerrain, water: &WaterCache) {
        self.base.clear(Rgba::BLACK);
        let stroke = SEAM_STROKE * self.scale;
        for tri in &terrain.land {
            let path = self.to_device(tri.path);
            Self::fill(&mut self.base, path, tri.color, stroke);
        }
        for tri in &terrain.water {
            let path = self.to_device(tri.path);
            Self::fill(&mut self.base, path, water.color(tri.brightness), stroke);
        }
    }

    /// Redraw the animated overlay.
    pub fn draw_overlay(&mut self, frame: &OverlayFrame<'_>) {
        self.overlay.clear(Rgba::TRANSPARENT);
        if frame.animate_water {
            self.draw_water(frame);
        }
        self.draw_bloom(frame.sun, frame.water.glint(), frame.warmth);
        self.draw_birds(frame.flocks);
    }

    fn draw_water(&mut self, frame: &OverlayFrame<'_>) {
        let stroke = SEAM_STROKE * self.scale;
        let t = frame.time;
        for tri in &frame.terrain.water {
            let c = tri.centroid;
            let wave = SHIMMER_AMPLITUDE.0 * (c.dot(SHIMMER_WAVE[0]) + t * SHIMMER_SPEED.0).sin()
                + SHIMMER_AMPLITUDE.1 * (c.dot(SHIMMER_WAVE[1]) - t * SHIMMER_SPEED.1).sin();
            let color = frame.water.color(tri.brightness + wave);
            let path = self.to_device(tri.path);
            Self::fill(&mut self.overlay, path, color, stroke);
        }
    }

    /// Soft glow from the canvas edge the sun sits beyond.
    fn draw_bloom(&mut self, sun: Vec3, glint: Hsl, warmth: f32) {
        let Some(bearing) = Vec2::new(sun.x, sun.y).try_normalize() else {
            return;
        };
        let size = Vec2::new(self.overlay.width() as f32, self.overlay.height() as f32);
        let center = size * 0.5;
        // Where the sun bearing leaves the canvas.
        let reach_x = if bearing.x.abs() > 1e-6 { center.x / bearing.x.abs() } else { f32::INFINITY };
        let reach_y = if bearing.y.abs() > 1e-6 { center.y / bearing.y.abs() } else { f32::INFINITY };
        let edge = center + bearing * reach_x.min(reach_y);
        let inward = edge - bearing * size.length() * BLOOM_REACH;

        let alpha = BLOOM_ALPHA * (0.55 + 0.45 * warmth.clamp(0.0, 1.0));
        let rgb = glint.to_rgb();
        self.overlay.fill_linear_gradient(
            edge,
            inward,
            &[
                (0.0, Rgba::from_rgba(rgb, alpha)),
                (0.35, Rgba::from_rgba(rgb, alpha * 0.35)),
                (1.0, Rgba::from_rgba(rgb, 0.0)),
            ],
        );
    }

    fn draw_birds(&mut self, flocks: &FlockSim) {
        let width = (1.1 * self.scale).max(0.75);
        for bird in flocks.flocks.iter().flat_map(|f| &f.birds) {
            let body = bird.pos * self.scale;
            let forward = Vec2::from_angle(bird.heading);
            let side = forward.perp();
            let span = BIRD_WINGSPAN * bird.scale * self.scale;
            // Screen y grows downward, so raised wings have smaller y.
            let lift = Vec2::new(0.0, -bird.wing() * span * 0.6);
            let sweep = -forward * span * 0.35;
            let left = body + side * span + sweep + lift;
            let right = body - side * span + sweep + lift;
            self.overlay.stroke_line(left, body, width, BIRD_COLOR);
            self.overlay.stroke_line(body, right, width, BIRD_COLOR);
        }
    }

    /// Composite base then overlay and hand the result to the surface.
    pub fn present(&mut self, surface: &mut dyn Surface) {
        self.frame.clone_from(&self.base);
        self.frame.draw_layer(&self.overlay);
        surface.present(self.frame.width(), self.frame.height(), self.frame.as_bytes());
    }
}
