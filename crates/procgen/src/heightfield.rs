//! Elevation model and the sampled height grid.
//!
//! [`HeightModel`] is the continuous elevation function: fractal noise,
//! optional dunes, Gaussian mountain bumps, the river valley and a little
//! roughness. [`HeightGrid`] samples it once per rebuild at a resolution
//! independent of the render mesh and serves bilinear lookups to the river
//! carver, the mesh shoreline snap, the triangle cache and the shadow map.

use glam::Vec2;

use crate::biome::{BiomeDef, BiomeKind};
use crate::noise_field::NoiseField;
use crate::river::River;
use crate::rng::{SeededRng, MOUNTAIN_SALT};

/// Height grid step is the shorter canvas side over this many cells.
pub const GRID_DIVISIONS: f32 = 220.0;
/// Grid step never drops below this many pixels.
pub const MIN_GRID_STEP: f32 = 2.0;
/// Mountains are centered inside this central fraction of the canvas.
pub const MOUNTAIN_CENTER_SPAN: f32 = 0.7;

// Noise-space offsets that keep the sub-features from sampling the same
// region of the field as the base height.
const DUNE_OFFSET: Vec2 = Vec2::new(311.7, -127.9);
const ROUGH_OFFSET: Vec2 = Vec2::new(-521.3, 91.7);

/// A Gaussian elevation bump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mountain {
    pub center: Vec2,
    /// Gaussian sigma in pixels.
    pub radius: f32,
    pub amplitude: f32,
}

/// Place the biome's mountains for `seed` on a `width x height` canvas.
/// Biomes without a mountain rule get none.
pub fn place_mountains(def: &BiomeDef, seed: u32, width: f32, height: f32) -> Vec<Mountain> {
    let Some(rule) = def.mountains else {
        return Vec::new();
    };
    let mut rng = SeededRng::for_feature(seed, MOUNTAIN_SALT);
    let min_dim = width.min(height);
    let margin = (1.0 - MOUNTAIN_CENTER_SPAN) * 0.5;
    let count = rng.range_u32(rule.count.0, rule.count.1);

    (0..count)
        .map(|_| {
            let x = width * (margin + rng.next_f32() * MOUNTAIN_CENTER_SPAN);
            let y = height * (margin + rng.next_f32() * MOUNTAIN_CENTER_SPAN);
            let radius = rng.range(rule.radius.0, rule.radius.1) * min_dim;
            let amplitude = rng.range(rule.amplitude.0, rule.amplitude.1);
            Mountain {
                center: Vec2::new(x, y),
                radius: radius.max(1.0),
                amplitude,
            }
        })
        .collect()
}

/// Continuous elevation function for one biome, seed and canvas size.
#[derive(Debug, Clone)]
pub struct HeightModel {
    biome: &'static BiomeDef,
    noise: NoiseField,
    width: f32,
    height: f32,
    min_dim: f32,
    zoom: f32,
    mountains: Vec<Mountain>,
    /// Bumps are divided by this so stacked mountains stay in range.
    bump_norm: f32,
}

impl HeightModel {
    pub fn new(kind: BiomeKind, noise: NoiseField, width: f32, height: f32, zoom: f32) -> Self {
        let biome = kind.def();
        let mountains = place_mountains(biome, noise.seed(), width, height);
        let bump_norm = (mountains.len().max(1) as f32).sqrt();
        Self {
            biome,
            noise,
            width,
            height,
            min_dim: width.min(height).max(1.0),
            zoom: if zoom.is_finite() && zoom > 0.05 { zoom } else { 0.05 },
            mountains,
            bump_norm,
        }
    }

    pub fn biome(&self) -> &'static BiomeDef {
        self.biome
    }

    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    pub fn mountains(&self) -> &[Mountain] {
        &self.mountains
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Pixels of vertical relief for a normalized elevation of 1.
    pub fn pixel_scale(&self) -> f32 {
        self.biome.height_scale * self.min_dim
    }

    /// Canvas pixels to noise space (one unit = shorter side at zoom 1).
    #[inline]
    fn to_noise(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y) / (self.min_dim * self.zoom)
    }

    /// Fractal noise elevation with optional dunes, in [0, 1].
    pub fn base_height(&self, x: f32, y: f32) -> f32 {
        let p = self.to_noise(x, y);
        let hn = &self.biome.height_noise;
        let q = p * hn.scale;
        let fbm = self.noise.fbm(q.x, q.y, hn.octaves, hn.persistence, hn.lacunarity);
        let mut h = fbm * 0.5 + 0.5;

        if let Some(d) = self.biome.dunes {
            let dq = Vec2::new(p.x * d.scale, p.y * d.scale * d.stretch) + DUNE_OFFSET;
            let n = self.noise.sample01(dq.x, dq.y);
            let shaped = n.clamp(0.0, 1.0).powf(d.sharpness);
            h += (shaped - h) * d.mix;
        }

        h.clamp(0.0, 1.0)
    }

    /// Sum of Gaussian mountain bumps at (x, y).
    pub fn mountain_height(&self, x: f32, y: f32) -> f32 {
        let p = Vec2::new(x, y);
        self.mountains
            .iter()
            .map(|m| {
                let d2 = p.distance_squared(m.center);
                m.amplitude / self.bump_norm * (-d2 / (2.0 * m.radius * m.radius)).exp()
            })
            .sum()
    }

    /// Signed small-amplitude roughness.
    pub fn roughness(&self, x: f32, y: f32) -> f32 {
        let Some(r) = self.biome.rough else {
            return 0.0;
        };
        let q = self.to_noise(x, y) * r.scale + ROUGH_OFFSET;
        self.noise.sample(q.x, q.y) * r.amp
    }

    /// Elevation without the river's own valley. The river walk steers by
    /// this so it never reacts to its own carve.
    pub fn height_no_river01(&self, x: f32, y: f32) -> f32 {
        (self.base_height(x, y) + self.mountain_height(x, y) + self.roughness(x, y)).clamp(0.0, 1.0)
    }

    /// Canonical elevation in [0, 1].
    pub fn height01(&self, x: f32, y: f32, river: &River) -> f32 {
        (self.base_height(x, y) + self.mountain_height(x, y) - river.valley_at(x, y) + self.roughness(x, y))
            .clamp(0.0, 1.0)
    }
}

/// Elevation sampled on a regular grid covering the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    pub step: f32,
    pub cols: usize,
    pub rows: usize,
    pub width: f32,
    pub height: f32,
    /// Pixels of relief per unit of normalized elevation.
    pub px_scale: f32,
    values01: Vec<f32>,
    values_px: Vec<f32>,
    max01: f32,
}

impl HeightGrid {
    /// Grid step for a canvas.
    pub fn step_for(width: f32, height: f32) -> f32 {
        (width.min(height) / GRID_DIVISIONS).max(MIN_GRID_STEP)
    }

    /// Sample `elevation01` at every grid node. The grid has one extra row
    /// and column so the far canvas edges are covered.
    pub fn build(width: f32, height: f32, px_scale: f32, elevation01: impl Fn(f32, f32) -> f32) -> Self {
        let step = Self::step_for(width, height);
        let cols = (width / step).ceil().max(1.0) as usize + 1;
        let rows = (height / step).ceil().max(1.0) as usize + 1;

        let mut values01 = Vec::with_capacity(cols * rows);
        for j in 0..rows {
            let y = j as f32 * step;
            for i in 0..cols {
                values01.push(elevation01(i as f32 * step, y).clamp(0.0, 1.0));
            }
        }
        let values_px = values01.iter().map(|v| v * px_scale).collect();
        let max01 = values01.iter().copied().fold(0.0f32, f32::max);

        Self {
            step,
            cols,
            rows,
            width,
            height,
            px_scale,
            values01,
            values_px,
            max01,
        }
    }

    /// Highest normalized elevation on the grid.
    pub fn max01(&self) -> f32 {
        self.max01
    }

    /// Highest elevation in pixels.
    pub fn max_px(&self) -> f32 {
        self.max01 * self.px_scale
    }

    /// Bilinear normalized elevation at any canvas point (clamped to edges).
    pub fn sample01(&self, x: f32, y: f32) -> f32 {
        self.bilinear(&self.values01, x, y)
    }

    /// Bilinear elevation in pixels.
    pub fn sample_px(&self, x: f32, y: f32) -> f32 {
        self.bilinear(&self.values_px, x, y)
    }

    /// Central-difference gradient of the normalized elevation, per pixel.
    pub fn gradient01(&self, x: f32, y: f32) -> Vec2 {
        let e = self.step;
        Vec2::new(
            (self.sample01(x + e, y) - self.sample01(x - e, y)) / (2.0 * e),
            (self.sample01(x, y + e) - self.sample01(x, y - e)) / (2.0 * e),
        )
    }

    fn bilinear(&self, values: &[f32], x: f32, y: f32) -> f32 {
        let gx = (x / self.step).clamp(0.0, (self.cols - 1) as f32);
        let gy = (y / self.step).clamp(0.0, (self.rows - 1) as f32);
        let x0 = (gx.floor() as usize).min(self.cols.saturating_sub(2));
        let y0 = (gy.floor() as usize).min(self.rows.saturating_sub(2));
        let x1 = (x0 + 1).min(self.cols - 1);
        let y1 = (y0 + 1).min(self.rows - 1);
        let fx = (gx - x0 as f32).clamp(0.0, 1.0);
        let fy = (gy - y0 as f32).clamp(0.0, 1.0);

        let h00 = values[y0 * self.cols + x0];
        let h10 = values[y0 * self.cols + x1];
        let h01 = values[y1 * self.cols + x0];
        let h11 = values[y1 * self.cols + x1];
        let top = h00 + (h10 - h00) * fx;
        let bottom = h01 + (h11 - h01) * fx;
        top + (bottom - top) * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::ALL_BIOMES;

    fn model(kind: BiomeKind, seed: u32) -> HeightModel {
        HeightModel::new(kind, NoiseField::new(seed), 300.0, 180.0, 1.0)
    }

    #[test]
    fn base_height_in_unit_range() {
        for kind in ALL_BIOMES {
            for seed in [0, 42, 9999] {
                let m = model(kind, seed);
                for i in 0..400 {
                    let x = (i as f32 * 37.3) % 900.0 - 300.0;
                    let y = (i as f32 * 53.9) % 700.0 - 250.0;
                    let h = m.base_height(x, y);
                    assert!((0.0..=1.0).contains(&h), "{:?} seed {} ({x},{y}) -> {h}", kind, seed);
                }
            }
        }
    }

    #[test]
    fn composed_height_clamped_with_stacked_mountains() {
        let mut m = model(BiomeKind::Alpine, 5);
        // Pile extra bumps on one spot to force overshoot before the clamp.
        m.mountains = (0..8)
            .map(|_| Mountain {
                center: Vec2::new(150.0, 90.0),
                radius: 40.0,
                amplitude: 0.9,
            })
            .collect();
        let river = River::disabled(300.0);
        for j in 0..30 {
            for i in 0..50 {
                let h = m.height01(i as f32 * 6.0, j as f32 * 6.0, &river);
                assert!((0.0..=1.0).contains(&h));
            }
        }
        assert_eq!(m.height01(150.0, 90.0, &river), 1.0);
    }

    #[test]
    fn mountains_land_in_central_span() {
        let def = BiomeKind::Mountainous.def();
        let rule = def.mountains.unwrap();
        for seed in 0..20 {
            let ms = place_mountains(def, seed, 400.0, 200.0);
            assert!(ms.len() as u32 >= rule.count.0 && ms.len() as u32 <= rule.count.1);
            for m in ms {
                assert!(m.center.x >= 400.0 * 0.15 - 1e-3 && m.center.x <= 400.0 * 0.85 + 1e-3);
                assert!(m.center.y >= 200.0 * 0.15 - 1e-3 && m.center.y <= 200.0 * 0.85 + 1e-3);
            }
        }
        assert!(place_mountains(BiomeKind::Desert.def(), 1, 400.0, 200.0).is_empty());
    }

    #[test]
    fn grid_covers_canvas_and_interpolates_nodes() {
        let m = model(BiomeKind::Meadow, 77);
        let grid = HeightGrid::build(300.0, 180.0, m.pixel_scale(), |x, y| m.height_no_river01(x, y));
        assert_eq!(grid.step, 2.0);
        assert!((grid.cols - 1) as f32 * grid.step >= 300.0);
        assert!((grid.rows - 1) as f32 * grid.step >= 180.0);

        let node = m.height_no_river01(20.0, 40.0);
        assert!((grid.sample01(20.0, 40.0) - node).abs() < 1e-5);
        assert!((grid.sample_px(20.0, 40.0) - node * m.pixel_scale()).abs() < 1e-3);

        // Outside the canvas clamps to the edge.
        assert_eq!(grid.sample01(-50.0, 0.0), grid.sample01(0.0, 0.0));
    }

    #[test]
    fn grid_step_has_floor() {
        assert_eq!(HeightGrid::step_for(100.0, 100.0), MIN_GRID_STEP);
        assert!((HeightGrid::step_for(2200.0, 1100.0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn same_seed_same_grid() {
        let a = model(BiomeKind::Mountainous, 42);
        let b = model(BiomeKind::Mountainous, 42);
        let ga = HeightGrid::build(300.0, 180.0, a.pixel_scale(), |x, y| a.height_no_river01(x, y));
        let gb = HeightGrid::build(300.0, 180.0, b.pixel_scale(), |x, y| b.height_no_river01(x, y));
        assert_eq!(ga, gb);
    }
}
