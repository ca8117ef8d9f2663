//! Ray-marched sun visibility on a coarse grid, blurred for soft edges.

use glam::{Vec2, Vec3};

use crate::heightfield::HeightGrid;

pub const MIN_SUN_ELEVATION: f32 = 5.0;
pub const MAX_SUN_ELEVATION: f32 = 85.0;
/// Cell size multiplier while the user is dragging a control.
pub const INTERACTING_QUALITY: f32 = 2.5;
/// Terrain must rise this many pixels above the ray to cast a shadow.
pub const SHADOW_BIAS_PX: f32 = 0.75;
pub const MAX_BLUR_RADIUS: i32 = 5;

/// Unit vector pointing at the sun. x is right, y is down the screen and z
/// is up out of the terrain; azimuth 0 is the top of the screen, clockwise.
pub fn sun_vector(azimuth_deg: f32, elevation_deg: f32) -> Vec3 {
    let az = azimuth_deg.to_radians();
    let el = elevation_deg
        .clamp(MIN_SUN_ELEVATION, MAX_SUN_ELEVATION)
        .to_radians();
    Vec3::new(el.cos() * az.sin(), -el.cos() * az.cos(), el.sin()).normalize()
}

/// Blur radius in cells for a softness in [0,1] at the given quality.
pub fn blur_radius(softness: f32, quality: f32) -> i32 {
    let softness = if softness.is_finite() { softness.clamp(0.0, 1.0) } else { 0.0 };
    let r = (1.0 + softness * 4.0).round().clamp(1.0, MAX_BLUR_RADIUS as f32);
    ((r / quality.max(1.0)).round() as i32).max(1)
}

/// Sun visibility per cell: 0 is lit, 1 is fully shadowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMap {
    pub cols: usize,
    pub rows: usize,
    /// Cell size in pixels.
    pub cell: f32,
    /// 1 at rest, `INTERACTING_QUALITY` while interacting.
    pub quality: f32,
    values: Vec<f32>,
}

impl ShadowMap {
    pub fn build(grid: &HeightGrid, width: f32, height: f32, sun: Vec3, softness: f32, interacting: bool) -> Self {
        let quality = if interacting { INTERACTING_QUALITY } else { 1.0 };
        let cell = grid.step * quality;
        let cols = (width / cell).ceil().max(1.0) as usize + 1;
        let rows = (height / cell).ceil().max(1.0) as usize + 1;

        let flat = Vec2::new(sun.x, sun.y);
        let horizontal = flat.length();
        let mut values = vec![0.0; cols * rows];

        if horizontal > 1e-5 {
            let dir = flat / horizontal;
            let rise = sun.z / horizontal;
            let march = grid.step;
            let ceiling = grid.max_px();
            for j in 0..rows {
                for i in 0..cols {
                    let origin = Vec2::new(i as f32 * cell, j as f32 * cell);
                    let z0 = grid.sample_px(origin.x, origin.y);
                    values[j * cols + i] = march_ray(grid, origin, z0, dir, rise, march, ceiling, width, height);
                }
            }
        }

        let radius = blur_radius(softness, quality);
        binomial_blur(&mut values, cols, rows, radius);

        log::debug!(
            "shadow map {}x{} cell {:.1}px blur radius {}",
            cols,
            rows,
            cell,
            radius
        );

        Self {
            cols,
            rows,
            cell,
            quality,
            values,
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Bilinear shadow value at a canvas point.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let gx = (x / self.cell).clamp(0.0, (self.cols - 1) as f32);
        let gy = (y / self.cell).clamp(0.0, (self.rows - 1) as f32);
        let x0 = gx.floor() as usize;
        let y0 = gy.floor() as usize;
        let x1 = (x0 + 1).min(self.cols - 1);
        let y1 = (y0 + 1).min(self.rows - 1);
        let fx = gx - x0 as f32;
        let fy = gy - y0 as f32;

        let at = |i: usize, j: usize| self.values[j * self.cols + i];
        let top = at(x0, y0) + (at(x1, y0) - at(x0, y0)) * fx;
        let bottom = at(x0, y1) + (at(x1, y1) - at(x0, y1)) * fx;
        (top + (bottom - top) * fy).clamp(0.0, 1.0)
    }
}

#[allow(clippy::too_many_arguments)]
fn march_ray(
    grid: &HeightGrid,
    origin: Vec2,
    z0: f32,
    dir: Vec2,
    rise: f32,
    step: f32,
    ceiling: f32,
    width: f32,
    height: f32,
) -> f32 {
    let mut d = step;
    loop {
        let p = origin + dir * d;
        if p.x < 0.0 || p.y < 0.0 || p.x > width || p.y > height {
            return 0.0;
        }
        let ray_z = z0 + d * rise;
        if ray_z > ceiling {
            return 0.0;
        }
        if grid.sample_px(p.x, p.y) > ray_z + SHADOW_BIAS_PX {
            return 1.0;
        }
        d += step;
    }
}

fn binomial_kernel(radius: i32) -> Vec<f32> {
    let n = (2 * radius) as usize;
    let mut row = vec![1.0f32; n + 1];
    for k in 1..n {
        row[k] = row[k - 1] * (n - k + 1) as f32 / k as f32;
    }
    let sum: f32 = row.iter().sum();
    row.iter().map(|w| w / sum).collect()
}

/// Horizontal then vertical pass with edge clamping.
fn binomial_blur(values: &mut [f32], cols: usize, rows: usize, radius: i32) {
    let kernel = binomial_kernel(radius);
    let mut scratch = vec![0.0f32; values.len()];

    for j in 0..rows {
        for i in 0..cols {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let x = (i as i32 + k as i32 - radius).clamp(0, cols as i32 - 1) as usize;
                acc += w * values[j * cols + x];
            }
            scratch[j * cols + i] = acc;
        }
    }
    for j in 0..rows {
        for i in 0..cols {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let y = (j as i32 + k as i32 - radius).clamp(0, rows as i32 - 1) as usize;
                acc += w * scratch[y * cols + i];
            }
            values[j * cols + i] = acc.clamp(0.0, 1.0);
        }
    }
}
