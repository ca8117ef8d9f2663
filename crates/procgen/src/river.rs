//! River and lake carving.
//!
//! The river runs from the top edge to the bottom edge. Its centerline comes
//! from an explicit walk that follows a noisy meander while being pushed
//! downhill and away from mountains, then gets smoothed and fit with a
//! monotone cubic so `center(y)` is C1 between sample rows. Width is a
//! noisy base inflated on bends and at up to two lakes placed on flat
//! ground.

use glam::Vec2;

use crate::heightfield::{HeightGrid, HeightModel};
use crate::rng::{SeededRng, LAKE_SALT, RIVER_SALT};

/// Walk resolution: one step per this fraction of a grid step.
pub const WALK_STEP_FRAC: f32 = 0.35;
pub const MIN_WALK_STEPS: usize = 220;
/// Downhill pull per unit of lateral slope.
pub const DOWNHILL_GAIN: f32 = 10.0;
const DOWNHILL_STEP_SCALE: f32 = 0.1;
/// Push away from mountain centers, in walk steps.
pub const REPEL_GAIN: f32 = 1.5;
/// Pull back toward the noise meander, per step.
pub const SPRING_GAIN: f32 = 0.08;
/// Largest lateral move per walk step, in walk steps.
pub const MAX_STEP_FRAC: f32 = 0.9;
/// Elevation above which the walk searches sideways for lower ground.
pub const HIGH_GROUND_CUTOFF: f32 = 0.74;
/// Lateral search reach as a fraction of canvas width.
pub const SEARCH_RADIUS_FRAC: f32 = 0.12;
/// Weights of the slow and fast meanders.
pub const MEANDER_MIX: (f32, f32) = (0.6, 0.4);
/// Lateral margin kept free during the walk, as a fraction of the width.
pub const EDGE_MARGIN_FRAC: f32 = 0.04;
const SMOOTH_PASSES: usize = 3;
const SMOOTH_RADIUS: usize = 2;
const WIDTH_NOISE_AMP: f32 = 0.35;
const CURVE_INFLATE: f32 = 0.5;
pub const MAX_LAKES: usize = 2;
/// Lakes stay out of the first and last stretch of the path.
pub const LAKE_EDGE_EXCLUSION: f32 = 0.08;
/// Minimum along-path distance between lakes.
pub const LAKE_MIN_SEPARATION: f32 = 0.22;
const LAKE_SPREAD: f32 = 0.03;
const LAKE_SEARCH_WINDOW: usize = 3;
/// Minimum river half-width as a fraction of mesh spacing.
pub const MIN_WIDTH_SPACING_FRAC: f32 = 0.45;

/// A carved river, or a disabled placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct River {
    enabled: bool,
    width: f32,
    /// Row spacing of the sampled path.
    dy: f32,
    xs: Vec<f32>,
    slopes: Vec<f32>,
    /// Half-widths per row.
    widths: Vec<f32>,
    valley_depth: f32,
    valley_spread: f32,
    min_width: f32,
    /// Along-path positions (0..1) of lake centers.
    lakes: Vec<f32>,
}

impl River {
    /// A river that is never there.
    pub fn disabled(width: f32) -> Self {
        Self {
            enabled: false,
            width,
            dy: 1.0,
            xs: Vec::new(),
            slopes: Vec::new(),
            widths: Vec::new(),
            valley_depth: 0.0,
            valley_spread: 1.0,
            min_width: 0.0,
            lakes: Vec::new(),
        }
    }

    /// Minimum half-width for a mesh with point `spacing`.
    pub fn min_width_for(spacing: f32) -> f32 {
        (spacing * MIN_WIDTH_SPACING_FRAC).max(2.0)
    }

    /// Carve the river for `model`'s biome. `grid` must hold the elevation
    /// without any river valley.
    pub fn carve(model: &HeightModel, grid: &HeightGrid, seed: u32, min_width: f32) -> Self {
        let (w, h) = (model.width(), model.height());
        let Some(rule) = model.biome().river else {
            return Self::disabled(w);
        };
        let mut rng = SeededRng::for_feature(seed, RIVER_SALT);
        if rng.next_f32() >= rule.chance {
            log::debug!("river chance roll failed for seed {}", seed);
            return Self::disabled(w);
        }

        let noise = model.noise();
        let min_dim = w.min(h).max(1.0);
        let margin = w * EDGE_MARGIN_FRAC;
        let offset = w * (0.3 + 0.4 * rng.next_f32());
        let phase_slow = rng.range(0.0, 100.0);
        let phase_fast = rng.range(0.0, 100.0);
        let phase_width = rng.range(0.0, 100.0);
        let base_x = |y: f32| {
            let v = y / min_dim;
            let fx = noise.sample(v * 1.3 + phase_slow, 17.0 + phase_slow);
            let gx = noise.sample(v * 3.7 + phase_fast, -41.0 - phase_fast);
            let meander = MEANDER_MIX.0 * fx + MEANDER_MIX.1 * gx;
            (offset + w * rule.meander * meander).clamp(margin, (w - margin).max(margin))
        };

        let steps = ((h / (WALK_STEP_FRAC * grid.step)).ceil() as usize).max(MIN_WALK_STEPS);
        let dy = h / (steps - 1) as f32;
        let mut xs = walk(model, grid, &base_x, steps, dy, margin);

        for _ in 0..SMOOTH_PASSES {
            box_blur(&mut xs, SMOOTH_RADIUS);
        }
        for x in xs.iter_mut() {
            *x = x.clamp(0.0, w);
        }
        let slopes = monotone_slopes(&xs, dy);

        // Width profile.
        let base_width = rng.range(rule.width.0, rule.width.1) * min_dim;
        let mut widths: Vec<f32> = (0..steps)
            .map(|i| {
                let v = i as f32 * dy / min_dim;
                base_width * (1.0 + WIDTH_NOISE_AMP * noise.sample(v * 2.3 + phase_width, 88.0))
            })
            .collect();
        let curvature: Vec<f32> = (0..steps)
            .map(|i| {
                if i == 0 || i + 1 == steps {
                    0.0
                } else {
                    (xs[i + 1] - 2.0 * xs[i] + xs[i - 1]).abs()
                }
            })
            .collect();
        let max_curve = curvature.iter().copied().fold(0.0f32, f32::max);
        if max_curve > 1e-6 {
            for (wi, c) in widths.iter_mut().zip(&curvature) {
                *wi *= 1.0 + CURVE_INFLATE * c / max_curve;
            }
        }

        let mut lake_rng = SeededRng::for_feature(seed, LAKE_SALT);
        let wanted = (0..MAX_LAKES).filter(|_| lake_rng.next_f32() < rule.lake_chance).count();
        let lakes = place_lakes(grid, &xs, dy, wanted);
        for &t_lake in &lakes {
            let size = lake_rng.range(rule.lake_size.0, rule.lake_size.1) * base_width;
            for (i, wi) in widths.iter_mut().enumerate() {
                let t = i as f32 / (steps - 1) as f32;
                let d = t - t_lake;
                *wi += size * (-(d * d) / (2.0 * LAKE_SPREAD * LAKE_SPREAD)).exp();
            }
        }

        for _ in 0..2 {
            box_blur(&mut widths, 3);
        }
        for wi in widths.iter_mut() {
            *wi = wi.max(min_width);
        }

        log::debug!(
            "river carved: {} rows, base width {:.1}px, {} lake(s)",
            steps,
            base_width,
            lakes.len()
        );

        Self {
            enabled: true,
            width: w,
            dy,
            xs,
            slopes,
            widths,
            valley_depth: rule.valley_depth,
            valley_spread: rule.valley_spread,
            min_width,
            lakes,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn valley_depth(&self) -> f32 {
        self.valley_depth
    }

    pub fn min_width(&self) -> f32 {
        self.min_width
    }

    /// Along-path positions (0..1) of the lakes.
    pub fn lakes(&self) -> &[f32] {
        &self.lakes
    }

    /// Centerline x at row `y`. Disabled rivers report the canvas middle.
    pub fn center(&self, y: f32) -> f32 {
        if !self.enabled || self.xs.len() < 2 {
            return self.width * 0.5;
        }
        let n = self.xs.len();
        let t = (y / self.dy).clamp(0.0, (n - 1) as f32);
        let k = (t.floor() as usize).min(n - 2);
        let s = t - k as f32;
        let (s2, s3) = (s * s, s * s * s);
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        let x = h00 * self.xs[k]
            + h10 * self.dy * self.slopes[k]
            + h01 * self.xs[k + 1]
            + h11 * self.dy * self.slopes[k + 1];
        x.clamp(0.0, self.width)
    }

    /// Half-width at row `y`. Zero when disabled.
    pub fn width_at(&self, y: f32) -> f32 {
        if !self.enabled || self.widths.is_empty() {
            return 0.0;
        }
        let n = self.widths.len();
        let t = (y / self.dy).clamp(0.0, (n - 1) as f32);
        let k = (t.floor() as usize).min(n.saturating_sub(2));
        let k1 = (k + 1).min(n - 1);
        let s = t - k as f32;
        self.widths[k] + (self.widths[k1] - self.widths[k]) * s
    }

    /// Depth of the valley carve at a point.
    pub fn valley_at(&self, x: f32, y: f32) -> f32 {
        if !self.enabled || self.valley_depth <= 0.0 {
            return 0.0;
        }
        let dx = x - self.center(y);
        let sigma = (self.width_at(y) * self.valley_spread).max(1.0);
        self.valley_depth * (-(dx * dx) / (2.0 * sigma * sigma)).exp()
    }

    /// Whether `p` lies within `frac` half-widths of the centerline.
    pub fn covers(&self, p: Vec2, frac: f32) -> bool {
        self.enabled && (p.x - self.center(p.y)).abs() <= frac * self.width_at(p.y)
    }
}

fn walk(
    model: &HeightModel,
    grid: &HeightGrid,
    base_x: &impl Fn(f32) -> f32,
    steps: usize,
    dy: f32,
    margin: f32,
) -> Vec<f32> {
    let w = model.width();
    let min_dim = w.min(model.height()).max(1.0);
    let max_step = dy * MAX_STEP_FRAC;
    let hi = (w - margin).max(margin);

    let mut x = base_x(0.0);
    let mut xs = Vec::with_capacity(steps);
    xs.push(x);

    for i in 1..steps {
        let y = i as f32 * dy;

        let slope = grid.gradient01(x, y).x * min_dim;
        let down = (-slope * DOWNHILL_GAIN * DOWNHILL_STEP_SCALE * dy).clamp(-max_step, max_step);

        let repel: f32 = model
            .mountains()
            .iter()
            .map(|m| {
                let d = Vec2::new(x, y) - m.center;
                let reach = m.radius * 2.0;
                let dist = d.length();
                if dist < reach {
                    let side = if d.x >= 0.0 { 1.0 } else { -1.0 };
                    side * (1.0 - dist / reach) * REPEL_GAIN * dy
                } else {
                    0.0
                }
            })
            .sum::<f32>()
            .clamp(-max_step, max_step);

        let spring = ((base_x(y) - x) * SPRING_GAIN).clamp(-max_step, max_step);

        x = (x + (down + repel + spring).clamp(-max_step, max_step)).clamp(margin, hi);

        if grid.sample01(x, y) > HIGH_GROUND_CUTOFF {
            x = seek_lower_ground(grid, x, y, w * SEARCH_RADIUS_FRAC, margin, hi);
        }
        xs.push(x);
    }
    xs
}

/// Nearest point on row `y` below the cutoff within `reach`, else the
/// lowest point seen.
fn seek_lower_ground(grid: &HeightGrid, x: f32, y: f32, reach: f32, lo: f32, hi: f32) -> f32 {
    let mut best = (x, grid.sample01(x, y));
    let probes = (reach / grid.step).ceil() as usize;
    for k in 1..=probes {
        for dir in [-1.0f32, 1.0] {
            let xc = (x + dir * k as f32 * grid.step).clamp(lo, hi);
            let hc = grid.sample01(xc, y);
            if hc < HIGH_GROUND_CUTOFF {
                return xc;
            }
            if hc < best.1 {
                best = (xc, hc);
            }
        }
    }
    best.0
}

/// In-place box blur with clamped ends.
fn box_blur(values: &mut [f32], radius: usize) {
    let n = values.len();
    if n < 3 || radius == 0 {
        return;
    }
    let src = values.to_vec();
    for (i, v) in values.iter_mut().enumerate() {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius).min(n - 1);
        let sum: f32 = src[lo..=hi].iter().sum();
        *v = sum / (hi - lo + 1) as f32;
    }
}

/// Fritsch–Carlson tangents for uniformly spaced samples.
fn monotone_slopes(xs: &[f32], dy: f32) -> Vec<f32> {
    let n = xs.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let secants: Vec<f32> = xs.windows(2).map(|p| (p[1] - p[0]) / dy).collect();
    let mut m = vec![0.0; n];
    m[0] = secants[0];
    m[n - 1] = secants[n - 2];
    for k in 1..n - 1 {
        let (a, b) = (secants[k - 1], secants[k]);
        m[k] = if a * b <= 0.0 { 0.0 } else { (a + b) * 0.5 };
    }
    for k in 0..n - 1 {
        let d = secants[k];
        if d.abs() < 1e-12 {
            m[k] = 0.0;
            m[k + 1] = 0.0;
            continue;
        }
        let a = m[k] / d;
        let b = m[k + 1] / d;
        // Tangents pointing against the secant would overshoot.
        if a < 0.0 {
            m[k] = 0.0;
        }
        if b < 0.0 {
            m[k + 1] = 0.0;
        }
        let (a, b) = (m[k] / d, m[k + 1] / d);
        let s = a * a + b * b;
        if s > 9.0 {
            let t = 3.0 / s.sqrt();
            m[k] = t * a * d;
            m[k + 1] = t * b * d;
        }
    }
    m
}

/// Pick up to `wanted` lake positions (0..1 along the path) at rows where
/// the ground is locally flattest.
fn place_lakes(grid: &HeightGrid, xs: &[f32], dy: f32, wanted: usize) -> Vec<f32> {
    let n = xs.len();
    if wanted == 0 || n < 2 * LAKE_SEARCH_WINDOW + 1 {
        return Vec::new();
    }
    let last = (n - 1) as f32;
    let slope: Vec<f32> = xs
        .iter()
        .enumerate()
        .map(|(i, &x)| grid.gradient01(x, i as f32 * dy).length())
        .collect();

    let mut candidates: Vec<(usize, f32)> = (LAKE_SEARCH_WINDOW..n - LAKE_SEARCH_WINDOW)
        .filter(|&i| {
            let t = i as f32 / last;
            (LAKE_EDGE_EXCLUSION..=1.0 - LAKE_EDGE_EXCLUSION).contains(&t)
        })
        .filter(|&i| {
            slope[i - LAKE_SEARCH_WINDOW..=i + LAKE_SEARCH_WINDOW]
                .iter()
                .all(|&s| slope[i] <= s)
        })
        .map(|i| (i, slope[i]))
        .collect();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut lakes: Vec<f32> = Vec::with_capacity(wanted);
    for (i, _) in candidates {
        if lakes.len() >= wanted.min(MAX_LAKES) {
            break;
        }
        let t = i as f32 / last;
        if lakes.iter().all(|&other| (other - t).abs() >= LAKE_MIN_SEPARATION) {
            lakes.push(t);
        }
    }
    lakes.sort_by(f32::total_cmp);
    lakes
}
