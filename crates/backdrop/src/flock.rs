//! Small bird flocks drifting across the scene on the wind.
//!
//! Purely cosmetic and not seeded: flocks spawn off-canvas upwind of a
//! random point, ease onto the wind heading, flap, and are dropped once
//! every bird has left a margin around the canvas.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;

pub const MAX_FLOCKS: usize = 3;
pub const SPAWN_COOLDOWN: (f32, f32) = (9.0, 16.0);
pub const FLOCK_SIZES: [usize; 3] = [3, 5, 7];
/// Spawn chance per second once the cooldown has elapsed.
pub const SPAWN_RATE: f32 = 0.35;
/// Spawn distance upwind of the target, as a fraction of the canvas diagonal.
pub const SPAWN_DISTANCE_FRAC: f32 = 0.35;
/// Culling margin around the canvas, as a fraction of the diagonal.
pub const CULL_MARGIN_FRAC: f32 = 0.6;
/// Bird spacing across the wind, in pixels at scale 1.
pub const BIRD_SPREAD: f32 = 14.0;
pub const BIRD_JITTER: f32 = 4.0;
/// Bird speed as a fraction of the shorter canvas side per second.
pub const BIRD_SPEED_FRAC: (f32, f32) = (0.09, 0.14);
pub const BIRD_SCALE: (f32, f32) = (0.8, 1.25);
/// Wing beats in radians per second.
pub const FLAP_SPEED: (f32, f32) = (8.0, 12.0);
/// Upstroke runs this much faster than the downstroke.
pub const UPSTROKE_BOOST: f32 = 1.7;
/// Floor of the squared-cosine dwell multiplier.
pub const FLAP_DWELL: f32 = 0.65;
/// Heading alignment rate toward the wind, per second.
pub const HEADING_EASE: f32 = 1.2;
pub const WIND_SWAY: f32 = 0.35;
pub const WIND_SWAY_FREQ: f32 = 0.07;
pub const WIND_DRIFT: f32 = 0.012;
const MAX_PUSH_BACK_STEPS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bird {
    pub pos: Vec2,
    /// Radians, 0 along +x, y down.
    pub heading: f32,
    /// Pixels per second.
    pub speed: f32,
    pub scale: f32,
    /// Wing-beat phase in radians; `cos(phase)` is 1 with wings up.
    pub phase: f32,
    pub flap_speed: f32,
}

impl Bird {
    /// Wing lift in -1..1 (1 is fully raised).
    pub fn wing(&self) -> f32 {
        self.phase.cos()
    }

    fn advance(&mut self, wind: f32, dt: f32) {
        let ease = 1.0 - (-HEADING_EASE * dt).exp();
        self.heading += angle_delta(self.heading, wind) * ease;
        self.pos += Vec2::from_angle(self.heading) * self.speed * dt;
        self.phase = (self.phase + self.flap_speed * flap_multiplier(self.phase) * dt).rem_euclid(TAU);
    }
}

/// Rate multiplier for the wing phase. Phases in `[0, PI)` are the
/// downstroke, `[PI, TAU)` the upstroke.
pub fn flap_multiplier(phase: f32) -> f32 {
    let phase = phase.rem_euclid(TAU);
    let c = phase.cos();
    let dwell = FLAP_DWELL + (1.0 - FLAP_DWELL) * c * c;
    if phase >= PI {
        dwell * UPSTROKE_BOOST
    } else {
        dwell
    }
}

/// Signed shortest rotation from `from` to `to`.
fn angle_delta(from: f32, to: f32) -> f32 {
    (to - from + PI).rem_euclid(TAU) - PI
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flock {
    pub birds: Vec<Bird>,
}

impl Flock {
    fn any_inside(&self, min: Vec2, max: Vec2) -> bool {
        self.birds
            .iter()
            .any(|b| b.pos.x >= min.x && b.pos.y >= min.y && b.pos.x <= max.x && b.pos.y <= max.y)
    }
}

#[derive(Debug, Clone)]
pub struct FlockSim {
    pub flocks: Vec<Flock>,
    /// Current wind heading in radians.
    pub wind_heading: f32,
    wind_base: f32,
    wind_time: f32,
    /// Seconds that must pass after a spawn before the next one.
    pub cooldown: f32,
    pub since_spawn: f32,
}

impl FlockSim {
    pub fn new(rng: &mut impl Rng) -> Self {
        let wind_base = rng.gen::<f32>() * TAU;
        Self {
            flocks: Vec::new(),
            wind_heading: wind_base,
            wind_base,
            wind_time: rng.gen::<f32>() * 100.0,
            cooldown: rng.gen_range(SPAWN_COOLDOWN.0..SPAWN_COOLDOWN.1),
            since_spawn: 0.0,
        }
    }

    pub fn bird_count(&self) -> usize {
        self.flocks.iter().map(|f| f.birds.len()).sum()
    }

    pub fn clear(&mut self) {
        self.flocks.clear();
    }

    /// Advance by `dt` seconds on a `width x height` canvas.
    pub fn update(&mut self, dt: f32, width: f32, height: f32, rng: &mut impl Rng) {
        let dt = dt.max(0.0);
        self.wind_time += dt;
        self.wind_base += WIND_DRIFT * dt;
        let t = self.wind_time * WIND_SWAY_FREQ * TAU;
        self.wind_heading = self.wind_base + WIND_SWAY * (t.sin() + 0.4 * (t * 2.3 + 1.0).sin());

        for flock in &mut self.flocks {
            for bird in &mut flock.birds {
                bird.advance(self.wind_heading, dt);
            }
        }

        let margin = Vec2::new(width, height).length() * CULL_MARGIN_FRAC;
        let min = Vec2::splat(-margin);
        let max = Vec2::new(width + margin, height + margin);
        let before = self.flocks.len();
        self.flocks.retain(|f| f.any_inside(min, max));
        if self.flocks.len() < before {
            log::trace!("culled {} flock(s)", before - self.flocks.len());
        }

        self.since_spawn += dt;
        if self.flocks.len() < MAX_FLOCKS && self.since_spawn >= self.cooldown {
            let chance = 1.0 - (-SPAWN_RATE * dt).exp();
            if rng.gen::<f32>() < chance {
                self.spawn(width, height, rng);
            }
        }
    }

    /// Spawn one flock upwind of a random on-canvas target.
    pub fn spawn(&mut self, width: f32, height: f32, rng: &mut impl Rng) {
        if self.flocks.len() >= MAX_FLOCKS || width <= 0.0 || height <= 0.0 {
            return;
        }
        let count = FLOCK_SIZES[rng.gen_range(0..FLOCK_SIZES.len())];
        let target = Vec2::new(rng.gen::<f32>() * width, rng.gen::<f32>() * height);
        let wind = Vec2::from_angle(self.wind_heading);
        let across = wind.perp();
        let diagonal = Vec2::new(width, height).length();
        let center = target - wind * diagonal * SPAWN_DISTANCE_FRAC;
        let min_dim = width.min(height);
        let flock_speed = rng.gen_range(BIRD_SPEED_FRAC.0..BIRD_SPEED_FRAC.1) * min_dim;

        let mut birds = Vec::with_capacity(count);
        for k in 0..count {
            let slot = k as f32 - (count - 1) as f32 * 0.5;
            let scale = rng.gen_range(BIRD_SCALE.0..BIRD_SCALE.1);
            let jitter = Vec2::new(
                rng.gen_range(-BIRD_JITTER..BIRD_JITTER),
                rng.gen_range(-BIRD_JITTER..BIRD_JITTER),
            );
            // Loose V: outer birds trail behind the leader.
            let pos = center + across * slot * BIRD_SPREAD - wind * slot.abs() * BIRD_SPREAD * 0.6 + jitter;
            birds.push(Bird {
                pos,
                heading: self.wind_heading + rng.gen_range(-0.15..0.15),
                speed: flock_speed * rng.gen_range(0.92..1.08),
                scale,
                phase: rng.gen::<f32>() * TAU,
                flap_speed: rng.gen_range(FLAP_SPEED.0..FLAP_SPEED.1),
            });
        }

        let mut flock = Flock { birds };
        let canvas_max = Vec2::new(width, height);
        let step = wind * BIRD_SPREAD * 2.0;
        for _ in 0..MAX_PUSH_BACK_STEPS {
            if !flock.any_inside(Vec2::ZERO, canvas_max) {
                break;
            }
            for bird in &mut flock.birds {
                bird.pos -= step;
            }
        }

        log::debug!("spawned a flock of {} at {:?}", count, center);
        self.flocks.push(flock);
        self.since_spawn = 0.0;
        self.cooldown = rng.gen_range(SPAWN_COOLDOWN.0..SPAWN_COOLDOWN.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn respects_cooldown_and_flock_cap() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sim = FlockSim::new(&mut rng);
        let cooldown = sim.cooldown;
        assert!((SPAWN_COOLDOWN.0..SPAWN_COOLDOWN.1).contains(&cooldown));

        let dt = 1.0 / 60.0;
        let mut t = 0.0;
        while t + dt < cooldown {
            sim.update(dt, 300.0, 180.0, &mut rng);
            t += dt;
        }
        assert!(sim.flocks.is_empty());

        for _ in 0..(60 * 120) {
            sim.update(dt, 300.0, 180.0, &mut rng);
            assert!(sim.flocks.len() <= MAX_FLOCKS);
        }
        assert!(sim.since_spawn < 120.0);
    }

    #[test]
    fn spawned_flocks_start_off_canvas_with_valid_sizes() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let mut sim = FlockSim::new(&mut rng);
            sim.spawn(300.0, 180.0, &mut rng);
            assert_eq!(sim.flocks.len(), 1);
            let flock = &sim.flocks[0];
            assert!(FLOCK_SIZES.contains(&flock.birds.len()));
            assert!(!flock.any_inside(Vec2::ZERO, Vec2::new(300.0, 180.0)));
            let margin = Vec2::new(300.0, 180.0).length() * CULL_MARGIN_FRAC;
            assert!(flock.any_inside(Vec2::splat(-margin), Vec2::new(300.0 + margin, 180.0 + margin)));
        }
    }

    #[test]
    fn flocks_leave_and_get_culled() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut sim = FlockSim::new(&mut rng);
        sim.spawn(300.0, 180.0, &mut rng);
        sim.cooldown = f32::INFINITY;
        let start = sim.flocks[0].birds[0].pos;
        sim.update(1.0, 300.0, 180.0, &mut rng);
        assert_eq!(sim.flocks.len(), 1);
        assert!(sim.flocks[0].birds[0].pos.distance(start) > 1.0);
        for _ in 0..(60 * 90) {
            sim.update(1.0 / 60.0, 300.0, 180.0, &mut rng);
        }
        assert!(sim.flocks.is_empty());
    }

    #[test]
    fn downstroke_is_slower_than_upstroke() {
        let bird = |phase| Bird {
            pos: Vec2::ZERO,
            heading: 0.0,
            speed: 0.0,
            scale: 1.0,
            phase,
            flap_speed: 10.0,
        };
        let (mut b, dt) = (bird(0.0), 1e-3);
        let (mut down, mut up) = (0.0, 0.0);
        for _ in 0..20_000 {
            if b.phase < PI {
                down += dt;
            } else {
                up += dt;
            }
            b.advance(0.0, dt);
        }
        assert!(down > up * 1.3);
        assert!(flap_multiplier(0.0) > flap_multiplier(PI * 0.5));
    }

    #[test]
    fn heading_eases_toward_wind() {
        let mut b = Bird {
            pos: Vec2::ZERO,
            heading: 0.0,
            speed: 10.0,
            scale: 1.0,
            phase: 0.0,
            flap_speed: 10.0,
        };
        b.advance(1.0, 0.5);
        assert!(b.heading > 0.0 && b.heading < 1.0);
        assert!((angle_delta(0.1, TAU - 0.1) + 0.2).abs() < 1e-5);
    }
}
