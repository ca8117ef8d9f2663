//! Seeded continuous 2D noise.

use noise::{NoiseFn, Simplex};

/// Simplex noise field, fixed for one terrain seed.
#[derive(Debug, Clone, Copy)]
pub struct NoiseField {
    seed: u32,
    simplex: Simplex,
}

impl NoiseField {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            simplex: Simplex::new(seed),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Noise value in [-1, 1].
    #[inline]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        (self.simplex.get([x as f64, y as f64]) as f32).clamp(-1.0, 1.0)
    }

    /// Noise remapped to [0, 1].
    #[inline]
    pub fn sample01(&self, x: f32, y: f32) -> f32 {
        self.sample(x, y) * 0.5 + 0.5
    }

    /// Fractal sum of `octaves` layers, normalized by total amplitude.
    /// Output is in [-1, 1].
    pub fn fbm(&self, x: f32, y: f32, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_value = 0.0;

        for octave in 0..octaves.max(1) {
            // Offset each octave so the layers do not share a lattice origin.
            let shift = octave as f32 * 17.31;
            value += self.sample(x * frequency + shift, y * frequency - shift) * amplitude;
            max_value += amplitude;

            amplitude *= persistence;
            frequency *= lacunarity;
        }

        if max_value > 0.0 {
            (value / max_value).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_per_seed() {
        let a = NoiseField::new(42);
        let b = NoiseField::new(42);
        for i in 0..200 {
            let (x, y) = (i as f32 * 0.37, i as f32 * -0.11);
            assert_eq!(a.sample(x, y), b.sample(x, y));
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = NoiseField::new(1);
        let b = NoiseField::new(2);
        let differs = (0..100).any(|i| {
            let (x, y) = (i as f32 * 0.53 + 0.1, i as f32 * 0.29 + 0.2);
            a.sample(x, y) != b.sample(x, y)
        });
        assert!(differs);
    }

    #[test]
    fn fbm_stays_in_range_and_is_smooth() {
        let field = NoiseField::new(9);
        let mut prev = field.fbm(0.0, 0.0, 5, 0.5, 2.0);
        for i in 1..2000 {
            let x = i as f32 * 0.001;
            let v = field.fbm(x, 0.3, 5, 0.5, 2.0);
            assert!((-1.0..=1.0).contains(&v));
            assert!((v - prev).abs() < 0.1, "jump at x={x}: {prev} -> {v}");
            prev = v;
        }
    }
}
