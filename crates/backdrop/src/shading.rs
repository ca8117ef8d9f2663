//! Per-triangle lighting and land coloring.
//!
//! Intensity comes from a Lambert term plus a Blinn-Phong highlight, blended
//! between a lit and a shadowed formula by the shadow map. Land triangles
//! turn into final colors here; water triangles keep only their intensity so
//! the overlay can shimmer them through the water color cache.

use glam::{Vec2, Vec3};
use procgen::{BiomeDef, NoiseField, Palette, ShadowMap, TriangleRecord};
use renderer::{lerp, smoothstep, Hsl, Rgba};

use crate::settings::Settings;

pub const SPECULAR_EXPONENT: f32 = 24.0;
pub const SPECULAR_SCALE: f32 = 0.18;
pub const LIT_AMBIENT: f32 = 0.32;
pub const LIT_DIFFUSE: f32 = 0.68;
pub const SHADOW_AMBIENT: f32 = 0.24;
pub const SHADOW_DIFFUSE: f32 = 0.16;
pub const RIM_BOOST: f32 = 0.06;
pub const MIN_LIGHTNESS: f32 = 6.0;
pub const MAX_LIGHTNESS: f32 = 98.0;
/// Offsets that decorrelate the tone and stripe noise from the terrain.
const TONE_NOISE_OFFSET: Vec2 = Vec2::new(71.3, -19.7);
const STRIPE_NOISE_OFFSET: Vec2 = Vec2::new(-43.1, 57.9);

/// Sun and tone parameters for one base redraw.
#[derive(Debug, Clone, Copy)]
pub struct Lighting {
    pub sun: Vec3,
    pub half: Vec3,
    pub elevation: f32,
    pub softness: f32,
    pub contrast: f32,
}

impl Lighting {
    pub fn new(settings: &Settings) -> Self {
        let sun = procgen::sun_vector(settings.azimuth, settings.elevation);
        Self {
            sun,
            half: (sun + Vec3::Z).normalize(),
            elevation: settings.elevation,
            softness: settings.softness,
            contrast: settings.contrast,
        }
    }

    /// Brightness of a surface in 0..1.
    pub fn intensity(&self, normal: Vec3, shadow: f32) -> f32 {
        let diffuse = normal.dot(self.sun).max(0.0);
        let specular = normal.dot(self.half).max(0.0).powf(SPECULAR_EXPONENT) * SPECULAR_SCALE;

        // Soft settings widen the penumbra, hard ones snap it.
        let gamma = lerp(1.6, 0.7, self.softness);
        let shade = shadow.clamp(0.0, 1.0).powf(gamma);

        let lit = LIT_AMBIENT + LIT_DIFFUSE * diffuse + specular;
        let shadowed = SHADOW_AMBIENT + SHADOW_DIFFUSE * diffuse + specular * 0.15;
        let mut i = lerp(lit, shadowed, shade);

        let rim_start = lerp(0.92, 0.75, self.softness);
        i += RIM_BOOST * smoothstep(rim_start, 1.0, diffuse) * (1.0 - shade);

        (0.5 + (i - 0.5) * self.contrast).clamp(0.0, 1.0)
    }
}

/// A land triangle ready to fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandTriangle {
    pub path: [Vec2; 3],
    pub color: Rgba,
}

/// A water triangle, colored later by brightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterTriangle {
    pub path: [Vec2; 3],
    pub centroid: Vec2,
    pub brightness: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadedTerrain {
    pub land: Vec<LandTriangle>,
    pub water: Vec<WaterTriangle>,
}

/// Everything the land colorizer reads besides the triangle itself.
pub struct ColorContext<'a> {
    pub palette: &'a Palette,
    pub biome: &'a BiomeDef,
    pub noise: &'a NoiseField,
    /// Shorter canvas side, for scale-free pattern sizes.
    pub min_dim: f32,
}

impl ColorContext<'_> {
    /// Final land color for a triangle lit at `intensity`.
    pub fn land_color(&self, tri: &TriangleRecord, intensity: f32, sun_elevation: f32) -> Hsl {
        let (base, light_range) = self.palette.band_color(tri.elev01);
        let mut hsl = self.palette.warm(base, tri.elev01, sun_elevation);
        let at = tri.centroid / self.min_dim.max(1.0);

        if let Some(tone) = self.palette.tone_noise {
            let p = at * tone.scale + TONE_NOISE_OFFSET;
            let n = self.noise.sample(p.x, p.y);
            hsl.h += n * tone.hue;
            hsl.l += n * tone.light;
        }

        if let (Some(stripes), Some(farm)) = (self.palette.stripes, self.biome.farmland) {
            if tri.elev01 < stripes.max_elev {
                let angle = stripes.angle_deg.to_radians();
                let u = (at.x * angle.cos() + at.y * angle.sin()) / stripes.period.max(1e-3);
                let q = at * stripes.noise_scale + STRIPE_NOISE_OFFSET;
                let pattern = 0.5
                    + 0.5 * (u * std::f32::consts::TAU).sin()
                    + self.noise.sample(q.x, q.y) * stripes.noise_amp;
                if pattern > stripes.threshold {
                    let fade = 1.0 - smoothstep(stripes.max_elev * 0.7, stripes.max_elev, tri.elev01);
                    let amount = farm.intensity * smoothstep(stripes.threshold, 1.0, pattern) * fade;
                    hsl.l += stripes.lighten * amount;
                    hsl.s -= stripes.desaturate * amount;
                }
            }
        }

        hsl.s = hsl.s.clamp(0.0, 100.0);
        hsl.l = (hsl.l + (intensity - 0.5) * light_range).clamp(MIN_LIGHTNESS, MAX_LIGHTNESS);
        hsl
    }
}

/// Light every triangle and split land from water.
pub fn shade_terrain(
    triangles: &[TriangleRecord],
    shadow: &ShadowMap,
    lighting: &Lighting,
    colors: &ColorContext<'_>,
) -> ShadedTerrain {
    let mut out = ShadedTerrain::default();
    for tri in triangles {
        let s = shadow.sample(tri.centroid.x, tri.centroid.y);
        let intensity = lighting.intensity(tri.normal, s);
        if tri.is_water {
            out.water.push(WaterTriangle {
                path: tri.path,
                centroid: tri.centroid,
                brightness: intensity,
            });
        } else {
            let color = colors.land_color(tri, intensity, lighting.elevation).to_rgba();
            out.land.push(LandTriangle { path: tri.path, color });
        }
    }
    log::debug!("shaded {} land and {} water triangles", out.land.len(), out.water.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgen::BiomeKind;

    fn lighting(elevation: f32) -> Lighting {
        Lighting::new(&Settings {
            elevation,
            ..Default::default()
        })
    }

    #[test]
    fn shadow_darkens() {
        let l = lighting(42.0);
        let up = Vec3::Z;
        assert!(l.intensity(up, 0.0) > l.intensity(up, 1.0));
        assert!(l.intensity(up, 0.5) <= l.intensity(up, 0.0));
    }

    #[test]
    fn facing_the_sun_is_brighter() {
        let l = lighting(30.0);
        let toward = (l.sun + Vec3::Z).normalize();
        let away = Vec3::new(-l.sun.x, -l.sun.y, 0.5).normalize();
        assert!(l.intensity(toward, 0.0) > l.intensity(away, 0.0));
    }

    #[test]
    fn contrast_pivots_on_half() {
        let mut s = Settings::default();
        s.contrast = 0.0;
        let flat = Lighting::new(&s);
        assert!((flat.intensity(Vec3::Z, 0.0) - 0.5).abs() < 1e-6);
        s.contrast = 2.0;
        let l = Lighting::new(&s);
        for n in [Vec3::Z, Vec3::new(0.5, 0.2, 0.8).normalize()] {
            for sh in [0.0, 0.3, 1.0] {
                assert!((0.0..=1.0).contains(&l.intensity(n, sh)));
            }
        }
    }

    #[test]
    fn land_lightness_is_clamped() {
        let noise = NoiseField::new(1);
        for kind in [BiomeKind::Mountainous, BiomeKind::Meadow, BiomeKind::Alpine, BiomeKind::Desert] {
            let ctx = ColorContext {
                palette: kind.palette(),
                biome: kind.def(),
                noise: &noise,
                min_dim: 180.0,
            };
            for i in 0..50 {
                let tri = TriangleRecord {
                    normal: Vec3::Z,
                    centroid: Vec2::new(i as f32 * 6.0, i as f32 * 3.5),
                    elev01: i as f32 / 49.0,
                    path: [Vec2::ZERO; 3],
                    is_water: false,
                };
                for intensity in [0.0, 0.5, 1.0] {
                    let c = ctx.land_color(&tri, intensity, 42.0);
                    assert!((MIN_LIGHTNESS..=MAX_LIGHTNESS).contains(&c.l));
                    assert!((0.0..=100.0).contains(&c.s));
                }
            }
        }
    }
}
