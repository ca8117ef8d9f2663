//! Brightness-indexed water colors.

use procgen::Palette;
use renderer::{lerp, smoothstep, Hsl, Rgba};

pub const WATER_CACHE_SIZE: usize = 256;
/// Extra glint share at full brightness.
pub const HIGHLIGHT_TINT: f32 = 0.35;
/// Extra glint share at full brightness with a fully warm sun.
pub const WARM_TINT: f32 = 0.2;
pub const MAX_TINT: f32 = 0.85;
/// Darkest water is multiplied by this before brightening back to 1.
pub const SHADOW_DAMPING: f32 = 0.78;

/// 256 water colors from darkest to brightest.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterCache {
    colors: Vec<Rgba>,
    glint: Hsl,
}

impl WaterCache {
    /// Build for a palette at sun elevation `sun_elevation`. `glint_override`
    /// replaces the palette-derived glint when set.
    pub fn build(palette: &Palette, sun_elevation: f32, glint_override: Option<Hsl>) -> Self {
        let warmth = palette.glint_warmth(sun_elevation);
        let glint = glint_override.unwrap_or_else(|| palette.glint_color(sun_elevation));
        let glint_rgb = glint.to_rgb();
        let (light_min, light_max) = palette.water_light;

        let colors = (0..WATER_CACHE_SIZE)
            .map(|i| {
                let b = i as f32 / (WATER_CACHE_SIZE - 1) as f32;
                let base = Hsl::new(palette.water_hue, palette.water_sat, lerp(light_min, light_max, b)).to_rgb();
                let tint = (palette.water_tint + HIGHLIGHT_TINT * b * b + WARM_TINT * warmth * b).clamp(0.0, MAX_TINT);
                let damping = lerp(SHADOW_DAMPING, 1.0, smoothstep(0.0, 0.35, b));
                // A glint darker than the water only ever tints upward.
                Rgba::from_rgb(base.lerp(glint_rgb.max(base), tint) * damping)
            })
            .collect();

        Self { colors, glint }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// The glint the cache was built with; the sun bloom uses it too.
    pub fn glint(&self) -> Hsl {
        self.glint
    }

    /// Color for a brightness in 0..1 (clamped, quantized to 256 steps).
    pub fn color(&self, brightness: f32) -> Rgba {
        let b = if brightness.is_finite() { brightness.clamp(0.0, 1.0) } else { 0.0 };
        let idx = (b * (WATER_CACHE_SIZE - 1) as f32).round() as usize;
        self.colors[idx.min(self.colors.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgen::{BiomeKind, ALL_BIOMES};

    #[test]
    fn cache_has_256_entries() {
        let cache = WaterCache::build(BiomeKind::Mountainous.palette(), 42.0, None);
        assert_eq!(cache.len(), 256);
        assert_eq!(cache.color(-1.0), cache.colors()[0]);
        assert_eq!(cache.color(2.0), cache.colors()[255]);
        assert_eq!(cache.color(f32::NAN), cache.colors()[0]);
    }

    #[test]
    fn lightness_never_drops_as_index_rises() {
        let glints = [
            None,
            Some(Hsl::new(220.0, 40.0, 5.0)),
            Some(Hsl::new(10.0, 80.0, 12.0)),
            Some(Hsl::new(0.0, 100.0, 50.0)),
        ];
        for kind in ALL_BIOMES {
            for glint in glints {
                assert_monotone(kind, WaterCache::build(kind.palette(), 42.0, glint));
                assert_monotone(kind, WaterCache::build(kind.palette(), 8.0, glint));
            }
        }
    }

    fn assert_monotone(kind: BiomeKind, cache: WaterCache) {
        for pair in cache.colors().windows(2) {
            assert!(
                pair[1].luminance() + 1e-3 >= pair[0].luminance(),
                "{:?}: {:?} -> {:?} with glint {:?}",
                kind,
                pair[0],
                pair[1],
                cache.glint()
            );
        }
        let first = cache.colors()[0].luminance();
        let last = cache.colors()[255].luminance();
        assert!(last > first);
    }

    #[test]
    fn override_changes_colors() {
        let palette = BiomeKind::Meadow.palette();
        let derived = WaterCache::build(palette, 42.0, None);
        let red = WaterCache::build(palette, 42.0, Some(Hsl::new(0.0, 100.0, 50.0)));
        assert_ne!(derived, red);
        assert_eq!(red.glint(), Hsl::new(0.0, 100.0, 50.0));
        assert!(red.colors()[255].r >= derived.colors()[255].r);
        assert!(red.colors()[255].b <= derived.colors()[255].b);
    }

    #[test]
    fn low_sun_warms_the_glint() {
        let palette = BiomeKind::Mountainous.palette();
        let high = WaterCache::build(palette, 80.0, None);
        let low = WaterCache::build(palette, 5.0, None);
        assert_eq!(high.glint(), palette.glint);
        assert_ne!(high.colors()[200], low.colors()[200]);
    }
}
