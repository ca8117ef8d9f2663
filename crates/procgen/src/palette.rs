//! Per-biome color ramps.
//!
//! A palette is a stack of elevation bands plus a few optional modifiers
//! (warm light at low sun, per-pixel tone noise, farmland stripes) and the
//! water and glint colors. Values are HSL in CSS units.

use renderer::{lerp, Hsl};

use crate::biome::BiomeKind;

/// One elevation band. Every HSL channel is a `(at start, at end)` pair
/// lerped across the band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBand {
    pub start: f32,
    pub end: f32,
    pub hue: (f32, f32),
    pub sat: (f32, f32),
    pub light: (f32, f32),
    /// How far lighting can swing lightness (percent points).
    pub light_range: (f32, f32),
}

/// Recolors low terrain toward a warm hue when the sun sits low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarmShift {
    /// Sun elevation (degrees) at which warming starts.
    pub pivot: f32,
    /// Degrees below the pivot at which warming is full.
    pub range: f32,
    /// Terrain above this normalized elevation is untouched.
    pub max_elev: f32,
    pub hue: f32,
    pub hue_mix: f32,
    pub sat_add: f32,
    pub light_add: f32,
}

/// Organic per-triangle variance in hue and lightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneNoise {
    pub scale: f32,
    pub hue: f32,
    pub light: f32,
}

/// Farmland field stripes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripeRule {
    /// Stripe period as a fraction of the shorter canvas side.
    pub period: f32,
    pub angle_deg: f32,
    /// Pattern value above which a patch counts as a field.
    pub threshold: f32,
    pub lighten: f32,
    pub desaturate: f32,
    pub noise_scale: f32,
    pub noise_amp: f32,
    /// Fields only appear below this normalized elevation.
    pub max_elev: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub bands: &'static [ColorBand],
    pub warm_shift: Option<WarmShift>,
    pub tone_noise: Option<ToneNoise>,
    pub stripes: Option<StripeRule>,
    /// Glint at high sun.
    pub glint: Hsl,
    /// Glint at low sun.
    pub glint_warm: Hsl,
    pub glint_pivot: f32,
    pub glint_range: f32,
    pub water_hue: f32,
    pub water_sat: f32,
    pub water_light: (f32, f32),
    /// Base share of glint color bled into the water.
    pub water_tint: f32,
}

impl BiomeKind {
    pub fn palette(self) -> &'static Palette {
        match self {
            BiomeKind::Mountainous => &MOUNTAINOUS_PALETTE,
            BiomeKind::Desert => &DESERT_PALETTE,
            BiomeKind::Meadow => &MEADOW_PALETTE,
            BiomeKind::Alpine => &ALPINE_PALETTE,
        }
    }
}

impl Palette {
    /// Band lookup and lerp. Elevations past the last band use the last
    /// band's top color.
    pub fn band_color(&self, elev01: f32) -> (Hsl, f32) {
        let e = elev01.clamp(0.0, 1.0);
        let band = self
            .bands
            .iter()
            .find(|b| e >= b.start && e < b.end)
            .or(self.bands.last());
        let Some(band) = band else {
            return (Hsl::new(0.0, 0.0, 50.0), 30.0);
        };
        let span = band.end - band.start;
        let t = if span > 0.0 { ((e - band.start) / span).clamp(0.0, 1.0) } else { 0.0 };
        let hsl = Hsl::new(
            lerp(band.hue.0, band.hue.1, t),
            lerp(band.sat.0, band.sat.1, t),
            lerp(band.light.0, band.light.1, t),
        );
        (hsl, lerp(band.light_range.0, band.light_range.1, t))
    }

    /// Apply the warm-light rule, if any, for a sun at `sun_elev_deg`.
    pub fn warm(&self, hsl: Hsl, elev01: f32, sun_elev_deg: f32) -> Hsl {
        let Some(w) = self.warm_shift else {
            return hsl;
        };
        let sun = ((w.pivot - sun_elev_deg) / w.range.max(1e-3)).clamp(0.0, 1.0);
        let ground = (1.0 - elev01 / w.max_elev.max(1e-3)).clamp(0.0, 1.0);
        let amount = sun * ground;
        if amount <= 0.0 {
            return hsl;
        }
        let target = Hsl::new(w.hue, hsl.s, hsl.l);
        let mut out = hsl.lerp(target, amount * w.hue_mix);
        out.s += w.sat_add * amount;
        out.l += w.light_add * amount;
        out
    }

    /// 0 at or above the glint pivot, 1 once the sun is `glint_range`
    /// degrees below it.
    pub fn glint_warmth(&self, sun_elev_deg: f32) -> f32 {
        ((self.glint_pivot - sun_elev_deg) / self.glint_range.max(1e-3)).clamp(0.0, 1.0)
    }

    /// Palette-derived glint for the current sun.
    pub fn glint_color(&self, sun_elev_deg: f32) -> Hsl {
        self.glint.lerp(self.glint_warm, self.glint_warmth(sun_elev_deg))
    }
}

const MOUNTAINOUS_BANDS: [ColorBand; 4] = [
    ColorBand {
        start: 0.0,
        end: 0.3,
        hue: (96.0, 88.0),
        sat: (30.0, 27.0),
        light: (32.0, 36.0),
        light_range: (30.0, 30.0),
    },
    ColorBand {
        start: 0.3,
        end: 0.56,
        hue: (88.0, 62.0),
        sat: (26.0, 17.0),
        light: (36.0, 41.0),
        light_range: (30.0, 32.0),
    },
    ColorBand {
        start: 0.56,
        end: 0.8,
        hue: (36.0, 28.0),
        sat: (14.0, 10.0),
        light: (42.0, 52.0),
        light_range: (32.0, 34.0),
    },
    ColorBand {
        start: 0.8,
        end: 1.01,
        hue: (212.0, 210.0),
        sat: (10.0, 6.0),
        light: (80.0, 92.0),
        light_range: (20.0, 16.0),
    },
];

pub const MOUNTAINOUS_PALETTE: Palette = Palette {
    bands: &MOUNTAINOUS_BANDS,
    warm_shift: Some(WarmShift {
        pivot: 30.0,
        range: 22.0,
        max_elev: 0.7,
        hue: 32.0,
        hue_mix: 0.35,
        sat_add: 8.0,
        light_add: 2.0,
    }),
    tone_noise: Some(ToneNoise {
        scale: 6.0,
        hue: 6.0,
        light: 3.0,
    }),
    stripes: None,
    glint: Hsl::new(48.0, 90.0, 86.0),
    glint_warm: Hsl::new(28.0, 95.0, 66.0),
    glint_pivot: 35.0,
    glint_range: 28.0,
    water_hue: 202.0,
    water_sat: 48.0,
    water_light: (22.0, 58.0),
    water_tint: 0.18,
};

const DESERT_BANDS: [ColorBand; 3] = [
    ColorBand {
        start: 0.0,
        end: 0.4,
        hue: (30.0, 34.0),
        sat: (46.0, 52.0),
        light: (52.0, 58.0),
        light_range: (30.0, 30.0),
    },
    ColorBand {
        start: 0.4,
        end: 0.75,
        hue: (34.0, 38.0),
        sat: (52.0, 56.0),
        light: (58.0, 64.0),
        light_range: (30.0, 28.0),
    },
    ColorBand {
        start: 0.75,
        end: 1.01,
        hue: (38.0, 42.0),
        sat: (50.0, 44.0),
        light: (64.0, 72.0),
        light_range: (28.0, 24.0),
    },
];

pub const DESERT_PALETTE: Palette = Palette {
    bands: &DESERT_BANDS,
    warm_shift: Some(WarmShift {
        pivot: 35.0,
        range: 25.0,
        max_elev: 1.0,
        hue: 18.0,
        hue_mix: 0.45,
        sat_add: 10.0,
        light_add: -2.0,
    }),
    tone_noise: Some(ToneNoise {
        scale: 4.0,
        hue: 3.0,
        light: 2.5,
    }),
    stripes: None,
    glint: Hsl::new(44.0, 92.0, 84.0),
    glint_warm: Hsl::new(22.0, 96.0, 62.0),
    glint_pivot: 38.0,
    glint_range: 30.0,
    water_hue: 190.0,
    water_sat: 40.0,
    water_light: (28.0, 60.0),
    water_tint: 0.22,
};

const MEADOW_BANDS: [ColorBand; 3] = [
    ColorBand {
        start: 0.0,
        end: 0.45,
        hue: (102.0, 94.0),
        sat: (38.0, 34.0),
        light: (38.0, 42.0),
        light_range: (28.0, 28.0),
    },
    ColorBand {
        start: 0.45,
        end: 0.75,
        hue: (94.0, 80.0),
        sat: (34.0, 30.0),
        light: (42.0, 46.0),
        light_range: (28.0, 30.0),
    },
    ColorBand {
        start: 0.75,
        end: 1.01,
        hue: (80.0, 62.0),
        sat: (28.0, 22.0),
        light: (46.0, 52.0),
        light_range: (30.0, 30.0),
    },
];

pub const MEADOW_PALETTE: Palette = Palette {
    bands: &MEADOW_BANDS,
    warm_shift: Some(WarmShift {
        pivot: 28.0,
        range: 20.0,
        max_elev: 0.8,
        hue: 40.0,
        hue_mix: 0.3,
        sat_add: 6.0,
        light_add: 1.0,
    }),
    tone_noise: Some(ToneNoise {
        scale: 7.0,
        hue: 7.0,
        light: 3.5,
    }),
    stripes: Some(StripeRule {
        period: 0.045,
        angle_deg: 28.0,
        threshold: 0.35,
        lighten: 7.0,
        desaturate: 9.0,
        noise_scale: 3.0,
        noise_amp: 0.6,
        max_elev: 0.62,
    }),
    glint: Hsl::new(52.0, 88.0, 88.0),
    glint_warm: Hsl::new(32.0, 94.0, 68.0),
    glint_pivot: 32.0,
    glint_range: 26.0,
    water_hue: 198.0,
    water_sat: 52.0,
    water_light: (24.0, 60.0),
    water_tint: 0.2,
};

const ALPINE_BANDS: [ColorBand; 4] = [
    ColorBand {
        start: 0.0,
        end: 0.25,
        hue: (140.0, 130.0),
        sat: (24.0, 20.0),
        light: (26.0, 30.0),
        light_range: (28.0, 28.0),
    },
    ColorBand {
        start: 0.25,
        end: 0.5,
        hue: (120.0, 60.0),
        sat: (16.0, 10.0),
        light: (32.0, 40.0),
        light_range: (30.0, 32.0),
    },
    ColorBand {
        start: 0.5,
        end: 0.66,
        hue: (220.0, 215.0),
        sat: (6.0, 8.0),
        light: (44.0, 54.0),
        light_range: (32.0, 32.0),
    },
    ColorBand {
        start: 0.66,
        end: 1.01,
        hue: (205.0, 200.0),
        sat: (18.0, 14.0),
        light: (82.0, 95.0),
        light_range: (18.0, 12.0),
    },
];

pub const ALPINE_PALETTE: Palette = Palette {
    bands: &ALPINE_BANDS,
    warm_shift: Some(WarmShift {
        pivot: 25.0,
        range: 18.0,
        max_elev: 1.0,
        hue: 345.0,
        hue_mix: 0.25,
        sat_add: 14.0,
        light_add: 0.0,
    }),
    tone_noise: Some(ToneNoise {
        scale: 8.0,
        hue: 4.0,
        light: 2.5,
    }),
    stripes: None,
    glint: Hsl::new(200.0, 60.0, 92.0),
    glint_warm: Hsl::new(335.0, 80.0, 76.0),
    glint_pivot: 30.0,
    glint_range: 24.0,
    water_hue: 188.0,
    water_sat: 56.0,
    water_light: (26.0, 64.0),
    water_tint: 0.16,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::ALL_BIOMES;

    #[test]
    fn bands_are_contiguous_and_cover_unit_range() {
        for kind in ALL_BIOMES {
            let bands = kind.palette().bands;
            assert_eq!(bands[0].start, 0.0, "{:?}", kind);
            assert!(bands.last().unwrap().end >= 1.0, "{:?}", kind);
            for pair in bands.windows(2) {
                assert_eq!(pair[0].end, pair[1].start, "{:?}", kind);
            }
        }
    }

    #[test]
    fn top_elevation_uses_last_band() {
        let palette = BiomeKind::Mountainous.palette();
        let (top, _) = palette.band_color(1.0);
        let (over, _) = palette.band_color(5.0);
        assert_eq!(top, over);
        assert!(top.l > 80.0, "snow caps should be light");
    }

    #[test]
    fn warm_shift_only_at_low_sun() {
        let palette = BiomeKind::Desert.palette();
        let base = Hsl::new(36.0, 50.0, 60.0);
        assert_eq!(palette.warm(base, 0.2, 80.0), base);
        let warm = palette.warm(base, 0.2, 5.0);
        assert_ne!(warm, base);
        assert!(warm.s > base.s);
    }

    #[test]
    fn glint_warms_as_sun_drops() {
        let palette = BiomeKind::Mountainous.palette();
        assert_eq!(palette.glint_warmth(85.0), 0.0);
        assert_eq!(palette.glint_warmth(5.0), 1.0);
        assert_eq!(palette.glint_color(85.0), palette.glint);
    }
}
