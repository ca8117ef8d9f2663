//! User-facing look settings and partial updates to them.

use procgen::{BiomeKind, MAX_SUN_ELEVATION, MIN_SUN_ELEVATION, MIN_TRI_DENSITY};
use renderer::Hsl;
use serde::{Deserialize, Serialize};

/// Smallest zoom accepted; noise sampling divides by it.
pub const MIN_ZOOM: f32 = 0.05;

/// Explicit sun-glint color (CSS HSL units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlintColor {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl GlintColor {
    pub fn to_hsl(self) -> Hsl {
        Hsl::new(self.h, self.s, self.l)
    }

    fn is_finite(&self) -> bool {
        self.to_hsl().is_finite()
    }
}

/// Glint override as it arrives from a host. Every channel must be present.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlintPatch {
    pub h: Option<f32>,
    pub s: Option<f32>,
    pub l: Option<f32>,
}

impl GlintPatch {
    pub fn new(h: f32, s: f32, l: f32) -> Self {
        Self {
            h: Some(h),
            s: Some(s),
            l: Some(l),
        }
    }

    /// The full color, or `None` if any channel is missing or not finite.
    pub fn complete(self) -> Option<GlintColor> {
        let color = GlintColor {
            h: self.h?,
            s: self.s?,
            l: self.l?,
        };
        color.is_finite().then_some(color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Sun bearing in degrees, clockwise from the top of the screen.
    #[serde(default = "default_azimuth")]
    pub azimuth: f32,
    /// Sun height in degrees.
    #[serde(default = "default_elevation")]
    pub elevation: f32,
    /// Shadow blur amount, 0..1.
    #[serde(default = "default_softness")]
    pub softness: f32,
    #[serde(default = "default_contrast")]
    pub contrast: f32,
    /// Mesh resolution: the shorter canvas side divided by point spacing.
    #[serde(default = "default_tri_density")]
    pub tri_density: f32,
    #[serde(default = "default_zoom")]
    pub zoom: f32,
    #[serde(default = "default_true")]
    pub animate_water: bool,
    #[serde(default)]
    pub biome: BiomeKind,
    #[serde(default)]
    pub glint_color: Option<GlintColor>,
}

fn default_azimuth() -> f32 {
    320.0
}
fn default_elevation() -> f32 {
    42.0
}
fn default_softness() -> f32 {
    0.6
}
fn default_contrast() -> f32 {
    0.9
}
fn default_tri_density() -> f32 {
    28.0
}
fn default_zoom() -> f32 {
    1.0
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            azimuth: default_azimuth(),
            elevation: default_elevation(),
            softness: default_softness(),
            contrast: default_contrast(),
            tri_density: default_tri_density(),
            zoom: default_zoom(),
            animate_water: true,
            biome: BiomeKind::default(),
            glint_color: None,
        }
    }
}

/// Partial settings update. `None` leaves a field alone.
///
/// `glint_color` has three states: `None` leaves the override,
/// `Some(None)` clears it and `Some(Some(patch))` sets it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SettingsPatch {
    pub azimuth: Option<f32>,
    pub elevation: Option<f32>,
    pub softness: Option<f32>,
    pub contrast: Option<f32>,
    pub tri_density: Option<f32>,
    pub zoom: Option<f32>,
    pub animate_water: Option<bool>,
    pub biome: Option<BiomeKind>,
    pub glint_color: Option<Option<GlintPatch>>,
}

impl From<Settings> for SettingsPatch {
    fn from(s: Settings) -> Self {
        Self {
            azimuth: Some(s.azimuth),
            elevation: Some(s.elevation),
            softness: Some(s.softness),
            contrast: Some(s.contrast),
            tri_density: Some(s.tri_density),
            zoom: Some(s.zoom),
            animate_water: Some(s.animate_water),
            biome: Some(s.biome),
            glint_color: Some(s.glint_color.map(|g| GlintPatch::new(g.h, g.s, g.l))),
        }
    }
}

/// Which rebuild tiers a settings update touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsChanges {
    /// Biome, density or zoom changed: heights, river and mesh are stale.
    pub terrain: bool,
    /// Sun direction or softness changed: the shadow map is stale.
    pub lighting: bool,
    /// Elevation, biome or glint changed: the water colors are stale.
    pub water: bool,
    /// Anything that changes the base layer's pixels.
    pub base: bool,
}

impl SettingsChanges {
    pub fn any(&self) -> bool {
        self.terrain || self.lighting || self.water || self.base
    }
}

impl Settings {
    /// Defaults with `patch` merged over them.
    pub fn from_patch(patch: SettingsPatch) -> Self {
        let mut settings = Self::default();
        settings.apply(patch);
        settings
    }

    /// Pull every field into its accepted range. Non-finite numbers fall
    /// back to the defaults.
    pub fn clamped(self) -> Self {
        let d = Self::default();
        let finite = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };
        let glint_color = match self.glint_color {
            Some(g) if !g.is_finite() => {
                log::warn!("ignoring non-finite glint color {:?}", g);
                None
            }
            other => other,
        };
        Self {
            azimuth: finite(self.azimuth, d.azimuth).rem_euclid(360.0),
            elevation: finite(self.elevation, d.elevation).clamp(MIN_SUN_ELEVATION, MAX_SUN_ELEVATION),
            softness: finite(self.softness, d.softness).clamp(0.0, 1.0),
            contrast: finite(self.contrast, d.contrast).max(0.0),
            tri_density: finite(self.tri_density, d.tri_density).max(MIN_TRI_DENSITY),
            zoom: finite(self.zoom, d.zoom).max(MIN_ZOOM),
            animate_water: self.animate_water,
            biome: self.biome,
            glint_color,
        }
    }

    /// Merge `patch` in, clamp, and report which tiers changed.
    pub fn apply(&mut self, patch: SettingsPatch) -> SettingsChanges {
        let before = *self;
        let mut next = before;

        if let Some(v) = patch.azimuth {
            next.azimuth = v;
        }
        if let Some(v) = patch.elevation {
            next.elevation = v;
        }
        if let Some(v) = patch.softness {
            next.softness = v;
        }
        if let Some(v) = patch.contrast {
            next.contrast = v;
        }
        if let Some(v) = patch.tri_density {
            next.tri_density = v;
        }
        if let Some(v) = patch.zoom {
            next.zoom = v;
        }
        if let Some(v) = patch.animate_water {
            next.animate_water = v;
        }
        if let Some(v) = patch.biome {
            next.biome = v;
        }
        match patch.glint_color {
            None => {}
            Some(None) => next.glint_color = None,
            Some(Some(glint)) => {
                next.glint_color = glint.complete();
                if next.glint_color.is_none() {
                    log::warn!("rejecting incomplete glint color {:?}, override cleared", glint);
                }
            }
        }

        *self = next.clamped();
        self.diff(&before)
    }

    fn diff(&self, before: &Settings) -> SettingsChanges {
        let terrain =
            self.biome != before.biome || self.tri_density != before.tri_density || self.zoom != before.zoom;
        let water = self.elevation != before.elevation
            || self.biome != before.biome
            || self.glint_color != before.glint_color;
        let lighting = terrain
            || self.azimuth != before.azimuth
            || self.elevation != before.elevation
            || self.softness != before.softness;
        let base = lighting || water || self.contrast != before.contrast;
        SettingsChanges {
            terrain,
            lighting,
            water,
            base,
        }
    }

    /// Glint override as HSL, if set.
    pub fn glint_hsl(&self) -> Option<Hsl> {
        self.glint_color.map(GlintColor::to_hsl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.azimuth, 320.0);
        assert_eq!(s.elevation, 42.0);
        assert_eq!(s.softness, 0.6);
        assert_eq!(s.contrast, 0.9);
        assert_eq!(s.tri_density, 28.0);
        assert_eq!(s.zoom, 1.0);
        assert!(s.animate_water);
        assert_eq!(s.biome, BiomeKind::Mountainous);
        assert_eq!(s.glint_color, None);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let s = Settings::from_patch(SettingsPatch {
            elevation: Some(120.0),
            softness: Some(-1.0),
            tri_density: Some(0.0),
            zoom: Some(-3.0),
            azimuth: Some(-40.0),
            ..Default::default()
        });
        assert_eq!(s.elevation, MAX_SUN_ELEVATION);
        assert_eq!(s.softness, 0.0);
        assert_eq!(s.tri_density, MIN_TRI_DENSITY);
        assert_eq!(s.zoom, MIN_ZOOM);
        assert_eq!(s.azimuth, 320.0);

        let s = Settings::from_patch(SettingsPatch {
            elevation: Some(f32::NAN),
            ..Default::default()
        });
        assert_eq!(s.elevation, 42.0);
    }

    #[test]
    fn change_tiers() {
        let mut s = Settings::default();
        let c = s.apply(SettingsPatch {
            contrast: Some(1.3),
            ..Default::default()
        });
        assert!(c.base && !c.lighting && !c.terrain && !c.water);

        let c = s.apply(SettingsPatch {
            tri_density: Some(40.0),
            ..Default::default()
        });
        assert!(c.terrain && c.lighting && c.base && !c.water);

        let c = s.apply(SettingsPatch {
            elevation: Some(10.0),
            ..Default::default()
        });
        assert!(c.water && c.lighting && c.base && !c.terrain);

        let c = s.apply(SettingsPatch {
            glint_color: Some(Some(GlintPatch::new(200.0, 50.0, 70.0))),
            ..Default::default()
        });
        assert!(c.water && c.base && !c.lighting && !c.terrain);

        let c = s.apply(SettingsPatch {
            elevation: Some(10.0),
            ..Default::default()
        });
        assert!(!c.any());
    }

    #[test]
    fn glint_override_set_clear_and_reject() {
        let mut s = Settings::default();
        let c = s.apply(SettingsPatch {
            glint_color: Some(Some(GlintPatch::new(20.0, 80.0, 60.0))),
            ..Default::default()
        });
        assert!(c.water);
        assert_eq!(s.glint_color, Some(GlintColor { h: 20.0, s: 80.0, l: 60.0 }));

        s.apply(SettingsPatch::default());
        assert!(s.glint_color.is_some());

        let partial = GlintPatch {
            h: Some(10.0),
            ..Default::default()
        };
        s.apply(SettingsPatch {
            glint_color: Some(Some(partial)),
            ..Default::default()
        });
        assert_eq!(s.glint_color, None);

        s.apply(SettingsPatch {
            glint_color: Some(Some(GlintPatch::new(20.0, f32::INFINITY, 60.0))),
            ..Default::default()
        });
        assert_eq!(s.glint_color, None);

        s.apply(SettingsPatch {
            glint_color: Some(Some(GlintPatch::new(20.0, 80.0, 60.0))),
            ..Default::default()
        });
        s.apply(SettingsPatch {
            glint_color: Some(None),
            ..Default::default()
        });
        assert_eq!(s.glint_color, None);
    }

    #[test]
    fn settings_round_trip_through_patch() {
        let custom = Settings {
            biome: BiomeKind::Alpine,
            elevation: 20.0,
            glint_color: Some(GlintColor { h: 1.0, s: 2.0, l: 3.0 }),
            ..Default::default()
        };
        assert_eq!(Settings::from_patch(custom.into()), custom);
    }
}
