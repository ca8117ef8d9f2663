//! Biome presets: noise shape and optional terrain features per terrain
//! style.

use serde::{Deserialize, Serialize};

/// Terrain styles the backdrop can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiomeKind {
    /// Rugged ridges with a valley river.
    #[default]
    Mountainous,
    /// Rolling dunes, no water.
    Desert,
    /// Gentle hills, farmland stripes and a lazy river.
    Meadow,
    /// Tall snowy peaks and a thin glacial stream.
    Alpine,
}

/// All biome kinds for iteration.
pub const ALL_BIOMES: [BiomeKind; 4] = [
    BiomeKind::Mountainous,
    BiomeKind::Desert,
    BiomeKind::Meadow,
    BiomeKind::Alpine,
];

impl BiomeKind {
    /// Look a biome up by name (case-insensitive). Unknown names fall back
    /// to [`BiomeKind::Mountainous`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mountainous" => BiomeKind::Mountainous,
            "desert" => BiomeKind::Desert,
            "meadow" => BiomeKind::Meadow,
            "alpine" => BiomeKind::Alpine,
            other => {
                log::warn!("unknown biome {:?}, using mountainous", other);
                BiomeKind::Mountainous
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BiomeKind::Mountainous => "mountainous",
            BiomeKind::Desert => "desert",
            BiomeKind::Meadow => "meadow",
            BiomeKind::Alpine => "alpine",
        }
    }

    /// Static parameters for this biome.
    pub fn def(self) -> &'static BiomeDef {
        match self {
            BiomeKind::Mountainous => &MOUNTAINOUS,
            BiomeKind::Desert => &DESERT,
            BiomeKind::Meadow => &MEADOW,
            BiomeKind::Alpine => &ALPINE,
        }
    }
}

/// Fractal sum parameters for the base elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightNoise {
    /// Features across the shorter canvas side at zoom 1.
    pub scale: f32,
    pub octaves: u32,
    /// Amplitude multiplier per octave.
    pub persistence: f32,
    /// Frequency multiplier per octave.
    pub lacunarity: f32,
}

/// Dune shaping: a second noise sample sharpened by a power curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dunes {
    pub scale: f32,
    /// Blend factor toward the dune sample.
    pub mix: f32,
    /// Exponent applied to the dune sample.
    pub sharpness: f32,
    /// Vertical squash of the dune noise; > 1 elongates crests horizontally.
    pub stretch: f32,
}

/// Small high-frequency elevation jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roughness {
    pub scale: f32,
    pub amp: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountainRule {
    /// Inclusive count range.
    pub count: (u32, u32),
    /// Radius as a fraction of the shorter canvas side.
    pub radius: (f32, f32),
    pub amplitude: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiverRule {
    /// Probability that a given seed gets a river.
    pub chance: f32,
    /// Base width as a fraction of the shorter canvas side.
    pub width: (f32, f32),
    /// Depth of the Gaussian valley carved around the river line.
    pub valley_depth: f32,
    /// Valley sigma as a multiple of the local river width.
    pub valley_spread: f32,
    /// Lateral meander amplitude as a fraction of the canvas width.
    pub meander: f32,
    /// Per-lake roll probability (at most two lakes).
    pub lake_chance: f32,
    /// Extra half-width of a lake as a multiple of the base width.
    pub lake_size: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Farmland {
    /// Strength of the field stripe pattern (0..1).
    pub intensity: f32,
}

/// Immutable per-biome configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeDef {
    /// Vertical exaggeration: peak height as a fraction of the shorter side.
    pub height_scale: f32,
    pub height_noise: HeightNoise,
    pub dunes: Option<Dunes>,
    pub rough: Option<Roughness>,
    pub mountains: Option<MountainRule>,
    pub river: Option<RiverRule>,
    pub farmland: Option<Farmland>,
}

pub const MOUNTAINOUS: BiomeDef = BiomeDef {
    height_scale: 0.30,
    height_noise: HeightNoise {
        scale: 2.2,
        octaves: 5,
        persistence: 0.5,
        lacunarity: 2.0,
    },
    dunes: None,
    rough: Some(Roughness { scale: 9.0, amp: 0.035 }),
    mountains: Some(MountainRule {
        count: (2, 4),
        radius: (0.12, 0.24),
        amplitude: (0.25, 0.45),
    }),
    river: Some(RiverRule {
        chance: 1.0,
        width: (0.018, 0.03),
        valley_depth: 0.22,
        valley_spread: 2.6,
        meander: 0.16,
        lake_chance: 0.55,
        lake_size: (1.2, 2.4),
    }),
    farmland: None,
};

pub const DESERT: BiomeDef = BiomeDef {
    height_scale: 0.14,
    height_noise: HeightNoise {
        scale: 1.6,
        octaves: 4,
        persistence: 0.45,
        lacunarity: 2.1,
    },
    dunes: Some(Dunes {
        scale: 5.0,
        mix: 0.55,
        sharpness: 2.2,
        stretch: 2.5,
    }),
    rough: Some(Roughness { scale: 14.0, amp: 0.015 }),
    mountains: None,
    river: None,
    farmland: None,
};

pub const MEADOW: BiomeDef = BiomeDef {
    height_scale: 0.16,
    height_noise: HeightNoise {
        scale: 1.8,
        octaves: 4,
        persistence: 0.5,
        lacunarity: 2.0,
    },
    dunes: None,
    rough: Some(Roughness { scale: 10.0, amp: 0.02 }),
    mountains: None,
    river: Some(RiverRule {
        chance: 0.85,
        width: (0.02, 0.035),
        valley_depth: 0.12,
        valley_spread: 3.0,
        meander: 0.2,
        lake_chance: 0.45,
        lake_size: (1.4, 2.8),
    }),
    farmland: Some(Farmland { intensity: 0.6 }),
};

pub const ALPINE: BiomeDef = BiomeDef {
    height_scale: 0.36,
    height_noise: HeightNoise {
        scale: 2.6,
        octaves: 6,
        persistence: 0.55,
        lacunarity: 2.05,
    },
    dunes: None,
    rough: Some(Roughness { scale: 8.0, amp: 0.05 }),
    mountains: Some(MountainRule {
        count: (3, 5),
        radius: (0.10, 0.20),
        amplitude: (0.35, 0.6),
    }),
    river: Some(RiverRule {
        chance: 0.6,
        width: (0.012, 0.022),
        valley_depth: 0.25,
        valley_spread: 2.2,
        meander: 0.12,
        lake_chance: 0.35,
        lake_size: (1.0, 2.0),
    }),
    farmland: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_falls_back_to_mountainous() {
        assert_eq!(BiomeKind::from_name("tundra"), BiomeKind::Mountainous);
        assert_eq!(BiomeKind::from_name(" Desert "), BiomeKind::Desert);
    }

    #[test]
    fn names_round_trip() {
        for kind in ALL_BIOMES {
            assert_eq!(BiomeKind::from_name(kind.name()), kind);
        }
    }

    #[test]
    fn desert_has_no_river_and_mountainous_always_does() {
        assert!(BiomeKind::Desert.def().river.is_none());
        let river = BiomeKind::Mountainous.def().river.expect("mountainous river");
        assert_eq!(river.chance, 1.0);
    }

    #[test]
    fn ranges_are_ordered() {
        for kind in ALL_BIOMES {
            let def = kind.def();
            if let Some(m) = def.mountains {
                assert!(m.count.0 <= m.count.1);
                assert!(m.radius.0 <= m.radius.1);
                assert!(m.amplitude.0 <= m.amplitude.1);
            }
            if let Some(r) = def.river {
                assert!(r.width.0 <= r.width.1);
                assert!(r.lake_size.0 <= r.lake_size.1);
            }
        }
    }
}
