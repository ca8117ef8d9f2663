//! Procedural generation for the low-poly terrain backdrop: seeded noise,
//! biome and palette tables, heightfield, river carving, meshing and the
//! sun shadow map.

pub mod biome;
pub mod heightfield;
pub mod mesh;
pub mod noise_field;
pub mod palette;
pub mod river;
pub mod rng;
pub mod shadow;
pub mod triangles;

pub use biome::*;
pub use heightfield::*;
pub use mesh::*;
pub use noise_field::*;
pub use palette::*;
pub use river::*;
pub use rng::*;
pub use shadow::*;
pub use triangles::*;
