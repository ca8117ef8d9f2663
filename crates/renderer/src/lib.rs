//! Software rasterization for the terrain backdrop: colors, offscreen
//! layers and the handful of 2D primitives the compositor needs.

pub mod color;
pub mod raster;

pub use color::*;
pub use raster::*;
