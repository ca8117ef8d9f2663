//! Low-poly terrain backdrop: settings, shading, water, flocks and the
//! frame-driven engine that ties the procedural pipeline to a host surface.

pub mod compositor;
pub mod config;
pub mod engine;
pub mod error;
pub mod flock;
pub mod settings;
pub mod shading;
pub mod water;

pub use compositor::Compositor;
pub use config::{BackdropConfig, ConfigError};
pub use engine::{Engine, EngineOptions, EngineState, EngineStats};
pub use error::EngineError;
pub use flock::{Bird, Flock, FlockSim};
pub use settings::{GlintColor, GlintPatch, Settings, SettingsChanges, SettingsPatch};
pub use shading::{Lighting, ShadedTerrain};
pub use water::WaterCache;
