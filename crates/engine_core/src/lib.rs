//! Core engine types shared by the terrain backdrop crates.
//!
//! This crate provides the foundational pieces every other crate leans on:
//! - Frame timing driven by host timestamps
//! - Host collaborator traits (surface, frame scheduler, resize observer)

pub mod host;
pub mod time;

pub use host::*;
pub use time::*;

// Re-export commonly used types
pub use glam::{Vec2, Vec3};
