//! Common component types used across benchmarks.
//!
//! Sized to be representative of real simulation components.

use hive_macros::{Component, Tag};

/// 3D position component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 3D velocity component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Hit points (4 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Health(pub u32);

/// A fatter component to stress value moves (64 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Transform {
    pub matrix: [f32; 16],
}

/// Presence-only marker.
#[derive(Tag)]
pub struct Frozen;
