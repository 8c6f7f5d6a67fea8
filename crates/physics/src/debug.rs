//! Debug event sink.
//!
//! Collision and movement code reports faces and text through a
//! [`DebugSink`] passed in by the caller. What happens to them (drawing,
//! logging, nothing) is up to the implementation; physics results never
//! depend on it, except for the locked-motion toggle which freezes input.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::{CollisionFlags, Face};

/// RGB color for debug primitives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebugColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl DebugColor {
    pub const RED: Self = Self::new(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::new(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::new(0.0, 0.0, 1.0);
    pub const YELLOW: Self = Self::new(1.0, 1.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Floors are green, ceilings white, walls blue.
    pub fn for_flags(flags: CollisionFlags) -> Self {
        if flags == CollisionFlags::FLOOR {
            Self::GREEN
        } else if flags == CollisionFlags::CEILING {
            Self::WHITE
        } else {
            Self::BLUE
        }
    }
}

/// Runtime debug toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugFlags {
    /// Draw every face returned by the BVH for a sweep.
    pub draw_collision_query: bool,
    /// Draw the faces contributing to averaged normals.
    pub draw_collided_face: bool,
    /// Snapping and step-up status text.
    pub draw_status: bool,
    /// Draw faces discarded by bucket cancellation.
    pub draw_ignored_faces: bool,
    /// Ask the renderer to draw debug faces without depth testing.
    pub disable_depth_debug: bool,
    /// Freeze camera and input driven velocity.
    pub use_locked_motion: bool,
    /// Draw the face a step-up landed on.
    pub draw_step_up: bool,
}

/// Receiver for per-frame debug primitives.
pub trait DebugSink {
    fn flags(&self) -> &DebugFlags;

    fn record_face(&mut self, face: &Face, normal: Vec3, color: DebugColor, width: u32);

    /// Screen-space text at `(x, y)` pixels.
    fn record_text(&mut self, text: &str, color: DebugColor, x: f32, y: f32);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDebugSink {
    flags: DebugFlags,
}

impl NullDebugSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(flags: DebugFlags) -> Self {
        Self { flags }
    }
}

impl DebugSink for NullDebugSink {
    fn flags(&self) -> &DebugFlags {
        &self.flags
    }

    fn record_face(&mut self, _face: &Face, _normal: Vec3, _color: DebugColor, _width: u32) {}

    fn record_text(&mut self, _text: &str, _color: DebugColor, _x: f32, _y: f32) {}
}
