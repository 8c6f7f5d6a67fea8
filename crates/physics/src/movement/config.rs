//! Movement configuration constants.
//!
//! All movement parameters are grouped here for easy tuning. Distances are
//! in world units, velocities in world units per reference frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::Capsule;

/// Configuration for player movement physics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    // ========================================================================
    // Player Dimensions
    // ========================================================================
    /// Capsule radius.
    pub capsule_radius: f32,

    /// Half length of the capsule's inner segment.
    pub capsule_half_height: f32,

    // ========================================================================
    // Velocity
    // ========================================================================
    /// Per-axis acceleration while a movement key is held (x strafe, y fly, z forward).
    pub acceleration: Vec3,

    /// Per-axis velocity cap. The speed keys move all three together.
    pub velocity_limit: Vec3,

    /// Deceleration applied toward zero every reference frame.
    pub friction: f32,

    /// Amount the speed keys change the velocity limit per frame.
    pub speed_step: f32,

    /// Lowest velocity limit the speed keys can reach.
    pub min_velocity_limit: f32,

    // ========================================================================
    // Vertical Motion
    // ========================================================================
    /// Downward acceleration when not grounded.
    pub gravity: f32,

    /// Vertical velocity set by a jump.
    pub jump_velocity: f32,

    /// Snapping to the floor only happens at or below this vertical velocity.
    pub snap_velocity: f32,

    /// Lateral probe distance used to test for climbable steps.
    pub snap_shift: f32,

    // ========================================================================
    // Collision Resolution
    // ========================================================================
    /// Remaining energy under which resolution stops, also the stand-off
    /// distance kept from an impacted surface.
    pub energy_cutoff: f32,

    /// Resolution sub-steps per frame.
    pub resolution_steps: u32,

    /// Bisection iterations for impact times.
    pub toi_iterations: u32,

    /// Bisection stops once the impact is localised to this distance.
    pub toi_limit_distance: f32,

    // ========================================================================
    // Timing
    // ========================================================================
    /// Frame time the tuning values refer to, and the cap on frame time (seconds).
    pub reference_frame_time: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        let capsule_radius = 16.0;

        Self {
            capsule_radius,
            capsule_half_height: 12.0,

            acceleration: Vec3::splat(5.0),
            velocity_limit: Vec3::splat(10.0),
            friction: 2.0,
            speed_step: 0.25,
            min_velocity_limit: 0.125,

            gravity: 1.0,
            jump_velocity: 10.0,
            snap_velocity: 0.0,
            snap_shift: capsule_radius / 2.0,

            energy_cutoff: 0.25,
            resolution_steps: 5,
            toi_iterations: 16,
            toi_limit_distance: 1.0e-3,

            reference_frame_time: 0.033,
        }
    }
}

impl MovementConfig {
    /// Low gravity, long jumps.
    pub fn floaty() -> Self {
        Self {
            gravity: 0.5,
            jump_velocity: 12.0,
            friction: 1.0,
            ..Default::default()
        }
    }

    /// Strong gravity, short jumps, quick stops.
    pub fn heavy() -> Self {
        Self {
            gravity: 2.0,
            jump_velocity: 8.0,
            friction: 3.0,
            acceleration: Vec3::splat(4.0),
            ..Default::default()
        }
    }

    /// Clamp a frame time to the reference frame time.
    #[inline]
    pub fn clamp_delta_time(&self, delta_time: f32) -> f32 {
        delta_time.min(self.reference_frame_time)
    }

    /// Scale applied to per-frame quantities for a (clamped) frame time.
    #[inline]
    pub fn frame_multiplier(&self, delta_time: f32) -> f32 {
        delta_time / self.reference_frame_time
    }

    /// Player capsule centered on `center`.
    pub fn capsule_at(&self, center: Vec3) -> Capsule {
        Capsule::new(center, self.capsule_half_height, self.capsule_radius)
    }

    /// Downward sweep length used by floor snapping.
    ///
    /// One diameter plus a slack of one bisection step's worth of diameter.
    pub fn snap_distance(&self, radius: f32) -> f32 {
        let diameter = radius * 2.0;
        diameter + diameter / self.toi_iterations.max(1) as f32
    }
}

/// Mouse look tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Radians of yaw per pixel of horizontal mouse motion.
    pub horizontal_sensitivity: f32,

    /// Radians of pitch per pixel of vertical mouse motion.
    pub vertical_sensitivity: f32,

    /// Maximum pitch above or below the horizon (degrees).
    pub vertical_limit_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            horizontal_sensitivity: 1.0 / 1000.0,
            vertical_sensitivity: 1.0 / 1000.0,
            vertical_limit_degrees: 60.0,
        }
    }
}
