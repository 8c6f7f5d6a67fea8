//! Player movement controller.
//!
//! This is the main entry point for player movement. It takes input commands
//! and updates the player state through the BVH.

use glam::Vec3;

use crate::collision::{is_in_valid_space, Bvh, CollisionError, CollisionFlags};
use crate::debug::{DebugColor, DebugSink};

use super::config::{CameraConfig, MovementConfig};
use super::slide_move::{handle_collision_detection, report_invalid_space};
use super::snap::{can_snap_vertically, record_snap};
use super::state::{CommandButtons, PlayerCommand, PlayerState};

/// Player movement controller.
///
/// Handles all player movement physics including:
/// - Camera relative acceleration and friction
/// - Floor snapping, gravity and jumping
/// - Flying
/// - Collision response
///
/// # Example
///
/// ```ignore
/// let controller = PlayerController::with_default_config();
/// let mut state = PlayerState::spawn(start, 0.0, &controller.config, &bvh)?;
///
/// // Each frame:
/// controller.update(&mut state, &command, &bvh, delta_time, &mut debug)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlayerController {
    pub config: MovementConfig,
    pub camera: CameraConfig,
}

impl PlayerController {
    pub fn new(config: MovementConfig, camera: CameraConfig) -> Self {
        Self { config, camera }
    }

    /// Create a controller with default configuration.
    pub fn with_default_config() -> Self {
        Self::default()
    }

    /// Update player movement for one frame.
    ///
    /// # Arguments
    ///
    /// * `state` - The player's state (will be modified)
    /// * `command` - The player's input for this frame
    /// * `bvh` - The static world
    /// * `delta_time` - Frame time in seconds, capped at the reference frame time
    /// * `debug` - Receives status text and debug faces
    ///
    /// # Returns
    ///
    /// The contact classes met while resolving this frame's motion.
    pub fn update(
        &self,
        state: &mut PlayerState,
        command: &PlayerCommand,
        bvh: &Bvh,
        delta_time: f32,
        debug: &mut dyn DebugSink,
    ) -> Result<CollisionFlags, CollisionError> {
        let delta_time = self.config.clamp_delta_time(delta_time);
        let multiplier = self.config.frame_multiplier(delta_time);
        let locked = debug.flags().use_locked_motion;

        if !locked {
            if command.is_pressed(CommandButtons::RESET_CAMERA) {
                state.camera.reset();
            }
            state.camera.rotate(command.mouse_delta, &self.camera);
            self.update_velocity(state, command, multiplier);
        }

        if !state.is_flying {
            self.update_vertical_velocity(state, bvh, debug)?;
        }

        let displacement = world_relative_displacement(state, multiplier);
        let report = handle_collision_detection(
            bvh,
            &mut state.capsule,
            state.on_solid_floor,
            displacement,
            &self.config,
            debug,
        )?;

        if !is_in_valid_space(bvh, &state.capsule)? {
            report_invalid_space(&state.capsule, debug);
        }

        state.camera.position = state.capsule.center;

        self.apply_gravity(state, multiplier);

        if command.is_triggered(CommandButtons::JUMP) && state.on_solid_floor {
            log::debug!("Jump from y={:.2}", state.capsule.center.y);
            state.on_solid_floor = false;
            state.velocity.y = self.config.jump_velocity;
        }

        // Bumping a ceiling kills upward speed
        if !state.is_flying && report.flags.contains(CollisionFlags::CEILING) && state.velocity.y > 0.0 {
            state.velocity.y = 0.0;
        }

        self.update_velocity_limit(state, command);

        if command.is_triggered(CommandButtons::FLY) {
            state.is_flying = !state.is_flying;
            log::info!("Flying {}", if state.is_flying { "enabled" } else { "disabled" });
        }

        record_status(state, debug);

        Ok(report.flags)
    }

    // ========================================================================
    // Velocity
    // ========================================================================

    /// Accelerate from held keys, apply friction and clamp.
    fn update_velocity(&self, state: &mut PlayerState, command: &PlayerCommand, multiplier: f32) {
        let acceleration = self.config.acceleration * multiplier;
        let friction = self.config.friction * multiplier;
        let velocity = &mut state.velocity;

        if command.is_pressed(CommandButtons::STRAFE_LEFT) {
            velocity.x -= acceleration.x;
        }
        if command.is_pressed(CommandButtons::STRAFE_RIGHT) {
            velocity.x += acceleration.x;
        }
        if command.is_pressed(CommandButtons::FORWARD) {
            velocity.z += acceleration.z;
        }
        if command.is_pressed(CommandButtons::BACK) {
            velocity.z -= acceleration.z;
        }
        if state.is_flying {
            if command.is_pressed(CommandButtons::UP) {
                velocity.y += acceleration.y;
            }
            if command.is_pressed(CommandButtons::DOWN) {
                velocity.y -= acceleration.y;
            }
        }

        apply_friction(&mut velocity.x, friction);
        apply_friction(&mut velocity.z, friction);
        if state.is_flying {
            apply_friction(&mut velocity.y, friction);
        }

        let limit = state.velocity_limit;
        velocity.x = velocity.x.clamp(-limit.x, limit.x);
        velocity.z = velocity.z.clamp(-limit.z, limit.z);
        if state.is_flying {
            velocity.y = velocity.y.clamp(-limit.y, limit.y);
        }
    }

    /// Snap to the floor below, or mark the player airborne.
    fn update_vertical_velocity(
        &self,
        state: &mut PlayerState,
        bvh: &Bvh,
        debug: &mut dyn DebugSink,
    ) -> Result<(), CollisionError> {
        let snap = can_snap_vertically(bvh, &state.capsule, &self.config, debug)?;

        match snap {
            Some(snap) if state.velocity.y <= self.config.snap_velocity => {
                if !state.on_solid_floor {
                    log::debug!("Landed at y={:.2}", snap.resting_y);
                }

                let distance = state.capsule.center.y - snap.resting_y;
                state.on_solid_floor = true;
                state.velocity.y = 0.0;
                state.capsule.center.y = snap.resting_y;
                record_snap(bvh, &snap, distance, debug);
            }
            _ => {
                if state.on_solid_floor {
                    log::debug!("Left the ground at y={:.2}", state.capsule.center.y);
                }
                state.on_solid_floor = false;
            }
        }

        Ok(())
    }

    fn apply_gravity(&self, state: &mut PlayerState, multiplier: f32) {
        if state.on_solid_floor || state.is_flying {
            return;
        }

        state.velocity.y -= self.config.gravity * multiplier;
        state.velocity.y = state.velocity.y.max(-state.velocity_limit.y);
    }

    /// Speed keys move all three limits together.
    fn update_velocity_limit(&self, state: &mut PlayerState, command: &PlayerCommand) {
        let mut limit = state.velocity_limit.z;

        if command.is_pressed(CommandButtons::SPEED_UP) {
            limit += self.config.speed_step;
            state.velocity_limit = Vec3::splat(limit);
        }

        if command.is_pressed(CommandButtons::SPEED_DOWN) {
            limit = (limit - self.config.speed_step).max(self.config.min_velocity_limit);
            state.velocity_limit = Vec3::splat(limit);
        }
    }
}

/// Move `value` toward zero by `friction` without crossing it.
#[inline]
fn apply_friction(value: &mut f32, friction: f32) {
    *value = if *value > 0.0 {
        (*value - friction).max(0.0)
    } else {
        (*value + friction).min(0.0)
    };
}

/// Convert the camera relative velocity into a world displacement.
///
/// Strafing follows the horizontal right vector, forward motion the
/// horizontal look direction. Vertical velocity is world Y.
fn world_relative_displacement(state: &PlayerState, multiplier: f32) -> Vec3 {
    let velocity = state.velocity;
    let right = state.camera.right_xz();

    let mut displacement = right * velocity.x * multiplier;
    displacement.y += velocity.y * multiplier;

    if let Some(forward) = state.camera.forward_xz() {
        displacement += forward * velocity.z * multiplier;
    }

    displacement
}

fn record_status(state: &PlayerState, debug: &mut dyn DebugSink) {
    let center = state.capsule.center;
    debug.record_text(
        &format!(
            "CAPSULE POSITION:     {:.2}     {:.2}     {:.2}",
            center.x, center.y, center.z
        ),
        DebugColor::GREEN,
        0.0,
        120.0,
    );

    let color = if state.is_flying {
        DebugColor::RED
    } else {
        DebugColor::WHITE
    };
    debug.record_text("[9] SWITCH CAMERA MODE", color, 0.0, 140.0);
}

// ============================================================================
// Tests
// ============================================================================
