//! Player state and input structures.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::config::MovementConfig;
use crate::collision::{ensure_in_valid_space, is_in_valid_space, Bvh, Capsule, CollisionError};

/// High level movement mode, derived from the state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementMode {
    /// Resting on a floor; gravity is off and jumps are allowed.
    Grounded,
    /// Falling or jumping.
    Airborne,
    /// Free flight, no gravity or snapping.
    Flying,
}

/// Complete movement state for a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    /// Collision volume; its center is the player position.
    pub capsule: Capsule,

    /// Camera relative velocity: x strafe, y vertical, z forward.
    pub velocity: Vec3,

    /// Current per-axis velocity cap, changed by the speed keys.
    pub velocity_limit: Vec3,

    pub is_flying: bool,

    /// Set by floor snapping at the start of a frame.
    pub on_solid_floor: bool,

    pub camera: Camera,
}

impl PlayerState {
    /// Create a state at `start`, facing -Z rotated by `angle` radians.
    ///
    /// The capsule is not checked against the world; see [`Self::spawn`].
    pub fn new(start: Vec3, angle: f32, config: &MovementConfig) -> Self {
        Self {
            capsule: config.capsule_at(start),
            velocity: Vec3::ZERO,
            velocity_limit: config.velocity_limit,
            is_flying: false,
            on_solid_floor: false,
            camera: Camera::facing(start, angle),
        }
    }

    /// Create a state and push it out of any geometry it starts in.
    pub fn spawn(
        start: Vec3,
        angle: f32,
        config: &MovementConfig,
        bvh: &Bvh,
    ) -> Result<Self, CollisionError> {
        let mut state = Self::new(start, angle, config);

        if !is_in_valid_space(bvh, &state.capsule)? {
            log::warn!("Spawn point {start} overlaps geometry, pushing out");
            ensure_in_valid_space(bvh, &mut state.capsule)?;
            state.camera.position = state.capsule.center;
        }

        Ok(state)
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.capsule.center
    }

    pub fn mode(&self) -> MovementMode {
        if self.is_flying {
            MovementMode::Flying
        } else if self.on_solid_floor {
            MovementMode::Grounded
        } else {
            MovementMode::Airborne
        }
    }
}

/// Input command from the player for a single frame.
///
/// `pressed` holds the keys currently down; `triggered` holds the keys that
/// went down this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerCommand {
    pub pressed: CommandButtons,
    pub triggered: CommandButtons,
    /// Mouse motion this frame in pixels.
    pub mouse_delta: Vec2,
}

/// Button state flags for player commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandButtons(pub u16);

impl CommandButtons {
    pub const FORWARD: u16 = 1 << 0;
    pub const BACK: u16 = 1 << 1;
    pub const STRAFE_LEFT: u16 = 1 << 2;
    pub const STRAFE_RIGHT: u16 = 1 << 3;

    /// Fly up, only while flying.
    pub const UP: u16 = 1 << 4;

    /// Fly down, only while flying.
    pub const DOWN: u16 = 1 << 5;

    pub const JUMP: u16 = 1 << 6;

    /// Toggle flying.
    pub const FLY: u16 = 1 << 7;

    /// Raise the velocity limit while held.
    pub const SPEED_UP: u16 = 1 << 8;

    /// Lower the velocity limit while held.
    pub const SPEED_DOWN: u16 = 1 << 9;

    /// Put the camera back to its initial orientation.
    pub const RESET_CAMERA: u16 = 1 << 10;

    /// Check if a button is set.
    #[inline]
    pub fn pressed(self, button: u16) -> bool {
        (self.0 & button) != 0
    }

    #[inline]
    pub fn press(&mut self, button: u16) {
        self.0 |= button;
    }

    #[inline]
    pub fn release(&mut self, button: u16) {
        self.0 &= !button;
    }
}

impl PlayerCommand {
    /// Command with `buttons` held and newly pressed this frame.
    pub fn tap(buttons: u16) -> Self {
        Self {
            pressed: CommandButtons(buttons),
            triggered: CommandButtons(buttons),
            mouse_delta: Vec2::ZERO,
        }
    }

    /// Command with `buttons` held since an earlier frame.
    pub fn hold(buttons: u16) -> Self {
        Self {
            pressed: CommandButtons(buttons),
            triggered: CommandButtons::default(),
            mouse_delta: Vec2::ZERO,
        }
    }

    #[inline]
    pub fn is_pressed(&self, button: u16) -> bool {
        self.pressed.pressed(button)
    }

    #[inline]
    pub fn is_triggered(&self, button: u16) -> bool {
        self.triggered.pressed(button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::BvhBuilder;

    #[test]
    fn test_player_command_buttons() {
        let mut cmd = PlayerCommand::default();
        assert!(!cmd.is_pressed(CommandButtons::JUMP));

        cmd.pressed.press(CommandButtons::JUMP);
        assert!(cmd.is_pressed(CommandButtons::JUMP));
        assert!(!cmd.is_triggered(CommandButtons::JUMP));

        cmd.pressed.release(CommandButtons::JUMP);
        assert!(!cmd.is_pressed(CommandButtons::JUMP));

        let tap = PlayerCommand::tap(CommandButtons::FLY | CommandButtons::FORWARD);
        assert!(tap.is_triggered(CommandButtons::FLY));
        assert!(tap.is_pressed(CommandButtons::FORWARD));
        assert!(!PlayerCommand::hold(CommandButtons::FLY).is_triggered(CommandButtons::FLY));
    }

    #[test]
    fn test_mode() {
        let config = MovementConfig::default();
        let mut state = PlayerState::new(Vec3::ZERO, 0.0, &config);
        assert_eq!(state.mode(), MovementMode::Airborne);

        state.on_solid_floor = true;
        assert_eq!(state.mode(), MovementMode::Grounded);

        state.is_flying = true;
        assert_eq!(state.mode(), MovementMode::Flying);
    }

    #[test]
    fn test_spawn_pushes_out_of_floor() {
        let mut builder = BvhBuilder::new();
        builder.add_quad(
            Vec3::new(-100.0, 0.0, 100.0),
            Vec3::new(100.0, 0.0, 100.0),
            Vec3::new(100.0, 0.0, -100.0),
            Vec3::new(-100.0, 0.0, -100.0),
        );
        let bvh = builder.build().unwrap();
        let config = MovementConfig::default();

        // Lowest point at y = -8
        let state = PlayerState::spawn(Vec3::new(0.0, 20.0, 0.0), 0.0, &config, &bvh).unwrap();

        assert!(is_in_valid_space(&bvh, &state.capsule).unwrap());
        assert!(state.position().y >= 27.9, "y = {}", state.position().y);
        assert_eq!(state.camera.position, state.position());
    }

    #[test]
    fn test_spawn_in_free_space_is_unchanged() {
        let bvh = {
            let mut builder = BvhBuilder::new();
            builder.add_triangle(
                Vec3::new(-10.0, 0.0, 10.0),
                Vec3::new(10.0, 0.0, 10.0),
                Vec3::new(0.0, 0.0, -10.0),
            );
            builder.build().unwrap()
        };
        let start = Vec3::new(0.0, 50.0, 0.0);
        let state = PlayerState::spawn(start, 0.0, &MovementConfig::default(), &bvh).unwrap();
        assert_eq!(state.position(), start);
    }
}
