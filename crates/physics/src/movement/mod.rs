//! Player movement physics system.
//!
//! This module implements a capsule character controller with:
//!
//! - Camera relative acceleration with friction
//! - Floor snapping and step climbing
//! - Gravity, jumping and a flying mode
//! - Multi-contact sliding with energy loss
//!
//! # Design
//!
//! Movement is controlled by the [`PlayerController`] which takes input commands
//! and updates the player's [`PlayerState`] against a static [`Bvh`](crate::Bvh).
//!
//! Given the same state, inputs and frame times, an update always produces
//! the same result.

mod camera;
mod config;
mod controller;
mod slide_move;
mod snap;
mod state;

pub use camera::Camera;
pub use config::{CameraConfig, MovementConfig};
pub use controller::PlayerController;
pub use slide_move::{handle_collision_detection, project_velocity, ResolutionReport};
pub use snap::{can_snap_vertically, can_step_up, SnapResult};
pub use state::{CommandButtons, MovementMode, PlayerCommand, PlayerState};
