//! Slidecap Physics Engine
//!
//! Capsule character collision and response against a static triangle mesh.
//!
//! # Architecture
//!
//! The physics engine is split into three parts:
//!
//! - **Collision**: BVH over world triangles, swept capsule time of impact,
//!   contact grouping and normal averaging
//! - **Movement**: Uses collision sweeps to implement the player controller
//! - **Debug**: A sink the other two report faces and status text into
//!
//! Nothing here allocates per frame: sweep results live in fixed-capacity
//! buffers and overflowing one is reported as a [`CollisionError`].

pub mod collision;
pub mod debug;
pub mod movement;

// Re-export commonly used types
pub use collision::{
    Bvh, BvhBuilder, BvhError, Capsule, CollisionError, CollisionFlags, Face, IntersectionData,
    IntersectionInfo,
};
pub use debug::{DebugColor, DebugFlags, DebugSink, NullDebugSink};
pub use movement::{
    Camera, CameraConfig, CommandButtons, MovementConfig, MovementMode, PlayerCommand,
    PlayerController, PlayerState,
};
