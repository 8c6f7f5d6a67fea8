//! Slidecap Game Logic
//!
//! This crate wraps the physics in a playable frame loop:
//!
//! - Keyboard and mouse state with edge detection
//! - Debug overlay recording and runtime debug toggles
//! - Test levels built from code or indexed meshes
//! - A single-player simulation driven one frame at a time
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       Simulation                          │
//! │  ┌──────────┐    ┌────────────┐    ┌───────────────────┐  │
//! │  │ Keyboard │───►│ Controller │───►│ Player state      │  │
//! │  │  State   │    │ (snap, TOI,│    │ Debug overlay     │  │
//! │  └──────────┘    │  slide)    │    └───────────────────┘  │
//! │                  └────────────┘                           │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod debug;
pub mod input;
pub mod level;
pub mod simulation;

// Re-export main types
pub use debug::{DebugFace, DebugOverlay, DebugText, DebugToggle};
pub use input::{KeyBindings, KeyboardState};
pub use level::{Level, SpawnPoint};
pub use simulation::{Simulation, SimulationConfig, SimulationError};

// Re-export physics types for convenience
pub use slidecap_physics::{
    CollisionFlags, DebugFlags, MovementConfig, MovementMode, PlayerCommand, PlayerController,
    PlayerState,
};
