//! Game simulation - the main frame loop.
//!
//! One player moving through one level. Each tick reads the keyboard,
//! applies debug toggles, runs the controller and records the overlay.

use serde::{Deserialize, Serialize};
use slidecap_physics::{
    BvhError, CameraConfig, CollisionError, CollisionFlags, DebugFlags, MovementConfig,
    PlayerController, PlayerState,
};
use thiserror::Error;

use crate::debug::DebugOverlay;
use crate::input::{KeyBindings, KeyboardState};
use crate::level::Level;

/// Game simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Movement physics configuration.
    pub movement: MovementConfig,

    /// Mouse look configuration.
    pub camera: CameraConfig,

    pub bindings: KeyBindings,

    /// Debug toggles at startup.
    pub debug: DebugFlags,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            movement: MovementConfig::default(),
            camera: CameraConfig::default(),
            bindings: KeyBindings::default(),
            debug: DebugFlags::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Collision(#[from] CollisionError),

    #[error(transparent)]
    Level(#[from] BvhError),

    #[error("level '{0}' has no player spawn point")]
    NoSpawnPoint(String),
}

/// The main game simulation.
#[derive(Debug)]
pub struct Simulation {
    /// Current frame number.
    pub frame: u64,

    /// Simulation configuration.
    pub config: SimulationConfig,

    /// Current level.
    pub level: Level,

    pub player: PlayerState,

    /// Everything the physics reported during the last tick.
    pub debug: DebugOverlay,

    controller: PlayerController,
}

impl Simulation {
    /// Create a simulation with the player at the level's first spawn point.
    pub fn new(config: SimulationConfig, level: Level) -> Result<Self, SimulationError> {
        let controller = PlayerController::new(config.movement.clone(), config.camera.clone());
        let player = spawn_player(&level, &controller.config)?;
        let debug = DebugOverlay::new(config.debug);

        Ok(Self {
            frame: 0,
            config,
            level,
            player,
            debug,
            controller,
        })
    }

    /// Create a simulation with default configuration and test arena.
    pub fn test() -> Result<Self, SimulationError> {
        Self::new(SimulationConfig::default(), Level::test_arena()?)
    }

    /// Put the player back at the first spawn point.
    pub fn respawn(&mut self) -> Result<(), SimulationError> {
        self.player = spawn_player(&self.level, &self.controller.config)?;
        Ok(())
    }

    /// Advance the simulation by one frame.
    ///
    /// # Arguments
    ///
    /// * `keyboard` - Input for this frame; the caller ends its frame afterwards
    /// * `delta_time` - Time since the last tick in seconds; the controller
    ///   caps it at the movement reference frame time
    ///
    /// # Returns
    ///
    /// The contact classes the player met this frame.
    pub fn tick(
        &mut self,
        keyboard: &KeyboardState,
        delta_time: f32,
    ) -> Result<CollisionFlags, SimulationError> {
        self.debug.begin_frame();
        keyboard.apply_debug_toggles(&mut self.debug);

        let command = keyboard.command(&self.config.bindings);
        let flags = self.controller.update(
            &mut self.player,
            &command,
            &self.level.bvh,
            delta_time,
            &mut self.debug,
        )?;

        self.debug.record_legend();
        self.frame += 1;

        Ok(flags)
    }
}

fn spawn_player(level: &Level, config: &MovementConfig) -> Result<PlayerState, SimulationError> {
    let spawn = level
        .get_player_spawn(0)
        .ok_or_else(|| SimulationError::NoSpawnPoint(level.id.clone()))?;

    let player = PlayerState::spawn(spawn.position, spawn.facing, config, &level.bvh)?;
    log::debug!("Spawned in '{}' at {}", level.id, player.position());
    Ok(player)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use slidecap_physics::collision::is_in_valid_space;
    use slidecap_physics::{BvhBuilder, DebugColor, DebugSink, MovementMode};

    const FRAME: f32 = 0.033;

    fn run(sim: &mut Simulation, keyboard: &mut KeyboardState, frames: usize) {
        for _ in 0..frames {
            sim.tick(keyboard, FRAME).unwrap();
            keyboard.end_frame();
        }
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::test().unwrap();
        assert_eq!(sim.frame, 0);
        assert_eq!(sim.player.position(), Vec3::new(0.0, 40.0, 200.0));
    }

    #[test]
    fn test_tick_advances_frame() {
        let mut sim = Simulation::test().unwrap();
        let mut keyboard = KeyboardState::new();

        run(&mut sim, &mut keyboard, 2);
        assert_eq!(sim.frame, 2);
    }

    #[test]
    fn test_player_lands() {
        let mut sim = Simulation::test().unwrap();
        let mut keyboard = KeyboardState::new();

        run(&mut sim, &mut keyboard, 30);

        assert_eq!(sim.player.mode(), MovementMode::Grounded);
        assert!((sim.player.position().y - 28.0).abs() < 0.05);
    }

    #[test]
    fn test_walk_into_pillar() {
        let mut sim = Simulation::test().unwrap();
        let mut keyboard = KeyboardState::new();
        keyboard.press('w');

        run(&mut sim, &mut keyboard, 120);

        // Pillar front is the plane z = -160
        let position = sim.player.position();
        assert!(position.z > -145.0 && position.z < -140.0, "z = {}", position.z);
        assert!(position.x.abs() < 1e-3);
        assert!(is_in_valid_space(&sim.level.bvh, &sim.player.capsule).unwrap());
    }

    #[test]
    fn test_debug_overlay() {
        let mut sim = Simulation::test().unwrap();
        let mut keyboard = KeyboardState::new();

        run(&mut sim, &mut keyboard, 20);
        assert!(sim.debug.find_text("CAPSULE POSITION:").is_some());
        assert!(sim.debug.find_text("[P] DRAW STEP UP FACE").is_some());
        assert!(sim.debug.find_text("SNAPPING").is_none());

        keyboard.press('5');
        run(&mut sim, &mut keyboard, 1);
        assert!(sim.debug.flags().draw_status);

        let snapping = sim.debug.find_text("SNAPPING").expect("grounded player snaps");
        assert_eq!(snapping.color, DebugColor::GREEN);
        assert_eq!(sim.debug.faces().len(), 1);
    }

    #[test]
    fn test_fly_toggle_key() {
        let mut sim = Simulation::test().unwrap();
        let mut keyboard = KeyboardState::new();

        keyboard.press('9');
        run(&mut sim, &mut keyboard, 5);
        assert_eq!(sim.player.mode(), MovementMode::Flying);

        let flying = sim.debug.find_text("[9] SWITCH CAMERA MODE").unwrap();
        assert_eq!(flying.color, DebugColor::RED);
    }

    #[test]
    fn test_determinism() {
        let script = |frame: usize, keyboard: &mut KeyboardState| {
            for (key, on) in [('w', frame % 2 == 0), ('d', frame % 3 == 0), (' ', frame % 10 == 0)] {
                if on {
                    keyboard.press(key);
                } else {
                    keyboard.release(key);
                }
            }
            keyboard.move_mouse((frame % 7) as f32, 0.0);
        };

        let mut positions = Vec::new();
        for _ in 0..2 {
            let mut sim = Simulation::test().unwrap();
            let mut keyboard = KeyboardState::new();
            for frame in 0..100 {
                script(frame, &mut keyboard);
                sim.tick(&keyboard, FRAME).unwrap();
                keyboard.end_frame();
            }
            positions.push(sim.player.position());
        }

        assert_eq!(positions[0], positions[1]);
    }

    #[test]
    fn test_long_frames_are_capped() {
        let keyboard = KeyboardState::new();
        let mut capped = Simulation::test().unwrap();
        let mut stalled = Simulation::test().unwrap();

        capped.tick(&keyboard, capped.config.movement.reference_frame_time).unwrap();
        stalled.tick(&keyboard, 0.5).unwrap();

        assert_eq!(capped.player.position(), stalled.player.position());
        assert_eq!(capped.player.velocity, stalled.player.velocity);
    }

    #[test]
    fn test_respawn() {
        let mut sim = Simulation::test().unwrap();
        let mut keyboard = KeyboardState::new();
        keyboard.press('w');
        run(&mut sim, &mut keyboard, 10);

        sim.respawn().unwrap();
        assert_eq!(sim.player.position(), Vec3::new(0.0, 40.0, 200.0));
        assert_eq!(sim.player.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_missing_spawn_point() {
        let mut builder = BvhBuilder::new();
        builder.add_triangle(Vec3::ZERO, Vec3::X, Vec3::Z);
        let level = Level::new("bare", "Bare", &builder, Vec::new()).unwrap();

        let result = Simulation::new(SimulationConfig::default(), level);
        assert!(matches!(result, Err(SimulationError::NoSpawnPoint(id)) if id == "bare"));
    }
}
