//! Slidecap - Main Entry Point
//!
//! Runs a scripted walk through a test level without a window and logs
//! where the capsule ends up after each phase.
//!
//! Usage: `slidecap [arena|corner]`

use anyhow::{bail, Context, Result};
use slidecap_game::{KeyboardState, Level, Simulation, SimulationConfig};

/// Frame time fed to the simulation (seconds).
const FRAME_TIME: f32 = 1.0 / 60.0;

/// A stretch of frames with a fixed set of held keys.
struct Phase {
    name: &'static str,
    keys: &'static [char],
    mouse: (f32, f32),
    frames: usize,
}

const SCRIPT: &[Phase] = &[
    Phase { name: "settle", keys: &[], mouse: (0.0, 0.0), frames: 60 },
    Phase { name: "walk forward", keys: &['w'], mouse: (0.0, 0.0), frames: 120 },
    Phase { name: "turn right", keys: &[], mouse: (26.0, 0.0), frames: 60 },
    Phase { name: "strafe and jump", keys: &['d', ' '], mouse: (0.0, 0.0), frames: 90 },
    Phase { name: "fly up", keys: &['9', 'q'], mouse: (0.0, -5.0), frames: 60 },
    Phase { name: "land", keys: &['9'], mouse: (0.0, 0.0), frames: 1 },
    Phase { name: "fall", keys: &[], mouse: (0.0, 0.0), frames: 120 },
];

fn load_level(name: &str) -> Result<Level> {
    let level = match name {
        "arena" => Level::test_arena(),
        "corner" => Level::corner(),
        other => bail!("unknown level '{other}', expected 'arena' or 'corner'"),
    };
    level.with_context(|| format!("failed to build level '{name}'"))
}

fn main() -> Result<()> {
    env_logger::init();

    let level_name = std::env::args().nth(1).unwrap_or_else(|| "arena".to_string());
    let level = load_level(&level_name)?;
    log::info!("Loaded '{}' ({} faces)", level.name, level.bvh.face_count());

    let mut sim = Simulation::new(SimulationConfig::default(), level)
        .context("failed to start simulation")?;
    let mut keyboard = KeyboardState::new();

    for phase in SCRIPT {
        for key in phase.keys {
            keyboard.press(*key);
        }

        for _ in 0..phase.frames {
            keyboard.move_mouse(phase.mouse.0, phase.mouse.1);
            let flags = sim
                .tick(&keyboard, FRAME_TIME)
                .with_context(|| format!("frame {} failed", sim.frame))?;
            keyboard.end_frame();
            log::trace!("frame {} flags {:?}", sim.frame, flags);
        }

        for key in phase.keys {
            keyboard.release(*key);
        }
        keyboard.end_frame();

        let player = &sim.player;
        log::info!(
            "{:<16} frame {:>4}  position {:>8.2} {:>8.2} {:>8.2}  mode {:?}",
            phase.name,
            sim.frame,
            player.position().x,
            player.position().y,
            player.position().z,
            player.mode()
        );
    }

    println!(
        "Finished {} frames at {}",
        sim.frame,
        sim.player.position()
    );

    Ok(())
}
