//! Player input handling.
//!
//! This module tracks raw key and mouse state between frames and converts it
//! into commands for the physics system.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use slidecap_physics::movement::{CommandButtons, PlayerCommand};

use crate::debug::{DebugOverlay, DebugToggle};

/// Which key drives which movement button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    pub forward: char,
    pub back: char,
    pub strafe_left: char,
    pub strafe_right: char,
    pub up: char,
    pub down: char,
    pub jump: char,
    pub toggle_fly: char,
    pub speed_up: char,
    pub speed_down: char,
    pub reset_camera: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: 'w',
            back: 's',
            strafe_left: 'a',
            strafe_right: 'd',
            up: 'q',
            down: 'e',
            jump: ' ',
            toggle_fly: '9',
            speed_up: '1',
            speed_down: '2',
            reset_camera: 'c',
        }
    }
}

impl KeyBindings {
    fn buttons(&self) -> [(char, u16); 11] {
        [
            (self.forward, CommandButtons::FORWARD),
            (self.back, CommandButtons::BACK),
            (self.strafe_left, CommandButtons::STRAFE_LEFT),
            (self.strafe_right, CommandButtons::STRAFE_RIGHT),
            (self.up, CommandButtons::UP),
            (self.down, CommandButtons::DOWN),
            (self.jump, CommandButtons::JUMP),
            (self.toggle_fly, CommandButtons::FLY),
            (self.speed_up, CommandButtons::SPEED_UP),
            (self.speed_down, CommandButtons::SPEED_DOWN),
            (self.reset_camera, CommandButtons::RESET_CAMERA),
        ]
    }
}

/// Key and mouse state with edge detection.
///
/// Keys are case-insensitive. A key is triggered on the first frame it is
/// held; call [`KeyboardState::end_frame`] once per frame after the
/// command has been consumed.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: HashSet<char>,
    previous: HashSet<char>,
    mouse_delta: Vec2,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: char) {
        self.held.insert(key.to_ascii_lowercase());
    }

    pub fn release(&mut self, key: char) {
        self.held.remove(&key.to_ascii_lowercase());
    }

    /// Accumulate mouse motion in pixels.
    pub fn move_mouse(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vec2::new(dx, dy);
    }

    pub fn is_pressed(&self, key: char) -> bool {
        self.held.contains(&key.to_ascii_lowercase())
    }

    /// Held now but not last frame.
    pub fn is_triggered(&self, key: char) -> bool {
        let key = key.to_ascii_lowercase();
        self.held.contains(&key) && !self.previous.contains(&key)
    }

    /// Snapshot this frame's state as a physics command.
    pub fn command(&self, bindings: &KeyBindings) -> PlayerCommand {
        let mut command = PlayerCommand {
            mouse_delta: self.mouse_delta,
            ..Default::default()
        };

        for (key, button) in bindings.buttons() {
            if self.is_pressed(key) {
                command.pressed.press(button);
            }
            if self.is_triggered(key) {
                command.triggered.press(button);
            }
        }

        command
    }

    /// Flip the debug toggles whose keys were triggered this frame.
    pub fn apply_debug_toggles(&self, overlay: &mut DebugOverlay) {
        for toggle in DebugToggle::ALL {
            if self.is_triggered(toggle.key()) {
                overlay.toggle(toggle);
            }
        }
    }

    /// Roll held keys into the previous frame and clear mouse motion.
    pub fn end_frame(&mut self) {
        self.previous.clone_from(&self.held);
        self.mouse_delta = Vec2::ZERO;
    }
}
